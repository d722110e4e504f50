//! Id-addressed store for heavyweight objects shared with the audio thread.
//!
//! Decoded waves and per-channel runtime state are too large (or too stateful)
//! to clone into every document snapshot. They live here instead, addressed by
//! the ids the document carries.
//!
//! Exclusion works through the document ring rather than a lock the audio
//! thread could block on. [`SharedStore::lock`] closes the shared gate on the
//! back document, publishes it, and waits until the audio thread no longer
//! holds an older snapshot. From then on every snapshot the reader can claim
//! has the gate closed, so [`StoreReader::get`] returns `None` and the control
//! thread has the items to itself. Dropping the [`DataLock`] reopens the gate
//! with a second swap.

use crate::swap::{RtLock, SwapHint, SwapWriter};
use crate::Id;
use hashbrown::HashMap;
use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

struct Items<V> {
    map: UnsafeCell<HashMap<Id, V>>,
    ring: usize,
}

// SAFETY: the map is accessed either by the control thread under a DataLock
// or by the single StoreReader while the gate is open, never both.
unsafe impl<V: Send> Sync for Items<V> {}

/// Control-side handle.
pub struct SharedStore<V> {
    items: Arc<Items<V>>,
}

/// Audio-thread handle. Not `Clone`: there is exactly one.
pub struct StoreReader<V> {
    items: Arc<Items<V>>,
}

impl<V> SharedStore<V> {
    /// Creates a store gated by the ring `writer` belongs to.
    pub fn new<T: Clone>(writer: &SwapWriter<T>) -> (SharedStore<V>, StoreReader<V>) {
        let items = Arc::new(Items {
            map: UnsafeCell::new(HashMap::new()),
            ring: writer.ring_id(),
        });
        (
            SharedStore {
                items: Arc::clone(&items),
            },
            StoreReader { items },
        )
    }

    /// Takes exclusive access to the items. Forces a swap so the audio thread
    /// steps off the store before this returns.
    pub fn lock<'a, T: Clone>(&'a mut self, writer: &'a mut SwapWriter<T>) -> DataLock<'a, T, V> {
        debug_assert_eq!(writer.ring_id(), self.items.ring, "store locked through a foreign ring");

        writer.set_shared_open(false);
        writer.swap(SwapHint::None);
        writer.wait_for_reader();
        tracing::debug!(swaps = writer.swaps(), "shared store locked");

        DataLock {
            items: &self.items,
            writer,
        }
    }
}

/// Exclusive scoped access to a [`SharedStore`].
pub struct DataLock<'a, T: Clone, V> {
    items: &'a Items<V>,
    writer: &'a mut SwapWriter<T>,
}

impl<T: Clone, V> DataLock<'_, T, V> {
    /// The document back version, editable while the store is held.
    pub fn document(&mut self) -> &mut T {
        self.writer.get_mut()
    }
}

impl<T: Clone, V> Deref for DataLock<'_, T, V> {
    type Target = HashMap<Id, V>;

    fn deref(&self) -> &HashMap<Id, V> {
        // SAFETY: the reader is locked out for the lifetime of the DataLock.
        unsafe { &*self.items.map.get() }
    }
}

impl<T: Clone, V> DerefMut for DataLock<'_, T, V> {
    fn deref_mut(&mut self) -> &mut HashMap<Id, V> {
        // SAFETY: as above; `&mut self` makes this the only borrow.
        unsafe { &mut *self.items.map.get() }
    }
}

impl<T: Clone, V> Drop for DataLock<'_, T, V> {
    fn drop(&mut self) {
        self.writer.set_shared_open(true);
        self.writer.swap(SwapHint::None);
        tracing::debug!("shared store released");
    }
}

impl<V> StoreReader<V> {
    /// The items, if `lock`'s snapshot lets the audio thread touch them. The
    /// borrow is tied to the lock so it can't outlive the claim.
    pub fn get<'a, T>(&'a mut self, lock: &'a RtLock<'_, T>) -> Option<&'a mut HashMap<Id, V>> {
        debug_assert_eq!(lock.ring_id(), self.items.ring, "store read through a foreign ring");
        if !lock.shared_open() {
            return None;
        }
        // SAFETY: gate open means no DataLock is held; `&mut self` on the only
        // reader handle makes this the only borrow.
        Some(unsafe { &mut *self.items.map.get() })
    }
}
