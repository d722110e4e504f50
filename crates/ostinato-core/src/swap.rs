//! Lock-free document swap.
//!
//! A ring of [`SLOTS`] full snapshots is shared between one writer (control
//! side) and one reader (audio thread). At any instant one slot is the
//! published front, one is the writer's back, and the third is either idle or
//! still being read from an earlier publish.
//!
//! The reader claims the front index for the scope of an [`RtLock`]; the writer
//! publishes its back and then picks a new back that is neither the new front
//! nor the claimed slot, so it never writes into a snapshot being read. A swap
//! that lands while the audio thread holds a lock becomes visible on its next
//! lock. Both halves use `SeqCst` on `front` and `claimed` so each side sees
//! the other's store before relying on its own load.
//!
//! The writer half is not `Clone` and swaps through `&mut self`, so only one
//! control thread can swap at a time; share it behind a mutex if several
//! threads edit.

use std::cell::UnsafeCell;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshots in the ring.
pub const SLOTS: usize = 3;

const UNCLAIMED: usize = usize::MAX;

/// What a swap changed, passed to the post-swap listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapHint {
    /// Structure changed (channels added/removed, actions edited): dependents rebuild.
    Hard,
    /// Properties changed: dependents redraw.
    Soft,
    None,
}

struct Snapshot<T> {
    document: T,
    shared_open: bool,
}

struct Ring<T> {
    slots: [UnsafeCell<Snapshot<T>>; SLOTS],
    front: AtomicUsize,
    claimed: AtomicUsize,
}

// SAFETY: the writer only touches its back slot and the front it just
// published (read-only); the reader only touches the slot it claimed, which the
// writer never selects as back. See the module docs for the handshake.
unsafe impl<T: Send + Sync> Sync for Ring<T> {}

/// Builds a ring with every slot initialised to `initial`.
pub fn ring<T: Clone>(initial: T) -> (SwapWriter<T>, SwapReader<T>) {
    let slot = |document: T| {
        UnsafeCell::new(Snapshot {
            document,
            shared_open: true,
        })
    };
    let ring = Arc::new(Ring {
        slots: [slot(initial.clone()), slot(initial.clone()), slot(initial)],
        front: AtomicUsize::new(0),
        claimed: AtomicUsize::new(UNCLAIMED),
    });

    let writer = SwapWriter {
        ring: Arc::clone(&ring),
        back: 1,
        listener: None,
        swaps: 0,
    };
    (writer, SwapReader { ring })
}

/// Picks a slot that is neither `published` nor `claimed`.
#[inline]
fn free_slot(published: usize, claimed: usize) -> usize {
    let next = (published + 1) % SLOTS;
    if next == claimed {
        (next + 1) % SLOTS
    } else {
        next
    }
}

type Listener = Box<dyn FnMut(SwapHint) + Send>;

/// Control-side half: edits the back version and publishes it.
pub struct SwapWriter<T> {
    ring: Arc<Ring<T>>,
    back: usize,
    listener: Option<Listener>,
    swaps: u64,
}

impl<T: Clone> SwapWriter<T> {
    /// The back version.
    pub fn get(&self) -> &T {
        // SAFETY: the back slot is never claimed by the reader.
        unsafe { &(*self.ring.slots[self.back].get()).document }
    }

    /// Mutable access to the back version. Changes stay invisible to the
    /// audio thread until [`swap`](Self::swap).
    pub fn get_mut(&mut self) -> &mut T {
        // SAFETY: as above, and `&mut self` rules out a second writer borrow.
        unsafe { &mut (*self.ring.slots[self.back].get()).document }
    }

    /// Registers the callback run after every swap.
    pub fn set_listener(&mut self, listener: impl FnMut(SwapHint) + Send + 'static) {
        self.listener = Some(Box::new(listener));
    }

    /// Publishes the back version as the new front, then refreshes a free
    /// slot from it to become the next back.
    pub fn swap(&mut self, hint: SwapHint) {
        let published = self.back;
        self.ring.front.store(published, Ordering::SeqCst);

        let claimed = self.ring.claimed.load(Ordering::SeqCst);
        let next = free_slot(published, claimed);

        // SAFETY: `next` is neither the front nor the claimed slot; the reader
        // can only claim `published` from now on. `published` is only read.
        unsafe {
            let source = &*self.ring.slots[published].get();
            let target = &mut *self.ring.slots[next].get();
            target.document.clone_from(&source.document);
            target.shared_open = source.shared_open;
        }
        self.back = next;
        self.swaps += 1;

        if let Some(listener) = self.listener.as_mut() {
            listener(hint);
        }
    }

    /// Number of swaps performed.
    pub fn swaps(&self) -> u64 {
        self.swaps
    }

    /// Marks whether snapshots published from the back may touch shared stores.
    pub(crate) fn set_shared_open(&mut self, open: bool) {
        // SAFETY: back slot, see `get_mut`.
        unsafe { (*self.ring.slots[self.back].get()).shared_open = open }
    }

    /// Waits until the reader holds no snapshot older than the current front.
    pub(crate) fn wait_for_reader(&self) {
        loop {
            let claimed = self.ring.claimed.load(Ordering::SeqCst);
            if claimed == UNCLAIMED || claimed == self.ring.front.load(Ordering::SeqCst) {
                return;
            }
            std::hint::spin_loop();
            std::thread::yield_now();
        }
    }

    pub(crate) fn ring_id(&self) -> usize {
        Arc::as_ptr(&self.ring) as *const () as usize
    }
}

/// Audio-thread half.
pub struct SwapReader<T> {
    ring: Arc<Ring<T>>,
}

impl<T> SwapReader<T> {
    /// Claims the current front for the lifetime of the returned lock. Never
    /// blocks: it only retries while a publish races with the claim.
    pub fn lock(&mut self) -> RtLock<'_, T> {
        let ring = &*self.ring;
        let mut index = ring.front.load(Ordering::SeqCst);
        loop {
            ring.claimed.store(index, Ordering::SeqCst);
            let current = ring.front.load(Ordering::SeqCst);
            if current == index {
                break;
            }
            index = current;
        }
        RtLock { ring, index }
    }
}

/// Scoped read-only access to one published snapshot.
pub struct RtLock<'a, T> {
    ring: &'a Ring<T>,
    index: usize,
}

impl<T> RtLock<'_, T> {
    /// Whether shared stores may be read under this snapshot.
    pub fn shared_open(&self) -> bool {
        // SAFETY: the slot is claimed for the lock's lifetime.
        unsafe { (*self.ring.slots[self.index].get()).shared_open }
    }

    pub(crate) fn ring_id(&self) -> usize {
        self.ring as *const Ring<T> as *const () as usize
    }
}

impl<T> Deref for RtLock<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the slot is claimed for the lock's lifetime.
        unsafe { &(*self.ring.slots[self.index].get()).document }
    }
}

impl<T> Drop for RtLock<'_, T> {
    fn drop(&mut self) {
        self.ring.claimed.store(UNCLAIMED, Ordering::SeqCst);
    }
}
