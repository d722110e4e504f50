//! Single-value cells the audio thread stores into and control threads poll:
//! playhead, trackers, meters and flags. Each cell has one writer; a reader
//! sees the latest store and everything the writer did before it.

use atomic_float::AtomicF32;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::Frame;

macro_rules! published_cell {
    ($(#[$meta:meta])* $name:ident($atomic:ty) -> $value:ty = $zero:expr) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name($atomic);

        impl $name {
            pub fn new(value: $value) -> Self {
                Self(<$atomic>::new(value))
            }

            #[inline]
            pub fn get(&self) -> $value {
                self.0.load(Ordering::Acquire)
            }

            #[inline]
            pub fn set(&self, value: $value) {
                self.0.store(value, Ordering::Release);
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new($zero)
            }
        }
    };
}

published_cell!(
    /// Meter levels and gains.
    AtomicFloat(AtomicF32) -> f32 = 0.0
);

published_cell!(AtomicFlag(AtomicBool) -> bool = false);

published_cell!(
    /// Positions in frames: the sequencer playhead, channel trackers.
    AtomicFrame(AtomicUsize) -> Frame = 0
);
