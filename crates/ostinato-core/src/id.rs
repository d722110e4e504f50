//! Monotonic id generator.
//!
//! Each aggregate that hands out ids owns its own `IdManager` (channels, actions,
//! waves never share one). Zero is reserved for "no id".

use crate::Id;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdManager {
    max: Id,
}

impl IdManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `requested` if non-zero, raising the high-water mark to it,
    /// otherwise a fresh id above every id seen so far.
    pub fn generate(&mut self, requested: Id) -> Id {
        if requested != 0 {
            self.set(requested);
            return requested;
        }
        self.max += 1;
        self.max
    }

    /// Raises the high-water mark so ids up to `id` are never handed out.
    pub fn set(&mut self, id: Id) {
        self.max = self.max.max(id);
    }

    /// Highest id generated or seen.
    pub fn get(&self) -> Id {
        self.max
    }

    pub fn reset(&mut self) {
        self.max = 0;
    }
}
