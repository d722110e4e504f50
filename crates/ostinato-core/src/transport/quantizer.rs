//! One-shot grid trigger.
//!
//! A channel registers its deferred actions as variants of `A`, arms one with
//! [`Quantizer::trigger`], and gets it back from [`Quantizer::advance`] on the
//! block containing the next grid boundary, together with the boundary's
//! offset inside the block.

use crate::Frame;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer<A> {
    armed: Option<A>,
}

impl<A> Default for Quantizer<A> {
    fn default() -> Self {
        Self { armed: None }
    }
}

impl<A: Copy> Quantizer<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms `action`, replacing any pending one.
    pub fn trigger(&mut self, action: A) {
        self.armed = Some(action);
    }

    /// Cancels the pending action. Clearing an idle quantizer is a no-op.
    pub fn clear(&mut self) {
        self.armed = None;
    }

    pub fn is_triggered(&self) -> bool {
        self.armed.is_some()
    }

    pub fn pending(&self) -> Option<A> {
        self.armed
    }

    /// Fires the armed action if a multiple of `step` lies in `block`. Fires at
    /// most once, at the first boundary, however many the block spans.
    pub fn advance(&mut self, block: Range<Frame>, step: Frame) -> Option<(A, Frame)> {
        let action = self.armed?;
        if step == 0 {
            return None;
        }

        let remainder = block.start % step;
        let boundary = if remainder == 0 {
            block.start
        } else {
            block.start + (step - remainder)
        };
        if boundary >= block.end {
            return None;
        }

        self.armed = None;
        Some((action, boundary - block.start))
    }
}
