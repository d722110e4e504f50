//! Sequencer clock, per-block event bundle and grid quantizer.

mod events;
mod quantizer;
mod sequencer;

pub use events::{SequencerEvent, SequencerEventKind};
pub use quantizer::Quantizer;
pub use sequencer::{Sequencer, SequencerState, SequencerStatus};

use crate::Frame;

/// Transport queries the channel state machine relies on.
pub trait Transport {
    fn is_running(&self) -> bool;

    /// Running with a quantize grid selected.
    fn can_quantize(&self) -> bool;

    /// Global frame at the head of the current block.
    fn current_frame(&self) -> Frame;

    /// Grid step in frames, 0 when quantization is off.
    fn quantizer_step(&self) -> Frame;
}

/// Rounds `frame` to the nearest multiple of `step`. A zero step leaves the
/// frame untouched.
pub fn quantize_frame(frame: Frame, step: Frame) -> Frame {
    if step == 0 {
        return frame;
    }
    let below = frame - frame % step;
    if frame - below >= step.div_ceil(2) {
        below + step
    } else {
        below
    }
}
