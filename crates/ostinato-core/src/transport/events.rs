use crate::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerEventKind {
    /// Loop start (frame 0).
    FirstBeat,
    /// Bar boundary other than the loop start.
    Bar,
    /// Recorded actions exist at `global_frame`.
    Actions,
    /// The sequencer stopped since the previous block.
    Stop,
}

/// One entry of the per-block bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerEvent {
    pub kind: SequencerEventKind,
    /// Offset inside the block.
    pub delta: Frame,
    pub global_frame: Frame,
}
