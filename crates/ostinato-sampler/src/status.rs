//! Channel status and playback mode.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

/// Play (or record) status of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelStatus {
    #[default]
    Off,
    /// Armed, waiting for the next first beat or bar.
    Wait,
    Play,
    /// Stop requested, runs until the next first beat or sample end.
    Ending,
}

impl ChannelStatus {
    pub const ALL: [ChannelStatus; 4] = [
        ChannelStatus::Off,
        ChannelStatus::Wait,
        ChannelStatus::Play,
        ChannelStatus::Ending,
    ];

    /// Producing audio.
    pub fn is_playing(self) -> bool {
        matches!(self, ChannelStatus::Play | ChannelStatus::Ending)
    }

    const fn code(self) -> u8 {
        match self {
            ChannelStatus::Off => 0,
            ChannelStatus::Wait => 1,
            ChannelStatus::Play => 2,
            ChannelStatus::Ending => 3,
        }
    }

    const fn from_code(code: u8) -> Self {
        match code {
            1 => ChannelStatus::Wait,
            2 => ChannelStatus::Play,
            3 => ChannelStatus::Ending,
            _ => ChannelStatus::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SamplePlayerMode {
    /// Loops from the next first beat until stopped.
    LoopBasic,
    /// Plays once per loop, starting on the first beat.
    LoopOnce,
    /// Restarts on every bar.
    LoopRepeat,
    /// Plays once, starting on the next bar.
    LoopOnceBar,
    /// One-shot. Pressing again while playing stops and rewinds.
    #[default]
    SingleBasic,
    /// One-shot. Pressing again while playing pauses in place.
    SingleBasicPause,
    /// Plays while the key is held.
    SinglePress,
    /// One-shot. Pressing again restarts from the beginning.
    SingleRetrig,
    /// One-shot that keeps looping until pressed again.
    SingleEndless,
}

impl SamplePlayerMode {
    pub const ALL: [SamplePlayerMode; 9] = [
        SamplePlayerMode::LoopBasic,
        SamplePlayerMode::LoopOnce,
        SamplePlayerMode::LoopRepeat,
        SamplePlayerMode::LoopOnceBar,
        SamplePlayerMode::SingleBasic,
        SamplePlayerMode::SingleBasicPause,
        SamplePlayerMode::SinglePress,
        SamplePlayerMode::SingleRetrig,
        SamplePlayerMode::SingleEndless,
    ];

    /// Sequencer-synced loop family.
    pub fn is_any_loop(self) -> bool {
        matches!(
            self,
            SamplePlayerMode::LoopBasic
                | SamplePlayerMode::LoopOnce
                | SamplePlayerMode::LoopRepeat
                | SamplePlayerMode::LoopOnceBar
        )
    }

    /// Modes that wrap to `begin` when they reach the end while playing.
    pub fn wraps(self) -> bool {
        matches!(
            self,
            SamplePlayerMode::LoopBasic
                | SamplePlayerMode::LoopRepeat
                | SamplePlayerMode::SingleEndless
        )
    }
}

/// Status cell polled by control threads.
#[derive(Debug, Default)]
#[repr(align(64))]
pub struct AtomicStatus {
    value: AtomicU8,
}

impl AtomicStatus {
    pub fn new(status: ChannelStatus) -> Self {
        Self {
            value: AtomicU8::new(status.code()),
        }
    }

    #[inline]
    pub fn get(&self) -> ChannelStatus {
        ChannelStatus::from_code(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, status: ChannelStatus) {
        self.value.store(status.code(), Ordering::Release);
    }
}
