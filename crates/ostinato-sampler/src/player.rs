//! Per-channel playback settings, stored in the document.

use crate::status::SamplePlayerMode;
use crate::wave::Wave;
use ostinato_core::{Frame, Id, MAX_PITCH, MIN_PITCH};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplePlayer {
    /// 0 when no wave is loaded.
    pub wave_id: Id,
    pub mode: SamplePlayerMode,
    /// First frame played.
    pub begin: Frame,
    /// One past the last frame played.
    pub end: Frame,
    pub shift: Frame,
    pitch: f32,
    /// Map key velocity onto the channel's internal volume.
    pub velocity_as_vol: bool,
}

impl Default for SamplePlayer {
    fn default() -> Self {
        Self {
            wave_id: 0,
            mode: SamplePlayerMode::default(),
            begin: 0,
            end: 0,
            shift: 0,
            pitch: 1.0,
            velocity_as_vol: false,
        }
    }
}

impl SamplePlayer {
    pub fn has_wave(&self) -> bool {
        self.wave_id != 0
    }

    /// Binds `wave` and resets the markers to its full length.
    pub fn load_wave(&mut self, wave: &Wave) {
        self.wave_id = wave.id();
        self.begin = 0;
        self.end = wave.frames();
        self.shift = 0;
    }

    pub fn unload_wave(&mut self) {
        self.wave_id = 0;
        self.begin = 0;
        self.end = 0;
        self.shift = 0;
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Sets the pitch, clamped to `MIN_PITCH..=MAX_PITCH`.
    pub fn set_pitch(&mut self, pitch: f32) {
        let clamped = pitch.clamp(MIN_PITCH, MAX_PITCH);
        if clamped != pitch {
            tracing::warn!(pitch, clamped, "pitch out of range");
        }
        self.pitch = clamped;
    }

    /// Sets begin/end, keeping `begin <= end`.
    pub fn set_range(&mut self, begin: Frame, end: Frame) {
        self.begin = begin.min(end);
        self.end = end.max(begin);
    }

    pub fn with_mode(mut self, mode: SamplePlayerMode) -> Self {
        self.mode = mode;
        self
    }
}
