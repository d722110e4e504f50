//! Audio-thread state of one channel.
//!
//! Lives in the shared store keyed by channel id: created and destroyed by the
//! control side under a store lock, mutated only by the audio thread. The
//! [`ChannelMonitor`] is the read-only window control threads poll.

use crate::error::Result;
use crate::status::{AtomicStatus, ChannelStatus};
use ostinato_core::{
    AtomicFlag, AtomicFloat, AtomicFrame, AudioBuffer, AudioBufferViewMut, Frame, Quantizer,
    Resampler, ResamplerQuality, MAX_IO_CHANS,
};
use std::sync::Arc;

/// Deferred actions a channel can arm on its quantizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizedAction {
    Play,
    Rewind,
}

/// Lock-free mirror of a channel's runtime state.
#[derive(Debug, Default)]
pub struct ChannelMonitor {
    pub status: AtomicStatus,
    pub rec_status: AtomicStatus,
    pub tracker: AtomicFrame,
    pub read_actions: AtomicFlag,
    pub quantizing: AtomicFlag,
    pub peak: AtomicFloat,
}

#[derive(Debug)]
pub struct ChannelRuntime {
    pub(crate) status: ChannelStatus,
    pub(crate) rec_status: ChannelStatus,
    pub(crate) read_actions: bool,
    pub(crate) tracker: Frame,
    /// Block offset the next render starts writing at.
    pub(crate) offset: Frame,
    pub(crate) rewinding: bool,
    /// Block frame a pending stop cuts playback at. The status stays playing
    /// until the renderer reaches it.
    pub(crate) stop_at: Option<Frame>,
    pub(crate) quantizing: bool,
    pub(crate) quantizer: Quantizer<QuantizedAction>,
    pub(crate) volume_i: f32,
    pub(crate) buffer: AudioBuffer,
    pub(crate) resampler: Resampler,
    monitor: Arc<ChannelMonitor>,
}

impl ChannelRuntime {
    /// Allocates the working buffer for blocks of up to `max_block` frames.
    pub fn new(max_block: Frame, quality: ResamplerQuality) -> Result<Self> {
        Ok(Self {
            status: ChannelStatus::Off,
            rec_status: ChannelStatus::Off,
            read_actions: false,
            tracker: 0,
            offset: 0,
            rewinding: false,
            stop_at: None,
            quantizing: false,
            quantizer: Quantizer::new(),
            volume_i: 1.0,
            buffer: AudioBuffer::with_size(max_block, MAX_IO_CHANS),
            resampler: Resampler::new(quality, MAX_IO_CHANS)?,
            monitor: Arc::new(ChannelMonitor::default()),
        })
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn rec_status(&self) -> ChannelStatus {
        self.rec_status
    }

    pub fn read_actions(&self) -> bool {
        self.read_actions
    }

    pub fn tracker(&self) -> Frame {
        self.tracker
    }

    pub fn volume_i(&self) -> f32 {
        self.volume_i
    }

    pub fn is_quantizing(&self) -> bool {
        self.quantizing
    }

    pub fn is_stopping(&self) -> bool {
        self.stop_at.is_some()
    }

    pub fn monitor(&self) -> Arc<ChannelMonitor> {
        Arc::clone(&self.monitor)
    }

    /// Starts reading recorded actions right away. Used when a patch restores a
    /// channel that was reading.
    pub fn set_read_actions(&mut self, read: bool) {
        self.read_actions = read;
        self.rec_status = if read {
            ChannelStatus::Play
        } else {
            ChannelStatus::Off
        };
    }

    /// Rendered audio of the last block.
    pub fn output(&self, frames: Frame) -> &[f32] {
        let frames = frames.min(self.buffer.frames());
        &self.buffer.samples()[..frames * MAX_IO_CHANS]
    }

    /// The first `frames` frames of the working buffer.
    pub(crate) fn block_view(buffer: &mut AudioBuffer, frames: Frame) -> AudioBufferViewMut<'_> {
        let frames = frames.min(buffer.frames());
        AudioBuffer::view_mut(&mut buffer.samples_mut()[..frames * MAX_IO_CHANS], frames, MAX_IO_CHANS)
    }

    pub(crate) fn arm(&mut self, action: QuantizedAction) {
        self.quantizer.trigger(action);
        self.quantizing = true;
    }

    pub(crate) fn disarm(&mut self) {
        self.quantizer.clear();
        self.quantizing = false;
    }

    /// Back to idle: stopped, cursor at 0, nothing armed. Used when the
    /// channel's wave changes under it.
    pub fn reset(&mut self) {
        self.status = ChannelStatus::Off;
        self.tracker = 0;
        self.offset = 0;
        self.rewinding = false;
        self.stop_at = None;
        self.volume_i = 1.0;
        self.disarm();
        self.resampler.last();
        self.buffer.clear_all();
    }

    /// Zeroes the working buffer for a new block.
    pub fn begin_block(&mut self, frames: Frame) {
        self.buffer.clear(0..frames);
    }

    /// Copies the state into the monitor. Atomic stores only.
    pub fn publish(&self, frames: Frame) {
        let m = &*self.monitor;
        m.status.set(self.status);
        m.rec_status.set(self.rec_status);
        m.tracker.set(self.tracker);
        m.read_actions.set(self.read_actions);
        m.quantizing.set(self.quantizing);
        let peak = self
            .output(frames)
            .iter()
            .fold(0.0_f32, |peak, s| peak.max(s.abs()));
        m.peak.set(peak);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_runtime_is_idle() {
        let rt = ChannelRuntime::new(64, ResamplerQuality::Linear).unwrap();
        assert_eq!(rt.status(), ChannelStatus::Off);
        assert_eq!(rt.volume_i(), 1.0);
        assert!(!rt.is_quantizing());
        assert_eq!(rt.output(64).len(), 64 * MAX_IO_CHANS);
    }

    #[test]
    fn test_arm_and_disarm_track_quantizing() {
        let mut rt = ChannelRuntime::new(64, ResamplerQuality::Linear).unwrap();
        rt.arm(QuantizedAction::Play);
        assert!(rt.is_quantizing());
        assert_eq!(rt.quantizer.pending(), Some(QuantizedAction::Play));
        rt.disarm();
        assert!(!rt.is_quantizing());
        assert!(!rt.quantizer.is_triggered());
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut rt = ChannelRuntime::new(4, ResamplerQuality::Linear).unwrap();
        rt.status = ChannelStatus::Play;
        rt.tracker = 300;
        rt.rewinding = true;
        rt.stop_at = Some(2);
        rt.volume_i = 0.2;
        rt.arm(QuantizedAction::Rewind);
        rt.buffer.frame_mut(0)[1] = 1.0;

        rt.reset();

        assert_eq!(rt.status(), ChannelStatus::Off);
        assert_eq!(rt.tracker(), 0);
        assert!(!rt.rewinding);
        assert!(!rt.is_stopping());
        assert!(!rt.is_quantizing());
        assert_eq!(rt.volume_i(), 1.0);
        assert!(rt.output(4).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_publish_mirrors_state() {
        let mut rt = ChannelRuntime::new(4, ResamplerQuality::Linear).unwrap();
        let monitor = rt.monitor();
        rt.status = ChannelStatus::Play;
        rt.tracker = 42;
        rt.buffer.frame_mut(1)[0] = -0.5;
        rt.set_read_actions(true);

        rt.publish(4);

        assert_eq!(monitor.status.get(), ChannelStatus::Play);
        assert_eq!(monitor.rec_status.get(), ChannelStatus::Play);
        assert_eq!(monitor.tracker.get(), 42);
        assert!(monitor.read_actions.get());
        assert_eq!(monitor.peak.get(), 0.5);
    }
}
