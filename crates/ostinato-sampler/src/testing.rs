use crate::channel::Channel;
use crate::runtime::ChannelRuntime;
use crate::status::SamplePlayerMode;
use crate::wave::Wave;
use ostinato_core::{Frame, ResamplerQuality, Transport};

pub(crate) const WAVE_ID: u32 = 1;
pub(crate) const BLOCK: Frame = 64;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FakeTransport {
    pub running: bool,
    pub step: Frame,
    pub frame: Frame,
}

impl FakeTransport {
    pub fn running() -> Self {
        Self {
            running: true,
            ..Self::default()
        }
    }

    pub fn stopped() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: Frame) -> Self {
        self.step = step;
        self
    }
}

impl Transport for FakeTransport {
    fn is_running(&self) -> bool {
        self.running
    }

    fn can_quantize(&self) -> bool {
        self.running && self.step > 0
    }

    fn current_frame(&self) -> Frame {
        self.frame
    }

    fn quantizer_step(&self) -> Frame {
        self.step
    }
}

/// Stereo wave whose frame `i` holds `i + 1` in both channels, so silence and
/// content can't be confused.
pub(crate) fn ramp_wave(frames: Frame) -> Wave {
    let samples = (0..frames).map(|i| (i + 1) as f32).collect();
    Wave::from_interleaved(WAVE_ID, samples, 1, 44_100).unwrap()
}

pub(crate) fn channel(mode: SamplePlayerMode) -> Channel {
    let mut ch = Channel::new(1);
    ch.player.load_wave(&ramp_wave(1_000));
    ch.player.mode = mode;
    ch
}

pub(crate) fn runtime() -> ChannelRuntime {
    ChannelRuntime::new(BLOCK, ResamplerQuality::Linear).unwrap()
}
