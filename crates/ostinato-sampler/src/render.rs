//! Reads a channel's wave into its working buffer.
//!
//! The cursor is clamped to `[begin, end)` first. A pending rewind stitches the
//! old tail at the block head and restarts from `begin` at the rewind offset.
//! Crossing `end` resets the resampler and runs the last-frame transition. For
//! wrapping modes still in `Play` the rest of the block refills from `begin`.
//! A pending stop limits the block to the stop frame; the frames after it stay
//! silent and the channel ends as an interrupted play.

use crate::controller::SampleController;
use crate::error::Result;
use crate::runtime::ChannelRuntime;
use crate::wave::Wave;
use ostinato_core::{AudioBufferView, Conversion, Frame, Pan, Transport};

impl ChannelRuntime {
    /// Writes `source` from `start` into the block from `offset` to its end.
    fn fill(&mut self, source: &AudioBufferView<'_>, start: Frame, offset: Frame, pitch: f32, frames: Frame) -> Result<Conversion> {
        let mut out = Self::block_view(&mut self.buffer, frames);
        if offset >= out.frames() || start >= source.frames() {
            return Ok(Conversion::default());
        }

        if pitch == 1.0 {
            let used = (out.frames() - offset).min(source.frames() - start);
            out.set(source, used, start, offset, 1.0, Pan::CENTER);
            return Ok(Conversion {
                used,
                generated: used,
            });
        }

        let ratio = 1.0 / f64::from(pitch);
        Ok(self.resampler.process(source, start, &mut out, offset, ratio)?)
    }
}

impl<T: Transport> SampleController<'_, T> {
    /// Renders `frames` frames into the runtime's working buffer. Does nothing
    /// unless the channel is playing.
    pub fn render(&self, rt: &mut ChannelRuntime, wave: &Wave, frames: Frame) -> Result<()> {
        let stop_at = rt.stop_at.take();
        let player = &self.channel().player;
        let end = player.end.min(wave.frames());
        let begin = player.begin.min(end);
        if !rt.status.is_playing() || begin == end {
            if stop_at.is_some() {
                self.finish_stop(rt);
            }
            return Ok(());
        }
        let limit = stop_at.map_or(frames, |at| at.min(frames));
        let pitch = player.pitch();
        let source = wave.view_until(end);

        let mut tracker = rt.tracker;
        if tracker < begin || tracker >= end {
            tracker = begin;
        }

        if rt.rewinding {
            let tail = rt.offset.min(limit);
            rt.fill(&source, tracker, 0, pitch, tail)?;
            rt.rewinding = false;
            rt.resampler.last();
            tracker = begin;
        }

        let mut offset = rt.offset;
        loop {
            let conv = rt.fill(&source, tracker, offset, pitch, limit)?;
            tracker += conv.used;
            offset += conv.generated;
            if tracker < end {
                break;
            }

            tracker = begin;
            rt.resampler.last();
            self.on_last_frame(rt, true);
            // Regions shorter than the block wrap more than once.
            if !self.should_loop(rt) || offset >= limit || conv.generated == 0 {
                break;
            }
        }

        rt.offset = 0;
        rt.tracker = tracker;
        if stop_at.is_some() {
            self.finish_stop(rt);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::channel::ChannelEvent;
    use crate::controller::SampleController;
    use crate::status::{ChannelStatus, SamplePlayerMode};
    use crate::testing::{channel, ramp_wave, runtime, FakeTransport, BLOCK};
    use ostinato_core::{Behaviors, MAX_VELOCITY};

    fn press() -> ChannelEvent {
        ChannelEvent::KeyPress {
            velocity: MAX_VELOCITY,
            recording: false,
        }
    }

    fn left(rt: &crate::ChannelRuntime) -> Vec<f32> {
        rt.output(BLOCK).iter().step_by(2).copied().collect()
    }

    #[test]
    fn test_idle_channel_renders_silence() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let ch = channel(SamplePlayerMode::SingleBasic);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();

        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();
        assert!(left(&rt).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_plays_from_offset_at_unity_pitch() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let ch = channel(SamplePlayerMode::SingleBasic);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        let wave = ramp_wave(1_000);

        ctl.parse(&mut rt, press(), 10);
        ctl.render(&mut rt, &wave, BLOCK).unwrap();

        let out = left(&rt);
        assert!(out[..10].iter().all(|s| *s == 0.0));
        assert_eq!(out[10], 1.0);
        assert_eq!(out[63], 54.0);
        assert_eq!(rt.tracker(), 54);

        rt.begin_block(BLOCK);
        ctl.render(&mut rt, &wave, BLOCK).unwrap();
        assert_eq!(left(&rt)[0], 55.0);
        assert_eq!(rt.tracker(), 118);
    }

    #[test]
    fn test_one_shot_stops_at_end() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let mut ch = channel(SamplePlayerMode::SingleBasic);
        ch.player.set_range(100, 120);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();

        ctl.parse(&mut rt, press(), 0);
        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();

        let out = left(&rt);
        assert_eq!(out[0], 101.0);
        assert_eq!(out[19], 120.0);
        assert!(out[20..].iter().all(|s| *s == 0.0));
        assert_eq!(rt.status(), ChannelStatus::Off);
        assert_eq!(rt.tracker(), 100);
    }

    #[test]
    fn test_wrapping_mode_refills_from_begin() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let mut ch = channel(SamplePlayerMode::SingleEndless);
        ch.player.set_range(0, 40);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();

        ctl.parse(&mut rt, press(), 0);
        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();

        let out = left(&rt);
        assert_eq!(out[39], 40.0);
        assert_eq!(out[40], 1.0);
        assert_eq!(out[63], 24.0);
        assert_eq!(rt.status(), ChannelStatus::Play);
        assert_eq!(rt.tracker(), 24);
    }

    #[test]
    fn test_ending_loop_does_not_wrap() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let mut ch = channel(SamplePlayerMode::SingleEndless);
        ch.player.set_range(0, 40);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        rt.status = ChannelStatus::Ending;

        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();

        assert!(left(&rt)[40..].iter().all(|s| *s == 0.0));
        assert_eq!(rt.status(), ChannelStatus::Off);
    }

    #[test]
    fn test_rewind_stitches_tail_and_head() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let ch = channel(SamplePlayerMode::SingleRetrig);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        let wave = ramp_wave(1_000);

        ctl.parse(&mut rt, press(), 0);
        ctl.render(&mut rt, &wave, BLOCK).unwrap();
        assert_eq!(rt.tracker(), 64);

        rt.begin_block(BLOCK);
        ctl.parse(&mut rt, press(), 16);
        ctl.render(&mut rt, &wave, BLOCK).unwrap();

        let out = left(&rt);
        assert_eq!(out[0], 65.0);
        assert_eq!(out[15], 80.0);
        assert_eq!(out[16], 1.0);
        assert_eq!(rt.tracker(), 48);
        assert!(!rt.rewinding);
    }

    #[test]
    fn test_tracker_clamped_into_range() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let mut ch = channel(SamplePlayerMode::SingleBasic);
        ch.player.set_range(200, 900);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        rt.status = ChannelStatus::Play;
        rt.tracker = 5;

        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();
        assert_eq!(left(&rt)[0], 201.0);
    }

    #[test]
    fn test_pitched_playback_reads_faster() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let mut ch = channel(SamplePlayerMode::SingleBasic);
        ch.player.set_pitch(2.0);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        let wave = ramp_wave(1_000);

        ctl.parse(&mut rt, press(), 0);
        for _ in 0..4 {
            rt.begin_block(BLOCK);
            ctl.render(&mut rt, &wave, BLOCK).unwrap();
        }

        // Four blocks of output consume roughly twice as much source.
        assert!(rt.tracker() > 4 * BLOCK);
        assert_eq!(rt.status(), ChannelStatus::Play);
        assert!(left(&rt).iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_kill_mid_block_plays_up_to_kill() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let ch = channel(SamplePlayerMode::SingleBasic);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        rt.status = ChannelStatus::Play;
        rt.tracker = 100;

        ctl.parse(&mut rt, ChannelEvent::KeyKill, 32);
        assert_eq!(rt.status(), ChannelStatus::Play);
        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();

        let out = left(&rt);
        assert_eq!(out[0], 101.0);
        assert_eq!(out[31], 132.0);
        assert!(out[32..].iter().all(|s| *s == 0.0));
        assert_eq!(rt.status(), ChannelStatus::Off);
        assert_eq!(rt.tracker(), 0);
        assert!(!rt.is_stopping());
    }

    #[test]
    fn test_ending_loop_stops_on_first_beat_mid_block() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let ch = channel(SamplePlayerMode::LoopBasic);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        rt.status = ChannelStatus::Ending;
        rt.tracker = 500;

        ctl.parse(&mut rt, ChannelEvent::FirstBeat, 40);
        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();

        let out = left(&rt);
        assert_eq!(out[0], 501.0);
        assert_eq!(out[39], 540.0);
        assert!(out[40..].iter().all(|s| *s == 0.0));
        assert_eq!(rt.status(), ChannelStatus::Off);
        assert_eq!(rt.tracker(), 0);
    }

    #[test]
    fn test_single_basic_second_press_mid_block_stops_there() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let ch = channel(SamplePlayerMode::SingleBasic);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        let wave = ramp_wave(1_000);

        ctl.parse(&mut rt, press(), 0);
        ctl.render(&mut rt, &wave, BLOCK).unwrap();

        rt.begin_block(BLOCK);
        ctl.parse(&mut rt, press(), 20);
        ctl.render(&mut rt, &wave, BLOCK).unwrap();

        let out = left(&rt);
        assert_eq!(out[0], 65.0);
        assert_eq!(out[19], 84.0);
        assert!(out[20..].iter().all(|s| *s == 0.0));
        assert_eq!(rt.status(), ChannelStatus::Off);
        assert_eq!(rt.tracker(), 0);
    }

    #[test]
    fn test_stop_in_wrapping_mode_does_not_restart() {
        let transport = FakeTransport::running();
        let behaviors = Behaviors::default();
        let mut ch = channel(SamplePlayerMode::SingleEndless);
        ch.player.set_range(0, 40);
        let ctl = SampleController::new(&transport, &behaviors, &ch);
        let mut rt = runtime();
        rt.status = ChannelStatus::Play;

        ctl.parse(&mut rt, ChannelEvent::KeyKill, 50);
        ctl.render(&mut rt, &ramp_wave(1_000), BLOCK).unwrap();

        let out = left(&rt);
        assert_eq!(out[39], 40.0);
        assert_eq!(out[40], 1.0);
        assert_eq!(out[49], 10.0);
        assert!(out[50..].iter().all(|s| *s == 0.0));
        assert_eq!(rt.status(), ChannelStatus::Off);
        assert_eq!(rt.tracker(), 0);
    }

    proptest::proptest! {
        #[test]
        fn test_tracker_stays_in_range(
            begin in 0usize..500,
            len in 1usize..500,
            mode_idx in 0usize..SamplePlayerMode::ALL.len(),
            blocks in 1usize..20,
        ) {
            let transport = FakeTransport::running();
            let behaviors = Behaviors::default();
            let mut ch = channel(SamplePlayerMode::ALL[mode_idx]);
            ch.player.set_range(begin, begin + len);
            let ctl = SampleController::new(&transport, &behaviors, &ch);
            let mut rt = runtime();
            let wave = ramp_wave(1_000);
            rt.status = ChannelStatus::Play;
            rt.tracker = begin;

            for _ in 0..blocks {
                rt.begin_block(BLOCK);
                ctl.render(&mut rt, &wave, BLOCK).unwrap();
                proptest::prop_assert!(rt.tracker() >= begin);
                proptest::prop_assert!(rt.tracker() < begin + len);
            }
        }
    }
}
