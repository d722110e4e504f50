//! Applies channel events to a runtime through the transition table.
//!
//! A `SampleController` is built per channel per block from the document
//! snapshot; it holds no state of its own. Status changes are applied before
//! the effect the table asks for, so effects see the status being entered.
//! The exception is a kill landing inside the block on a playing channel: it
//! keeps the status and leaves a pending stop for the renderer, which plays
//! up to the kill point and then ends the channel.

use crate::channel::{Channel, ChannelEvent};
use crate::fsm::{self, Context, Effect, Input};
use crate::runtime::{ChannelRuntime, QuantizedAction};
use crate::status::{ChannelStatus, SamplePlayerMode};
use ostinato_core::{Behaviors, EventType, Frame, Transport, MAX_VELOCITY, MAX_VOLUME};

pub struct SampleController<'a, T> {
    transport: &'a T,
    behaviors: &'a Behaviors,
    channel: &'a Channel,
}

impl<'a, T: Transport> SampleController<'a, T> {
    pub fn new(transport: &'a T, behaviors: &'a Behaviors, channel: &'a Channel) -> Self {
        Self {
            transport,
            behaviors,
            channel,
        }
    }

    pub fn channel(&self) -> &Channel {
        self.channel
    }

    fn mode(&self) -> SamplePlayerMode {
        self.channel.player.mode
    }

    /// Fires the armed quantized action if a grid boundary falls in the block.
    pub fn advance(&self, rt: &mut ChannelRuntime, frames: Frame) {
        let start = self.transport.current_frame();
        let step = self.transport.quantizer_step();
        let Some((action, delta)) = rt.quantizer.advance(start..start + frames, step) else {
            return;
        };
        rt.quantizing = false;
        match action {
            QuantizedAction::Play => {
                rt.offset = delta;
                rt.status = ChannelStatus::Play;
            }
            QuantizedAction::Rewind => self.rewind(rt, delta),
        }
    }

    /// Reacts to one event landing `delta` frames into the block. Channels
    /// without a wave ignore everything.
    pub fn parse(&self, rt: &mut ChannelRuntime, event: ChannelEvent, delta: Frame) {
        if !self.channel.player.has_wave() {
            return;
        }
        let single_press = self.mode() == SamplePlayerMode::SinglePress;

        match event {
            ChannelEvent::KeyPress {
                velocity,
                recording,
            } => {
                self.step(rt, Input::Press, delta, velocity, true);
                // Existing actions would fight the key being recorded.
                if recording && single_press {
                    rt.read_actions = false;
                }
            }
            ChannelEvent::KeyRelease { recording } => {
                self.step(rt, Input::Release, delta, 0, true);
                if recording && single_press {
                    rt.read_actions = true;
                }
            }
            ChannelEvent::KeyKill => self.step(rt, Input::Kill, delta, 0, true),
            ChannelEvent::FirstBeat => {
                self.step(rt, Input::FirstBeat, delta, 0, false);
                self.rec_first_beat(rt);
            }
            ChannelEvent::Bar => self.step(rt, Input::Bar, delta, 0, false),
            ChannelEvent::SeqStop => self.step(rt, Input::SeqStop, delta, 0, false),
            ChannelEvent::Action(event) => {
                if rt.read_actions && !self.mode().is_any_loop() {
                    match event.event_type() {
                        Some(EventType::NoteOn) => self.step(rt, Input::Press, delta, MAX_VELOCITY, false),
                        Some(EventType::NoteOff) => self.step(rt, Input::Release, delta, 0, false),
                        Some(EventType::NoteKill) => self.step(rt, Input::Kill, delta, 0, false),
                        Some(EventType::Envelope) | None => {}
                    }
                }
            }
            ChannelEvent::ToggleReadActions => {
                self.step(rt, Input::ToggleReadActions, 0, 0, false);
                self.toggle_read_actions(rt);
            }
            ChannelEvent::KillReadActions => {
                if self.behaviors.treat_recs_as_loops {
                    rt.rec_status = ChannelStatus::Off;
                    rt.read_actions = false;
                }
            }
        }
    }

    /// Called by the renderer when playback ends: `natural` when the read
    /// cursor crossed the end marker, not when a stop cut it short.
    pub(crate) fn on_last_frame(&self, rt: &mut ChannelRuntime, natural: bool) {
        let input = if natural { Input::LastFrame } else { Input::Stop };
        self.step(rt, input, 0, 0, false);
    }

    pub(crate) fn should_loop(&self, rt: &ChannelRuntime) -> bool {
        self.mode().wraps() && rt.status == ChannelStatus::Play
    }

    fn context(&self, rt: &ChannelRuntime, manual: bool) -> Context {
        Context {
            running: self.transport.is_running(),
            can_quantize: self.transport.can_quantize(),
            manual,
            reading_actions: rt.read_actions,
            rec_playing: rt.rec_status == ChannelStatus::Play,
            chans_stop_on_seq_halt: self.behaviors.chans_stop_on_seq_halt,
            treat_recs_as_loops: self.behaviors.treat_recs_as_loops,
        }
    }

    fn step(&self, rt: &mut ChannelRuntime, input: Input, delta: Frame, velocity: u8, manual: bool) {
        let ctx = self.context(rt, manual);
        let previous = rt.status;
        let transition = fsm::transition(previous, self.mode(), input, &ctx);
        rt.status = transition.next;

        match transition.effect {
            Effect::None => {}
            Effect::StoreOffset => rt.offset = delta,
            Effect::Start => {
                rt.offset = delta;
                self.apply_velocity(rt, velocity);
            }
            Effect::ArmPlay => {
                rt.offset = delta;
                self.apply_velocity(rt, velocity);
                rt.arm(QuantizedAction::Play);
            }
            Effect::ArmRewind => rt.arm(QuantizedAction::Rewind),
            Effect::Rewind => self.rewind(rt, delta),
            Effect::Kill if delta > 0 && previous.is_playing() => self.stop(rt, previous, delta),
            Effect::Kill => self.kill(rt),
            Effect::ClearQuantizer => rt.disarm(),
        }
    }

    fn apply_velocity(&self, rt: &mut ChannelRuntime, velocity: u8) {
        if self.channel.player.velocity_as_vol {
            rt.volume_i = f32::from(velocity) / f32::from(MAX_VELOCITY) * MAX_VOLUME;
        }
    }

    fn rewind(&self, rt: &mut ChannelRuntime, delta: Frame) {
        rt.disarm();
        if rt.status.is_playing() {
            rt.rewinding = true;
            rt.offset = delta;
        } else {
            rt.tracker = self.channel.player.begin;
        }
    }

    fn kill(&self, rt: &mut ChannelRuntime) {
        rt.status = ChannelStatus::Off;
        rt.tracker = self.channel.player.begin;
        rt.rewinding = false;
        rt.stop_at = None;
        rt.disarm();
        rt.resampler.last();
    }

    /// Keeps `status` until the renderer reaches `delta`. The earliest stop
    /// in a block wins.
    fn stop(&self, rt: &mut ChannelRuntime, status: ChannelStatus, delta: Frame) {
        rt.status = status;
        rt.stop_at = Some(rt.stop_at.map_or(delta, |at| at.min(delta)));
        rt.disarm();
    }

    /// Ends a stop the renderer reached.
    pub(crate) fn finish_stop(&self, rt: &mut ChannelRuntime) {
        rt.tracker = self.channel.player.begin;
        rt.rewinding = false;
        rt.offset = 0;
        rt.resampler.last();
        self.on_last_frame(rt, false);
    }

    fn rec_first_beat(&self, rt: &mut ChannelRuntime) {
        match rt.rec_status {
            ChannelStatus::Ending => {
                rt.rec_status = ChannelStatus::Off;
                rt.read_actions = false;
            }
            ChannelStatus::Wait => {
                rt.rec_status = ChannelStatus::Play;
                rt.read_actions = true;
            }
            _ => {}
        }
    }

    fn toggle_read_actions(&self, rt: &mut ChannelRuntime) {
        if !self.channel.has_actions {
            return;
        }
        // A pending start (Wait) cancels like a running read.
        if rt.read_actions || rt.rec_status == ChannelStatus::Wait {
            self.stop_read_actions(rt);
        } else {
            self.start_read_actions(rt);
        }
    }

    fn start_read_actions(&self, rt: &mut ChannelRuntime) {
        if self.behaviors.treat_recs_as_loops {
            rt.rec_status = ChannelStatus::Wait;
        } else {
            rt.rec_status = ChannelStatus::Play;
            rt.read_actions = true;
        }
    }

    fn stop_read_actions(&self, rt: &mut ChannelRuntime) {
        if !self.transport.is_running() || !self.behaviors.treat_recs_as_loops {
            rt.rec_status = ChannelStatus::Off;
            rt.read_actions = false;
            return;
        }
        rt.rec_status = match rt.rec_status {
            ChannelStatus::Wait => ChannelStatus::Off,
            ChannelStatus::Ending => ChannelStatus::Play,
            _ => ChannelStatus::Ending,
        };
    }
}
