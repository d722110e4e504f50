//! Channel playback transition table.
//!
//! `transition` is a pure function of (status, mode, input) plus the few
//! transport and configuration bits that gate some rows. It says where the
//! channel goes and which side effect the controller must run; the controller
//! applies the new status first, then the effect.

use crate::status::{ChannelStatus, SamplePlayerMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Press,
    Release,
    Kill,
    FirstBeat,
    Bar,
    SeqStop,
    /// The read cursor reached the end marker.
    LastFrame,
    /// Playback was cut before the end marker by a stop landing mid-block.
    Stop,
    ToggleReadActions,
}

impl Input {
    pub const ALL: [Input; 9] = [
        Input::Press,
        Input::Release,
        Input::Kill,
        Input::FirstBeat,
        Input::Bar,
        Input::SeqStop,
        Input::LastFrame,
        Input::Stop,
        Input::ToggleReadActions,
    ];
}

/// Gating bits for one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub running: bool,
    pub can_quantize: bool,
    /// The press comes from a key, not from a replayed action.
    pub manual: bool,
    pub reading_actions: bool,
    /// Record status is `Play`.
    pub rec_playing: bool,
    pub chans_stop_on_seq_halt: bool,
    pub treat_recs_as_loops: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Start the next render at the event offset.
    StoreOffset,
    /// One-shot start: store the offset, apply velocity as volume.
    Start,
    /// Same as `Start`, deferred to the next grid boundary.
    ArmPlay,
    /// Rewind at the next grid boundary.
    ArmRewind,
    Rewind,
    Kill,
    ClearQuantizer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: ChannelStatus,
    pub effect: Effect,
}

impl Transition {
    const fn to(next: ChannelStatus, effect: Effect) -> Self {
        Self { next, effect }
    }

    const fn stay(status: ChannelStatus) -> Self {
        Self::to(status, Effect::None)
    }
}

pub fn transition(status: ChannelStatus, mode: SamplePlayerMode, input: Input, ctx: &Context) -> Transition {
    use ChannelStatus::*;
    use SamplePlayerMode::*;

    let looping = mode.is_any_loop();

    match input {
        Input::Press => match status {
            Off if looping => Transition::to(Wait, Effect::StoreOffset),
            Off if ctx.can_quantize && ctx.manual => Transition::to(Off, Effect::ArmPlay),
            Off => Transition::to(Play, Effect::Start),
            Play => match mode {
                SingleRetrig if ctx.can_quantize && ctx.manual => Transition::to(Play, Effect::ArmRewind),
                SingleRetrig => Transition::to(Play, Effect::Rewind),
                LoopBasic | LoopOnce | LoopRepeat | LoopOnceBar | SingleEndless => {
                    Transition::stay(Ending)
                }
                SingleBasic | SinglePress => Transition::to(Off, Effect::Kill),
                SingleBasicPause => Transition::stay(Off),
            },
            Wait => Transition::stay(Off),
            Ending => Transition::stay(Play),
        },

        Input::Release => match status {
            _ if mode != SinglePress => Transition::stay(status),
            Play => Transition::to(Off, Effect::Kill),
            _ => Transition::to(status, Effect::ClearQuantizer),
        },

        Input::Kill => Transition::to(Off, Effect::Kill),

        Input::FirstBeat => match status {
            _ if !ctx.running => Transition::stay(status),
            Play if looping => Transition::to(Play, Effect::Rewind),
            Wait => Transition::to(Play, Effect::StoreOffset),
            Ending if looping => Transition::to(Off, Effect::Kill),
            _ => Transition::stay(status),
        },

        Input::Bar => match (status, mode) {
            (Play, LoopRepeat) => Transition::to(Play, Effect::Rewind),
            (Wait, LoopOnceBar) => Transition::to(Play, Effect::StoreOffset),
            _ => Transition::stay(status),
        },

        Input::SeqStop => match status {
            Wait if looping => Transition::stay(Off),
            Play if ctx.chans_stop_on_seq_halt && (looping || ctx.reading_actions) => {
                Transition::to(Off, Effect::Kill)
            }
            _ => Transition::stay(status),
        },

        Input::LastFrame => match status {
            Play => match mode {
                SingleBasic | SingleBasicPause | SinglePress | SingleRetrig => Transition::stay(Off),
                _ if looping && !ctx.running => Transition::stay(Off),
                LoopOnce | LoopOnceBar => Transition::stay(Wait),
                _ => Transition::stay(Play),
            },
            Ending => match mode {
                LoopOnce | LoopOnceBar => Transition::stay(Wait),
                _ => Transition::stay(Off),
            },
            _ => Transition::stay(status),
        },

        Input::Stop => match status {
            Play | Ending => Transition::stay(Off),
            _ => Transition::stay(status),
        },

        Input::ToggleReadActions => {
            if ctx.running && ctx.rec_playing && !ctx.treat_recs_as_loops {
                Transition::to(Off, Effect::Kill)
            } else {
                Transition::stay(status)
            }
        }
    }
}
