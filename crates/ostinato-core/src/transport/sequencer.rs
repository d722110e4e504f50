//! Loop clock.
//!
//! [`SequencerState`] is the editable part and lives in the document.
//! [`Sequencer`] is owned by the audio thread: it moves the playhead, wraps it
//! at the loop end, and fills the per-block event bundle.

use super::events::{SequencerEvent, SequencerEventKind};
use super::Transport;
use crate::error::{Error, Result};
use crate::lockfree::AtomicFrame;
use crate::Frame;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const DEFAULT_BPM: f32 = 120.0;
pub const DEFAULT_BEATS: u32 = 4;
pub const DEFAULT_BARS: u32 = 1;
pub const DEFAULT_QUANTIZE: u32 = 0;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 999.0;
pub const MAX_BEATS: u32 = 32;
pub const MAX_BARS: u32 = 32;
pub const MAX_QUANTIZE: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SequencerStatus {
    #[default]
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerState {
    pub status: SequencerStatus,
    pub bpm: f32,
    /// Beats in the whole loop.
    pub beats: u32,
    /// Bars the loop's beats are split into.
    pub bars: u32,
    /// Grid subdivisions per beat, 0 = off.
    pub quantize: u32,
    pub sample_rate: u32,
}

impl Default for SequencerState {
    fn default() -> Self {
        Self {
            status: SequencerStatus::Stopped,
            bpm: DEFAULT_BPM,
            beats: DEFAULT_BEATS,
            bars: DEFAULT_BARS,
            quantize: DEFAULT_QUANTIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl SequencerState {
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn is_running(&self) -> bool {
        self.status == SequencerStatus::Running
    }

    pub fn can_quantize(&self) -> bool {
        self.is_running() && self.quantize > 0
    }

    pub fn frames_in_beat(&self) -> Frame {
        (self.sample_rate as f32 * 60.0 / self.bpm) as Frame
    }

    pub fn frames_in_loop(&self) -> Frame {
        self.frames_in_beat() * self.beats as Frame
    }

    pub fn frames_in_bar(&self) -> Frame {
        self.frames_in_loop() / self.bars.max(1) as Frame
    }

    pub fn quantizer_step(&self) -> Frame {
        if self.quantize == 0 {
            0
        } else {
            self.frames_in_beat() / self.quantize as Frame
        }
    }

    /// Sets the tempo, returning the old/new ratio recorded frames must be
    /// scaled by.
    pub fn set_bpm(&mut self, bpm: f32) -> Result<f32> {
        if !(MIN_BPM..=MAX_BPM).contains(&bpm) {
            return Err(Error::InvalidConfig(format!(
                "bpm {bpm} outside {MIN_BPM}..={MAX_BPM}"
            )));
        }
        let ratio = self.bpm / bpm;
        self.bpm = bpm;
        Ok(ratio)
    }

    pub fn set_beats(&mut self, beats: u32, bars: u32) -> Result<()> {
        if beats == 0 || beats > MAX_BEATS || bars == 0 || bars > MAX_BARS || bars > beats {
            return Err(Error::InvalidConfig(format!("{beats} beats over {bars} bars")));
        }
        self.beats = beats;
        self.bars = bars;
        Ok(())
    }

    pub fn set_quantize(&mut self, quantize: u32) -> Result<()> {
        if quantize > MAX_QUANTIZE {
            return Err(Error::InvalidConfig(format!("quantize {quantize} > {MAX_QUANTIZE}")));
        }
        self.quantize = quantize;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Sequencer {
    state: SequencerState,
    current_frame: Frame,
    block_start: Frame,
    was_running: bool,
    max_block: Frame,
    position: Arc<AtomicFrame>,
    events: Vec<SequencerEvent>,
}

impl Sequencer {
    /// `max_block` bounds the block size; the event list is sized for it up front.
    pub fn new(max_block: Frame) -> Self {
        Self {
            state: SequencerState::default(),
            current_frame: 0,
            block_start: 0,
            was_running: false,
            max_block,
            position: Arc::new(AtomicFrame::new(0)),
            events: Vec::with_capacity(max_block * 2 + 1),
        }
    }

    /// Playhead mirror for control threads.
    pub fn position(&self) -> Arc<AtomicFrame> {
        Arc::clone(&self.position)
    }

    pub fn state(&self) -> &SequencerState {
        &self.state
    }

    pub fn current_frame(&self) -> Frame {
        self.current_frame
    }

    pub fn rewind(&mut self) {
        self.current_frame = 0;
        self.position.set(0);
    }

    /// Advances by `block` frames and returns the events landing in them, in
    /// frame order. `has_actions` tells whether the ledger holds anything at a
    /// global frame.
    pub fn advance(
        &mut self,
        state: &SequencerState,
        block: Frame,
        has_actions: impl Fn(Frame) -> bool,
    ) -> &[SequencerEvent] {
        debug_assert!(block <= self.max_block, "block larger than sequencer was sized for");

        self.events.clear();
        self.state = *state;
        self.block_start = self.current_frame;

        let running = state.is_running();
        if self.was_running && !running {
            self.push(SequencerEventKind::Stop, 0, self.current_frame);
        }
        self.was_running = running;

        let loop_len = state.frames_in_loop();
        if !running || loop_len == 0 {
            return &self.events;
        }
        if self.current_frame >= loop_len {
            self.current_frame = 0;
            self.block_start = 0;
        }

        let bar_len = state.frames_in_bar();
        for delta in 0..block.min(self.max_block) {
            let frame = self.current_frame;
            if frame == 0 {
                self.push(SequencerEventKind::FirstBeat, delta, frame);
            } else if bar_len > 0 && frame % bar_len == 0 {
                self.push(SequencerEventKind::Bar, delta, frame);
            }
            if has_actions(frame) {
                self.push(SequencerEventKind::Actions, delta, frame);
            }
            self.current_frame = (frame + 1) % loop_len;
        }
        self.position.set(self.current_frame);

        &self.events
    }

    /// Events from the last `advance`.
    pub fn events(&self) -> &[SequencerEvent] {
        &self.events
    }

    fn push(&mut self, kind: SequencerEventKind, delta: Frame, global_frame: Frame) {
        if self.events.len() < self.events.capacity() {
            self.events.push(SequencerEvent {
                kind,
                delta,
                global_frame,
            });
        }
    }
}

impl Transport for Sequencer {
    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn can_quantize(&self) -> bool {
        self.state.can_quantize()
    }

    fn current_frame(&self) -> Frame {
        self.block_start
    }

    fn quantizer_step(&self) -> Frame {
        self.state.quantizer_step()
    }
}
