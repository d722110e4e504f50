//! Audio-thread entry point.
//!
//! One [`Engine::process`] call renders one device block:
//!
//! 1. drain the command queue into a preallocated list
//! 2. claim the front document for the whole block
//! 3. advance the sequencer and collect its event bundle
//! 4. per channel: fire quantized triggers, apply sequencer events in frame
//!    order (recorded actions included), apply live commands, render, mix
//! 5. copy the stereo mix to the device buffer
//!
//! Nothing here allocates, blocks or logs. When the shared stores are locked
//! by the control side the block is silent. A channel that fails to render is
//! silenced for the block; the rest of the block completes and the first
//! failure is returned once the output is written.

use crate::config::EngineConfig;
use crate::document::Document;
use crate::error::Result;
use crate::queue::{Command, CommandConsumer};
use ostinato_core::{
    AtomicFloat, AtomicFrame, AudioBuffer, Frame, Pan, Sequencer, SequencerEventKind,
    StoreReader, SwapReader, MAX_IO_CHANS,
};
use ostinato_sampler::{ChannelEvent, ChannelRuntime, SampleController, Wave};
use std::sync::Arc;

pub struct Engine {
    max_block: Frame,
    device_channels: usize,
    reader: SwapReader<Document>,
    waves: StoreReader<Wave>,
    runtimes: StoreReader<ChannelRuntime>,
    commands: CommandConsumer,
    pending: Vec<Command>,
    sequencer: Sequencer,
    master: AudioBuffer,
    input_peak: Arc<AtomicFloat>,
}

impl Engine {
    pub(crate) fn new(
        config: &EngineConfig,
        reader: SwapReader<Document>,
        waves: StoreReader<Wave>,
        runtimes: StoreReader<ChannelRuntime>,
        commands: CommandConsumer,
    ) -> Self {
        Self {
            max_block: config.buffer_size,
            device_channels: config.output_channels.clamp(1, MAX_IO_CHANS),
            reader,
            waves,
            runtimes,
            commands,
            pending: Vec::with_capacity(config.live_queue_capacity),
            sequencer: Sequencer::new(config.buffer_size),
            master: AudioBuffer::with_size(config.buffer_size, MAX_IO_CHANS),
            input_peak: Arc::new(AtomicFloat::new(0.0)),
        }
    }

    pub fn position(&self) -> Arc<AtomicFrame> {
        self.sequencer.position()
    }

    pub fn input_peak(&self) -> Arc<AtomicFloat> {
        Arc::clone(&self.input_peak)
    }

    pub fn max_block(&self) -> Frame {
        self.max_block
    }

    /// Renders `frames` frames into `output`. Both buffers are interleaved at
    /// the device width; blocks longer than the configured buffer size are
    /// truncated to it.
    pub fn process(&mut self, input: &[f32], output: &mut [f32], frames: Frame) -> Result<()> {
        let width = self.device_channels;
        let frames = frames.min(self.max_block).min(output.len() / width);
        let mut out = AudioBuffer::view_mut(output, frames, width);
        out.clear_all();

        let input = AudioBuffer::view(input, frames.min(input.len() / width), width);
        self.input_peak.set(input.peak());

        self.pending.clear();
        while self.pending.len() < self.pending.capacity() {
            match self.commands.pop() {
                Some(command) => self.pending.push(command),
                None => break,
            }
        }

        let doc = self.reader.lock();
        if !doc.mixer.rendering {
            return Ok(());
        }

        if self.pending.contains(&Command::Rewind) {
            self.sequencer.rewind();
        }
        self.sequencer
            .advance(&doc.sequencer, frames, |frame| doc.actions.has_actions_on_frame(frame));
        let events = self.sequencer.events();

        let (Some(waves), Some(runtimes)) = (self.waves.get(&doc), self.runtimes.get(&doc)) else {
            return Ok(());
        };

        let mut failure = None;
        self.master.clear(0..frames);
        for channel in &doc.channels {
            let Some(rt) = runtimes.get_mut(&channel.id) else {
                continue;
            };
            let ctl = SampleController::new(&self.sequencer, &doc.behaviors, channel);

            rt.begin_block(frames);
            ctl.advance(rt, frames);

            for event in events {
                match event.kind {
                    SequencerEventKind::FirstBeat => ctl.parse(rt, ChannelEvent::FirstBeat, event.delta),
                    SequencerEventKind::Bar => ctl.parse(rt, ChannelEvent::Bar, event.delta),
                    SequencerEventKind::Stop => ctl.parse(rt, ChannelEvent::SeqStop, event.delta),
                    SequencerEventKind::Actions => {
                        for action in doc.actions.actions_on_frame(event.global_frame) {
                            if action.channel == channel.id {
                                ctl.parse(rt, ChannelEvent::Action(action.event), event.delta);
                            }
                        }
                    }
                }
            }

            for command in &self.pending {
                match *command {
                    Command::Channel { channel: id, event } if id == channel.id => ctl.parse(rt, event, 0),
                    Command::ReadActions { channel: id, read } if id == channel.id => rt.set_read_actions(read),
                    _ => {}
                }
            }

            if let Some(wave) = waves.get(&channel.player.wave_id) {
                if let Err(err) = ctl.render(rt, wave, frames) {
                    rt.begin_block(frames);
                    failure.get_or_insert(err);
                }
            }

            if channel.is_audible(doc.mixer.has_solos) {
                let gain = channel.volume * rt.volume_i() * doc.mixer.output_gain;
                let rendered = AudioBuffer::view(rt.output(frames), frames, MAX_IO_CHANS);
                self.master.sum(&rendered, frames, 0, 0, gain, channel.pan_gains());
            }
            rt.publish(frames);
        }

        if width == MAX_IO_CHANS {
            out.set(&self.master, frames, 0, 0, 1.0, Pan::CENTER);
        } else {
            for f in 0..frames {
                let mix = self.master.frame(f);
                let mono = (mix[0] + mix[1]) * 0.5;
                out.frame_mut(f).fill(mono);
            }
        }

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
