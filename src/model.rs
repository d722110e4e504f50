//! Control-side editing surface.
//!
//! [`Model`] owns the writer half of the document ring, the control halves of
//! the shared stores and the action recorder. Every edit lands on the back
//! document and is published with a swap: property changes use
//! [`SwapHint::Soft`], structural ones (channels, waves, actions)
//! [`SwapHint::Hard`]. Live key events go to the audio thread through the
//! command queue and are applied at the head of its next block.

use crate::config::EngineConfig;
use crate::document::Document;
use crate::engine::Engine;
use crate::error::{Error, Result};
use crate::queue::{command_queue, Command, CommandProducer};
use hashbrown::HashMap;
use ostinato_actions::{Action, ActionRecorder, Ledger, LedgerHost, PersistedAction};
use ostinato_core::{
    quantize_frame, ring, AtomicFloat, AtomicFrame, Behaviors, EventType, Frame, Id, IdManager,
    MidiEvent, SequencerState, SequencerStatus, SharedStore, SwapHint, SwapWriter, MAX_VOLUME,
};
use ostinato_sampler::{
    Channel, ChannelEvent, ChannelMonitor, ChannelRuntime, SamplePlayerMode, Wave,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Ledger view over the back document.
struct DocumentHost<'a> {
    writer: &'a mut SwapWriter<Document>,
}

impl<'a> DocumentHost<'a> {
    fn new(writer: &'a mut SwapWriter<Document>) -> Self {
        Self { writer }
    }
}

impl LedgerHost for DocumentHost<'_> {
    fn ledger(&self) -> &Ledger {
        &self.writer.get().actions
    }

    fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.writer.get_mut().actions
    }

    fn set_has_actions(&mut self, channel: Id, has_actions: bool) {
        if let Some(ch) = self.writer.get_mut().channel_mut(channel) {
            ch.has_actions = has_actions;
        }
    }

    fn is_single_press(&self, channel: Id) -> bool {
        self.writer
            .get()
            .channel(channel)
            .is_some_and(|ch| ch.player.mode == SamplePlayerMode::SinglePress)
    }

    fn publish(&mut self) {
        self.writer.swap(SwapHint::Hard);
    }
}

pub struct Model {
    config: EngineConfig,
    writer: SwapWriter<Document>,
    waves: SharedStore<Wave>,
    runtimes: SharedStore<ChannelRuntime>,
    channel_ids: IdManager,
    wave_ids: IdManager,
    recorder: ActionRecorder,
    commands: CommandProducer,
    monitors: HashMap<Id, Arc<ChannelMonitor>>,
    position: Arc<AtomicFrame>,
    input_peak: Arc<AtomicFloat>,
    recording: bool,
}

impl Model {
    /// Builds the control surface and the audio-thread engine sharing its
    /// document ring.
    pub fn new(config: EngineConfig) -> (Self, Engine) {
        let document = Document {
            sequencer: SequencerState::default().with_sample_rate(config.sample_rate),
            behaviors: config.behaviors,
            ..Document::default()
        };
        let (writer, reader) = ring(document);
        let (waves, wave_reader) = SharedStore::new(&writer);
        let (runtimes, runtime_reader) = SharedStore::new(&writer);
        let (commands, command_rx) = command_queue(config.live_queue_capacity);

        let engine = Engine::new(&config, reader, wave_reader, runtime_reader, command_rx);
        let model = Self {
            config,
            writer,
            waves,
            runtimes,
            channel_ids: IdManager::new(),
            wave_ids: IdManager::new(),
            recorder: ActionRecorder::new(),
            commands,
            monitors: HashMap::new(),
            position: engine.position(),
            input_peak: engine.input_peak(),
            recording: false,
        };
        tracing::debug!(
            sample_rate = config.sample_rate,
            buffer_size = config.buffer_size,
            "model created"
        );
        (model, engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The back document, including edits not yet published.
    pub fn document(&self) -> &Document {
        self.writer.get()
    }

    pub fn actions(&self) -> &Ledger {
        &self.writer.get().actions
    }

    pub fn swaps(&self) -> u64 {
        self.writer.swaps()
    }

    /// Registers the callback run after every swap with its hint.
    pub fn set_swap_listener(&mut self, listener: impl FnMut(SwapHint) + Send + 'static) {
        self.writer.set_listener(listener);
    }

    /// Playhead as of the last processed block.
    pub fn position(&self) -> Frame {
        self.position.get()
    }

    /// Input peak of the last processed block.
    pub fn input_peak(&self) -> f32 {
        self.input_peak.get()
    }

    /// Lock-free view of a channel's audio-thread state.
    pub fn monitor(&self, channel: Id) -> Option<Arc<ChannelMonitor>> {
        self.monitors.get(&channel).cloned()
    }

    // --- channels ---

    pub fn add_channel(&mut self, mode: SamplePlayerMode) -> Result<Id> {
        let id = self.channel_ids.generate(0);
        let runtime = ChannelRuntime::new(self.config.buffer_size, self.writer.get().behaviors.resampler_quality)?;
        self.monitors.insert(id, runtime.monitor());

        let mut channel = Channel::new(id);
        channel.player.mode = mode;
        {
            let mut lock = self.runtimes.lock(&mut self.writer);
            lock.insert(id, runtime);
            lock.document().channels.push(channel);
        }
        self.writer.swap(SwapHint::Hard);
        tracing::debug!(channel = id, ?mode, "channel added");
        Ok(id)
    }

    /// Removes a channel with its runtime state, its actions, and its wave
    /// if no other channel uses it.
    pub fn remove_channel(&mut self, id: Id) -> Result<()> {
        let wave_id = self.channel(id)?.player.wave_id;
        {
            let mut lock = self.runtimes.lock(&mut self.writer);
            lock.remove(&id);
            let doc = lock.document();
            doc.channels.retain(|c| c.id != id);
            doc.refresh_solos();
        }
        self.monitors.remove(&id);
        self.release_wave(wave_id);
        self.recorder.clear_channel(&mut DocumentHost::new(&mut self.writer), id);
        tracing::debug!(channel = id, "channel removed");
        Ok(())
    }

    /// Decodes interleaved samples into a new wave bound to `channel`. The
    /// channel's markers reset to the full wave.
    pub fn load_wave(&mut self, channel: Id, samples: Vec<f32>, channels: usize, rate: u32) -> Result<Id> {
        let old = self.channel(channel)?.player.wave_id;
        let wave = Wave::from_interleaved(self.wave_ids.generate(0), samples, channels, rate)?;
        let wave_id = wave.id();
        let frames = wave.frames();
        if let Some(rt) = self.runtimes.lock(&mut self.writer).get_mut(&channel) {
            rt.reset();
        }
        {
            let mut lock = self.waves.lock(&mut self.writer);
            if let Some(ch) = lock.document().channel_mut(channel) {
                ch.player.load_wave(&wave);
            }
            lock.insert(wave_id, wave);
        }
        self.release_wave(old);
        self.writer.swap(SwapHint::Hard);
        tracing::debug!(channel, wave = wave_id, frames, "wave loaded");
        Ok(wave_id)
    }

    pub fn unload_wave(&mut self, channel: Id) -> Result<()> {
        let old = self.channel(channel)?.player.wave_id;
        {
            let mut lock = self.runtimes.lock(&mut self.writer);
            if let Some(rt) = lock.get_mut(&channel) {
                rt.reset();
            }
            if let Some(ch) = lock.document().channel_mut(channel) {
                ch.player.unload_wave();
            }
        }
        self.writer.swap(SwapHint::Hard);
        self.release_wave(old);
        Ok(())
    }

    pub fn set_name(&mut self, channel: Id, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.edit_channel(channel, |ch| ch.name = name)
    }

    pub fn set_volume(&mut self, channel: Id, volume: f32) -> Result<()> {
        self.edit_channel(channel, |ch| ch.volume = volume.clamp(0.0, MAX_VOLUME))
    }

    /// Knob position in `[0, 1]`, 0.5 is center.
    pub fn set_pan(&mut self, channel: Id, pan: f32) -> Result<()> {
        self.edit_channel(channel, |ch| ch.pan = pan.clamp(0.0, 1.0))
    }

    pub fn set_mute(&mut self, channel: Id, mute: bool) -> Result<()> {
        self.edit_channel(channel, |ch| ch.mute = mute)
    }

    pub fn set_solo(&mut self, channel: Id, solo: bool) -> Result<()> {
        self.channel_mut(channel)?.solo = solo;
        self.writer.get_mut().refresh_solos();
        self.writer.swap(SwapHint::Soft);
        Ok(())
    }

    pub fn set_armed(&mut self, channel: Id, armed: bool) -> Result<()> {
        self.edit_channel(channel, |ch| ch.armed = armed)
    }

    pub fn set_mode(&mut self, channel: Id, mode: SamplePlayerMode) -> Result<()> {
        self.edit_channel(channel, |ch| ch.player.mode = mode)
    }

    pub fn set_pitch(&mut self, channel: Id, pitch: f32) -> Result<()> {
        self.edit_channel(channel, |ch| ch.player.set_pitch(pitch))
    }

    /// Sets the played region, `end` exclusive.
    pub fn set_range(&mut self, channel: Id, begin: Frame, end: Frame) -> Result<()> {
        self.edit_channel(channel, |ch| ch.player.set_range(begin, end))
    }

    pub fn set_velocity_as_vol(&mut self, channel: Id, enabled: bool) -> Result<()> {
        self.edit_channel(channel, |ch| ch.player.velocity_as_vol = enabled)
    }

    pub fn set_output_gain(&mut self, gain: f32) {
        self.writer.get_mut().mixer.output_gain = gain.max(0.0);
        self.writer.swap(SwapHint::Soft);
    }

    pub fn set_rendering(&mut self, rendering: bool) {
        self.writer.get_mut().mixer.rendering = rendering;
        self.writer.swap(SwapHint::Soft);
    }

    pub fn set_behaviors(&mut self, behaviors: Behaviors) {
        self.writer.get_mut().behaviors = behaviors;
        self.writer.swap(SwapHint::Soft);
    }

    // --- live events ---

    /// Presses a channel's key. While recording with the transport running,
    /// one-shot channels capture a note-on at the quantized playhead.
    pub fn press(&mut self, channel: Id, velocity: u8) -> Result<()> {
        let mode = self.channel(channel)?.player.mode;
        let recording = self.can_record() && !mode.is_any_loop();
        if recording {
            let frame = self.quantized_position();
            let event = MidiEvent::of_type(EventType::NoteOn, 0, velocity.max(1));
            self.recorder.live_rec(channel, event, frame);
        }
        self.send(Command::Channel {
            channel,
            event: ChannelEvent::KeyPress { velocity, recording },
        })
    }

    /// Releases a channel's key. Only single-press channels capture it.
    pub fn release(&mut self, channel: Id) -> Result<()> {
        let mode = self.channel(channel)?.player.mode;
        let recording = self.can_record() && mode == SamplePlayerMode::SinglePress;
        if recording {
            let frame = self.quantized_position();
            let event = MidiEvent::of_type(EventType::NoteOff, 0, 0);
            self.recorder.live_rec(channel, event, frame);
        }
        self.send(Command::Channel {
            channel,
            event: ChannelEvent::KeyRelease { recording },
        })
    }

    /// Stops a channel right away. Recorded as a kill action while recording.
    pub fn kill(&mut self, channel: Id) -> Result<()> {
        self.channel(channel)?;
        if self.can_record() {
            let frame = self.quantized_position();
            let event = MidiEvent::of_type(EventType::NoteKill, 0, 0);
            self.recorder.rec(&mut DocumentHost::new(&mut self.writer), channel, frame, event);
        }
        self.send(Command::Channel {
            channel,
            event: ChannelEvent::KeyKill,
        })
    }

    /// Flips whether the channel replays its recorded actions.
    pub fn toggle_read_actions(&mut self, channel: Id) -> Result<()> {
        self.channel(channel)?;
        self.send(Command::Channel {
            channel,
            event: ChannelEvent::ToggleReadActions,
        })
    }

    /// Stops reading actions and kills the channel, for channels whose
    /// recordings behave like loops.
    pub fn kill_read_actions(&mut self, channel: Id) -> Result<()> {
        self.channel(channel)?;
        self.send(Command::Channel {
            channel,
            event: ChannelEvent::KillReadActions,
        })
    }

    // --- transport ---

    pub fn start(&mut self) {
        self.writer.get_mut().sequencer.status = SequencerStatus::Running;
        self.writer.swap(SwapHint::Soft);
        tracing::debug!("sequencer started");
    }

    /// Stops the sequencer, closing an action recording pass if one is open.
    pub fn stop(&mut self) {
        if self.recording {
            self.stop_action_recording();
        }
        self.writer.get_mut().sequencer.status = SequencerStatus::Stopped;
        self.writer.swap(SwapHint::Soft);
        tracing::debug!("sequencer stopped");
    }

    /// Playhead back to frame 0 at the next block.
    pub fn rewind(&mut self) -> Result<()> {
        self.send(Command::Rewind)
    }

    /// Changes tempo and rescales recorded actions to it.
    pub fn set_bpm(&mut self, bpm: f32) -> Result<()> {
        let ratio = self.writer.get_mut().sequencer.set_bpm(bpm)?;
        let step = self.writer.get().sequencer.quantizer_step();
        if ratio == 1.0 {
            self.writer.swap(SwapHint::Soft);
        } else {
            let mut host = DocumentHost::new(&mut self.writer);
            self.recorder.update_bpm(&mut host, ratio, step);
        }
        tracing::debug!(bpm, ratio, "tempo changed");
        Ok(())
    }

    pub fn set_beats(&mut self, beats: u32, bars: u32) -> Result<()> {
        self.writer.get_mut().sequencer.set_beats(beats, bars)?;
        self.writer.swap(SwapHint::Soft);
        Ok(())
    }

    pub fn set_quantize(&mut self, quantize: u32) -> Result<()> {
        self.writer.get_mut().sequencer.set_quantize(quantize)?;
        self.writer.swap(SwapHint::Soft);
        Ok(())
    }

    // --- action recording ---

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Opens a recording pass and starts the transport.
    pub fn start_action_recording(&mut self) {
        self.recording = true;
        if !self.writer.get().sequencer.is_running() {
            self.start();
        }
    }

    /// Closes the recording pass: links and merges the captured actions, then
    /// makes the channels that received them read right away. Returns those
    /// channels.
    pub fn stop_action_recording(&mut self) -> BTreeSet<Id> {
        self.recording = false;
        let mut host = DocumentHost::new(&mut self.writer);
        let channels = self.recorder.consolidate(&mut host);
        for &channel in &channels {
            let reading = self
                .monitors
                .get(&channel)
                .is_some_and(|m| m.read_actions.get());
            if !reading && !self.commands.push(Command::ReadActions { channel, read: true }) {
                tracing::warn!(channel, "command queue full, channel not set to read actions");
            }
        }
        tracing::debug!(channels = channels.len(), "action recording stopped");
        channels
    }

    // --- action editing ---

    pub fn record_midi_action(&mut self, channel: Id, note: u8, velocity: u8, f1: Frame, f2: Frame) -> Result<(Action, Action)> {
        self.channel(channel)?;
        let frames_in_loop = self.frames_in_loop();
        let mut host = DocumentHost::new(&mut self.writer);
        Ok(self
            .recorder
            .record_midi_action(&mut host, channel, note, velocity, f1, f2, frames_in_loop))
    }

    pub fn record_sample_action(&mut self, channel: Id, kind: EventType, f1: Frame, f2: Frame) -> Result<Action> {
        self.channel(channel)?;
        let frames_in_loop = self.frames_in_loop();
        let mut host = DocumentHost::new(&mut self.writer);
        Ok(self
            .recorder
            .record_sample_action(&mut host, channel, kind, f1, f2, frames_in_loop))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_midi_action(
        &mut self,
        channel: Id,
        id: Id,
        note: u8,
        velocity: u8,
        f1: Frame,
        f2: Frame,
    ) -> Result<(Action, Action)> {
        self.channel(channel)?;
        let frames_in_loop = self.frames_in_loop();
        let mut host = DocumentHost::new(&mut self.writer);
        Ok(self
            .recorder
            .update_midi_action(&mut host, channel, id, note, velocity, f1, f2, frames_in_loop))
    }

    pub fn update_sample_action(&mut self, channel: Id, id: Id, kind: EventType, f1: Frame, f2: Frame) -> Result<Action> {
        self.channel(channel)?;
        let frames_in_loop = self.frames_in_loop();
        let mut host = DocumentHost::new(&mut self.writer);
        Ok(self
            .recorder
            .update_sample_action(&mut host, channel, id, kind, f1, f2, frames_in_loop))
    }

    pub fn delete_midi_action(&mut self, id: Id) -> bool {
        let mut host = DocumentHost::new(&mut self.writer);
        self.recorder.delete_midi_action(&mut host, id)
    }

    pub fn delete_sample_action(&mut self, id: Id) -> bool {
        let mut host = DocumentHost::new(&mut self.writer);
        self.recorder.delete_sample_action(&mut host, id)
    }

    pub fn update_velocity(&mut self, id: Id, velocity: u8) -> bool {
        let mut host = DocumentHost::new(&mut self.writer);
        self.recorder.update_velocity(&mut host, id, velocity)
    }

    /// Copies `src`'s actions onto `dest` with fresh ids.
    pub fn clone_actions(&mut self, src: Id, dest: Id) -> Result<bool> {
        self.channel(dest)?;
        let mut host = DocumentHost::new(&mut self.writer);
        Ok(self.recorder.clone_actions(&mut host, src, dest))
    }

    pub fn clear_channel_actions(&mut self, channel: Id) {
        let mut host = DocumentHost::new(&mut self.writer);
        self.recorder.clear_channel(&mut host, channel);
    }

    pub fn clear_actions(&mut self, channel: Id, kind: EventType) {
        let mut host = DocumentHost::new(&mut self.writer);
        self.recorder.clear_actions(&mut host, channel, kind);
    }

    pub fn clear_all_actions(&mut self) {
        let mut host = DocumentHost::new(&mut self.writer);
        self.recorder.clear_all_actions(&mut host);
    }

    // --- persistence ---

    pub fn serialize_actions(&self) -> Vec<PersistedAction> {
        ostinato_actions::persist::serialize(&self.writer.get().actions)
    }

    /// Replaces the ledger with actions saved at `patch_rate` and rescales
    /// them to the engine rate.
    pub fn load_actions(&mut self, records: &[PersistedAction], patch_rate: u32) -> Result<()> {
        let system_rate = self.writer.get().sequencer.sample_rate;
        let mut host = DocumentHost::new(&mut self.writer);
        self.recorder.load(&mut host, records)?;
        self.recorder.update_samplerate(&mut host, system_rate, patch_rate);
        Ok(())
    }

    // --- internals ---

    fn channel(&self, id: Id) -> Result<&Channel> {
        self.writer.get().channel(id).ok_or(Error::ChannelNotFound(id))
    }

    fn channel_mut(&mut self, id: Id) -> Result<&mut Channel> {
        self.writer.get_mut().channel_mut(id).ok_or(Error::ChannelNotFound(id))
    }

    pub(crate) fn edit_channel(&mut self, id: Id, edit: impl FnOnce(&mut Channel)) -> Result<()> {
        edit(self.channel_mut(id)?);
        self.writer.swap(SwapHint::Soft);
        Ok(())
    }

    fn frames_in_loop(&self) -> Frame {
        self.writer.get().sequencer.frames_in_loop()
    }

    fn can_record(&self) -> bool {
        self.recording && self.writer.get().sequencer.is_running()
    }

    /// Playhead snapped to the grid, wrapped into the loop.
    fn quantized_position(&self) -> Frame {
        let sequencer = &self.writer.get().sequencer;
        let frame = quantize_frame(self.position.get(), sequencer.quantizer_step());
        match sequencer.frames_in_loop() {
            0 => frame,
            len => frame % len,
        }
    }

    fn send(&mut self, command: Command) -> Result<()> {
        if self.commands.push(command) {
            Ok(())
        } else {
            tracing::warn!(?command, "command queue full");
            Err(Error::QueueFull)
        }
    }

    /// Drops `wave_id` from the store unless a channel still plays it.
    fn release_wave(&mut self, wave_id: Id) {
        if wave_id == 0 || self.writer.get().channels.iter().any(|c| c.player.wave_id == wave_id) {
            return;
        }
        let mut lock = self.waves.lock(&mut self.writer);
        lock.remove(&wave_id);
        tracing::debug!(wave = wave_id, "wave released");
    }
}
