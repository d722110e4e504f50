//! Editing surface over the ledger.
//!
//! Every mutation refreshes the touched channels' "has actions" flag and
//! publishes the host document. Two-part events are always removed together
//! with their sibling so no half-pair is left behind.

use crate::action::Action;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::persist::{self, PersistedAction};
use hashbrown::HashMap;
use ostinato_core::{EventType, Frame, Id, IdManager, MidiEvent, MAX_VELOCITY};
use std::collections::BTreeSet;

/// Length given to a two-part action recorded without an end frame.
pub const MIN_ACTION_SPAN: Frame = 8192;

/// Growth step of the live-capture buffer.
pub const LIVE_CHUNK: usize = 128;

/// Owner of the ledger being edited, usually the back document.
pub trait LedgerHost {
    fn ledger(&self) -> &Ledger;

    fn ledger_mut(&mut self) -> &mut Ledger;

    fn set_has_actions(&mut self, channel: Id, has_actions: bool);

    /// Whether `channel` plays in single-press mode, where sample actions are
    /// recorded as on/off pairs.
    fn is_single_press(&self, channel: Id) -> bool;

    /// Makes the edited ledger visible (structural swap).
    fn publish(&mut self);
}

#[derive(Debug)]
pub struct ActionRecorder {
    ids: IdManager,
    live: Vec<Action>,
}

impl Default for ActionRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRecorder {
    pub fn new() -> Self {
        Self {
            ids: IdManager::new(),
            live: Vec::with_capacity(LIVE_CHUNK),
        }
    }

    pub fn ids(&self) -> &IdManager {
        &self.ids
    }

    /// Forgets every id handed out and drops pending live actions.
    pub fn reset(&mut self) {
        self.ids.reset();
        self.live.clear();
    }

    /// Records one instantaneous action.
    pub fn rec<H: LedgerHost>(&mut self, host: &mut H, channel: Id, frame: Frame, event: MidiEvent) -> Action {
        let action = Action::new(self.ids.generate(0), channel, frame, event);
        host.ledger_mut().rec(action);
        self.commit(host, [channel]);
        action
    }

    /// Records a note-on at `f1` and a note-off at `f2`, linked. `f2 == 0`
    /// means `f1 + MIN_ACTION_SPAN`; a pair running past the loop end is
    /// shifted left so it ends on it.
    #[allow(clippy::too_many_arguments)]
    pub fn record_midi_action<H: LedgerHost>(
        &mut self,
        host: &mut H,
        channel: Id,
        note: u8,
        velocity: u8,
        f1: Frame,
        f2: Frame,
        frames_in_loop: Frame,
    ) -> (Action, Action) {
        let (f1, f2) = fit_span(f1, f2, frames_in_loop);
        // A zero-velocity note-on would read back as a second note-off.
        let on = MidiEvent::of_type(EventType::NoteOn, note, velocity.max(1));
        let off = MidiEvent::of_type(EventType::NoteOff, note, velocity);
        let pair = self.rec_pair(host, channel, f1, on, f2, off);
        self.commit(host, [channel]);
        pair
    }

    /// Single-press channels get an on/off pair (note 0) so editors can treat
    /// them like notes; everything else a single action of `kind`.
    pub fn record_sample_action<H: LedgerHost>(
        &mut self,
        host: &mut H,
        channel: Id,
        kind: EventType,
        f1: Frame,
        f2: Frame,
        frames_in_loop: Frame,
    ) -> Action {
        let first = if host.is_single_press(channel) {
            let (f1, f2) = fit_span(f1, f2, frames_in_loop);
            let on = MidiEvent::of_type(EventType::NoteOn, 0, MAX_VELOCITY);
            let off = MidiEvent::of_type(EventType::NoteOff, 0, 0);
            self.rec_pair(host, channel, f1, on, f2, off).0
        } else {
            let action = Action::new(self.ids.generate(0), channel, f1, MidiEvent::of_type(kind, 0, 0));
            host.ledger_mut().rec(action);
            action
        };
        self.commit(host, [channel]);
        first
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_midi_action<H: LedgerHost>(
        &mut self,
        host: &mut H,
        channel: Id,
        id: Id,
        note: u8,
        velocity: u8,
        f1: Frame,
        f2: Frame,
        frames_in_loop: Frame,
    ) -> (Action, Action) {
        remove_with_sibling(host.ledger_mut(), id);
        self.record_midi_action(host, channel, note, velocity, f1, f2, frames_in_loop)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_sample_action<H: LedgerHost>(
        &mut self,
        host: &mut H,
        channel: Id,
        id: Id,
        kind: EventType,
        f1: Frame,
        f2: Frame,
        frames_in_loop: Frame,
    ) -> Action {
        remove_with_sibling(host.ledger_mut(), id);
        self.record_sample_action(host, channel, kind, f1, f2, frames_in_loop)
    }

    /// Deletes a note and its note-off. Returns false if `id` is unknown.
    pub fn delete_midi_action<H: LedgerHost>(&mut self, host: &mut H, id: Id) -> bool {
        self.delete_action(host, id)
    }

    /// Deletes a sample action and, for pairs, its second half.
    pub fn delete_sample_action<H: LedgerHost>(&mut self, host: &mut H, id: Id) -> bool {
        self.delete_action(host, id)
    }

    /// Rewrites the velocity byte in place. Ids and links don't change.
    pub fn update_velocity<H: LedgerHost>(&mut self, host: &mut H, id: Id, velocity: u8) -> bool {
        let Some(action) = host.ledger_mut().find_mut(id) else {
            return false;
        };
        action.event.set_velocity(velocity);
        let channel = action.channel;
        self.commit(host, [channel]);
        true
    }

    pub fn update_siblings<H: LedgerHost>(&mut self, host: &mut H, id: Id, prev: Id, next: Id) -> bool {
        let Some(action) = host.ledger_mut().find_mut(id) else {
            return false;
        };
        action.prev = prev;
        action.next = next;
        let channel = action.channel;
        self.commit(host, [channel]);
        true
    }

    /// Copies every action of `src` onto `dest` with fresh ids, keeping the
    /// pairing. Returns whether anything was copied.
    pub fn clone_actions<H: LedgerHost>(&mut self, host: &mut H, src: Id, dest: Id) -> bool {
        let sources = host.ledger().actions_on_channel(src);
        if sources.is_empty() {
            return false;
        }

        // Full old -> new map first, so links are remapped in one go.
        let mut remap: HashMap<Id, Id> = HashMap::with_capacity(sources.len());
        let mut cloned: Vec<Action> = sources
            .iter()
            .map(|a| {
                let id = self.ids.generate(0);
                remap.insert(a.id, id);
                Action { id, channel: dest, ..*a }
            })
            .collect();

        let relink = |id: Id| if id == 0 { 0 } else { remap.get(&id).copied().unwrap_or(0) };
        for action in cloned.iter_mut() {
            action.prev = relink(action.prev);
            action.next = relink(action.next);
        }

        let stored = host.ledger_mut().rec_many(cloned);
        tracing::debug!(src, dest, stored, "cloned channel actions");
        self.commit(host, [dest]);
        true
    }

    /// Captures a note-on/off during a recording pass. Other events are
    /// rejected. Only grows the buffer when a chunk fills up.
    pub fn live_rec(&mut self, channel: Id, event: MidiEvent, frame: Frame) {
        debug_assert!(event.is_note_on_off(), "live capture takes note-on/off only");
        if !event.is_note_on_off() {
            tracing::warn!(raw = event.raw(), "ignoring non note-on/off live event");
            return;
        }
        if self.live.len() == self.live.capacity() {
            self.live.reserve(LIVE_CHUNK);
        }
        self.live.push(Action::new(self.ids.generate(0), channel, frame, event));
    }

    pub fn has_live_actions(&self) -> bool {
        !self.live.is_empty()
    }

    pub fn live_actions(&self) -> &[Action] {
        &self.live
    }

    /// Pairs captured note-ons with the next matching note-off, merges them
    /// into the ledger and empties the capture buffer. Returns the channels
    /// that received actions.
    pub fn consolidate<H: LedgerHost>(&mut self, host: &mut H) -> BTreeSet<Id> {
        link_live(&mut self.live);

        let channels: BTreeSet<Id> = self.live.iter().map(|a| a.channel).collect();
        let stored = host.ledger_mut().rec_many(self.live.drain(..));
        tracing::debug!(stored, channels = channels.len(), "consolidated live actions");

        self.commit(host, channels.iter().copied());
        channels
    }

    /// Rewrites every frame through `map` and rebuilds the index.
    pub fn update_key_frames<H: LedgerHost>(&mut self, host: &mut H, map: impl FnMut(Frame) -> Frame) {
        host.ledger_mut().update_key_frames(map);
        host.publish();
    }

    /// Rescales frames after a tempo change and nudges them onto the grid when
    /// rounding left them a few frames short of it.
    pub fn update_bpm<H: LedgerHost>(&mut self, host: &mut H, ratio: f32, quantizer_step: Frame) {
        if ratio == 1.0 {
            return;
        }
        self.update_key_frames(host, |old| {
            let frame = (old as f32 * ratio) as Frame;
            if frame != 0 {
                let delta = quantizer_step % frame;
                if delta > 0 && delta <= 6 {
                    return frame + delta;
                }
            }
            frame
        });
    }

    /// Rescales frames recorded at `patch_rate` to `system_rate`.
    pub fn update_samplerate<H: LedgerHost>(&mut self, host: &mut H, system_rate: u32, patch_rate: u32) {
        if system_rate == patch_rate || patch_rate == 0 {
            return;
        }
        let (system, patch) = (u64::from(system_rate), u64::from(patch_rate));
        self.update_key_frames(host, |old| (old as u64 * system / patch) as Frame);
    }

    pub fn clear_channel<H: LedgerHost>(&mut self, host: &mut H, channel: Id) {
        host.ledger_mut().clear_channel(channel);
        self.commit(host, [channel]);
    }

    pub fn clear_actions<H: LedgerHost>(&mut self, host: &mut H, channel: Id, kind: EventType) {
        host.ledger_mut().clear_actions(channel, kind);
        self.commit(host, [channel]);
    }

    pub fn clear_all_actions<H: LedgerHost>(&mut self, host: &mut H) {
        let channels = host.ledger().channels();
        host.ledger_mut().clear();
        self.commit(host, channels);
    }

    pub fn serialize<H: LedgerHost>(&self, host: &H) -> Vec<PersistedAction> {
        persist::serialize(host.ledger())
    }

    /// Replaces the ledger with a saved set and raises the id mark past it.
    pub fn load<H: LedgerHost>(&mut self, host: &mut H, records: &[PersistedAction]) -> Result<()> {
        let ledger = persist::deserialize(records, &mut self.ids)?;
        let mut channels = host.ledger().channels();
        channels.extend(ledger.channels());
        *host.ledger_mut() = ledger;
        tracing::debug!(actions = records.len(), max_id = self.ids.get(), "loaded actions");
        self.commit(host, channels);
        Ok(())
    }

    fn rec_pair<H: LedgerHost>(
        &mut self,
        host: &mut H,
        channel: Id,
        f1: Frame,
        on: MidiEvent,
        f2: Frame,
        off: MidiEvent,
    ) -> (Action, Action) {
        let mut first = Action::new(self.ids.generate(0), channel, f1, on);
        let mut second = Action::new(self.ids.generate(0), channel, f2, off);
        first.next = second.id;
        second.prev = first.id;

        let ledger = host.ledger_mut();
        ledger.rec(first);
        ledger.rec(second);
        (first, second)
    }

    fn delete_action<H: LedgerHost>(&mut self, host: &mut H, id: Id) -> bool {
        let Some(channel) = remove_with_sibling(host.ledger_mut(), id) else {
            return false;
        };
        self.commit(host, [channel]);
        true
    }

    fn commit<H: LedgerHost>(&self, host: &mut H, channels: impl IntoIterator<Item = Id>) {
        for channel in channels {
            let has_actions = host.ledger().has_actions(channel);
            host.set_has_actions(channel, has_actions);
        }
        host.publish();
    }
}

fn fit_span(f1: Frame, f2: Frame, frames_in_loop: Frame) -> (Frame, Frame) {
    let f2 = if f2 == 0 { f1 + MIN_ACTION_SPAN } else { f2 };
    if f2 > frames_in_loop {
        let overflow = f2 - frames_in_loop;
        (f1.saturating_sub(overflow), f2 - overflow)
    } else {
        (f1, f2)
    }
}

/// Removes `id` and its next sibling. Returns the action's channel.
fn remove_with_sibling(ledger: &mut Ledger, id: Id) -> Option<Id> {
    let action = *ledger.find(id)?;
    if let Some(next) = ledger.next_of(&action).map(|a| a.id) {
        ledger.remove(next);
    }
    ledger.remove(id);
    Some(action.channel)
}

/// Links each note-on to the first later note-off of the same note and
/// channel not already claimed. Capture is chronological, so only later
/// entries are scanned. Skipping claimed note-offs keeps every link
/// reciprocal: overlapping repeats of one note pair up in capture order
/// instead of sharing the earliest note-off.
fn link_live(live: &mut [Action]) {
    for i in 0..live.len() {
        if !live[i].event.is_type(EventType::NoteOn) {
            continue;
        }
        let on = live[i];
        let Some(j) = (i + 1..live.len()).find(|&j| live[j].prev == 0 && on.pairs_with(&live[j])) else {
            continue;
        };
        live[i].next = live[j].id;
        live[j].prev = on.id;
    }
}
