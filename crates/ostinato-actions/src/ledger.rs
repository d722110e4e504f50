//! Frame-indexed action storage.
//!
//! Frames are the map keys, so anything that moves actions in time has to
//! rebuild the index ([`Ledger::update_key_frames`]). Empty frames are pruned
//! on every removal so `actions_on_frame` never returns stale keys.

use crate::action::Action;
use ostinato_core::{EventType, Frame, Id};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    frames: BTreeMap<Frame, Vec<Action>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `action` unless an identical one (channel, frame, payload) is
    /// already there. Returns whether it was stored.
    pub fn rec(&mut self, action: Action) -> bool {
        let bucket = self.frames.entry(action.frame).or_default();
        if bucket.iter().any(|a| a.same_as(&action)) {
            return false;
        }
        bucket.push(action);
        true
    }

    pub fn rec_many(&mut self, actions: impl IntoIterator<Item = Action>) -> usize {
        actions.into_iter().filter(|a| self.rec(*a)).count()
    }

    /// Stores without duplicate suppression. Used when restoring a saved set
    /// verbatim.
    pub(crate) fn insert(&mut self, action: Action) {
        self.frames.entry(action.frame).or_default().push(action);
    }

    pub fn len(&self) -> usize {
        self.frames.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Every action, in frame order.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.frames.values().flatten()
    }

    /// Frames holding at least one action.
    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.keys().copied()
    }

    pub fn find(&self, id: Id) -> Option<&Action> {
        if id == 0 {
            return None;
        }
        self.iter().find(|a| a.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: Id) -> Option<&mut Action> {
        if id == 0 {
            return None;
        }
        self.frames.values_mut().flatten().find(|a| a.id == id)
    }

    /// The paired half `action.next` points at, if it links back.
    pub fn next_of(&self, action: &Action) -> Option<&Action> {
        self.find(action.next).filter(|n| n.prev == action.id)
    }

    /// The paired half `action.prev` points at, if it links back.
    pub fn prev_of(&self, action: &Action) -> Option<&Action> {
        self.find(action.prev).filter(|p| p.next == action.id)
    }

    /// Allocation-free lookup used on the audio thread.
    pub fn actions_on_frame(&self, frame: Frame) -> &[Action] {
        self.frames.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_actions_on_frame(&self, frame: Frame) -> bool {
        self.frames.contains_key(&frame)
    }

    pub fn actions_on_channel(&self, channel: Id) -> Vec<Action> {
        self.iter().filter(|a| a.channel == channel).copied().collect()
    }

    pub fn has_actions(&self, channel: Id) -> bool {
        self.iter().any(|a| a.channel == channel)
    }

    pub fn has_actions_of(&self, channel: Id, kind: EventType) -> bool {
        self.iter().any(|a| a.channel == channel && a.is_type(kind))
    }

    /// Channels with at least one action.
    pub fn channels(&self) -> BTreeSet<Id> {
        self.iter().map(|a| a.channel).collect()
    }

    /// Latest action at or before `frame` on `channel` of type `kind`.
    pub fn closest_action(&self, channel: Id, frame: Frame, kind: EventType) -> Option<&Action> {
        self.frames
            .range(..=frame)
            .rev()
            .flat_map(|(_, bucket)| bucket.iter())
            .find(|a| a.channel == channel && a.is_type(kind))
    }

    pub fn remove(&mut self, id: Id) -> Option<Action> {
        let mut removed = None;
        self.remove_if(|a| {
            if removed.is_none() && a.id == id {
                removed = Some(*a);
                true
            } else {
                false
            }
        });
        removed
    }

    /// Removes every action matching `pred`, then prunes empty frames.
    pub fn remove_if(&mut self, mut pred: impl FnMut(&Action) -> bool) -> usize {
        let mut removed = 0;
        for bucket in self.frames.values_mut() {
            let before = bucket.len();
            bucket.retain(|a| !pred(a));
            removed += before - bucket.len();
        }
        self.frames.retain(|_, bucket| !bucket.is_empty());
        removed
    }

    /// Rewrites every action's frame through `map` and rebuilds the index.
    /// Ids, payloads and links are untouched.
    pub fn update_key_frames(&mut self, mut map: impl FnMut(Frame) -> Frame) {
        let old = std::mem::take(&mut self.frames);
        for (frame, bucket) in old {
            let moved = map(frame);
            let target = self.frames.entry(moved).or_default();
            for mut action in bucket {
                action.frame = moved;
                target.push(action);
            }
        }
    }

    pub fn clear_channel(&mut self, channel: Id) -> usize {
        self.remove_if(|a| a.channel == channel)
    }

    pub fn clear_actions(&mut self, channel: Id, kind: EventType) -> usize {
        self.remove_if(|a| a.channel == channel && a.is_type(kind))
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}
