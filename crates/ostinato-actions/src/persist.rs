//! Flat action records for patch files.
//!
//! Records carry the raw 32-bit event payload and sibling ids. Loading keeps
//! ids verbatim and raises the id generator past the highest one.

use crate::action::Action;
use crate::error::{Error, Result};
use crate::ledger::Ledger;
use hashbrown::HashSet;
use ostinato_core::{Frame, Id, IdManager, MidiEvent};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedAction {
    pub id: Id,
    pub channel_id: Id,
    pub frame: Frame,
    pub event: u32,
    #[serde(default)]
    pub prev_id: Id,
    #[serde(default)]
    pub next_id: Id,
}

impl From<&Action> for PersistedAction {
    fn from(a: &Action) -> Self {
        Self {
            id: a.id,
            channel_id: a.channel,
            frame: a.frame,
            event: a.event.raw(),
            prev_id: a.prev,
            next_id: a.next,
        }
    }
}

impl From<&PersistedAction> for Action {
    fn from(p: &PersistedAction) -> Self {
        Self {
            id: p.id,
            channel: p.channel_id,
            frame: p.frame,
            event: MidiEvent::from_raw(p.event),
            prev: p.prev_id,
            next: p.next_id,
        }
    }
}

/// Every action, ordered by frame then id.
pub fn serialize(ledger: &Ledger) -> Vec<PersistedAction> {
    let mut records: Vec<PersistedAction> = ledger.iter().map(PersistedAction::from).collect();
    records.sort_by_key(|r| (r.frame, r.id));
    records
}

/// Rebuilds a ledger from saved records. Fails on a zero or repeated id.
pub fn deserialize(records: &[PersistedAction], ids: &mut IdManager) -> Result<Ledger> {
    let mut seen = HashSet::with_capacity(records.len());
    let mut ledger = Ledger::new();

    for record in records {
        if record.id == 0 {
            return Err(Error::ZeroId);
        }
        if !seen.insert(record.id) {
            return Err(Error::DuplicateId(record.id));
        }
        ledger.insert(Action::from(record));
    }

    for id in seen {
        ids.set(id);
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ostinato_core::EventType;
    use proptest::prelude::*;

    fn record(id: Id, frame: Frame, kind: EventType) -> PersistedAction {
        PersistedAction {
            id,
            channel_id: 1,
            frame,
            event: MidiEvent::of_type(kind, 60, 100).raw(),
            prev_id: 0,
            next_id: 0,
        }
    }

    #[test]
    fn test_serialize_orders_by_frame_then_id() {
        let mut ledger = Ledger::new();
        let on = MidiEvent::of_type(EventType::NoteOn, 60, 100);
        ledger.rec(Action::new(7, 1, 50, on));
        ledger.rec(Action::new(3, 2, 50, on));
        ledger.rec(Action::new(9, 1, 10, on));

        let ids: Vec<Id> = serialize(&ledger).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![9, 3, 7]);
    }

    #[test]
    fn test_deserialize_raises_id_mark() {
        let mut ids = IdManager::new();
        let ledger = deserialize(&[record(12, 0, EventType::NoteOn), record(4, 9, EventType::NoteOff)], &mut ids).unwrap();

        assert_eq!(ledger.len(), 2);
        assert_eq!(ids.get(), 12);
        assert_eq!(ids.generate(0), 13);
    }

    #[test]
    fn test_deserialize_rejects_bad_ids() {
        let mut ids = IdManager::new();
        assert_eq!(deserialize(&[record(0, 0, EventType::NoteOn)], &mut ids), Err(Error::ZeroId));
        assert_eq!(
            deserialize(&[record(2, 0, EventType::NoteOn), record(2, 5, EventType::NoteOff)], &mut ids),
            Err(Error::DuplicateId(2))
        );
    }

    #[test]
    fn test_deserialize_keeps_duplicate_payloads() {
        let mut ids = IdManager::new();
        let ledger = deserialize(&[record(1, 0, EventType::NoteOn), record(2, 0, EventType::NoteOn)], &mut ids).unwrap();
        assert_eq!(ledger.actions_on_frame(0).len(), 2);
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(record(5, 42, EventType::NoteKill)).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["channel_id"], 1);
        assert_eq!(json["frame"], 42);
        assert_eq!(json["event"], 0x703C_6400u32);

        let parsed: PersistedAction =
            serde_json::from_str(r#"{"id":5,"channel_id":1,"frame":42,"event":1883005952}"#).unwrap();
        assert_eq!(parsed.prev_id, 0);
        assert_eq!(parsed.next_id, 0);
    }

    fn records() -> impl Strategy<Value = Vec<PersistedAction>> {
        prop::collection::vec((1u32..8, 0usize..1_000, 0u8..4, 0u8..128, 1u8..128), 0..30).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (channel_id, frame, kind, note, velocity))| {
                    let status = [0x90, 0x80, 0x70, 0xB0][kind as usize];
                    PersistedAction {
                        id: i as Id + 1,
                        channel_id,
                        frame,
                        event: MidiEvent::new(status, note, velocity).raw(),
                        prev_id: 0,
                        next_id: 0,
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_restored_ledger_serializes_identically(mut saved in records()) {
            let mut ids = IdManager::new();
            let ledger = deserialize(&saved, &mut ids).unwrap();
            saved.sort_by_key(|r| (r.frame, r.id));
            prop_assert_eq!(serialize(&ledger), saved);
        }
    }
}
