use ostinato_core::{EventType, Frame, Id, MidiEvent};

/// A timestamped event on a channel. `prev`/`next` hold the id of the paired
/// half (note-on ↔ note-off), 0 when unpaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Action {
    pub id: Id,
    pub channel: Id,
    pub frame: Frame,
    pub event: MidiEvent,
    pub prev: Id,
    pub next: Id,
}

impl Action {
    pub fn new(id: Id, channel: Id, frame: Frame, event: MidiEvent) -> Self {
        Self {
            id,
            channel,
            frame,
            event,
            prev: 0,
            next: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.id != 0
    }

    pub fn is_type(&self, kind: EventType) -> bool {
        self.event.is_type(kind)
    }

    /// Duplicate test: same channel, frame and raw payload, whatever the ids.
    pub fn same_as(&self, other: &Action) -> bool {
        self.channel == other.channel
            && self.frame == other.frame
            && self.event.raw() == other.event.raw()
    }

    /// `self` is a note-on that `other`, a note-off on the same note and
    /// channel, can close.
    pub fn pairs_with(&self, other: &Action) -> bool {
        self.event.is_type(EventType::NoteOn)
            && other.event.is_type(EventType::NoteOff)
            && self.event.note() == other.event.note()
            && self.channel == other.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(kind: EventType, channel: Id, frame: Frame, note: u8) -> Action {
        Action::new(1, channel, frame, MidiEvent::of_type(kind, note, 100))
    }

    #[test]
    fn test_same_as_ignores_ids_and_links() {
        let a = note(EventType::NoteOn, 1, 10, 60);
        let mut b = a;
        b.id = 99;
        b.next = 5;
        assert!(a.same_as(&b));

        b.frame = 11;
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_pairs_with() {
        let on = note(EventType::NoteOn, 1, 0, 60);
        assert!(on.pairs_with(&note(EventType::NoteOff, 1, 50, 60)));
        assert!(!on.pairs_with(&note(EventType::NoteOff, 2, 50, 60)));
        assert!(!on.pairs_with(&note(EventType::NoteOff, 1, 50, 61)));
        assert!(!on.pairs_with(&note(EventType::NoteOn, 1, 50, 60)));
    }
}
