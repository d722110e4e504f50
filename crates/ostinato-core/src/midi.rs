//! Fixed-width event payload carried by recorded actions.
//!
//! Packed as `status | channel` in the top byte, then note, then velocity:
//! `0xSCNNVV00`.

use crate::MAX_VELOCITY;
use serde::{Deserialize, Serialize};

/// Status class, the upper nibble of the top byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    NoteOn,
    NoteOff,
    NoteKill,
    Envelope,
}

impl EventType {
    pub const fn status(self) -> u8 {
        match self {
            EventType::NoteOn => MidiEvent::NOTE_ON,
            EventType::NoteOff => MidiEvent::NOTE_OFF,
            EventType::NoteKill => MidiEvent::NOTE_KILL,
            EventType::Envelope => MidiEvent::ENVELOPE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct MidiEvent {
    status: u8,
    channel: u8,
    note: u8,
    velocity: u8,
}

impl MidiEvent {
    pub const NOTE_ON: u8 = 0x90;
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_KILL: u8 = 0x70;
    pub const ENVELOPE: u8 = 0xB0;

    /// Builds from a status byte (status nibble and channel nibble), note and
    /// velocity. A note-on with zero velocity becomes a note-off.
    pub fn new(byte1: u8, note: u8, velocity: u8) -> Self {
        let mut event = Self {
            status: byte1 & 0xF0,
            channel: byte1 & 0x0F,
            note,
            velocity,
        };
        event.fix_velocity_zero();
        event
    }

    pub fn of_type(kind: EventType, note: u8, velocity: u8) -> Self {
        Self::new(kind.status(), note, velocity)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self::new((raw >> 24) as u8, (raw >> 16) as u8, (raw >> 8) as u8)
    }

    #[inline]
    pub fn raw(&self) -> u32 {
        (u32::from(self.status | self.channel) << 24)
            | (u32::from(self.note) << 16)
            | (u32::from(self.velocity) << 8)
    }

    #[inline]
    pub fn status(&self) -> u8 {
        self.status
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    #[inline]
    pub fn note(&self) -> u8 {
        self.note
    }

    #[inline]
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Velocity normalised to `0..=1`.
    pub fn velocity_float(&self) -> f32 {
        f32::from(self.velocity) / f32::from(MAX_VELOCITY)
    }

    pub fn set_velocity(&mut self, velocity: u8) {
        self.velocity = velocity;
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel & 0x0F;
    }

    pub fn event_type(&self) -> Option<EventType> {
        match self.status {
            Self::NOTE_ON => Some(EventType::NoteOn),
            Self::NOTE_OFF => Some(EventType::NoteOff),
            Self::NOTE_KILL => Some(EventType::NoteKill),
            Self::ENVELOPE => Some(EventType::Envelope),
            _ => None,
        }
    }

    pub fn is_type(&self, kind: EventType) -> bool {
        self.status == kind.status()
    }

    pub fn is_note_on_off(&self) -> bool {
        self.status == Self::NOTE_ON || self.status == Self::NOTE_OFF
    }

    fn fix_velocity_zero(&mut self) {
        if self.status == Self::NOTE_ON && self.velocity == 0 {
            self.status = Self::NOTE_OFF;
        }
    }
}

impl From<u32> for MidiEvent {
    fn from(raw: u32) -> Self {
        Self::from_raw(raw)
    }
}

impl From<MidiEvent> for u32 {
    fn from(event: MidiEvent) -> Self {
        event.raw()
    }
}
