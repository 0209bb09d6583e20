//! Outgoing MIDI events and their USB-MIDI Event Packet encoding.
//!
//! Every event travels as exactly four bytes:
//!
//! | byte | content                                                            |
//! |------|--------------------------------------------------------------------|
//! | 0    | packet header: message kind (code index number) `\|` cable `<< 4`  |
//! | 1    | MIDI status: message kind `<< 4` `\|` channel                       |
//! | 2    | note or controller number (0–127)                                  |
//! | 3    | velocity or controller value (0–127)                               |

use wmidi::{Channel, MidiMessage, U7};

/// Length in bytes of a USB-MIDI Event Packet.
pub const EVENT_PACKET_LEN: usize = 4;

/// One event, serialized for the transport.
pub type EventPacket = [u8; EVENT_PACKET_LEN];

/// The kinds of MIDI message this device sends. Discriminants are the message-kind nibble used on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum EventKind {
    /// A note was released.
    NoteOff = 0x8,
    /// A note was pressed.
    NoteOn = 0x9,
    /// A continuous controller changed.
    ControlChange = 0xB,
}

impl EventKind {
    /// The message-kind nibble.
    pub const fn code(&self) -> u8 {
        *self as u8
    }
}

/// A USB-MIDI virtual cable, the transport lane an event is sent on (0–15).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cable(u8);

impl Cable {
    /// Construct a `Cable`, keeping only the low nibble.
    pub const fn new(number: u8) -> Self {
        Self(number & 0x0F)
    }

    /// The cable number.
    pub const fn number(&self) -> u8 {
        self.0
    }
}

/// A MIDI event ready to be serialized. Constructed by the encoder and immediately written to the packet buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MidiEvent {
    /// The kind of message.
    pub kind: EventKind,
    /// The MIDI channel the message is addressed to.
    pub channel: Channel,
    /// Note number for note events; controller number for ControlChange.
    pub identifier: U7,
    /// Velocity for note events; controller value for ControlChange.
    pub value: U7,
}

impl MidiEvent {
    /// A NoteOn event.
    pub fn note_on(channel: Channel, note: U7, velocity: U7) -> Self {
        Self {
            kind: EventKind::NoteOn,
            channel,
            identifier: note,
            value: velocity,
        }
    }

    /// A NoteOff event.
    pub fn note_off(channel: Channel, note: U7, velocity: U7) -> Self {
        Self {
            kind: EventKind::NoteOff,
            channel,
            identifier: note,
            value: velocity,
        }
    }

    /// A ControlChange event.
    pub fn control_change(channel: Channel, controller: U7, value: U7) -> Self {
        Self {
            kind: EventKind::ControlChange,
            channel,
            identifier: controller,
            value,
        }
    }

    /// Serializes the event as a USB-MIDI Event Packet on the given cable.
    pub fn to_packet(&self, cable: Cable) -> EventPacket {
        let kind = self.kind.code();
        [
            kind | (cable.number() << 4),
            (kind << 4) | self.channel.index(),
            u8::from(self.identifier),
            u8::from(self.value),
        ]
    }

    /// Parses a USB-MIDI Event Packet, returning the cable it was sent on and the event it carries.
    ///
    /// Returns `None` for anything other than NoteOn, NoteOff or ControlChange, and for packets whose header
    /// disagrees with the MIDI status byte.
    pub fn from_packet(packet: &EventPacket) -> Option<(Cable, MidiEvent)> {
        // the zeroth byte is the Packet Header; the remaining three bytes contain the actual MIDI event
        let event = match MidiMessage::from_bytes(&packet[1..]).ok()? {
            MidiMessage::NoteOn(channel, note, velocity) => {
                Self::note_on(channel, U7::from_u8_lossy(note as u8), velocity)
            }
            MidiMessage::NoteOff(channel, note, velocity) => {
                Self::note_off(channel, U7::from_u8_lossy(note as u8), velocity)
            }
            MidiMessage::ControlChange(channel, control_function, value) => Self::control_change(
                channel,
                U7::from_u8_lossy(u8::from(control_function)),
                value,
            ),
            _ => return None,
        };

        if packet[0] & 0x0F != event.kind.code() {
            return None;
        }
        Some((Cable::new(packet[0] >> 4), event))
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MidiEvent {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "MidiEvent {{ kind: {}, channel: {}, identifier: {}, value: {} }}",
            self.kind,
            self.channel.number(),
            u8::from(self.identifier),
            u8::from(self.value)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE: U7 = U7::from_u8_lossy(0x60);

    #[test]
    fn note_on_packet() {
        let event = MidiEvent::note_on(Channel::Ch1, NOTE, U7::MAX);
        assert_eq!(
            [0x09, 0x90, 0x60, 0x7F],
            event.to_packet(Cable::default()),
            "Expected left but got right"
        );
    }

    #[test]
    fn note_off_packet() {
        let event = MidiEvent::note_off(Channel::Ch1, U7::from_u8_lossy(0x61), U7::MAX);
        assert_eq!(
            [0x08, 0x80, 0x61, 0x7F],
            event.to_packet(Cable::default()),
            "Expected left but got right"
        );
    }

    #[test]
    fn control_change_packet_on_other_lane_and_channel() {
        let event = MidiEvent::control_change(
            Channel::Ch3,
            U7::from_u8_lossy(11),
            U7::from_u8_lossy(64),
        );
        assert_eq!(
            [0x2B, 0xB2, 11, 64],
            event.to_packet(Cable::new(2)),
            "Expected left but got right"
        );
    }

    #[test]
    fn note_on_decodes_back() {
        let packet = MidiEvent::note_on(Channel::Ch1, NOTE, U7::MAX).to_packet(Cable::default());
        let (cable, event) = MidiEvent::from_packet(&packet).expect("packet should decode");
        assert_eq!(Cable::new(0), cable);
        assert_eq!(EventKind::NoteOn, event.kind);
        assert_eq!(0, event.channel.index());
        assert_eq!(0x60, u8::from(event.identifier));
        assert_eq!(0x7F, u8::from(event.value));
    }

    #[test]
    fn control_change_decodes_back() {
        let sent =
            MidiEvent::control_change(Channel::Ch1, U7::from_u8_lossy(4), U7::from_u8_lossy(99));
        let (_, decoded) = MidiEvent::from_packet(&sent.to_packet(Cable::default()))
            .expect("packet should decode");
        assert_eq!(sent, decoded, "Expected left but got right");
    }

    #[test]
    fn unsupported_messages_do_not_decode() {
        // program change
        assert_eq!(None, MidiEvent::from_packet(&[0x0C, 0xC0, 0x05, 0x00]));
        // header disagrees with status byte
        assert_eq!(None, MidiEvent::from_packet(&[0x08, 0x90, 0x60, 0x7F]));
    }

    #[test]
    fn cable_keeps_low_nibble() {
        assert_eq!(3, Cable::new(0x13).number());
    }
}
