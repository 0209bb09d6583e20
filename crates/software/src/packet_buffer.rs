//! Provides [`PacketBuffer`], the bounded batch of encoded events handed to the transport once per transmit cycle.

use crate::event::{Cable, EVENT_PACKET_LEN, EventPacket, MidiEvent};
use tinyvec::{ArrayVec, array_vec};

/// Number of events a single submission can carry. The transport accepts at most eight bytes per transfer.
pub const MAX_MSG_COUNT: usize = 2;

/// Largest submission a default-sized [`PacketBuffer`] ever produces.
pub const MAX_SUBMISSION_LEN: usize = MAX_MSG_COUNT * EVENT_PACKET_LEN;

/// A fixed-capacity batch of serialized events.
///
/// The buffer accumulates events between transmit opportunities. Once its contents have been handed to the transport
/// it is marked submitted and refuses further appends until [`reset()`](Self::reset), which the scheduler only calls
/// after the transport reports the previous submission has drained. A batch therefore can't change while in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct PacketBuffer<const N: usize = MAX_MSG_COUNT> {
    packets: ArrayVec<[EventPacket; N]>,
    submitted: bool,
}

impl<const N: usize> Default for PacketBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PacketBuffer<N> {
    /// Construct an empty `PacketBuffer`.
    pub fn new() -> Self {
        Self {
            packets: array_vec!(),
            submitted: false,
        }
    }

    /// Serializes `event` and appends it, returning whether it fit.
    ///
    /// When the buffer is full, or its contents are in flight, the event is dropped and the buffer is left unchanged.
    pub fn try_append(&mut self, event: MidiEvent, cable: Cable) -> bool {
        if self.submitted || self.is_full() {
            return false;
        }
        self.packets.push(event.to_packet(cable));
        true
    }

    /// Empties the buffer and makes it writable again.
    ///
    /// Must only be called once the transport is ready for a new submission.
    pub fn reset(&mut self) {
        self.packets.clear();
        self.submitted = false;
    }

    /// Records that the current contents were handed to the transport.
    pub fn mark_submitted(&mut self) {
        self.submitted = true;
    }

    /// Whether the current contents were handed to the transport and haven't been reset since.
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Number of events in the buffer.
    pub fn len(&self) -> usize {
        self.packets.len()
    }

    /// Number of bytes written so far; always four per event.
    pub fn write_cursor(&self) -> usize {
        self.packets.len() * EVENT_PACKET_LEN
    }

    /// Determine if the buffer holds no events.
    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Determine if another event would be dropped.
    pub fn is_full(&self) -> bool {
        self.packets.len() == N
    }

    /// Whether an append would currently succeed.
    pub fn accepts_events(&self) -> bool {
        !self.submitted && !self.is_full()
    }

    /// The serialized events, ready for submission.
    pub fn as_bytes(&self) -> &[u8] {
        self.packets.as_slice().as_flattened()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wmidi::{Channel, U7};

    fn note_on(note: u8) -> MidiEvent {
        MidiEvent::note_on(Channel::Ch1, U7::from_u8_lossy(note), U7::MAX)
    }

    #[test]
    fn new_is_empty() {
        let buffer: PacketBuffer = PacketBuffer::new();
        assert!(buffer.is_empty());
        assert_eq!(0, buffer.len());
        assert_eq!(0, buffer.write_cursor());
        assert!(buffer.as_bytes().is_empty());
    }

    #[test]
    fn append_serializes_four_bytes_per_event() {
        let mut buffer: PacketBuffer = PacketBuffer::new();
        assert!(buffer.try_append(note_on(0x60), Cable::default()));
        assert!(buffer.try_append(note_on(0x61), Cable::default()));
        assert_eq!(2, buffer.len());
        assert_eq!(8, buffer.write_cursor());
        assert_eq!(
            &[0x09, 0x90, 0x60, 0x7F, 0x09, 0x90, 0x61, 0x7F],
            buffer.as_bytes(),
            "Expected left but got right"
        );
    }

    #[test]
    fn third_append_fails_and_leaves_contents_unchanged() {
        let mut buffer: PacketBuffer = PacketBuffer::new();
        buffer.try_append(note_on(0x60), Cable::default());
        buffer.try_append(note_on(0x61), Cable::default());
        let before = buffer.clone();

        assert!(!buffer.try_append(note_on(0x62), Cable::default()));
        assert_eq!(MAX_MSG_COUNT, buffer.len(), "Count must never exceed capacity");
        assert_eq!(before, buffer, "Expected left but got right");
    }

    #[test]
    fn submitted_buffer_rejects_appends_until_reset() {
        let mut buffer: PacketBuffer = PacketBuffer::new();
        buffer.try_append(note_on(0x60), Cable::default());
        buffer.mark_submitted();
        assert!(!buffer.accepts_events());
        assert!(!buffer.try_append(note_on(0x61), Cable::default()));
        assert_eq!(4, buffer.write_cursor());

        buffer.reset();
        assert!(buffer.is_empty());
        assert!(!buffer.is_submitted());
        assert!(buffer.try_append(note_on(0x61), Cable::default()));
    }

    #[test]
    fn bytes_never_exceed_max_submission_len() {
        let mut buffer: PacketBuffer = PacketBuffer::new();
        for note in 0x60..0x70 {
            buffer.try_append(note_on(note), Cable::default());
            assert!(buffer.as_bytes().len() <= MAX_SUBMISSION_LEN);
        }
        assert_eq!(
            MAX_SUBMISSION_LEN,
            buffer.as_bytes().len(),
            "Expected left but got right"
        );
    }

    #[test]
    fn capacity_follows_const_parameter() {
        let mut buffer = PacketBuffer::<3>::new();
        for note in 0x60..0x63 {
            assert!(buffer.try_append(note_on(note), Cable::default()));
        }
        assert!(buffer.is_full());
        assert_eq!(12, buffer.write_cursor());
    }
}
