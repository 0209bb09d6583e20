//! The hand-off between the analog-to-digital converter's completion handler and the scheduling loop.
//!
//! Conversions run continuously. Each completed conversion is written into one of two slots, and only once the write
//! is finished is that slot published to the consumer by flipping the write index and raising a "ready" flag. The
//! consumer only ever reads the slot published last, never the one currently being written, so a half-finished write
//! cannot be observed. Index bookkeeping does the work a lock would do elsewhere; everything here is a single-byte
//! atomic, which is all the handler and the main flow share.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// One 8-bit, left-aligned conversion result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogSample(pub u8);

impl AnalogSample {
    /// The sample scaled to MIDI's 7-bit range by dropping its least significant bit.
    pub const fn to_u7(&self) -> u8 {
        self.0 >> 1
    }
}

/// A two-slot rotating buffer of conversion results with a "new sample available" flag.
///
/// Intended to live in a `static` shared by the conversion-complete handler (the producer) and the scheduling loop
/// (the consumer). There must be a single producer.
pub struct AnalogSampler {
    slots: [AtomicU8; 2],
    /// Set once the matching slot has been committed at least once since start.
    valid: [AtomicBool; 2],
    /// Index of the slot the producer writes next; the other slot holds the last committed sample.
    write_index: AtomicU8,
    ready: AtomicBool,
}

impl Default for AnalogSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalogSampler {
    /// Construct a sampler with no valid samples.
    pub const fn new() -> Self {
        Self {
            slots: [AtomicU8::new(0), AtomicU8::new(0)],
            valid: [AtomicBool::new(false), AtomicBool::new(false)],
            write_index: AtomicU8::new(0),
            ready: AtomicBool::new(false),
        }
    }

    /// Producer side: starts writing a conversion result into the slot the consumer is not reading.
    ///
    /// Nothing written through the returned [`SlotWriter`] is visible until [`SlotWriter::commit()`].
    pub fn begin_conversion(&self) -> SlotWriter<'_> {
        SlotWriter {
            sampler: self,
            slot: usize::from(self.write_index.load(Ordering::Acquire) & 1),
        }
    }

    /// Producer side: publishes a finished conversion in one step. This is what the conversion-complete handler calls.
    pub fn on_conversion_complete(&self, value: u8) {
        let mut writer = self.begin_conversion();
        writer.write(value);
        writer.commit();
    }

    /// Consumer side: drains the "new sample available" flag, returning the most recently committed sample if one
    /// arrived since the last call.
    pub fn take_sample(&self) -> Option<AnalogSample> {
        if self.ready.swap(false, Ordering::AcqRel) {
            self.latest()
        } else {
            None
        }
    }

    /// Consumer side: the most recently committed sample, without touching the ready flag. `None` until the first
    /// conversion has been committed.
    pub fn latest(&self) -> Option<AnalogSample> {
        let slot = usize::from(self.read_index());
        if self.valid[slot].load(Ordering::Acquire) {
            Some(AnalogSample(self.slots[slot].load(Ordering::Acquire)))
        } else {
            None
        }
    }

    /// Whether a sample has arrived that hasn't been taken yet.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn read_index(&self) -> u8 {
        (self.write_index.load(Ordering::Acquire) & 1) ^ 1
    }
}

/// Write access to the slot of an [`AnalogSampler`] that is not visible to the consumer.
pub struct SlotWriter<'a> {
    sampler: &'a AnalogSampler,
    slot: usize,
}

impl SlotWriter<'_> {
    /// Stores (part of) the conversion result. May be called repeatedly; the last value written is what gets published.
    pub fn write(&mut self, value: u8) {
        self.sampler.slots[self.slot].store(value, Ordering::Release);
    }

    /// Publishes the slot: marks it valid, makes it the slot the consumer reads and raises the ready flag.
    pub fn commit(self) {
        let sampler = self.sampler;
        sampler.valid[self.slot].store(true, Ordering::Release);
        // the slot just written becomes the read slot, so the producer moves on to the other one
        sampler
            .write_index
            .store((self.slot as u8) ^ 1, Ordering::Release);
        sampler.ready.store(true, Ordering::Release);
    }
}
