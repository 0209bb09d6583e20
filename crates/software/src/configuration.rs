//! This module contains both user-configurable settings (implemented as enums) and the fixed parameters of the pedal,
//! along with traits to make them easier to work with in code.

mod analog_mode;
pub use analog_mode::*;

use crate::{event::Cable, input::ContactPolarity};
use embassy_time::Duration;
use num_traits::{FromPrimitive, ToPrimitive};
use wmidi::{Channel, Note, U7, Velocity};

/// How long a contact must hold still before a change is believed. Mechanical foot switches settle well within this.
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(20);

/// The note assigned to the first foot switch; each further switch plays the next semitone up.
pub const BASE_NOTE: Note = Note::C7;

/// Note events are not velocity sensitive, so every NoteOn and NoteOff carries full velocity.
pub const DEFAULT_NOTE_VELOCITY: Velocity = U7::MAX;

/// A trait which allows infinite cycling of an enum's variants.
///
/// Useful for pushbutton user interfaces, allowing presses to advance from the current to the next variant,
/// cycling back to the beginning when all variants have been exhausted.
pub trait CycleConfig {
    /// Return the next variant, cycling back to the beginning as needed.
    fn cycle(self) -> Self
    where
        Self: FromPrimitive + ToPrimitive + Sized,
    {
        let index = self
            .to_u8()
            .expect("enum variants should be castable to u8");
        match <Self as FromPrimitive>::from_u8(index + 1) {
            Some(new_selection) => new_selection,
            None => FromPrimitive::from_u8(0).expect("enum should not be empty"),
        }
    }
}

/// Everything the input-to-event pipeline needs to know about how the pedal is wired and what it should send.
///
/// None of this is persisted; the pedal boots with [`PedalConfig::default()`] every time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PedalConfig {
    /// Note sent by the switch on bit 0 of the input mask. Switch `n` sends `base_note + n`.
    pub base_note: Note,
    /// Velocity carried by NoteOn and NoteOff events.
    pub velocity: Velocity,
    /// MIDI channel of every outgoing event.
    pub channel: Channel,
    /// USB-MIDI virtual cable the events are sent on.
    pub cable: Cable,
    /// Number of contacts monitored, counted from bit 0 of the input port.
    pub switch_count: u8,
    /// Which line level counts as a closed contact.
    pub polarity: ContactPolarity,
    /// Stability window of the debounce state machine.
    pub debounce_interval: Duration,
    /// Mapping of the analog input onto a MIDI controller.
    pub analog: AnalogConfig,
}

impl Default for PedalConfig {
    fn default() -> Self {
        Self {
            base_note: BASE_NOTE,
            velocity: DEFAULT_NOTE_VELOCITY,
            channel: Channel::Ch1,
            cable: Cable::default(),
            switch_count: 2,
            polarity: ContactPolarity::default(),
            debounce_interval: DEBOUNCE_INTERVAL,
            analog: AnalogConfig::default(),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PedalConfig {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "PedalConfig {{ base_note: {}, velocity: {}, channel: {}, cable: {}, switch_count: {}, polarity: {}, debounce_interval: {} ms, analog: {} }}",
            self.base_note.to_str(),
            u8::from(self.velocity),
            self.channel.number(),
            self.cable,
            self.switch_count,
            self.polarity,
            self.debounce_interval.as_millis(),
            self.analog
        );
    }
}

/// Configuration of the analog (expression) input.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogConfig {
    /// Controller the input is reported on, if any.
    pub mode: AnalogMode,
    /// Minimum movement, in 7-bit controller steps, before a new ControlChange is sent. Anything below this is
    /// treated as converter noise. A threshold of 0 behaves like 1.
    pub threshold: u8,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            mode: AnalogMode::default(),
            threshold: 2,
        }
    }
}
