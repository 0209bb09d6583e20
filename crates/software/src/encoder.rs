//! Turns confirmed contact changes and analog samples into [`MidiEvent`]s.

use crate::{
    analog::AnalogSample,
    configuration::{AnalogMode, PedalConfig},
    event::MidiEvent,
    input::Transition,
};
use wmidi::U7;

/// Maps pedal input onto MIDI according to a [`PedalConfig`].
///
/// Digital transitions map to notes: switch `n` plays `base_note + n`, NoteOn when its contact closes and NoteOff
/// when it opens, always at the configured velocity. The analog input maps to a ControlChange on the controller
/// selected by the [`AnalogMode`], sent only when the value has moved far enough since the last one sent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EventEncoder {
    config: PedalConfig,
    /// The last controller value sent, so jitter below the threshold can be ignored.
    last_analog: Option<u8>,
}

impl EventEncoder {
    /// Construct an `EventEncoder`.
    pub fn new(config: PedalConfig) -> Self {
        Self {
            config,
            last_analog: None,
        }
    }

    /// The configuration in use.
    pub fn config(&self) -> &PedalConfig {
        &self.config
    }

    /// Selects a new destination for the analog input. The next sample is sent regardless of the threshold.
    pub fn set_analog_mode(&mut self, mode: AnalogMode) {
        if self.config.analog.mode != mode {
            self.config.analog.mode = mode;
            self.last_analog = None;
        }
    }

    /// Encodes a confirmed [`Transition`].
    ///
    /// Returns `None` if the switch's note would fall outside MIDI's 0–127 range.
    pub fn encode_transition(&self, transition: Transition) -> Option<MidiEvent> {
        let note = (self.config.base_note as u8).checked_add(transition.index)?;
        if note > u8::from(U7::MAX) {
            return None;
        }
        let note = U7::from_u8_lossy(note);

        let event = if transition.level {
            MidiEvent::note_on(self.config.channel, note, self.config.velocity)
        } else {
            MidiEvent::note_off(self.config.channel, note, self.config.velocity)
        };
        Some(event)
    }

    /// Encodes an [`AnalogSample`] as a ControlChange.
    ///
    /// Returns `None` while analog output is disabled or when the value has not moved by at least the configured
    /// threshold since the last event. The first sample after start (or after a mode change) is always sent.
    pub fn encode_analog(&mut self, sample: AnalogSample) -> Option<MidiEvent> {
        let controller = self.config.analog.mode.controller()?;
        let value = sample.to_u7();

        if let Some(last) = self.last_analog {
            if last.abs_diff(value) < self.config.analog.threshold.max(1) {
                return None;
            }
        }

        self.last_analog = Some(value);
        Some(MidiEvent::control_change(
            self.config.channel,
            controller,
            U7::from_u8_lossy(value),
        ))
    }
}
