use num_derive::{FromPrimitive, ToPrimitive};
use wmidi::U7;

/// Determines which MIDI controller, if any, the analog input is reported on.
///
/// Variants are ordered for pushbutton cycling: the expression-style controllers come first, and the input can be
/// switched off entirely at the end of the cycle.
#[derive(Debug, Default, Copy, Clone, ToPrimitive, FromPrimitive, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnalogMode {
    /// CC 11: Expression Controller. The usual destination for a pedal's sweep.
    #[default]
    Expression,
    /// CC 4: Foot Controller.
    FootController,
    /// CC 1: Modulation Wheel.
    ModulationWheel,
    /// CC 7: Channel Volume.
    Volume,
    /// The analog input is sampled but never sent.
    Disabled,
}

impl AnalogMode {
    /// Returns the controller number this mode sends on, or `None` when analog output is disabled.
    pub fn controller(&self) -> Option<U7> {
        let number = match self {
            Self::Expression => 11,
            Self::FootController => 4,
            Self::ModulationWheel => 1,
            Self::Volume => 7,
            Self::Disabled => return None,
        };
        Some(U7::from_u8_lossy(number))
    }

    /// Returns true for any value other than [`AnalogMode::Disabled`].
    pub fn is_enabled(&self) -> bool {
        *self != Self::Disabled
    }
}

impl super::CycleConfig for AnalogMode {}
