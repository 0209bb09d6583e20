//! The foot switches, as the scheduler's input port.

use embassy_stm32::gpio::Input;
use midi_pedal_lib::input::{DigitalInputMask, InputPort};

/// Two normally-open foot switches, each pulling its pin to ground when pressed.
pub struct FootSwitches {
    contacts: [Input<'static>; 2],
}

impl FootSwitches {
    pub fn new(first: Input<'static>, second: Input<'static>) -> Self {
        Self {
            contacts: [first, second],
        }
    }
}

impl InputPort for FootSwitches {
    fn read(&mut self) -> DigitalInputMask {
        DigitalInputMask::from_levels(self.contacts.iter().map(Input::is_high))
    }
}
