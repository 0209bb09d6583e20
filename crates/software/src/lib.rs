//! This crate contains architecture-agnostic logic for a USB-MIDI foot pedal: two foot switches which play notes and
//! an expression input which drives a continuous controller, reported to a host over
//! [USB-MIDI](https://www.usb.org/sites/default/files/midi10.pdf).
//!
//! Nothing here touches hardware directly. The firmware supplies the input port, the debounce timer and the transport
//! through the traits in [`input`] and [`transport`], which keeps every piece of the pipeline testable on the host.

#![deny(missing_docs)]
#![no_std]

pub mod analog;
pub mod configuration;
pub mod encoder;
pub mod event;
pub mod input;
pub mod packet_buffer;
pub mod scheduler;
pub mod transport;
