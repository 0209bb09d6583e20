//! The boundary with the packetized link to the host.
//!
//! Enumeration, descriptors and framing belong to the transport's own library; the pedal only needs to hand over
//! batches of event packets and to know when the previous batch has left.

use embedded_hal::delay::DelayNs;

/// How long the device stays detached at startup so the host notices it leave and enumerates it afresh.
pub const REENUMERATION_DELAY_MS: u32 = 10;

/// A host-polled link that accepts one submission at a time.
pub trait Transport {
    /// Gives the link a chance to service pending transfers. Called once per scheduling tick.
    fn poll(&mut self);

    /// Whether the previous submission has fully drained and a new one may be handed over.
    fn ready_for_submission(&self) -> bool;

    /// Hands `bytes` (a whole number of event packets) over for asynchronous transmission.
    ///
    /// Only called when [`ready_for_submission()`](Self::ready_for_submission) returned true in the same tick.
    fn submit(&mut self, bytes: &[u8]);

    /// Attaches the device to the bus.
    fn connect(&mut self);

    /// Detaches the device from the bus.
    fn disconnect(&mut self);
}

/// Forces the host to enumerate the device again by detaching it, waiting [`REENUMERATION_DELAY_MS`] and attaching it.
///
/// Blocks for the whole delay; intended to run once during initialization.
pub fn reenumerate(transport: &mut impl Transport, delay: &mut impl DelayNs) {
    transport.disconnect();
    delay.delay_ms(REENUMERATION_DELAY_MS);
    transport.connect();
    #[cfg(feature = "defmt")]
    defmt::info!("Transport re-attached after {} ms", REENUMERATION_DELAY_MS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Disconnect,
        Delay(u32),
        Connect,
    }

    /// Both the transport and the delay record into the same log so their ordering can be checked.
    struct Recorder {
        calls: [Option<Call>; 3],
        len: usize,
    }

    impl Recorder {
        fn record(&mut self, call: Call) {
            self.calls[self.len] = Some(call);
            self.len += 1;
        }
    }

    struct Link<'a>(&'a core::cell::RefCell<Recorder>);

    impl Transport for Link<'_> {
        fn poll(&mut self) {}

        fn ready_for_submission(&self) -> bool {
            false
        }

        fn submit(&mut self, _bytes: &[u8]) {
            panic!("nothing should be submitted while re-enumerating");
        }

        fn connect(&mut self) {
            self.0.borrow_mut().record(Call::Connect);
        }

        fn disconnect(&mut self) {
            self.0.borrow_mut().record(Call::Disconnect);
        }
    }

    struct Sleep<'a>(&'a core::cell::RefCell<Recorder>);

    impl DelayNs for Sleep<'_> {
        fn delay_ns(&mut self, ns: u32) {
            self.0.borrow_mut().record(Call::Delay(ns / 1_000_000));
        }

        fn delay_ms(&mut self, ms: u32) {
            self.0.borrow_mut().record(Call::Delay(ms));
        }
    }

    #[test]
    fn reenumerate_brackets_delay() {
        let recorder = core::cell::RefCell::new(Recorder {
            calls: [None, None, None],
            len: 0,
        });
        reenumerate(&mut Link(&recorder), &mut Sleep(&recorder));

        let recorder = recorder.into_inner();
        assert_eq!(
            [
                Some(Call::Disconnect),
                Some(Call::Delay(10)),
                Some(Call::Connect)
            ],
            recorder.calls,
            "Expected left but got right"
        );
    }
}
