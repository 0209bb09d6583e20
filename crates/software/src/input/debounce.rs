//! Provides [`Debouncer`], a state machine which confirms foot-switch changes only after the contacts have held still
//! for a full debounce interval.
//!
//! The machine is either idle or pending. While idle, each poll samples the contacts and, on any difference from the
//! last confirmed state, arms the interval timer and holds the sample as a candidate. While pending, a poll either
//! finds the timer expired, in which case the contacts are sampled once more and the candidate is committed only if it
//! is still what the contacts read, or finds the contacts moving again, in which case the timer is stopped and the
//! candidate is replaced (or dropped, if the contacts went back to their confirmed state). A contact that never settles
//! simply never confirms.

use super::{DigitalInputMask, InputPort, IntervalTimer, Transitions};
use embassy_time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    /// No timer armed.
    Idle,
    /// Timer armed; the candidate must still be read when it expires.
    Pending { candidate: DigitalInputMask },
}

/// The debounce state machine for a bank of up to eight contacts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Debouncer {
    last_confirmed: DigitalInputMask,
    state: State,
    interval: Duration,
}

impl Debouncer {
    /// Construct a `Debouncer` which assumes every contact starts cleared.
    pub fn new(interval: Duration) -> Self {
        Self::with_confirmed(interval, DigitalInputMask::empty())
    }

    /// Construct a `Debouncer` with a known starting state, e.g., one sampled at boot.
    pub fn with_confirmed(interval: Duration, confirmed: DigitalInputMask) -> Self {
        Self {
            last_confirmed: confirmed,
            state: State::Idle,
            interval,
        }
    }

    /// The most recently confirmed contact state.
    pub fn confirmed(&self) -> DigitalInputMask {
        self.last_confirmed
    }

    /// The sample awaiting confirmation, if any.
    pub fn candidate(&self) -> Option<DigitalInputMask> {
        match self.state {
            State::Idle => None,
            State::Pending { candidate } => Some(candidate),
        }
    }

    /// Whether a candidate is waiting on the timer.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }

    /// Advances the state machine by one scheduling tick, returning the transitions confirmed by this tick (if any).
    ///
    /// `port` is read exactly once per call. `timer` must not be touched by anyone else while the debouncer uses it.
    pub fn poll(
        &mut self,
        port: &mut impl InputPort,
        timer: &mut impl IntervalTimer,
    ) -> Transitions {
        let sample = port.read();

        match self.state {
            State::Idle => {
                if sample != self.last_confirmed {
                    self.arm(timer, sample);
                }
                Transitions::none()
            }
            State::Pending { candidate } if timer.has_expired() => {
                timer.stop();
                self.state = State::Idle;

                if sample == candidate {
                    let transitions = Transitions::between(self.last_confirmed, candidate);
                    #[cfg(feature = "defmt")]
                    defmt::debug!(
                        "Contacts confirmed: {=u8:b} -> {=u8:b}",
                        self.last_confirmed.bits(),
                        candidate.bits()
                    );
                    self.last_confirmed = candidate;
                    transitions
                } else {
                    #[cfg(feature = "defmt")]
                    defmt::debug!(
                        "Contact bounce discarded: expected {=u8:b}, read {=u8:b}",
                        candidate.bits(),
                        sample.bits()
                    );
                    Transitions::none()
                }
            }
            State::Pending { candidate } => {
                if sample == self.last_confirmed {
                    // bounced back before the window closed
                    timer.stop();
                    self.state = State::Idle;
                } else if sample != candidate {
                    self.arm(timer, sample);
                }
                Transitions::none()
            }
        }
    }

    fn arm(&mut self, timer: &mut impl IntervalTimer, candidate: DigitalInputMask) {
        // stopping first guarantees a stale expiry can never be mistaken for this one
        timer.stop();
        timer.start(self.interval);
        self.state = State::Pending { candidate };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Transition;

    const INTERVAL: Duration = Duration::from_millis(20);

    /// A timer that only expires when told to.
    #[derive(Default)]
    struct ManualTimer {
        armed: bool,
        expired: bool,
        starts: usize,
        stops: usize,
    }

    impl ManualTimer {
        fn expire(&mut self) {
            if self.armed {
                self.expired = true;
            }
        }
    }

    impl IntervalTimer for ManualTimer {
        fn start(&mut self, interval: Duration) {
            assert_eq!(INTERVAL, interval, "Expected left but got right");
            assert!(!self.armed, "Timer must be stopped before it is re-armed");
            self.armed = true;
            self.expired = false;
            self.starts += 1;
        }

        fn stop(&mut self) {
            self.armed = false;
            self.expired = false;
            self.stops += 1;
        }

        fn is_running(&self) -> bool {
            self.armed && !self.expired
        }

        fn has_expired(&self) -> bool {
            self.armed && self.expired
        }
    }

    /// A port whose level is set directly by the test.
    struct Contacts(DigitalInputMask);

    impl Contacts {
        fn set(&mut self, bits: u8) {
            self.0 = DigitalInputMask::new(bits);
        }
    }

    impl InputPort for Contacts {
        fn read(&mut self) -> DigitalInputMask {
            self.0
        }
    }

    fn setup() -> (Debouncer, Contacts, ManualTimer) {
        (
            Debouncer::new(INTERVAL),
            Contacts(DigitalInputMask::empty()),
            ManualTimer::default(),
        )
    }

    #[test]
    fn idle_without_change() {
        let (mut debouncer, mut contacts, mut timer) = setup();
        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());
        assert!(!debouncer.is_pending());
        assert_eq!(0, timer.starts, "No timer should be armed");
    }

    #[test]
    fn difference_arms_timer_without_confirming() {
        let (mut debouncer, mut contacts, mut timer) = setup();
        contacts.set(0b01);

        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());
        assert!(debouncer.is_pending());
        assert!(timer.is_running());
        assert_eq!(Some(DigitalInputMask::new(0b01)), debouncer.candidate());
        assert_eq!(
            DigitalInputMask::empty(),
            debouncer.confirmed(),
            "Confirmed state must not change until the timer expires"
        );
    }

    #[test]
    fn stable_change_confirms_after_interval() {
        let (mut debouncer, mut contacts, mut timer) = setup();
        contacts.set(0b01);
        debouncer.poll(&mut contacts, &mut timer);

        // still within the window
        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());

        timer.expire();
        let mut transitions = debouncer.poll(&mut contacts, &mut timer);
        assert_eq!(
            Some(Transition {
                index: 0,
                level: true
            }),
            transitions.next(),
            "Expected left but got right"
        );
        assert_eq!(None, transitions.next());
        assert_eq!(DigitalInputMask::new(0b01), debouncer.confirmed());
        assert!(!debouncer.is_pending());
        assert!(!timer.is_running(), "Timer should be stopped once consumed");
    }

    #[test]
    fn bounce_within_window_emits_nothing() {
        // 00 -> 01 -> 00 inside the debounce window
        let (mut debouncer, mut contacts, mut timer) = setup();
        contacts.set(0b01);
        debouncer.poll(&mut contacts, &mut timer);
        contacts.set(0b00);
        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());
        assert!(!debouncer.is_pending(), "Should fall back to idle");

        timer.expire();
        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());
        assert_eq!(DigitalInputMask::empty(), debouncer.confirmed());
    }

    #[test]
    fn mismatch_at_expiry_is_discarded() {
        let (mut debouncer, mut contacts, mut timer) = setup();
        contacts.set(0b01);
        debouncer.poll(&mut contacts, &mut timer);

        // the contacts move again in the same tick the timer expires
        timer.expire();
        contacts.set(0b11);
        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());
        assert!(!debouncer.is_pending(), "Discarded candidate returns to idle");
        assert_eq!(DigitalInputMask::empty(), debouncer.confirmed());

        // the next observed difference re-arms
        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());
        assert_eq!(Some(DigitalInputMask::new(0b11)), debouncer.candidate());
    }

    #[test]
    fn moving_candidate_rearms_with_stop_first() {
        let (mut debouncer, mut contacts, mut timer) = setup();
        contacts.set(0b01);
        debouncer.poll(&mut contacts, &mut timer);
        contacts.set(0b11);
        debouncer.poll(&mut contacts, &mut timer);

        assert_eq!(2, timer.starts, "Expected left but got right");
        assert!(
            timer.stops >= timer.starts,
            "Every arm must be preceded by a stop"
        );
        assert_eq!(Some(DigitalInputMask::new(0b11)), debouncer.candidate());

        timer.expire();
        let transitions = debouncer.poll(&mut contacts, &mut timer);
        assert_eq!(2, transitions.len(), "Both switches flipped");
    }

    #[test]
    fn both_switches_release_together() {
        let (_, mut contacts, mut timer) = setup();
        let mut debouncer = Debouncer::with_confirmed(INTERVAL, DigitalInputMask::new(0b11));
        contacts.set(0b11);
        assert!(debouncer.poll(&mut contacts, &mut timer).is_empty());

        contacts.set(0b00);
        debouncer.poll(&mut contacts, &mut timer);
        timer.expire();
        let mut transitions = debouncer.poll(&mut contacts, &mut timer);
        assert_eq!(
            Some(Transition {
                index: 0,
                level: false
            }),
            transitions.next()
        );
        assert_eq!(
            Some(Transition {
                index: 1,
                level: false
            }),
            transitions.next()
        );
        assert_eq!(None, transitions.next());
    }

    #[test]
    fn only_flipped_bits_are_reported() {
        let (_, mut contacts, mut timer) = setup();
        let mut debouncer = Debouncer::with_confirmed(INTERVAL, DigitalInputMask::new(0b01));
        contacts.set(0b11);
        debouncer.poll(&mut contacts, &mut timer);
        timer.expire();
        let mut transitions = debouncer.poll(&mut contacts, &mut timer);
        assert_eq!(
            Some(Transition {
                index: 1,
                level: true
            }),
            transitions.next()
        );
        assert_eq!(None, transitions.next());
    }

    #[test]
    fn every_two_bit_sequence_confirms_only_stable_candidates() {
        // every sequence of four two-bit samples, crossed with every choice of ticks on which the timer has expired
        for sequence in 0..256_u16 {
            for expiries in 0..16_u8 {
                let (mut debouncer, mut contacts, mut timer) = setup();

                for step in 0..4 {
                    let sample = DigitalInputMask::new(((sequence >> (step * 2)) & 0b11) as u8);
                    contacts.set(sample.bits());
                    if expiries & (1 << step) != 0 {
                        timer.expire();
                    }

                    let expired = timer.has_expired();
                    let candidate = debouncer.candidate();
                    let confirmed = debouncer.confirmed();
                    let transitions = debouncer.poll(&mut contacts, &mut timer);

                    if expired && candidate == Some(sample) {
                        assert_eq!(
                            Transitions::between(confirmed, sample),
                            transitions,
                            "Expected left but got right"
                        );
                        assert_eq!(sample, debouncer.confirmed(), "Expected left but got right");
                    } else {
                        assert!(
                            transitions.is_empty(),
                            "Sequence {sequence:#010b}, expiries {expiries:#06b}: emitted at step {step} without a \
                             stable candidate"
                        );
                        assert_eq!(
                            confirmed,
                            debouncer.confirmed(),
                            "Confirmed state may only change on a stable expiry"
                        );
                    }
                }
            }
        }
    }
}
