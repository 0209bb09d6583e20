//! Provides [`Scheduler`], the control loop tying the foot switches and the expression input to the transport.

use crate::{
    analog::AnalogSampler,
    configuration::{AnalogMode, PedalConfig},
    encoder::EventEncoder,
    event::MidiEvent,
    input::{ContactPolarity, Debouncer, DigitalInputMask, InputPort, IntervalTimer},
    packet_buffer::PacketBuffer,
    transport::{Transport, reenumerate},
};
use embedded_hal::delay::DelayNs;

/// Pace of [`Scheduler::run()`]. Well below the debounce interval, so the window is sampled many times.
pub const TICK_PERIOD_MS: u32 = 1;

/// What a single [`Scheduler::tick()`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// Whether the buffer was emptied because the previous submission drained.
    pub reset: bool,
    /// Events written to the buffer.
    pub appended: u8,
    /// Events encoded but lost because the buffer was full.
    pub dropped: u8,
    /// Events handed to the transport.
    pub submitted: u8,
}

/// Everything the pedal's main flow owns, bundled into one context.
///
/// `P` is the foot-switch port, `T` the debounce timer and `X` the link to the host. The analog sampler is shared
/// with the conversion-complete handler and is therefore only borrowed.
pub struct Scheduler<'a, P, T, X> {
    port: P,
    timer: T,
    transport: X,
    debouncer: Debouncer,
    encoder: EventEncoder,
    buffer: PacketBuffer,
    sampler: &'a AnalogSampler,
}

impl<'a, P, T, X> Scheduler<'a, P, T, X>
where
    P: InputPort,
    T: IntervalTimer,
    X: Transport,
{
    /// Construct a `Scheduler`. Every contact is assumed open until the debouncer confirms otherwise.
    pub fn new(
        port: P,
        timer: T,
        transport: X,
        sampler: &'a AnalogSampler,
        config: PedalConfig,
    ) -> Self {
        Self {
            port,
            timer,
            transport,
            debouncer: Debouncer::new(config.debounce_interval),
            encoder: EventEncoder::new(config),
            buffer: PacketBuffer::new(),
            sampler,
        }
    }

    /// One-time startup work: forces the host to enumerate the device afresh.
    pub fn start(&mut self, delay: &mut impl DelayNs) {
        reenumerate(&mut self.transport, delay);
    }

    /// Starts the pedal and ticks it every [`TICK_PERIOD_MS`] forever.
    pub fn run(&mut self, delay: &mut impl DelayNs) -> ! {
        self.start(delay);
        loop {
            self.tick();
            delay.delay_ms(TICK_PERIOD_MS);
        }
    }

    /// Performs one iteration of the control loop.
    ///
    /// In order: the transport is serviced; the buffer is reset if (and only if) the previous submission has
    /// drained; the debouncer and then the analog sampler are drained into the buffer; whatever the buffer holds is
    /// submitted if the transport will take it. While a submission is in flight neither input is drained, so
    /// pending changes wait in the contacts and in the sampler rather than being dropped.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.transport.poll();
        let ready = self.transport.ready_for_submission();

        if ready && self.buffer.is_submitted() {
            self.buffer.reset();
            report.reset = true;
        }

        if self.buffer.accepts_events() {
            self.drain_switches(&mut report);
            self.drain_analog(&mut report);
        }

        if ready && !self.buffer.is_empty() && !self.buffer.is_submitted() {
            self.transport.submit(self.buffer.as_bytes());
            self.buffer.mark_submitted();
            report.submitted = self.buffer.len() as u8;
            #[cfg(feature = "defmt")]
            defmt::debug!(
                "Submitted {} event(s): {=[u8]:x}",
                report.submitted,
                self.buffer.as_bytes()
            );
        }

        report
    }

    fn drain_switches(&mut self, report: &mut TickReport) {
        let config = self.encoder.config();
        let mut port = Conditioned {
            port: &mut self.port,
            polarity: config.polarity,
            width: config.switch_count,
        };

        for transition in self.debouncer.poll(&mut port, &mut self.timer) {
            if let Some(event) = self.encoder.encode_transition(transition) {
                self.append(event, report);
            }
        }
    }

    fn drain_analog(&mut self, report: &mut TickReport) {
        // a sample left untaken stays flagged for the next cycle
        if !self.buffer.accepts_events() {
            return;
        }
        if let Some(sample) = self.sampler.take_sample() {
            if let Some(event) = self.encoder.encode_analog(sample) {
                self.append(event, report);
            }
        }
    }

    fn append(&mut self, event: MidiEvent, report: &mut TickReport) {
        if self.buffer.try_append(event, self.encoder.config().cable) {
            report.appended += 1;
            #[cfg(feature = "defmt")]
            defmt::info!("Encoded {}", event);
        } else {
            report.dropped += 1;
            #[cfg(feature = "defmt")]
            defmt::warn!("Packet buffer full; dropped {}", event);
        }
    }

    /// Selects what the expression input controls.
    pub fn set_analog_mode(&mut self, mode: AnalogMode) {
        self.encoder.set_analog_mode(mode);
        #[cfg(feature = "defmt")]
        defmt::info!("Analog mode set to {}", mode);
    }

    /// The outgoing packet buffer.
    pub fn buffer(&self) -> &PacketBuffer {
        &self.buffer
    }

    /// The debounce state machine.
    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    /// The link to the host.
    pub fn transport(&self) -> &X {
        &self.transport
    }
}

/// The switch port as the debouncer sees it: polarity applied and unused lines masked off.
struct Conditioned<'p, P> {
    port: &'p mut P,
    polarity: ContactPolarity,
    width: u8,
}

impl<P: InputPort> InputPort for Conditioned<'_, P> {
    fn read(&mut self) -> DigitalInputMask {
        self.polarity.apply(self.port.read(), self.width)
    }
}
