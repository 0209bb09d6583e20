//! The USB-MIDI link to the host.
//!
//! embassy-usb owns enumeration and generates the device and configuration descriptors from [`UsbIdentity`] and the
//! MIDI class. The pedal's scheduler talks to the link through [`UsbMidiTransport`], which hands submissions to
//! [`midi_writer_task`] and learns from it when the last one has gone out.

use core::sync::atomic::{AtomicBool, Ordering};
use defmt::{debug_assert, info, panic, warn};
use embassy_stm32::{peripherals, usb};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel, signal::Signal};
use embassy_usb::{Builder, UsbDevice, class::midi::MidiClass, driver::EndpointError};
use midi_pedal_lib::{packet_buffer::MAX_SUBMISSION_LEN, transport::Transport};
use static_cell::StaticCell;

pub type UsbDriver = usb::Driver<'static, peripherals::USB_OTG_FS>;

/// How the device introduces itself to the host.
pub struct UsbIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer: &'static str,
    pub product: &'static str,
    /// Largest packet the MIDI endpoints accept.
    pub max_packet_size: u16,
}

pub const IDENTITY: UsbIdentity = UsbIdentity {
    // per https://pid.codes, FOSS projects can apply to be listed under the vendor ID owned by InterBiometrics
    vendor_id: 0x1209,
    // the pid.codes test PID, until a dedicated one is allocated
    product_id: 0x0001,
    manufacturer: "Pawpaw Works",
    product: "MIDI Pedal",
    max_packet_size: 64,
};

impl UsbIdentity {
    fn device_config(&self) -> embassy_usb::Config<'static> {
        let mut config = embassy_usb::Config::new(self.vendor_id, self.product_id);
        config.manufacturer = Some(self.manufacturer);
        config.product = Some(self.product);
        config.self_powered = true;
        config.max_power = 0;
        config
    }
}

/// Builds the USB device and its MIDI class. The device must be handed to [`usb_task`], the class to
/// [`midi_writer_task`].
pub fn build(
    driver: UsbDriver,
    identity: &UsbIdentity,
) -> (UsbDevice<'static, UsbDriver>, MidiClass<'static, UsbDriver>) {
    // the builder needs some buffers for building the descriptors
    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUFFER: StaticCell<[u8; 64]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        identity.device_config(),
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUFFER.init([0; 64]),
    );

    // one jack each way; the pedal only ever writes
    let class = MidiClass::new(&mut builder, 1, 1, identity.max_packet_size);

    (builder.build(), class)
}

/// Released by [`UsbMidiTransport::connect()`]; until then the device stays off the bus.
static ATTACH: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Whether the host has configured the MIDI interface.
static CONNECTED: AtomicBool = AtomicBool::new(false);

/// Set when a submission is handed over, cleared once its transfer completes (or the host goes away).
static IN_FLIGHT: AtomicBool = AtomicBool::new(false);

/// Capacity of one matches the single submission allowed in flight.
static SUBMISSIONS: Channel<CriticalSectionRawMutex, Submission, 1> = Channel::new();

/// A copy of the packet buffer's contents, so the buffer itself never has to leave the scheduler.
struct Submission {
    bytes: [u8; MAX_SUBMISSION_LEN],
    len: usize,
}

impl Submission {
    fn new(bytes: &[u8]) -> Self {
        debug_assert!(
            bytes.len() <= MAX_SUBMISSION_LEN,
            "Submission of {} bytes exceeds the packet buffer",
            bytes.len()
        );
        let len = bytes.len();
        let mut submission = Self {
            bytes: [0; MAX_SUBMISSION_LEN],
            len,
        };
        submission.bytes[..len].copy_from_slice(bytes);
        submission
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

#[embassy_executor::task]
pub async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    ATTACH.wait().await;
    info!("Attaching to USB");
    usb.run().await
}

#[embassy_executor::task]
pub async fn midi_writer_task(mut class: MidiClass<'static, UsbDriver>) -> ! {
    loop {
        class.wait_connection().await;
        CONNECTED.store(true, Ordering::Release);
        info!("USB connected");

        let _ = forward_submissions(&mut class).await;

        CONNECTED.store(false, Ordering::Release);
        // whatever was in flight is gone with the host
        IN_FLIGHT.store(false, Ordering::Release);
        SUBMISSIONS.clear();
        info!("USB disconnected");
    }
}

#[doc(hidden)]
struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => panic!("Buffer overflow"),
            EndpointError::Disabled => Disconnected {},
        }
    }
}

/// Writes each submission to the IN endpoint, reporting completion through [`IN_FLIGHT`].
async fn forward_submissions<'d, T: usb::Instance + 'd>(
    class: &mut MidiClass<'d, usb::Driver<'d, T>>,
) -> Result<(), Disconnected> {
    loop {
        let submission = SUBMISSIONS.receive().await;
        class.write_packet(submission.as_bytes()).await?;
        IN_FLIGHT.store(false, Ordering::Release);
    }
}

/// The [`Transport`] the scheduler drives; a thin view over the statics shared with the USB tasks.
#[derive(Default)]
pub struct UsbMidiTransport {
    connected: bool,
}

impl Transport for UsbMidiTransport {
    fn poll(&mut self) {
        let connected = CONNECTED.load(Ordering::Acquire);
        if connected != self.connected {
            self.connected = connected;
            info!("Transport link up: {}", connected);
        }
    }

    fn ready_for_submission(&self) -> bool {
        self.connected && !IN_FLIGHT.load(Ordering::Acquire)
    }

    fn submit(&mut self, bytes: &[u8]) {
        IN_FLIGHT.store(true, Ordering::Release);
        if SUBMISSIONS.try_send(Submission::new(bytes)).is_err() {
            IN_FLIGHT.store(false, Ordering::Release);
            warn!("Submission rejected; writer still busy");
        }
    }

    fn connect(&mut self) {
        ATTACH.signal(());
    }

    fn disconnect(&mut self) {
        ATTACH.reset();
        CONNECTED.store(false, Ordering::Release);
        self.connected = false;
    }
}
