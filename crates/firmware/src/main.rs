//! [Embassy](https://embassy.dev)-based firmware for a USB-MIDI foot pedal. The firmware runs on the [Nucleo-F767ZI
//! development board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html), which is powered by an F7-series
//! STM32 microcontroller.
//!
//! Two foot switches play a pair of adjacent notes and an expression pedal sweeps a continuous controller. Everything
//! between the pins and the USB endpoint lives in `midi_pedal_lib`; this crate wires it to the board. The board's user
//! button cycles what the expression input controls, shown as a blink count on the red LED. The green LED lights
//! once the pedal is up and running.

#![no_std]
#![no_main]

mod analog_mode;
mod sampler;
mod switches;
mod usb;

use crate::{
    analog_mode::{ANALOG_MODE_SYNC, AnalogModeReceiver, display_analog_mode, select_analog_mode},
    sampler::{ANALOG_SAMPLER, conversion_task},
    switches::FootSwitches,
    usb::{IDENTITY, UsbMidiTransport, midi_writer_task, usb_task},
};
use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::{
    Config,
    adc::Adc,
    bind_interrupts,
    exti::ExtiInput,
    gpio::{Input, Level, Output, Pull, Speed},
    peripherals,
    time::Hertz,
    usb as stm32_usb,
};
use embassy_time::{Delay, Duration, Ticker};
use midi_pedal_lib::{
    configuration::PedalConfig,
    input::{ContactPolarity, DeadlineTimer},
    scheduler::{Scheduler, TICK_PERIOD_MS},
};
use static_cell::StaticCell;

#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        OTG_FS => stm32_usb::InterruptHandler<peripherals::USB_OTG_FS>;
    }
);

type PedalScheduler = Scheduler<'static, FootSwitches, DeadlineTimer, UsbMidiTransport>;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing MIDI pedal");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        // pll: phase-locked loop, crucial for dividing clock
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            // per section 5.2 of RM0410: the 48MHz clock used for USB OTG FS is derived from main PLL VCO (PLLQ clock)
            divq: Some(PllQDiv::DIV9), // 8mhz / 4 * 216 / 9 = 48Mhz
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    }
    let p = embassy_stm32::init(config);

    static ENDPOINT_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
    let mut usb_config = stm32_usb::Config::default();

    // USB devices which are self-powered need to enable vbus_detection to comply with the USB spec. Per section 6.10
    // of the Nucleo board manual (UM1974), CN13 (the USB port) cannot power the board.
    usb_config.vbus_detection = true;

    let driver = stm32_usb::Driver::new_fs(
        p.USB_OTG_FS,
        Irqs,
        p.PA12,
        p.PA11,
        ENDPOINT_OUT_BUFFER.init([0; 256]),
        usb_config,
    );
    let (device, class) = usb::build(driver, &IDENTITY);
    unwrap!(spawner.spawn(usb_task(device)));
    unwrap!(spawner.spawn(midi_writer_task(class)));

    // A0 on the Nucleo's Arduino header
    let adc = Adc::new(p.ADC1);
    unwrap!(spawner.spawn(conversion_task(adc, p.PA3)));

    let button = ExtiInput::new(p.PC13, p.EXTI13, Pull::None);
    unwrap!(spawner.spawn(select_analog_mode(button, ANALOG_MODE_SYNC.sender())));

    let red_led = Output::new(p.PB14, Level::Low, Speed::Low);
    let display_receiver = unwrap!(ANALOG_MODE_SYNC.receiver());
    unwrap!(spawner.spawn(display_analog_mode(red_led, display_receiver)));

    // pull-ups hold an open switch high, so a pressed one reads low
    let pedal_config = PedalConfig {
        polarity: ContactPolarity::ActiveLow,
        ..PedalConfig::default()
    };
    info!("{}", pedal_config);

    let switches = FootSwitches::new(
        Input::new(p.PD0, Pull::Up),
        Input::new(p.PD1, Pull::Up),
    );
    let scheduler = Scheduler::new(
        switches,
        DeadlineTimer::new(),
        UsbMidiTransport::default(),
        &ANALOG_SAMPLER,
        pedal_config,
    );

    let green_led = Output::new(p.PB0, Level::Low, Speed::Low);
    let pedal_receiver = unwrap!(ANALOG_MODE_SYNC.receiver());
    unwrap!(spawner.spawn(pedal_task(scheduler, pedal_receiver, green_led)));
}

/// Runs the pedal: re-enumerates once, then ticks the scheduler every [`TICK_PERIOD_MS`].
#[embassy_executor::task]
async fn pedal_task(
    mut scheduler: PedalScheduler,
    mut analog_mode: AnalogModeReceiver<'static>,
    mut status_led: Output<'static>,
) -> ! {
    scheduler.start(&mut Delay);
    status_led.set_high();
    info!("MIDI pedal running");

    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS.into()));
    loop {
        if let Some(mode) = analog_mode.try_changed() {
            scheduler.set_analog_mode(mode);
        }
        scheduler.tick();
        ticker.next().await;
    }
}
