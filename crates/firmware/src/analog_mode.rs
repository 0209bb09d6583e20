//! Tasks and types related to selecting what the expression input controls.

use embassy_stm32::{exti::ExtiInput, gpio::Output};
use embassy_sync::{
    blocking_mutex::raw::CriticalSectionRawMutex,
    watch::{Receiver, Sender, Watch},
};
use embassy_time::Timer;
use midi_pedal_lib::configuration::{AnalogMode, CycleConfig};

const ANALOG_MODE_RECEIVER_CNT: usize = 2;
/// Syncs the analog mode across tasks.
pub static ANALOG_MODE_SYNC: Watch<CriticalSectionRawMutex, AnalogMode, ANALOG_MODE_RECEIVER_CNT> =
    Watch::new_with(AnalogMode::Expression);
pub type AnalogModeSender<'a> =
    Sender<'a, CriticalSectionRawMutex, AnalogMode, ANALOG_MODE_RECEIVER_CNT>;
pub type AnalogModeReceiver<'a> =
    Receiver<'a, CriticalSectionRawMutex, AnalogMode, ANALOG_MODE_RECEIVER_CNT>;

/// Handles button presses, cycling through the [`AnalogMode`]s.
#[embassy_executor::task]
pub async fn select_analog_mode(
    mut button: ExtiInput<'static>,
    analog_mode: AnalogModeSender<'static>,
) -> ! {
    loop {
        button.wait_for_rising_edge().await;

        let new_mode = analog_mode
            .try_get()
            .expect("Analog mode should never be uninitialized")
            .cycle();
        analog_mode.send(new_mode);
    }
}

/// Blink-count display of the selected [`AnalogMode`].
///
/// Each cycle is divided in half. The LED remains dark for one half. For the other, the LED lights up N times, where
/// N is one more than the index of the selected mode.
#[embassy_executor::task]
pub async fn display_analog_mode(
    mut led: Output<'static>,
    mut analog_mode: AnalogModeReceiver<'static>,
) -> ! {
    const HALF_CYCLE_US: u64 = 1_000_000;

    loop {
        led.set_low();
        Timer::after_micros(HALF_CYCLE_US).await;

        // without the 1 the zeroth mode wouldn't blink at all
        let blink_cnt = { analog_mode.get().await as u8 }.saturating_add(1);
        // mult by two to account for the "off" periods, sub 1 so the LED always starts and ends lit
        let animation_frames = blink_cnt * 2 - 1;
        for _ in 0..animation_frames {
            led.toggle();
            Timer::after_micros(HALF_CYCLE_US / u64::from(animation_frames)).await;
        }
    }
}
