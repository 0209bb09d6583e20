//! Continuous conversion of the expression input.

use defmt::trace;
use embassy_stm32::{
    Peri,
    adc::{Adc, SampleTime},
    peripherals::{ADC1, PA3},
};
use embassy_time::{Duration, Ticker};
use midi_pedal_lib::analog::AnalogSampler;

/// Shared with the scheduler, which takes at most one sample per tick.
pub static ANALOG_SAMPLER: AnalogSampler = AnalogSampler::new();

const CONVERSION_PERIOD: Duration = Duration::from_millis(2);

/// Converts the expression input over and over, publishing each result as it completes.
#[embassy_executor::task]
pub async fn conversion_task(mut adc: Adc<'static, ADC1>, mut pin: Peri<'static, PA3>) -> ! {
    adc.set_sample_time(SampleTime::CYCLES480);
    let mut ticker = Ticker::every(CONVERSION_PERIOD);

    loop {
        let raw = adc.blocking_read(&mut pin);
        // 12-bit right-aligned down to the top eight bits, i.e., an 8-bit left-aligned result
        let sample = (raw >> 4) as u8;
        trace!("Expression input: {}", sample);
        ANALOG_SAMPLER.on_conversion_complete(sample);
        ticker.next().await;
    }
}
