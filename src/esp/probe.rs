use crate::ds18b20::{
    CONVERSION_TIME_MS, CONVERT_T, READ_SCRATCHPAD, SCRATCHPAD_LEN, SKIP_ROM, decode_scratchpad,
};
use crate::sensors::{Probe, battery_volts};
use anyhow::Context;
use esp_idf_svc::hal::adc::ADC1;
use esp_idf_svc::hal::adc::attenuation::DB_11;
use esp_idf_svc::hal::adc::oneshot::config::{AdcChannelConfig, Calibration};
use esp_idf_svc::hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Gpio2, Output, PinDriver};
use esp_idf_svc::hal::onewire::OWDriver;

/// Settle time after powering the sensor from a GPIO.
const SENSOR_POWER_UP_MS: u32 = 10;

/// DS18B20 on a one-wire bus plus the battery divider on an ADC pin.
///
/// The sensor is fed from a GPIO so it is unpowered while the node sleeps.
pub struct EspProbe<'d> {
    onewire: OWDriver<'d>,
    sensor_power: PinDriver<'d, AnyOutputPin, Output>,
    battery: AdcChannelDriver<'d, Gpio2, AdcDriver<'d, ADC1>>,
    battery_divider: f32,
}

impl<'d> EspProbe<'d> {
    pub fn new(
        onewire: OWDriver<'d>,
        sensor_power: AnyOutputPin,
        adc: ADC1,
        battery_pin: Gpio2,
        battery_divider: f32,
    ) -> anyhow::Result<Self> {
        let mut sensor_power =
            PinDriver::output(sensor_power).context("‼️Failed to init sensor power pin")?;
        sensor_power.set_high()?;
        FreeRtos::delay_ms(SENSOR_POWER_UP_MS);

        let adc = AdcDriver::new(adc).context("‼️Failed to init ADC")?;
        let channel_config = AdcChannelConfig {
            attenuation: DB_11,
            calibration: Calibration::Curve,
            ..Default::default()
        };
        let battery = AdcChannelDriver::new(adc, battery_pin, &channel_config)
            .context("‼️Failed to init battery ADC channel")?;

        Ok(Self {
            onewire,
            sensor_power,
            battery,
            battery_divider,
        })
    }
}

impl Probe for EspProbe<'_> {
    fn read_temperature_c(&mut self) -> anyhow::Result<f32> {
        self.onewire.reset().context("one-wire reset failed")?;
        self.onewire.write(&[SKIP_ROM, CONVERT_T])?;
        FreeRtos::delay_ms(CONVERSION_TIME_MS as u32);

        self.onewire.reset().context("one-wire reset failed")?;
        self.onewire.write(&[SKIP_ROM, READ_SCRATCHPAD])?;
        let mut pad = [0u8; SCRATCHPAD_LEN];
        self.onewire.read(&mut pad)?;

        Ok(decode_scratchpad(&pad)?)
    }

    fn read_battery_v(&mut self) -> anyhow::Result<f32> {
        let millivolts = self.battery.read().context("battery ADC read failed")?;
        Ok(battery_volts(millivolts, self.battery_divider))
    }
}

impl Drop for EspProbe<'_> {
    fn drop(&mut self) {
        let _ = self.sensor_power.set_low();
    }
}
