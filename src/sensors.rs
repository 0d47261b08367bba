use crate::logging::{log_empty_sample, log_sensor_error};
use crate::models::Reading;
use chrono::{DateTime, Utc};

/// The node's two measurements, whatever hardware sits behind them.
pub trait Probe {
    fn read_temperature_c(&mut self) -> anyhow::Result<f32>;

    fn read_battery_v(&mut self) -> anyhow::Result<f32>;
}

/// Battery voltage from the ADC pin voltage and the external divider ratio.
pub fn battery_volts(adc_mv: u16, divider: f32) -> f32 {
    f32::from(adc_mv) / 1000.0 * divider
}

/// Reads both values. Any failure is logged and yields no reading for this wake.
pub fn take_reading<P: Probe + ?Sized>(
    probe: &mut P,
    taken_at: Option<DateTime<Utc>>,
) -> Option<Reading> {
    let temperature_c = match probe.read_temperature_c() {
        Ok(t) if t.is_finite() => t,
        Ok(_) => {
            log_empty_sample();
            return None;
        }
        Err(e) => {
            log_sensor_error("DS18B20", e);
            return None;
        }
    };

    let battery_v = match probe.read_battery_v() {
        Ok(v) => v,
        Err(e) => {
            log_sensor_error("Battery ADC", e);
            return None;
        }
    };

    Some(Reading {
        temperature_c,
        battery_v,
        taken_at,
    })
}

/// Fixed values for dry runs off the device.
#[derive(Clone, Debug)]
pub struct SimulatedProbe {
    pub temperature_c: Option<f32>,
    pub battery_v: Option<f32>,
}

impl SimulatedProbe {
    pub fn new(temperature_c: f32, battery_v: f32) -> Self {
        Self {
            temperature_c: Some(temperature_c),
            battery_v: Some(battery_v),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            temperature_c: None,
            battery_v: Some(3.9),
        }
    }
}

impl Probe for SimulatedProbe {
    fn read_temperature_c(&mut self) -> anyhow::Result<f32> {
        self.temperature_c
            .ok_or_else(|| anyhow::anyhow!("simulated sensor is disconnected"))
    }

    fn read_battery_v(&mut self) -> anyhow::Result<f32> {
        self.battery_v
            .ok_or_else(|| anyhow::anyhow!("simulated ADC is disconnected"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn battery_conversion_applies_divider() {
        assert!((battery_volts(1000, 4.2) - 4.2).abs() < 1e-6);
        assert!((battery_volts(900, 2.0) - 1.8).abs() < 1e-6);
        assert_eq!(battery_volts(0, 4.2), 0.0);
    }

    #[test]
    fn reading_carries_both_values() {
        let mut probe = SimulatedProbe::new(24.5, 4.05);
        let reading = take_reading(&mut probe, None).unwrap();
        assert_eq!(reading.temperature_c, 24.5);
        assert_eq!(reading.battery_v, 4.05);
        assert!(reading.taken_at.is_none());
    }

    #[test]
    fn any_failed_measurement_drops_the_reading() {
        assert!(take_reading(&mut SimulatedProbe::disconnected(), None).is_none());

        let mut no_adc = SimulatedProbe::new(20.0, 0.0);
        no_adc.battery_v = None;
        assert!(take_reading(&mut no_adc, None).is_none());

        assert!(take_reading(&mut SimulatedProbe::new(f32::NAN, 4.0), None).is_none());
    }
}
