//! One wake: read, report, then tell the caller how long to sleep.

use crate::config::Config;
use crate::logging::{log_delivery, log_report, log_sleep};
use crate::models::{Reading, Report};
use crate::sensors::{Probe, take_reading};
use crate::time_utils::format_last_update;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Somewhere a report can be delivered to.
pub trait Sink {
    fn name(&self) -> &'static str;

    fn send_report(&mut self, report: &Report) -> anyhow::Result<()>;

    /// Free-form status text. `None` means the sink has no debug channel.
    fn send_debug(&mut self, _message: &str) -> Option<anyhow::Result<()>> {
        None
    }
}

#[derive(Debug)]
pub struct Delivery {
    pub sink: &'static str,
    pub result: anyhow::Result<()>,
}

#[derive(Debug)]
pub struct CycleOutcome {
    pub reading: Option<Reading>,
    pub deliveries: Vec<Delivery>,
    pub sleep_for: Duration,
}

impl CycleOutcome {
    pub fn all_delivered(&self) -> bool {
        self.deliveries.iter().all(|d| d.result.is_ok())
    }
}

pub fn render_report(config: &Config, reading: &Reading) -> Report {
    let timezone = match reading.taken_at {
        Some(utc) => config.timezone.local_time(utc).abbrev,
        None => "UTC".to_string(),
    };

    Report {
        temperature: config.units.from_celsius(reading.temperature_c),
        units: config.units,
        battery_v: reading.battery_v,
        time_synced: reading.taken_at.is_some(),
        timestamp_unix_s: reading.taken_at.map(|t| t.timestamp()),
        last_update: reading
            .taken_at
            .map(|t| format_last_update(&config.timezone, t)),
        timezone,
    }
}

/// Runs one measurement-report pass. Delivery failures are logged and left
/// for the next wake; nothing is retried here.
pub fn run_cycle<P: Probe + ?Sized>(
    config: &Config,
    probe: &mut P,
    sinks: &mut [Box<dyn Sink>],
    now: Option<DateTime<Utc>>,
) -> CycleOutcome {
    let reading = take_reading(probe, now);
    let mut deliveries = Vec::with_capacity(sinks.len());

    match &reading {
        Some(reading) => {
            let report = render_report(config, reading);
            log_report(&report);

            for sink in sinks.iter_mut() {
                let result = sink.send_report(&report);
                log_delivery(sink.name(), &result);
                deliveries.push(Delivery {
                    sink: sink.name(),
                    result,
                });
            }
        }
        None => {
            let message = format!(
                "SolarCroc: sensor read failed, sleeping {} min",
                config.sleep_minutes
            );
            for sink in sinks.iter_mut() {
                let Some(result) = sink.send_debug(&message) else {
                    continue;
                };
                log_delivery(sink.name(), &result);
                deliveries.push(Delivery {
                    sink: sink.name(),
                    result,
                });
            }
        }
    }

    log_sleep(config.sleep_minutes.get());

    CycleOutcome {
        reading,
        deliveries,
        sleep_for: config.sleep_duration(),
    }
}
