use crate::cycle::Sink;
use crate::models::Report;
use crate::transport::Publisher;
use anyhow::Context;

pub const TOPIC_DEBUG: &str = "home/debug";
pub const TOPIC_TEMPERATURE: &str = "home/pool/solarcroc/tempc";
pub const TOPIC_BATTERY: &str = "home/pool/solarcroc/battv";

pub const CLIENT_ID: &str = "solarcroc";

/// Human readable status line for the debug topic.
pub fn debug_line(report: &Report) -> String {
    format!(
        "SolarCroc: pool {}, battery {:.2}V, {}",
        report.temperature_label(),
        report.battery_v,
        match &report.last_update {
            Some(ts) => format!("at {} {}", ts, report.timezone),
            None => "clock not synced".to_string(),
        }
    )
}

pub struct MqttSink<P> {
    publisher: P,
}

impl<P: Publisher> MqttSink<P> {
    pub fn new(publisher: P) -> Self {
        Self { publisher }
    }
}

impl<P: Publisher> Sink for MqttSink<P> {
    fn name(&self) -> &'static str {
        "MQTT"
    }

    fn send_report(&mut self, report: &Report) -> anyhow::Result<()> {
        let summary = serde_json::to_string(report).context("report is not serializable")?;
        let messages = [
            (TOPIC_TEMPERATURE, format!("{:.2}", report.temperature), true),
            (TOPIC_BATTERY, format!("{:.2}", report.battery_v), true),
            (TOPIC_DEBUG, debug_line(report), false),
            (TOPIC_DEBUG, summary, false),
        ];

        // try every topic; report the first failure
        let mut first_error = None;
        for (topic, payload, retain) in messages {
            if let Err(e) = self.publisher.publish(topic, payload.as_bytes(), retain)
                && first_error.is_none()
            {
                first_error = Some(e.context(format!("publish to {} failed", topic)));
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn send_debug(&mut self, message: &str) -> Option<anyhow::Result<()>> {
        let result = self
            .publisher
            .publish(TOPIC_DEBUG, message.as_bytes(), false)
            .with_context(|| format!("publish to {} failed", TOPIC_DEBUG));
        Some(result)
    }
}
