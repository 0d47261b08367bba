//! Blynk dashboard over its HTTP batch update endpoint.

use crate::config::DashboardConfig;
use crate::cycle::Sink;
use crate::models::Report;
use crate::transport::HttpGet;
use anyhow::{Context, bail};
use std::fmt;
use std::fmt::Write as _;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VirtualPin(pub u8);

impl fmt::Display for VirtualPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}", self.0)
    }
}

pub const PIN_POOL_TEMPERATURE: VirtualPin = VirtualPin(11);
pub const PIN_BATTERY_VOLTAGE: VirtualPin = VirtualPin(12);
pub const PIN_LAST_UPDATE: VirtualPin = VirtualPin(13);

const NO_TIME_SYNC: &str = "no time sync";

/// Values for the three dashboard slots.
pub fn pin_values(report: &Report) -> [(VirtualPin, String); 3] {
    [
        (PIN_POOL_TEMPERATURE, format!("{:.1}", report.temperature)),
        (PIN_BATTERY_VOLTAGE, format!("{:.2}", report.battery_v)),
        (
            PIN_LAST_UPDATE,
            report
                .last_update
                .clone()
                .unwrap_or_else(|| NO_TIME_SYNC.to_string()),
        ),
    ]
}

pub fn batch_update_url(server: &str, token: &str, values: &[(VirtualPin, String)]) -> String {
    let base = if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", server.trim_end_matches('/'))
    };

    let mut url = format!(
        "{}/external/api/batch/update?token={}",
        base,
        encode_query_value(token)
    );
    for (pin, value) in values {
        let _ = write!(url, "&{}={}", pin, encode_query_value(value));
    }
    url
}

fn encode_query_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(char::from(byte))
            }
            _ => {
                let _ = write!(out, "%{:02X}", byte);
            }
        }
    }
    out
}

pub struct DashboardSink<H> {
    config: DashboardConfig,
    http: H,
}

impl<H: HttpGet> DashboardSink<H> {
    pub fn new(config: DashboardConfig, http: H) -> Self {
        Self { config, http }
    }
}

impl<H: HttpGet> Sink for DashboardSink<H> {
    fn name(&self) -> &'static str {
        "Blynk"
    }

    fn send_report(&mut self, report: &Report) -> anyhow::Result<()> {
        let url = batch_update_url(
            &self.config.server,
            self.config.auth_token.expose(),
            &pin_values(report),
        );

        let status = self
            .http
            .get(&url)
            .with_context(|| format!("dashboard request to {} failed", self.config.server))?;
        if !(200..300).contains(&status) {
            bail!("dashboard answered with status {}", status);
        }
        Ok(())
    }
}
