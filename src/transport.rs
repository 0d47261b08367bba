//! Seams between the sinks and the network stack.

use log::info;

/// A plain HTTP GET, returning the status code.
pub trait HttpGet {
    fn get(&mut self, url: &str) -> anyhow::Result<u16>;
}

/// Fire-and-forget MQTT publish.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> anyhow::Result<()>;
}

/// Logs instead of sending. Used when the firmware runs off the device.
#[derive(Debug, Default)]
pub struct DryRun;

impl HttpGet for DryRun {
    fn get(&mut self, url: &str) -> anyhow::Result<u16> {
        info!("🧪 GET {}", url);
        Ok(200)
    }
}

impl Publisher for DryRun {
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> anyhow::Result<()> {
        info!(
            "🧪 PUBLISH {}{} {}",
            topic,
            if retain { " (retained)" } else { "" },
            String::from_utf8_lossy(payload)
        );
        Ok(())
    }
}
