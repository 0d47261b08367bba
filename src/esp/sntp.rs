use crate::time_utils::mark_time_synced;
use anyhow::Context;
use embassy_time::Timer;
use esp_idf_svc::sntp::{EspSntp, SntpConf, SyncStatus};
use log::{info, warn};

const MAX_WAIT_CYCLES: u32 = 100;

/// Starts SNTP against `server` and waits up to ten seconds for the first sync.
///
/// The returned client must stay alive until the cycle is done.
pub async fn setup_ntp(server: &str) -> anyhow::Result<EspSntp<'static>> {
    let mut conf = SntpConf::default();
    conf.servers[0] = server;

    let ntp_client = EspSntp::new(&conf).context("‼️ Failed to init NTP")?;
    info!("\x1b[38;5;27m ⏳ Time sync with {} in progress...", server);

    let mut wait_cycles = 0;
    while ntp_client.get_sync_status() != SyncStatus::Completed {
        if wait_cycles >= MAX_WAIT_CYCLES {
            warn!(
                "\x1b[38;5;11m ⏳ NTP sync timed out. Reporting without a timestamp this time."
            );
            return Ok(ntp_client);
        }

        Timer::after_millis(100).await;

        wait_cycles += 1;
    }

    mark_time_synced();

    info!("\x1b[38;5;27m ⏳ Time is synchronized");
    Ok(ntp_client)
}
