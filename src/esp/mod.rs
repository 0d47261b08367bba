//! ESP-IDF adapters: radio, clock, sensor bus, network clients and sleep.

pub mod clients;
pub mod network;
pub mod probe;
pub mod sntp;

use log::info;
use std::time::Duration;

/// Powers down everything but the RTC timer. Execution restarts from reset.
pub fn deep_sleep(duration: Duration) -> ! {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    info!("💤 esp_deep_sleep({} us)", micros);
    unsafe { esp_idf_svc::sys::esp_deep_sleep(micros) }
}
