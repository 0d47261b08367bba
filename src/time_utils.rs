use crate::config::TIMESTAMP_PATTERN;
use crate::tz_rules::LocalZone;
use chrono::{DateTime, Utc};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Format of the dashboard's "last update" slot.
pub const LAST_UPDATE_PATTERN: &str = "%H:%M %d.%m.%Y";

static TIME_SYNCED: AtomicBool = AtomicBool::new(false);
static LOG_ZONE: OnceLock<LocalZone> = OnceLock::new();

pub fn is_time_synced() -> bool {
    TIME_SYNCED.load(Ordering::Relaxed)
}

pub fn mark_time_synced() {
    TIME_SYNCED.store(true, Ordering::Relaxed);
}

/// Current UTC time, or `None` while the clock still runs from the epoch.
pub fn synced_now() -> Option<DateTime<Utc>> {
    is_time_synced().then(Utc::now)
}

/// Zone used for log prefixes. Only the first call has an effect.
pub fn set_log_timezone(zone: LocalZone) {
    let _ = LOG_ZONE.set(zone);
}

pub fn get_formatted_timestamp() -> String {
    if !is_time_synced() {
        return "time not synced".to_string();
    }
    let zone = LOG_ZONE.get().copied().unwrap_or(LocalZone::Iana(chrono_tz::UTC));
    zone.local_time(Utc::now())
        .wall_clock
        .format(TIMESTAMP_PATTERN)
        .to_string()
}

/// Local wall-clock text for the dashboard, e.g. `08:15 19.10.2026`.
pub fn format_last_update(zone: &LocalZone, utc: DateTime<Utc>) -> String {
    zone.local_time(utc)
        .wall_clock
        .format(LAST_UPDATE_PATTERN)
        .to_string()
}

pub fn get_uptime_string() -> String {
    let micros = uptime_micros();
    let seconds = micros / 1_000_000;
    let millis = (micros % 1_000_000) / 1_000;
    format!("[{:>4}.{:03}s]", seconds, millis)
}

#[cfg(target_os = "espidf")]
fn uptime_micros() -> i64 {
    unsafe { esp_idf_svc::sys::esp_timer_get_time() }
}

#[cfg(not(target_os = "espidf"))]
fn uptime_micros() -> i64 {
    use std::time::Instant;

    static STARTED: OnceLock<Instant> = OnceLock::new();
    let elapsed = STARTED.get_or_init(Instant::now).elapsed();
    i64::try_from(elapsed.as_micros()).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tz_rules::DstRules;
    use chrono::TimeZone;

    #[test]
    fn last_update_uses_local_time() {
        let zone = LocalZone::Rules(DstRules::central_europe());
        let summer = Utc.with_ymd_and_hms(2026, 7, 4, 6, 5, 0).unwrap();
        let winter = Utc.with_ymd_and_hms(2026, 12, 31, 23, 30, 0).unwrap();

        assert_eq!(format_last_update(&zone, summer), "08:05 04.07.2026");
        assert_eq!(format_last_update(&zone, winter), "00:30 01.01.2027");
    }

    #[test]
    fn uptime_has_fixed_layout() {
        let uptime = get_uptime_string();
        assert!(uptime.starts_with('['));
        assert!(uptime.ends_with("s]"));
        assert_eq!(uptime.split('.').nth(1).map(str::len), Some(5));
    }
}
