use crate::config::SENSOR_EMPTY_SAMPLE_MSG;
use crate::models::Report;
use crate::time_utils::get_formatted_timestamp;
use log::{error, info, warn};

const SPLASH_SCREEN: &str = r#"
  ____        _              ____
 / ___|  ___ | | __ _ _ __  / ___|_ __ ___   ___
 \___ \ / _ \| |/ _` | '__|| |   | '__/ _ \ / __|
  ___) | (_) | | (_| | |   | |___| | | (_) | (__
 |____/ \___/|_|\__,_|_|    \____|_|  \___/ \___|   "#;

pub(crate) enum LogLevel {
    Info,
    Warn,
    Error,
}

pub fn print_splash_screen() {
    info!("{}", SPLASH_SCREEN);
}

pub fn log_report(report: &Report) {
    let ts = get_formatted_timestamp();

    let msg = format!(
        "[ 🌡️ Pool {} | 🔋 Battery {:.2}V ]",
        report.temperature_label(),
        report.battery_v
    );
    log_message(LogLevel::Info, &msg, &ts);
}

pub fn log_sensor_error(sensor_name: &str, error: impl std::fmt::Debug) {
    let ts = get_formatted_timestamp();

    log_message(
        LogLevel::Error,
        &format!("🚫 {} Error: {:?}", sensor_name, error),
        &ts,
    );
}

pub fn log_empty_sample() {
    let ts = get_formatted_timestamp();

    log_message(LogLevel::Warn, SENSOR_EMPTY_SAMPLE_MSG, &ts);
}

pub fn log_delivery(sink: &str, result: &anyhow::Result<()>) {
    let ts = get_formatted_timestamp();

    match result {
        Ok(()) => log_message(LogLevel::Info, &format!("📡 {} delivered", sink), &ts),
        Err(e) => log_message(
            LogLevel::Warn,
            &format!("📡 {} failed, next wake retries: {:#}", sink, e),
            &ts,
        ),
    }
}

pub fn log_sleep(minutes: u32) {
    let ts = get_formatted_timestamp();

    log_message(
        LogLevel::Info,
        &format!("💤 Going to deep sleep for {} min", minutes),
        &ts,
    );
}

fn log_message(level: LogLevel, message: &str, custom_ts: &str) {
    let uptime = crate::time_utils::get_uptime_string();
    let prefix = format!("{} [{}]", uptime, custom_ts);

    match level {
        LogLevel::Error => error!("\x1b[31m{} {}\x1b[0m", prefix, message),
        LogLevel::Warn => warn!("\x1b[38;5;11m{} {}\x1b[0m", prefix, message),
        LogLevel::Info => info!("\x1b[38;5;40m{} {}\x1b[0m", prefix, message),
    }
}
