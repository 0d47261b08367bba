use dotenvy::dotenv_iter;
use embuild::espidf;

/// Keys understood by `solarcroc::config`. Anything else in `.env` is ignored.
const CONFIG_KEYS: &[&str] = &[
    "WIFI_SSID",
    "WIFI_PASS",
    "BLYNK_AUTH_TOKEN",
    "BLYNK_SERVER",
    "MQTT_ENABLED",
    "MQTT_SERVER",
    "MQTT_PORT",
    "IS_METRIC",
    "SLEEP_TIME_MIN",
    "TIMEZONE",
    "NTP_SERVER",
    "BATTERY_DIVIDER",
];

fn main() {
    bake_dotenv_settings();

    if std::env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        espidf::sysenv::output();
    }
}

/// Bakes the node settings from `.env` into the firmware image.
///
/// The node has no file system to read settings from after a wake, so the
/// key/value pairs are emitted as `cargo:rustc-env` and picked up by
/// `option_env!` in `src/config.rs`. Values already exported in the build
/// environment win over the file.
///
/// # Security Note
/// The WiFi password and the dashboard token end up in flash in clear text.
fn bake_dotenv_settings() {
    println!("cargo:rerun-if-changed=.env");
    for key in CONFIG_KEYS {
        println!("cargo:rerun-if-env-changed={key}");
    }

    let Ok(iter) = dotenv_iter() else {
        return;
    };

    for item in iter {
        let (key, value) = item.expect("Failed to read .env element");
        if CONFIG_KEYS.contains(&key.as_str()) && std::env::var_os(&key).is_none() {
            println!("cargo:rustc-env={}={}", key, value);
        }
    }
}
