use crate::models::UnitSystem;
use crate::tz_rules::LocalZone;
use anyhow::{Context, bail};
use std::fmt;
use std::num::NonZeroU32;
use std::time::Duration;

pub const TIMESTAMP_PATTERN: &str = "%Y-%m-%d %H:%M:%S";
pub const SENSOR_EMPTY_SAMPLE_MSG: &str = "\x1b[38;5;11m 〇 DS18B20 returned no usable sample";

pub const DEFAULT_BLYNK_SERVER: &str = "blynk.cloud";
pub const DEFAULT_MQTT_SERVER: &str = "192.168.188.87";
pub const DEFAULT_MQTT_PORT: u16 = 1883;
pub const DEFAULT_SLEEP_MIN: u32 = 15;
pub const DEFAULT_TIMEZONE: &str = "central-europe";
pub const DEFAULT_NTP_SERVER: &str = "ch.pool.ntp.org";
pub const DEFAULT_BATTERY_DIVIDER: f32 = 4.2;

/// A string that never shows up in logs.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(***)")
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WifiConfig {
    pub ssid: String,
    pub password: Secret,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DashboardConfig {
    pub server: String,
    pub auth_token: Secret,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MqttConfig {
    pub server: String,
    pub port: u16,
}

impl MqttConfig {
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.server, self.port)
    }
}

/// Node settings. Built once after wake and only ever borrowed afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub wifi: WifiConfig,
    /// `None` when no auth token is configured.
    pub dashboard: Option<DashboardConfig>,
    /// `None` when MQTT is switched off or no broker is given.
    pub mqtt: Option<MqttConfig>,
    pub units: UnitSystem,
    pub sleep_minutes: NonZeroU32,
    pub timezone: LocalZone,
    pub ntp_server: String,
    pub battery_divider: f32,
}

impl Config {
    /// Parses the settings baked in by `build.rs`.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_lookup(baked)
    }

    /// Parses settings from any key/value source. Missing keys fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        // credentials may legitimately start or end with spaces
        let get_raw = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let wifi = WifiConfig {
            ssid: get_raw("WIFI_SSID").unwrap_or_default(),
            password: Secret::new(get_raw("WIFI_PASS").unwrap_or_default()),
        };

        let dashboard = get_raw("BLYNK_AUTH_TOKEN").map(|token| DashboardConfig {
            server: get("BLYNK_SERVER").unwrap_or_else(|| DEFAULT_BLYNK_SERVER.to_string()),
            auth_token: Secret::new(token),
        });

        let mqtt_enabled = parse_bool("MQTT_ENABLED", get("MQTT_ENABLED"), true)?;
        let mqtt_server = match lookup("MQTT_SERVER") {
            // an explicitly blank server disables MQTT
            Some(raw) => Some(raw.trim().to_string()).filter(|s| !s.is_empty()),
            None => Some(DEFAULT_MQTT_SERVER.to_string()),
        };
        let mqtt = match (mqtt_enabled, mqtt_server) {
            (true, Some(server)) => Some(MqttConfig {
                server,
                port: match get("MQTT_PORT") {
                    Some(raw) => raw
                        .parse()
                        .with_context(|| format!("MQTT_PORT is not a port number: {raw:?}"))?,
                    None => DEFAULT_MQTT_PORT,
                },
            }),
            _ => None,
        };

        let units = if parse_bool("IS_METRIC", get("IS_METRIC"), true)? {
            UnitSystem::Metric
        } else {
            UnitSystem::Imperial
        };

        let sleep_minutes = match get("SLEEP_TIME_MIN") {
            Some(raw) => raw
                .parse::<NonZeroU32>()
                .with_context(|| format!("SLEEP_TIME_MIN must be a positive number, got {raw:?}"))?,
            None => NonZeroU32::new(DEFAULT_SLEEP_MIN).context("default sleep interval is zero")?,
        };

        let timezone_name = get("TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone = LocalZone::from_name(&timezone_name)?;

        let battery_divider = match get("BATTERY_DIVIDER") {
            Some(raw) => raw
                .parse::<f32>()
                .with_context(|| format!("BATTERY_DIVIDER is not a number: {raw:?}"))?,
            None => DEFAULT_BATTERY_DIVIDER,
        };
        if !(battery_divider.is_finite() && battery_divider > 0.0) {
            bail!("BATTERY_DIVIDER must be positive, got {battery_divider}");
        }

        Ok(Self {
            wifi,
            dashboard,
            mqtt,
            units,
            sleep_minutes,
            timezone,
            ntp_server: get("NTP_SERVER").unwrap_or_else(|| DEFAULT_NTP_SERVER.to_string()),
            battery_divider,
        })
    }

    pub fn sleep_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.sleep_minutes.get()) * 60)
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> anyhow::Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => bail!("{key} must be true or false, got {raw:?}"),
    }
}

fn baked(key: &str) -> Option<String> {
    let value = match key {
        "WIFI_SSID" => option_env!("WIFI_SSID"),
        "WIFI_PASS" => option_env!("WIFI_PASS"),
        "BLYNK_AUTH_TOKEN" => option_env!("BLYNK_AUTH_TOKEN"),
        "BLYNK_SERVER" => option_env!("BLYNK_SERVER"),
        "MQTT_ENABLED" => option_env!("MQTT_ENABLED"),
        "MQTT_SERVER" => option_env!("MQTT_SERVER"),
        "MQTT_PORT" => option_env!("MQTT_PORT"),
        "IS_METRIC" => option_env!("IS_METRIC"),
        "SLEEP_TIME_MIN" => option_env!("SLEEP_TIME_MIN"),
        "TIMEZONE" => option_env!("TIMEZONE"),
        "NTP_SERVER" => option_env!("NTP_SERVER"),
        "BATTERY_DIVIDER" => option_env!("BATTERY_DIVIDER"),
        _ => None,
    };
    value.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_reference_node() {
        let config = Config::from_lookup(|_| None).unwrap();

        assert_eq!(config.sleep_minutes.get(), 15);
        assert_eq!(config.sleep_duration(), Duration::from_secs(900));
        assert_eq!(config.units, UnitSystem::Metric);
        assert_eq!(config.ntp_server, "ch.pool.ntp.org");
        assert!(config.dashboard.is_none());
        let mqtt = config.mqtt.unwrap();
        assert_eq!(mqtt.broker_url(), "mqtt://192.168.188.87:1883");
    }

    #[test]
    fn loading_twice_gives_identical_values() {
        let source = lookup(&[
            ("WIFI_SSID", "pool-net"),
            ("BLYNK_AUTH_TOKEN", "abc123"),
            ("IS_METRIC", "false"),
            ("SLEEP_TIME_MIN", "30"),
            ("TIMEZONE", "America/New_York"),
        ]);

        let first = Config::from_lookup(&source).unwrap();
        let second = Config::from_lookup(&source).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn sleep_interval_must_be_positive() {
        for bad in ["0", "-5", "1.5", "soon"] {
            let err = Config::from_lookup(lookup(&[("SLEEP_TIME_MIN", bad)])).unwrap_err();
            assert!(err.to_string().contains("SLEEP_TIME_MIN"), "{bad}: {err}");
        }
        let config = Config::from_lookup(lookup(&[("SLEEP_TIME_MIN", " 1 ")])).unwrap();
        assert_eq!(config.sleep_minutes.get(), 1);
    }

    #[test]
    fn unit_flag_selects_one_scale() {
        let metric = Config::from_lookup(lookup(&[("IS_METRIC", "true")])).unwrap();
        let imperial = Config::from_lookup(lookup(&[("IS_METRIC", "FALSE")])).unwrap();
        assert_eq!(metric.units, UnitSystem::Metric);
        assert_eq!(imperial.units, UnitSystem::Imperial);

        assert!(Config::from_lookup(lookup(&[("IS_METRIC", "celsius")])).is_err());
    }

    #[test]
    fn mqtt_can_be_switched_off_two_ways() {
        let flag = Config::from_lookup(lookup(&[("MQTT_ENABLED", "false")])).unwrap();
        assert!(flag.mqtt.is_none());

        let blank = Config::from_lookup(lookup(&[("MQTT_SERVER", "  ")])).unwrap();
        assert!(blank.mqtt.is_none());

        let custom = Config::from_lookup(lookup(&[
            ("MQTT_SERVER", "broker.local"),
            ("MQTT_PORT", "8883"),
        ]))
        .unwrap();
        let broker = custom.mqtt.unwrap();
        assert_eq!(broker.broker_url(), "mqtt://broker.local:8883");
    }

    #[test]
    fn mqtt_port_must_be_a_port_number() {
        for bad in ["abc", "70000", "-1", "18 83"] {
            let err = Config::from_lookup(lookup(&[("MQTT_PORT", bad)])).unwrap_err();
            assert!(err.to_string().contains("MQTT_PORT"), "{bad}: {err}");
        }
        let config = Config::from_lookup(lookup(&[("MQTT_PORT", " 1884 ")])).unwrap();
        assert_eq!(config.mqtt.unwrap().port, 1884);
    }

    #[test]
    fn credentials_keep_surrounding_spaces() {
        let config = Config::from_lookup(lookup(&[
            ("WIFI_SSID", "Pool Net "),
            ("WIFI_PASS", " pool pass "),
            ("BLYNK_AUTH_TOKEN", " tok "),
        ]))
        .unwrap();

        assert_eq!(config.wifi.ssid, "Pool Net ");
        assert_eq!(config.wifi.password.expose(), " pool pass ");
        assert_eq!(config.dashboard.unwrap().auth_token.expose(), " tok ");

        let empty = lookup(&[("WIFI_SSID", ""), ("BLYNK_AUTH_TOKEN", "")]);
        let empty = Config::from_lookup(empty).unwrap();
        assert!(empty.wifi.ssid.is_empty());
        assert!(empty.dashboard.is_none());
    }

    #[test]
    fn dashboard_needs_a_token() {
        let config = Config::from_lookup(lookup(&[("BLYNK_SERVER", "blynk.example")])).unwrap();
        assert!(config.dashboard.is_none());

        let config = Config::from_lookup(lookup(&[
            ("BLYNK_AUTH_TOKEN", "tok"),
            ("BLYNK_SERVER", "blynk.example"),
        ]))
        .unwrap();
        let dashboard = config.dashboard.unwrap();
        assert_eq!(dashboard.server, "blynk.example");
        assert_eq!(dashboard.auth_token.expose(), "tok");
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let config = Config::from_lookup(lookup(&[
            ("WIFI_PASS", "hunter2"),
            ("BLYNK_AUTH_TOKEN", "tok-very-secret"),
        ]))
        .unwrap();

        let printed = format!("{config:?}");
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("tok-very-secret"));
        assert!(printed.contains("Secret(***)"));
    }

    #[test]
    fn rejects_unknown_timezone_and_bad_divider() {
        assert!(Config::from_lookup(lookup(&[("TIMEZONE", "Mars/Olympus")])).is_err());
        assert!(Config::from_lookup(lookup(&[("BATTERY_DIVIDER", "0")])).is_err());
        assert!(Config::from_lookup(lookup(&[("BATTERY_DIVIDER", "two")])).is_err());
    }
}
