//! Firmware for a solar powered pool thermometer.
//!
//! Every wake the node reads a DS18B20 and its battery voltage, pushes both
//! to a Blynk dashboard and an MQTT broker, and goes back to deep sleep.
//! Hardware lives in [`esp`]; everything else runs on the host too.

pub mod config;
pub mod cycle;
pub mod dashboard;
pub mod ds18b20;
pub mod logging;
pub mod models;
pub mod mqtt;
pub mod sensors;
pub mod time_utils;
pub mod transport;
pub mod tz_rules;

#[cfg(target_os = "espidf")]
pub mod esp;
