use solarcroc::config::Config;
use solarcroc::cycle::{Sink, run_cycle};
use solarcroc::dashboard::DashboardSink;
use solarcroc::logging::print_splash_screen;
use solarcroc::mqtt::MqttSink;
use solarcroc::time_utils::{set_log_timezone, synced_now};

#[cfg(target_os = "espidf")]
#[embassy_executor::main]
async fn main(_spawner: embassy_executor::Spawner) {
    esp_idf_svc::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    print_splash_screen();

    let sleep_for = match firmware::run().await {
        Ok(sleep_for) => sleep_for,
        Err(e) => {
            log::error!("‼️ Cycle aborted: {:?}", e);
            firmware::fallback_sleep()
        }
    };

    solarcroc::esp::deep_sleep(sleep_for);
}

#[cfg(target_os = "espidf")]
mod firmware {
    use super::*;
    use anyhow::Context;
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::onewire::OWDriver;
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use log::warn;
    use solarcroc::config::DEFAULT_SLEEP_MIN;
    use solarcroc::esp::clients::{EspHttp, EspMqtt};
    use solarcroc::esp::network::setup_wifi;
    use solarcroc::esp::probe::EspProbe;
    use solarcroc::esp::sntp::setup_ntp;
    use std::time::Duration;

    const MQTT_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

    pub(super) fn fallback_sleep() -> Duration {
        Duration::from_secs(u64::from(DEFAULT_SLEEP_MIN) * 60)
    }

    pub(super) async fn run() -> anyhow::Result<Duration> {
        let config = Config::load().context("‼️ Invalid baked configuration")?;
        set_log_timezone(config.timezone);

        let peripherals = Peripherals::take().context("Failed to take Peripherals")?;
        let sys_loop = EspSystemEventLoop::take()?;
        let nvs = EspDefaultNvsPartition::take()?;

        let onewire = OWDriver::new(peripherals.pins.gpio4, peripherals.rmt.channel0)
            .context("‼️Failed to init one-wire bus")?;
        let mut probe = EspProbe::new(
            onewire,
            peripherals.pins.gpio3.into(),
            peripherals.adc1,
            peripherals.pins.gpio2,
            config.battery_divider,
        )?;

        let wifi = match setup_wifi(peripherals.modem, sys_loop, nvs, &config.wifi).await {
            Ok(wifi) => Some(wifi),
            Err(e) => {
                warn!("{:?} - measuring without reporting", e);
                None
            }
        };

        let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
        let mut mqtt_flush = None;
        let _sntp = if wifi.is_some() {
            let sntp = match setup_ntp(&config.ntp_server).await {
                Ok(sntp) => Some(sntp),
                Err(e) => {
                    warn!("{:?}", e);
                    None
                }
            };

            if let Some(dashboard) = config.dashboard.clone() {
                match EspHttp::new() {
                    Ok(http) => sinks.push(Box::new(DashboardSink::new(dashboard, http))),
                    Err(e) => warn!("{:?}", e),
                }
            }
            if let Some(mqtt) = &config.mqtt {
                match EspMqtt::connect(mqtt) {
                    Ok(client) => {
                        mqtt_flush = Some(client.flush_handle());
                        sinks.push(Box::new(MqttSink::new(client)));
                    }
                    Err(e) => warn!("{:?}", e),
                }
            }
            sntp
        } else {
            None
        };

        let outcome = run_cycle(&config, &mut probe, &mut sinks, synced_now());

        if let Some(flush) = mqtt_flush {
            flush.wait(MQTT_FLUSH_TIMEOUT).await;
        }
        drop(sinks);
        drop(probe);
        drop(wifi);

        Ok(outcome.sleep_for)
    }
}

/// Off the device: one cycle against simulated hardware, printing what would be sent.
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use solarcroc::sensors::SimulatedProbe;
    use solarcroc::time_utils::mark_time_synced;
    use solarcroc::transport::DryRun;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    print_splash_screen();

    let config = Config::load()?;
    set_log_timezone(config.timezone);
    // the host clock is assumed to be right
    mark_time_synced();

    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
    if let Some(dashboard) = config.dashboard.clone() {
        sinks.push(Box::new(DashboardSink::new(dashboard, DryRun)));
    }
    if config.mqtt.is_some() {
        sinks.push(Box::new(MqttSink::new(DryRun)));
    }

    let outcome = run_cycle(
        &config,
        &mut SimulatedProbe::new(24.5, 4.05),
        &mut sinks,
        synced_now(),
    );
    log::info!(
        "🧪 Dry run done, the node would now sleep for {} s",
        outcome.sleep_for.as_secs()
    );
    Ok(())
}
