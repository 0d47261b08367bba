use crate::config::WifiConfig;
use anyhow::{Result, anyhow};
use embassy_time::{Duration, Timer};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::modem::Modem;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration as EspWifiConfig, EspWifi};
use log::{info, warn};

const MAX_CONNECT_ATTEMPTS: u32 = 3;
const MAX_WAIT_POLLS: u32 = 40;

/// Joins the configured network. Gives up quickly: a node on battery is
/// better off sleeping than burning its charge on a dead access point.
pub async fn setup_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs: EspDefaultNvsPartition,
    credentials: &WifiConfig,
) -> Result<EspWifi<'static>> {
    if credentials.ssid.is_empty() {
        anyhow::bail!("📶 No WIFI_SSID configured");
    }

    let mut wifi = EspWifi::new(modem, sys_loop, Some(nvs))?;
    wifi.set_configuration(&EspWifiConfig::Client(ClientConfiguration {
        ssid: credentials
            .ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("SSID is too long"))?,
        password: credentials
            .password
            .expose()
            .try_into()
            .map_err(|_| anyhow!("Password is too long"))?,
        auth_method: if credentials.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    info!("📶 WiFi starting, network {}", credentials.ssid);

    Timer::after(Duration::from_millis(500)).await;

    let mut attempts = 0;
    loop {
        attempts += 1;
        info!("📶 WiFi connecting (attempt {})...", attempts);
        match wifi.connect() {
            Ok(_) => {
                let mut wait_counter = 0;

                while !wifi.is_connected()? {
                    Timer::after(Duration::from_millis(250)).await;

                    wait_counter += 1;
                    if wait_counter > MAX_WAIT_POLLS {
                        break;
                    }
                }

                if wifi.is_connected()? {
                    break;
                }
            }
            Err(e) => warn!("📶 Connect call failed: {:?}", e),
        }

        if attempts >= MAX_CONNECT_ATTEMPTS {
            anyhow::bail!("📶 Failed to connect after {} attempts", attempts);
        }

        info!("📶 Connection refused or timed out, retrying in 2s...");
        Timer::after(Duration::from_millis(2000)).await;
    }

    // wait for DHCP
    let mut netif_polls = 0;
    while !wifi.sta_netif().is_up()? {
        netif_polls += 1;
        if netif_polls > MAX_WAIT_POLLS {
            anyhow::bail!("📶 Associated but no IP address");
        }
        Timer::after(Duration::from_millis(250)).await;
    }

    let ip_info = wifi.sta_netif().get_ip_info()?;
    info!("📶 WiFi Connected! IP: {}", ip_info.ip);

    Ok(wifi)
}
