use crate::config::MqttConfig;
use crate::mqtt::CLIENT_ID;
use crate::transport::{HttpGet, Publisher};
use anyhow::Context;
use embassy_time::Timer;
use embedded_svc::http::Status;
use embedded_svc::http::client::Client;
use esp_idf_svc::http::client::{Configuration as HttpConfig, EspHttpConnection};
use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
};
use log::{info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

pub struct EspHttp {
    client: Client<EspHttpConnection>,
}

impl EspHttp {
    pub fn new() -> anyhow::Result<Self> {
        let connection = EspHttpConnection::new(&HttpConfig {
            timeout: Some(Duration::from_secs(10)),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })
        .context("‼️Failed to init HTTP client")?;

        Ok(Self {
            client: Client::wrap(connection),
        })
    }
}

impl HttpGet for EspHttp {
    fn get(&mut self, url: &str) -> anyhow::Result<u16> {
        let response = self.client.get(url)?.submit()?;
        Ok(response.status())
    }
}

#[derive(Default)]
struct MqttState {
    connected: AtomicBool,
    queued: AtomicU32,
    acknowledged: AtomicU32,
}

/// Waits for the broker to take everything that was queued.
#[derive(Clone)]
pub struct MqttFlush {
    state: Arc<MqttState>,
}

impl MqttFlush {
    pub async fn wait(&self, timeout: Duration) -> bool {
        let started = Instant::now();
        loop {
            let queued = self.state.queued.load(Ordering::Relaxed);
            let acknowledged = self.state.acknowledged.load(Ordering::Relaxed);
            if acknowledged >= queued {
                info!("📨 MQTT outbox drained ({} messages)", queued);
                return true;
            }
            if started.elapsed() >= timeout {
                let connected = self.state.connected.load(Ordering::Relaxed);
                warn!("📨 MQTT flush timed out ({acknowledged}/{queued}, connected: {connected})");
                return false;
            }
            Timer::after_millis(50).await;
        }
    }
}

pub struct EspMqtt {
    client: EspMqttClient<'static>,
    state: Arc<MqttState>,
}

impl EspMqtt {
    pub fn connect(config: &MqttConfig) -> anyhow::Result<Self> {
        let state = Arc::new(MqttState::default());
        let events = Arc::clone(&state);

        let conf = MqttClientConfiguration {
            client_id: Some(CLIENT_ID),
            keep_alive_interval: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let on_event = move |event: EspMqttEvent<'_>| match event.payload() {
            EventPayload::Connected(_) => events.connected.store(true, Ordering::Relaxed),
            EventPayload::Disconnected => events.connected.store(false, Ordering::Relaxed),
            EventPayload::Published(_) => {
                events.acknowledged.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        };

        let url = config.broker_url();
        let client = EspMqttClient::new_cb(&url, &conf, on_event)
            .with_context(|| format!("‼️Failed to start MQTT client for {url}"))?;

        info!("📨 MQTT client started for {}", url);
        Ok(Self { client, state })
    }

    pub fn flush_handle(&self) -> MqttFlush {
        MqttFlush {
            state: Arc::clone(&self.state),
        }
    }
}

impl Publisher for EspMqtt {
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> anyhow::Result<()> {
        // queued in the outbox, sent once the session is up
        self.client
            .enqueue(topic, QoS::AtLeastOnce, retain, payload)
            .with_context(|| format!("could not queue message for {}", topic))?;
        self.state.queued.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
