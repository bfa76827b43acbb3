use std::path::Path;
use std::time::Duration;
use std::env;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use irrigation_controller::clock::SystemClock;
use irrigation_controller::cloud::ChannelClient;
use irrigation_controller::config::{self, Config};
use irrigation_controller::connectivity::{ConnectivityGate, HostLink, HttpProber};
use irrigation_controller::controller::{Controller, Settings};
use irrigation_controller::reboot;
use irrigation_controller::relay::Relay;
use irrigation_controller::retained::{FileMemory, RetainedStore};

type HostController =
    Controller<HostLink, HttpProber, ChannelClient, Relay, FileMemory, SystemClock>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ──────────────────────────────────────────────────────
    let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "controller.toml".to_string());
    let mut cfg = config::load_or_default(Path::new(&config_path));
    if let Err(e) = cfg.apply_env(|key| env::var(key).ok()) {
        error!("{e:#}");
    }

    // ── One boot cycle ──────────────────────────────────────────────
    match build(&cfg) {
        Ok(mut controller) => {
            let cycle = async move { controller.run().await };
            if let Some(report) = reboot::supervise(cycle, cfg.sleep_interval()).await {
                info!(
                    verdict = ?report.verdict,
                    source = ?report.source,
                    decision = ?report.decision,
                    last_water_time = ?report.schedule.last_water_time,
                    posts = report.posts,
                    "boot cycle complete"
                );
            }
        }
        Err(e) => {
            // Without hardware there is nothing to do but avoid a tight
            // reboot loop.
            error!("failed to set up controller: {e:#}");
            tokio::time::sleep(cfg.sleep_interval()).await;
        }
    }

    reboot::reboot(&cfg.device.reboot_command)
}

fn build(cfg: &Config) -> Result<HostController> {
    let http = reqwest::Client::builder()
        .timeout(cfg.request_timeout())
        .build()
        .context("failed to build HTTP client")?;

    let gate = ConnectivityGate::new(
        HostLink::new(cfg.interface()),
        HttpProber::new(http.clone(), cfg.cloud.probe_url.clone()),
        Duration::from_secs(cfg.cycle.connect_backoff_sec),
    );
    let feed = ChannelClient::new(
        http,
        &cfg.cloud.base_url,
        cfg.cloud.channel_id,
        cfg.cloud.api_key.clone(),
    );

    let gpio_pin = u8::try_from(cfg.device.relay_gpio_pin)
        .with_context(|| format!("relay_gpio_pin {} out of range", cfg.device.relay_gpio_pin))?;
    let relay = Relay::new(gpio_pin, cfg.device.active_low)?;

    let store = RetainedStore::new(FileMemory::new(&cfg.device.retained_path));
    let clock = SystemClock::new(
        cfg.time.ntp_servers.clone(),
        Duration::from_secs(cfg.time.ntp_timeout_sec),
    );

    Ok(Controller::new(
        Settings::from_config(cfg),
        gate,
        feed,
        relay,
        store,
        clock,
    ))
}
