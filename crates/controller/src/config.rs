//! TOML config file loading and validation.
//!
//! Every option has a compiled-in default, so an absent file is a valid
//! (offline-only) configuration.

use std::num::NonZeroU32;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::schedule::FallbackDefaults;

// ---------------------------------------------------------------------------
// Config file structures
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub schedule: ScheduleSection,
    pub cycle: CycleSection,
    pub cloud: CloudSection,
    pub time: TimeSection,
    pub device: DeviceSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleSection {
    /// Fallback hours between waterings.
    pub pulse_rate_default: i64,
    /// Fallback watering minutes.
    pub duration_default: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleSection {
    pub max_connect_attempts: u32,
    pub connect_backoff_sec: u64,
    pub sleep_interval_sec: u64,
    pub boot_settle_sec: u64,
    pub cold_boot_wait_sec: u64,
    pub time_sync_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudSection {
    pub base_url: String,
    pub channel_id: u64,
    pub api_key: String,
    pub probe_url: String,
    pub request_timeout_sec: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeSection {
    pub ntp_servers: Vec<String>,
    pub ntp_timeout_sec: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceSection {
    pub retained_path: String,
    pub relay_gpio_pin: i64,
    pub active_low: bool,
    /// Interface that must carry traffic; empty accepts any non-loopback.
    pub interface: String,
    /// Command run to reboot; empty exits and leaves it to the supervisor.
    pub reboot_command: Vec<String>,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            pulse_rate_default: 12,
            duration_default: 1,
        }
    }
}

impl Default for CycleSection {
    fn default() -> Self {
        Self {
            max_connect_attempts: 5,
            connect_backoff_sec: 3,
            sleep_interval_sec: 1800,
            boot_settle_sec: 2,
            cold_boot_wait_sec: 60,
            time_sync_attempts: 5,
        }
    }
}

impl Default for CloudSection {
    fn default() -> Self {
        Self {
            base_url: "http://api.thingspeak.com".into(),
            channel_id: 0,
            api_key: String::new(),
            probe_url: "http://jsonip.com/".into(),
            request_timeout_sec: 10,
        }
    }
}

impl Default for TimeSection {
    fn default() -> Self {
        Self {
            ntp_servers: vec!["pool.ntp.org".into(), "time.google.com".into()],
            ntp_timeout_sec: 5,
        }
    }
}

impl Default for DeviceSection {
    fn default() -> Self {
        Self {
            retained_path: "retained.json".into(),
            relay_gpio_pin: 17,
            active_low: true,
            interface: String::new(),
            reboot_command: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// GPIO whitelist
// ---------------------------------------------------------------------------

/// BCM GPIO pins available on the Raspberry Pi 40-pin header for general
/// use. GPIO 0-1 are reserved for the ID EEPROM and must never be used.
const VALID_GPIO_PINS: std::ops::RangeInclusive<i64> = 2..=27;

/// Longest sane sleep between boots (one day).
const MAX_SLEEP_SEC: u64 = 86_400;

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl Config {
    /// Validate all options. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        let s = &self.schedule;
        if s.pulse_rate_default <= 0 || s.pulse_rate_default > i64::from(u32::MAX) {
            errors.push(format!(
                "schedule.pulse_rate_default must be a positive number of hours, got {}",
                s.pulse_rate_default
            ));
        }
        if s.duration_default <= 0 || s.duration_default > i64::from(u32::MAX) {
            errors.push(format!(
                "schedule.duration_default must be a positive number of minutes, got {}",
                s.duration_default
            ));
        }

        let c = &self.cycle;
        if c.sleep_interval_sec == 0 || c.sleep_interval_sec > MAX_SLEEP_SEC {
            errors.push(format!(
                "cycle.sleep_interval_sec {} out of range [1, {MAX_SLEEP_SEC}]",
                c.sleep_interval_sec
            ));
        }
        if c.max_connect_attempts == 0 {
            errors.push("cycle.max_connect_attempts must be at least 1".into());
        }

        let cl = &self.cloud;
        for (name, url) in [("cloud.base_url", &cl.base_url), ("cloud.probe_url", &cl.probe_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                errors.push(format!("{name} '{url}' is not an http(s) URL"));
            }
        }
        if cl.request_timeout_sec == 0 {
            errors.push("cloud.request_timeout_sec must be positive".into());
        }

        if self.time.ntp_servers.iter().any(|s| s.trim().is_empty()) {
            errors.push("time.ntp_servers contains an empty entry".into());
        }

        let d = &self.device;
        if d.retained_path.trim().is_empty() {
            errors.push("device.retained_path is empty".into());
        }
        if !VALID_GPIO_PINS.contains(&d.relay_gpio_pin) {
            errors.push(format!(
                "device.relay_gpio_pin {} is not a valid BCM GPIO pin (allowed: 2-27)",
                d.relay_gpio_pin
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }

    /// Fallback schedule. Only meaningful after `validate` passed.
    pub fn fallback(&self) -> FallbackDefaults {
        let defaults = FallbackDefaults::default();
        let nz = |v: i64| u32::try_from(v).ok().and_then(NonZeroU32::new);
        FallbackDefaults {
            pulse_rate: nz(self.schedule.pulse_rate_default).unwrap_or(defaults.pulse_rate),
            watering_duration: nz(self.schedule.duration_default)
                .unwrap_or(defaults.watering_duration),
        }
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_secs(self.cycle.sleep_interval_sec)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.cloud.request_timeout_sec)
    }

    pub fn interface(&self) -> Option<String> {
        let iface = self.device.interface.trim();
        (!iface.is_empty()).then(|| iface.to_string())
    }

    /// Apply `IRRIGATION_API_KEY` / `IRRIGATION_CHANNEL_ID` overrides.
    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = get("IRRIGATION_API_KEY") {
            self.cloud.api_key = key;
        }
        if let Some(id) = get("IRRIGATION_CHANNEL_ID") {
            self.cloud.channel_id = id
                .trim()
                .parse()
                .with_context(|| format!("invalid IRRIGATION_CHANNEL_ID: {id:?}"))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Read, parse, and validate a TOML config file.
pub fn load(path: &Path) -> Result<Config> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config: {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config: {}", path.display()))?;
    Ok(config)
}

/// Load the config, falling back to compiled-in defaults when the file is
/// missing or unusable. A bad file must not stop the device from watering.
pub fn load_or_default(path: &Path) -> Config {
    if !path.exists() {
        info!(path = %path.display(), "no config file, using built-in defaults");
        return Config::default();
    }
    match load(path) {
        Ok(config) => {
            info!(path = %path.display(), "config loaded");
            config
        }
        Err(e) => {
            error!("{e:#}");
            warn!("using built-in defaults");
            Config::default()
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
