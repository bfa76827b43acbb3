//! Cycle controller: runs one boot cycle from power-on to the reboot
//! request.
//!
//! ```text
//! settle ─▶ load retained ─▶ connectivity ─▶ (sync clock) ─▶ resolve ─▶ decide
//!                                                                       │
//!        ┌──────────────────── WaterNow ────────────────────────────────┤
//!        ▼                                                              │
//!   water ─▶ persist ─▶ report                                Sleep ─▶ persist
//!        │                                                              │
//!        └──────────────▶ long sleep ─▶ heartbeat (health=1) ◀──────────┘
//! ```
//!
//! The retained record is written before any network I/O that follows a
//! watering, so a power cut after watering never forgets it happened.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::clock::{display_ts, Clock};
use crate::cloud::CloudFeed;
use crate::config::Config;
use crate::connectivity::{ConnectivityGate, Link, Prober, Verdict};
use crate::decision::{decide, Decision};
use crate::diagnostics;
use crate::executor;
use crate::relay::OutputPin;
use crate::resolver::{resolve, Resolved, ScheduleSource};
use crate::retained::{BootKind, RetainedMemory, RetainedRecord, RetainedStore};
use crate::schedule::{FallbackDefaults, Health, Schedule};
use crate::telemetry;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Timing and fallback knobs for one cycle.
#[derive(Debug, Clone)]
pub struct Settings {
    pub fallback: FallbackDefaults,
    pub max_connect_attempts: u32,
    pub boot_settle: Duration,
    pub cold_boot_wait: Duration,
    pub sleep_interval: Duration,
    pub time_sync_attempts: u32,
}

impl Settings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            fallback: cfg.fallback(),
            max_connect_attempts: cfg.cycle.max_connect_attempts,
            boot_settle: Duration::from_secs(cfg.cycle.boot_settle_sec),
            cold_boot_wait: Duration::from_secs(cfg.cycle.cold_boot_wait_sec),
            sleep_interval: cfg.sleep_interval(),
            time_sync_attempts: cfg.cycle.time_sync_attempts,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What one completed cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub verdict: Verdict,
    pub source: ScheduleSource,
    pub decision: Decision,
    /// Final schedule, as posted with the heartbeat.
    pub schedule: Schedule,
    pub posts: u32,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct Controller<L, P, F, O, M, C> {
    settings: Settings,
    gate: ConnectivityGate<L, P>,
    feed: F,
    pin: O,
    store: RetainedStore<M>,
    clock: C,
}

impl<L, P, F, O, M, C> Controller<L, P, F, O, M, C>
where
    L: Link + Send,
    P: Prober + Sync,
    F: CloudFeed + Sync,
    O: OutputPin + Send,
    M: RetainedMemory + Send,
    C: Clock + Sync,
{
    pub fn new(
        settings: Settings,
        gate: ConnectivityGate<L, P>,
        feed: F,
        pin: O,
        store: RetainedStore<M>,
        clock: C,
    ) -> Self {
        Self {
            settings,
            gate,
            feed,
            pin,
            store,
            clock,
        }
    }

    /// Run one boot cycle. Never fails: anything that escapes the cycle is
    /// logged, the pump is forced off, and `None` is returned. Either way the
    /// caller reboots next.
    pub async fn run(&mut self) -> Option<CycleReport> {
        match self.cycle().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("boot cycle aborted: {e:#}");
                if let Err(e) = self.pin.set_active(false) {
                    error!("failed to force pump off: {e:#}");
                }
                None
            }
        }
    }

    async fn cycle(&mut self) -> Result<CycleReport> {
        self.pin
            .set_active(false)
            .context("failed to switch pump off at boot")?;
        self.clock.sleep(self.settings.boot_settle).await;

        // ── Retained state ──────────────────────────────────────────
        let (retained, boot) = self.store.load_boot();
        if boot == BootKind::Cold && !self.settings.cold_boot_wait.is_zero() {
            info!(
                wait_sec = self.settings.cold_boot_wait.as_secs(),
                "cold boot, waiting for router"
            );
            self.clock.sleep(self.settings.cold_boot_wait).await;
        }

        // ── Connectivity ────────────────────────────────────────────
        let verdict = self
            .gate
            .verdict(&self.clock, self.settings.max_connect_attempts)
            .await;
        let cloud = verdict.cloud_available();
        if cloud {
            self.clock
                .synchronise(self.settings.time_sync_attempts)
                .await;
        }

        // ── Schedule + decision ─────────────────────────────────────
        let Resolved {
            mut schedule,
            source,
        } = resolve(cloud.then_some(&self.feed), self.settings.fallback, &retained).await;

        let now = self.clock.now();
        let decision = decide(&schedule, now);
        info!(?decision, ?source, now = %display_ts(now), "decided");

        let mut posts = 0;
        match decision {
            Decision::WaterNow => {
                let finished =
                    executor::water(&mut self.pin, &self.clock, schedule.watering_duration)
                        .await?;
                schedule.last_water_time = Some(finished);
                self.persist(&retained, &schedule);
                if cloud && self.post(&schedule).await {
                    posts += 1;
                }
                self.clock.sleep(self.settings.boot_settle).await;
            }
            Decision::Sleep => {
                match schedule.due_time() {
                    Some(due) => info!(due = %display_ts(due), "not due yet"),
                    None => info!("not due within representable time"),
                }
                self.persist(&retained, &schedule);
            }
        }

        // ── Long sleep + heartbeat ──────────────────────────────────
        info!(
            sleep_sec = self.settings.sleep_interval.as_secs(),
            "sleeping before reboot"
        );
        self.clock.sleep(self.settings.sleep_interval).await;
        diagnostics::log_memory();

        schedule.health = Health::Alive;
        if cloud && self.post(&schedule).await {
            posts += 1;
        }

        Ok(CycleReport {
            verdict,
            source,
            decision,
            schedule,
            posts,
        })
    }

    /// Write back the later of the retained and the scheduled watering
    /// time. A failed write is logged; the cycle goes on.
    fn persist(&mut self, retained: &RetainedRecord, schedule: &Schedule) {
        let record = RetainedRecord {
            last_water_time: retained.last_water_time.max(schedule.last_water_time),
        };
        if let Err(e) = self.store.save(&record) {
            error!("failed to persist retained record: {e}");
        }
    }

    /// Re-check reachability, then post. Only called on cloud boots.
    async fn post(&self, schedule: &Schedule) -> bool {
        if !self.gate.probe_internet().await {
            info!("internet lost since boot, skipping telemetry");
            return false;
        }
        telemetry::report(&self.feed, schedule).await
    }
}

// ===========================================================================
// Tests
// ===========================================================================
