//! Watering executor: one uncancellable pump run.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::clock::{display_ts, Clock};
use crate::relay::OutputPin;

/// Holds the pump on for as long as it lives.
///
/// Dropping the guard switches the output off, whichever way the scope is
/// left: normal return, early error, panic, or the owning future being
/// dropped mid-wait.
pub struct PumpGuard<'a, P: OutputPin> {
    pin: &'a mut P,
}

impl<'a, P: OutputPin> PumpGuard<'a, P> {
    pub fn engage(pin: &'a mut P) -> Result<Self> {
        // Constructed before switching on so a failed or partial switch-on
        // is still switched off again.
        let mut guard = Self { pin };
        guard.pin.set_active(true).context("failed to switch pump on")?;
        Ok(guard)
    }
}

impl<P: OutputPin> Drop for PumpGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.pin.set_active(false) {
            error!("failed to switch pump off: {e:#}");
        }
    }
}

/// Run the pump for `minutes` and return the completion time, which
/// becomes the new last water time.
pub async fn water<P, C>(pin: &mut P, clock: &C, minutes: NonZeroU32) -> Result<i64>
where
    P: OutputPin + Send,
    C: Clock + Sync,
{
    let duration = Duration::from_secs(u64::from(minutes.get()) * 60);
    info!(minutes = minutes.get(), "watering started");
    {
        let _pump = PumpGuard::engage(pin)?;
        clock.sleep(duration).await;
    }
    let finished = clock.now();
    info!(finished = %display_ts(finished), "watering finished");
    Ok(finished)
}

// ===========================================================================
// Tests
// ===========================================================================
