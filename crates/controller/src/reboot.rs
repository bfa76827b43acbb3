//! The end of every boot cycle.

use std::future::Future;
use std::process::Command;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::controller::CycleReport;

/// Run one boot cycle as its own task and wait for it.
///
/// A cycle that aborted or panicked is followed by `backoff`, so a fault
/// that recurs every boot cannot reboot the device in a tight loop.
pub async fn supervise<F>(cycle: F, backoff: Duration) -> Option<CycleReport>
where
    F: Future<Output = Option<CycleReport>> + Send + 'static,
{
    let outcome = match tokio::spawn(cycle).await {
        Ok(report) => report,
        Err(e) => {
            error!("boot cycle panicked: {e}");
            None
        }
    };
    if outcome.is_none() {
        warn!(
            backoff_sec = backoff.as_secs(),
            "boot cycle did not complete, waiting before reboot"
        );
        tokio::time::sleep(backoff).await;
    }
    outcome
}

/// Run the configured reboot command, then exit so a supervisor restarts
/// the process if the command did not take the whole system down.
pub fn reboot(command: &[String]) -> ! {
    let code = if command.is_empty() || request_reboot(command) {
        0
    } else {
        1
    };
    info!(code, "rebooting");
    std::process::exit(code)
}

/// Returns whether the command ran and reported success.
pub fn request_reboot(command: &[String]) -> bool {
    let Some((program, args)) = command.split_first() else {
        return false;
    };
    match Command::new(program).args(args).status() {
        Ok(status) if status.success() => {
            info!(%program, "reboot requested");
            true
        }
        Ok(status) => {
            error!(%program, %status, "reboot command failed");
            false
        }
        Err(e) => {
            error!(%program, "failed to run reboot command: {e}");
            false
        }
    }
}
