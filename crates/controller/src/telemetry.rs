//! Best-effort telemetry: post the schedule, never fail the cycle.

use tracing::{info, warn};

use crate::cloud::CloudFeed;
use crate::schedule::Schedule;

/// Post `schedule` to the channel. Faults are logged and swallowed; the
/// return value is informational only.
pub async fn report<F: CloudFeed>(feed: &F, schedule: &Schedule) -> bool {
    match feed.publish(schedule).await {
        Ok(()) => {
            info!(
                health = schedule.health.code(),
                last_water_time = ?schedule.last_water_time,
                "telemetry posted"
            );
            true
        }
        Err(e) => {
            warn!("failed to post telemetry: {e}");
            false
        }
    }
}
