//! Schedule source resolver: cloud channel first, local fallback always.

use tracing::{info, warn};

use crate::cloud::CloudFeed;
use crate::retained::RetainedRecord;
use crate::schedule::{FallbackDefaults, Schedule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleSource {
    Cloud,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub schedule: Schedule,
    pub source: ScheduleSource,
}

/// Build this boot's schedule.
///
/// `feed` is `Some` only when the cloud is available. A failed fetch is
/// never an error here: it falls through to the fallback like being offline.
pub async fn resolve<F: CloudFeed>(
    feed: Option<&F>,
    defaults: FallbackDefaults,
    retained: &RetainedRecord,
) -> Resolved {
    if let Some(feed) = feed {
        match feed.fetch_latest().await {
            Ok(schedule) => {
                info!(
                    pulse_rate_h = schedule.pulse_rate.get(),
                    duration_min = schedule.watering_duration.get(),
                    last_water_time = ?schedule.last_water_time,
                    "schedule from cloud"
                );
                return Resolved {
                    schedule,
                    source: ScheduleSource::Cloud,
                };
            }
            Err(e) => warn!("couldn't fetch schedule from cloud: {e}"),
        }
    }

    let schedule = Schedule::fallback(defaults, retained);
    info!(
        pulse_rate_h = schedule.pulse_rate.get(),
        duration_min = schedule.watering_duration.get(),
        last_water_time = ?schedule.last_water_time,
        "fallback schedule"
    );
    Resolved {
        schedule,
        source: ScheduleSource::Fallback,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
