use std::num::NonZeroU32;

use crate::retained::RetainedRecord;

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// The single record governing watering for this boot.
///
/// Built fresh every boot from the cloud channel or from the fallback
/// defaults merged with the retained record; only `last_water_time` and
/// `health` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    /// Hours between waterings.
    pub pulse_rate: NonZeroU32,
    /// Minutes the pump stays on per watering.
    pub watering_duration: NonZeroU32,
    /// Epoch seconds of the last completed watering, `None` if never watered.
    pub last_water_time: Option<i64>,
    pub health: Health,
}

/// Liveness flag reported to telemetry. Never used in a local decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Health {
    /// Normal boot.
    #[default]
    Boot,
    /// About to reboot after the long sleep.
    Alive,
}

impl Health {
    pub fn code(self) -> u8 {
        match self {
            Self::Boot => 0,
            Self::Alive => 1,
        }
    }
}

/// Compiled-in or configured schedule used whenever the cloud is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackDefaults {
    pub pulse_rate: NonZeroU32,
    pub watering_duration: NonZeroU32,
}

impl Default for FallbackDefaults {
    fn default() -> Self {
        Self {
            pulse_rate: NonZeroU32::new(12).unwrap_or(NonZeroU32::MIN),
            watering_duration: NonZeroU32::MIN,
        }
    }
}

impl Schedule {
    /// Fallback schedule: defaults for the timing fields, the retained
    /// watering time only when it is a positive timestamp.
    pub fn fallback(defaults: FallbackDefaults, retained: &RetainedRecord) -> Self {
        Self {
            pulse_rate: defaults.pulse_rate,
            watering_duration: defaults.watering_duration,
            last_water_time: retained.last_water_time.filter(|&t| t > 0),
            health: Health::Boot,
        }
    }

    /// Interval between waterings in seconds.
    pub fn interval_secs(&self) -> i64 {
        i64::from(self.pulse_rate.get()) * 3600
    }

    /// Epoch seconds at which the next watering falls due. `None` when
    /// never watered or when the due time lies beyond `i64::MAX`.
    pub fn due_time(&self) -> Option<i64> {
        self.last_water_time?.checked_add(self.interval_secs())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
