//! Watering decision engine.
//!
//! Pure function of the resolved schedule and the current time. Everything
//! else in a boot cycle is I/O around this one call.
//!
//! ```text
//! Decide ──[never watered]─────────────────────────▶ WaterNow
//!    │
//!    ├────[last + pulse_rate * 3600 <= now]────────▶ WaterNow
//!    │
//!    └────[otherwise]──────────────────────────────▶ Sleep
//! ```

use crate::schedule::Schedule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    WaterNow,
    Sleep,
}

/// Decide whether this boot waters.
///
/// The interval is inclusive: a boot landing exactly on the due time waters.
/// A due time past `i64::MAX` is later than any `now`.
pub fn decide(schedule: &Schedule, now: i64) -> Decision {
    if schedule.last_water_time.is_none() {
        return Decision::WaterNow;
    }
    match schedule.due_time() {
        Some(due) if due <= now => Decision::WaterNow,
        _ => Decision::Sleep,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
