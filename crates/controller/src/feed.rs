//! Wire format of the cloud channel.
//!
//! The remote schema addresses values by numbered field slots. The slot
//! assignment is fixed by the existing channel and must not change:
//!
//! | slot     | value                         |
//! |----------|-------------------------------|
//! | `field1` | watering duration (minutes)   |
//! | `field2` | health flag                   |
//! | `field3` | last water time (epoch secs)  |
//! | `field4` | pulse rate (hours)            |

use std::num::NonZeroU32;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::FetchError;
use crate::schedule::{Health, Schedule};

pub const SLOT_FLOW_DURATION: u8 = 1;
pub const SLOT_HEALTH: u8 = 2;
pub const SLOT_LAST_WATER_TIME: u8 = 3;
pub const SLOT_PULSE_RATE: u8 = 4;

fn field_key(slot: u8) -> String {
    format!("field{slot}")
}

// ---------------------------------------------------------------------------
// Read: latest channel entry
// ---------------------------------------------------------------------------

/// Decode the channel's latest entry into a schedule.
///
/// Field values arrive as strings, numbers or `null`. Pulse rate and
/// duration must be positive; a missing, null or non-positive last water
/// time means "never watered".
pub fn parse_latest(body: &[u8]) -> Result<Schedule, FetchError> {
    let entry: Map<String, Value> =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let pulse_rate = required_positive(&entry, SLOT_PULSE_RATE)?;
    let watering_duration = required_positive(&entry, SLOT_FLOW_DURATION)?;
    let last_water_time = optional_int(&entry, SLOT_LAST_WATER_TIME)?.filter(|&t| t > 0);

    Ok(Schedule {
        pulse_rate,
        watering_duration,
        last_water_time,
        health: Health::Boot,
    })
}

fn required_positive(entry: &Map<String, Value>, slot: u8) -> Result<NonZeroU32, FetchError> {
    let value = optional_int(entry, slot)?.ok_or(FetchError::InvalidField {
        slot,
        reason: "missing",
    })?;
    u32::try_from(value)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(FetchError::InvalidField {
            slot,
            reason: "not a positive integer",
        })
}

fn optional_int(entry: &Map<String, Value>, slot: u8) -> Result<Option<i64>, FetchError> {
    let invalid = FetchError::InvalidField {
        slot,
        reason: "not an integer",
    };
    match entry.get(&field_key(slot)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_i64().map(Some).ok_or(invalid),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| invalid),
        Some(_) => Err(invalid),
    }
}

// ---------------------------------------------------------------------------
// Write: channel update
// ---------------------------------------------------------------------------

/// Body of a channel update. Field names carry the slot numbers above.
#[derive(Debug, Serialize)]
pub struct Update<'a> {
    #[serde(rename = "field1")]
    pub watering_duration: u32,
    #[serde(rename = "field2")]
    pub health: u8,
    #[serde(rename = "field3")]
    pub last_water_time: Option<i64>,
    #[serde(rename = "field4")]
    pub pulse_rate: u32,
    pub api_key: &'a str,
}

impl<'a> Update<'a> {
    pub fn new(schedule: &Schedule, api_key: &'a str) -> Self {
        Self {
            watering_duration: schedule.watering_duration.get(),
            health: schedule.health.code(),
            last_water_time: schedule.last_water_time,
            pulse_rate: schedule.pulse_rate.get(),
            api_key,
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
