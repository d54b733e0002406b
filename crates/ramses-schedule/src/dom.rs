//! The schedule DOM: seven days, each an ordered list of switch-points.
//!
//! A zone's switch-points carry a heat setpoint; DHW's carry a boolean
//! on/off instead (§3 "Schedule aggregator", §4.J step 4).

use serde::{Deserialize, Serialize};

/// Which entity a schedule belongs to: a numbered zone, or the literal
/// `"HW"` DHW slot named in spec §4.J.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneRef {
    Zone(u8),
    Dhw,
}

impl ZoneRef {
    /// The index byte this ref occupies in an `0404`/`0006` frame's
    /// payload -- DHW uses the domain-style `FA` index.
    pub fn index_byte(&self) -> u8 {
        match self {
            ZoneRef::Zone(idx) => *idx,
            ZoneRef::Dhw => 0xFA,
        }
    }

    pub fn label(&self) -> String {
        match self {
            ZoneRef::Zone(idx) => format!("{idx:02}"),
            ZoneRef::Dhw => "HW".to_owned(),
        }
    }
}

/// One switch-point within a day: a time of day, paired with either a heat
/// setpoint (zone schedules) or an enabled flag (DHW schedules).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwitchPoint {
    Heat { time_of_day: String, heat_setpoint: f64 },
    Dhw { time_of_day: String, enabled: bool },
}

impl SwitchPoint {
    pub fn time_of_day(&self) -> &str {
        match self {
            SwitchPoint::Heat { time_of_day, .. } | SwitchPoint::Dhw { time_of_day, .. } => time_of_day,
        }
    }
}

/// One of the seven days in a [`Schedule`], `day_of_week` in `0..=6`
/// (Monday-indexed, matching the wire order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayOfWeek {
    pub day_of_week: u8,
    pub switchpoints: Vec<SwitchPoint>,
}

/// A complete week of switch-points for one zone or DHW, plus the
/// `change_counter` it was read at (§4.J step 1/3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub zone_idx: String,
    pub days: [DayOfWeek; 7],
}

impl Schedule {
    pub fn new(zone_ref: ZoneRef, days: [DayOfWeek; 7]) -> Schedule {
        Schedule {
            zone_idx: zone_ref.label(),
            days,
        }
    }

    pub fn is_dhw(&self) -> bool {
        self.zone_idx == "HW"
    }
}
