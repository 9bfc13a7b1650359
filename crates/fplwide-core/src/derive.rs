//! Telemetry Derivation Functions
//!
//! Pure functions turning a leg's cumulative distance and the live telemetry
//! into display strings. Every function returns either a well-formed value or
//! a fixed-width placeholder; NaN, infinities and negative times never reach
//! the output.

use crate::config::DisplayProfile;
use crate::route::{
    CumulativeDistance, FixTypeFlags, HeadingTermination, LegClassification, LegTelemetryState,
    SegmentType, MANUAL_SEQUENCE_LEG_NAME,
};
use crate::units::{hours_to_ms, meters_to_feet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder for fuel, endurance, ETE, ETA and altitude
pub const VALUE_SENTINEL: &str = "_____";

/// Placeholder for bearing and desired track
pub const COURSE_SENTINEL: &str = "___";

/// Fuel and time estimates need the aircraft moving faster than this (knots)
pub const MIN_GROUNDSPEED_KTS: f64 = 30.0;

/// Raw course value meaning "no course"
pub const NO_COURSE: f64 = -1.0;

/// Significant digits kept in the travel time before splitting into fields
const TRAVEL_TIME_SIGNIFICANT_DIGITS: i32 = 4;

/// Travel time in hours to a leg's fix, when it can be estimated
pub fn travel_hours(
    distance: CumulativeDistance,
    leg_is_behind: bool,
    groundspeed_kts: f64,
) -> Option<f64> {
    if leg_is_behind {
        return None;
    }
    let nm = distance.nmiles().filter(|nm| nm.is_finite() && *nm >= 0.0)?;
    if !groundspeed_kts.is_finite() || groundspeed_kts <= MIN_GROUNDSPEED_KTS {
        return None;
    }
    Some(nm / groundspeed_kts)
}

/// Fuel on board at the fix, in the profile's display unit, rounded to a whole unit
pub fn fuel_remaining(
    distance: CumulativeDistance,
    leg_is_behind: bool,
    groundspeed_kts: f64,
    fuel_flow: f64,
    total_fuel: f64,
    profile: &DisplayProfile,
) -> Option<f64> {
    let hours = travel_hours(distance, leg_is_behind, groundspeed_kts)?;
    if fuel_flow.is_nan() || fuel_flow <= 0.0 {
        return None;
    }
    let remaining =
        profile.quantity_to_display(total_fuel) - hours * profile.flow_to_display(fuel_flow);
    remaining.is_finite().then(|| remaining.round() + 0.0)
}

/// Format a fuel quantity
pub fn format_fuel(fuel: Option<f64>) -> String {
    match fuel {
        Some(value) => format!("{value:.0}"),
        None => VALUE_SENTINEL.to_string(),
    }
}

/// Time the remaining fuel lasts at the current flow, as `H+MM`
///
/// A negative endurance clamps to `0+00`.
pub fn endurance(fuel_remaining: Option<f64>, fuel_flow: f64, profile: &DisplayProfile) -> String {
    let Some(fuel) = fuel_remaining else {
        return VALUE_SENTINEL.to_string();
    };
    let flow = profile.flow_to_display(fuel_flow);
    if flow.is_nan() || flow <= 0.0 {
        return VALUE_SENTINEL.to_string();
    }

    let hours = fuel / flow;
    if !hours.is_finite() {
        return VALUE_SENTINEL.to_string();
    }
    if hours < 0.0 {
        return "0+00".to_string();
    }

    let (h, m) = split_hours_minutes(hours);
    format!("{h}+{m:02}")
}

/// Estimated time en route: `MM:SS` below one hour, `HH+MM` from one hour
pub fn ete(distance: CumulativeDistance, leg_is_behind: bool, groundspeed_kts: f64) -> String {
    let Some(hours) = travel_hours(distance, leg_is_behind, groundspeed_kts) else {
        return VALUE_SENTINEL.to_string();
    };

    let hours = to_significant_digits(hours, TRAVEL_TIME_SIGNIFICANT_DIGITS);
    if hours < 1.0 {
        let total_seconds = (hours * 3600.0).round() as u64;
        let (minutes, seconds) = (total_seconds / 60, total_seconds % 60);
        if minutes < 60 {
            return format!("{minutes:02}:{seconds:02}");
        }
    }

    let (h, m) = split_hours_minutes(hours);
    format!("{h:02}+{m:02}")
}

/// Estimated time of arrival as `HH:MM` on the simulator clock
pub fn eta(
    distance: CumulativeDistance,
    leg_is_behind: bool,
    groundspeed_kts: f64,
    sim_time_ms: f64,
) -> String {
    let Some(hours) = travel_hours(distance, leg_is_behind, groundspeed_kts) else {
        return VALUE_SENTINEL.to_string();
    };
    let arrival_ms = sim_time_ms + hours_to_ms(hours);
    if !arrival_ms.is_finite() {
        return VALUE_SENTINEL.to_string();
    }

    match DateTime::<Utc>::from_timestamp_millis(arrival_ms.round() as i64) {
        Some(arrival) => arrival.format("%H:%M").to_string(),
        None => VALUE_SENTINEL.to_string(),
    }
}

/// Format a bearing or desired track: whole degrees, 0 shown as 360, three digits
pub fn format_course(degrees: f64) -> String {
    if !degrees.is_finite() || degrees < 0.0 {
        return COURSE_SENTINEL.to_string();
    }
    let rounded = (degrees.round() as u64) % 360;
    let shown = if rounded == 0 { 360 } else { rounded };
    format!("{shown:03}")
}

/// Suffix shown after the fix name
pub fn fix_type_label(
    flags: FixTypeFlags,
    leg_name: &str,
    classification: LegClassification,
) -> &'static str {
    match classification {
        LegClassification::HeadingTo(HeadingTermination::Manual)
            if leg_name == MANUAL_SEQUENCE_LEG_NAME =>
        {
            return " hdg";
        }
        LegClassification::PointToPoint
        | LegClassification::HeadingTo(_)
        | LegClassification::Hold(_)
        | LegClassification::Discontinuity
        | LegClassification::DirectTo => {}
    }

    match flags {
        FixTypeFlags::FAF => " faf",
        FixTypeFlags::IAF => " iaf",
        FixTypeFlags::MAP => " map",
        FixTypeFlags::MAHP => " mahp",
        _ => "",
    }
}

/// Raw course inputs for a row, in degrees (`NO_COURSE` when unavailable)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CourseInputs {
    /// Desired track
    pub dtk_deg: f64,
    /// Bearing
    pub bearing_deg: f64,
}

impl CourseInputs {
    /// Both courses unavailable
    pub const NONE: CourseInputs = CourseInputs {
        dtk_deg: NO_COURSE,
        bearing_deg: NO_COURSE,
    };

    /// Select the courses shown on a row
    ///
    /// The active leg follows the navigation computer; holds show their
    /// published course; a collapsed airway has no single course.
    pub fn select(leg: &LegTelemetryState, active_dtk_deg: f64, active_bearing_deg: f64) -> Self {
        if leg.is_active {
            return CourseInputs {
                dtk_deg: active_dtk_deg,
                bearing_deg: active_bearing_deg,
            };
        }
        if leg.is_collapsed && leg.is_airway_exit_fix {
            return CourseInputs::NONE;
        }
        let course = match leg.classification() {
            LegClassification::Hold(_) => leg.course_deg,
            LegClassification::PointToPoint
            | LegClassification::HeadingTo(_)
            | LegClassification::Discontinuity
            | LegClassification::DirectTo => leg.initial_dtk_deg,
        }
        .unwrap_or(NO_COURSE);

        CourseInputs {
            dtk_deg: course,
            bearing_deg: course,
        }
    }

    /// Formatted desired track; legs behind the aircraft show no track
    pub fn dtk_text(&self, leg_is_behind: bool) -> String {
        if leg_is_behind {
            COURSE_SENTINEL.to_string()
        } else {
            format_course(self.dtk_deg)
        }
    }

    /// Formatted bearing
    pub fn bearing_text(&self) -> String {
        format_course(self.bearing_deg)
    }
}

/// Altitude column content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AltitudeDisplay {
    /// Column left blank
    Hidden,
    /// Altitude shown
    Shown {
        /// Altitude in feet, if the leg has one
        feet: Option<i64>,
        /// Unit suffix ("FT" or " ")
        units: &'static str,
        /// Advisory (not a constraint)
        advisory: bool,
        /// Constraint cannot be met
        invalid: bool,
        /// Edited by the pilot
        user_edited: bool,
    },
}

impl AltitudeDisplay {
    /// Altitude column for a leg
    pub fn for_leg(leg: &LegTelemetryState) -> Self {
        let hidden = leg.is_behind
            || matches!(leg.segment_type, SegmentType::Origin | SegmentType::Departure)
            || leg.is_runway_fix()
            || leg.is_missed_approach;
        if hidden {
            return AltitudeDisplay::Hidden;
        }

        let invalid = leg.invalid_constraint_altitude_m.is_some();
        let advisory = leg.is_advisory && !invalid;
        let feet = leg
            .invalid_constraint_altitude_m
            .or(leg.target_altitude_m)
            .filter(|m| m.is_finite())
            .map(|m| meters_to_feet(m).round() as i64)
            .map(|ft| if advisory { ft.max(0) } else { ft });
        let units = match leg.target_altitude_m {
            Some(m) if m >= 1.0 => "FT",
            _ => " ",
        };

        AltitudeDisplay::Shown {
            feet,
            units,
            advisory,
            invalid,
            user_edited: leg.is_user_constraint,
        }
    }
}

impl fmt::Display for AltitudeDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltitudeDisplay::Hidden => Ok(()),
            AltitudeDisplay::Shown {
                feet: Some(ft),
                units,
                ..
            } => write!(f, "{ft}{units}"),
            AltitudeDisplay::Shown { feet: None, .. } => f.write_str(VALUE_SENTINEL),
        }
    }
}

/// Split decimal hours into whole hours and rounded minutes, carrying 60 minutes
fn split_hours_minutes(hours: f64) -> (u64, u64) {
    let mut h = hours.floor() as u64;
    let mut m = (hours.fract() * 60.0).round() as u64;
    if m >= 60 {
        h += 1;
        m -= 60;
    }
    (h, m)
}

/// Round to `digits` significant digits
fn to_significant_digits(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    (value * factor).round() / factor
}
