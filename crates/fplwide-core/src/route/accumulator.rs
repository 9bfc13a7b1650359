//! Leg Accumulator
//!
//! Produces the cumulative along-route distance shown on each row. The running
//! total is threaded through one ordered pass over the leg list and discarded
//! afterwards:
//!
//! 1. Active leg, or the fix the navigation computer last sequenced to:
//!    the total is reset to the externally supplied distance remaining.
//! 2. Leg behind the aircraft or without a usable computed distance:
//!    no value, the total is unchanged.
//! 3. Collapsed airway exit fix: the airway's aggregate distance is added.
//! 4. Holding patterns: only the final flight path vector is added.
//! 5. Everything else: the leg's own computed distance is added.
//!
//! An anchor without a distance remaining, or an airway exit without an
//! aggregate, leaves the total incomplete. Every following leg is unavailable
//! until the next successful reanchor.

use super::leg::{LegClassification, LegTelemetryState};
use crate::units::meters_to_nmiles;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Computed leg distances below this many metres count as "no geometry yet"
pub const NEAR_ZERO_DISTANCE_M: f64 = 0.1;

/// Cumulative distances at or above this many NM are shown without decimals
pub const WHOLE_NMILE_THRESHOLD: f64 = 100.0;

/// Placeholder shown when a row has no cumulative distance
pub const DISTANCE_SENTINEL: &str = "____";

/// Cumulative distance to a leg's fix
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum CumulativeDistance {
    /// Not currently derivable
    #[default]
    Unavailable,
    /// Distance in nautical miles
    Nmiles(f64),
}

impl CumulativeDistance {
    /// Distance in NM, if available
    pub fn nmiles(self) -> Option<f64> {
        match self {
            CumulativeDistance::Nmiles(nm) => Some(nm),
            CumulativeDistance::Unavailable => None,
        }
    }

    /// Whether a distance is available
    pub fn is_available(self) -> bool {
        self.nmiles().is_some()
    }
}

impl fmt::Display for CumulativeDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CumulativeDistance::Unavailable => f.write_str(DISTANCE_SENTINEL),
            CumulativeDistance::Nmiles(nm) => f.write_str(&format_nmiles(*nm)),
        }
    }
}

/// Format a distance: one decimal below 100 NM, none at or above
pub fn format_nmiles(nm: f64) -> String {
    if !nm.is_finite() {
        return DISTANCE_SENTINEL.to_string();
    }
    // Decide on the value as it would be printed so 99.96 shows "100", not "100.0"
    let tenths = (nm * 10.0).round() / 10.0;
    if tenths < WHOLE_NMILE_THRESHOLD {
        format!("{:.1}", tenths + 0.0)
    } else {
        format!("{:.0}", nm.round() + 0.0)
    }
}

/// External values that can reset the running total
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorContext<'a> {
    /// Identifier of the fix the navigation computer last sequenced to
    pub lnav_waypoint: Option<&'a str>,
    /// Distance remaining to the active leg's fix, in metres
    pub active_leg_distance_m: f64,
}

impl<'a> AnchorContext<'a> {
    /// Create an anchor context
    pub fn new(lnav_waypoint: Option<&'a str>, active_leg_distance_m: f64) -> Self {
        Self {
            lnav_waypoint,
            active_leg_distance_m,
        }
    }

    fn anchors(&self, leg: &LegTelemetryState) -> bool {
        leg.is_active || self.lnav_waypoint.is_some_and(|ident| ident == leg.name)
    }

    fn anchor_nmiles(&self) -> Option<f64> {
        let meters = self.active_leg_distance_m;
        (meters.is_finite() && meters >= 0.0).then(|| meters_to_nmiles(meters))
    }
}

/// Rule applied to one leg
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AccumulationStep {
    /// Total reset to the supplied distance remaining (NM)
    Reanchor(f64),
    /// No value, total unchanged
    NoData,
    /// No value, and the total no longer reflects the route up to this leg
    Unresolved,
    /// Distance added to the total (NM)
    Advance(f64),
}

/// Pick the rule for `leg`
pub fn accumulation_step(leg: &LegTelemetryState, anchor: &AnchorContext<'_>) -> AccumulationStep {
    if anchor.anchors(leg) {
        return match anchor.anchor_nmiles() {
            Some(nm) => AccumulationStep::Reanchor(nm),
            None => AccumulationStep::Unresolved,
        };
    }

    let has_geometry = leg.distance_m.is_some_and(|d| d >= NEAR_ZERO_DISTANCE_M);
    if leg.is_behind || !has_geometry {
        return AccumulationStep::NoData;
    }

    if leg.is_collapsed && leg.is_airway_exit_fix {
        return match leg.airway_distance_m {
            Some(d) if d.is_finite() && d >= 0.0 => AccumulationStep::Advance(meters_to_nmiles(d)),
            _ => AccumulationStep::Unresolved,
        };
    }

    let leg_distance_m = leg.distance_m.unwrap_or(0.0);
    match leg.classification() {
        // The racetrack repeats; only the entry/exit vector moves the aircraft along the route
        LegClassification::Hold(_) => {
            AccumulationStep::Advance(meters_to_nmiles(leg.final_vector_distance_m()))
        }
        LegClassification::PointToPoint
        | LegClassification::HeadingTo(_)
        | LegClassification::Discontinuity
        | LegClassification::DirectTo => AccumulationStep::Advance(meters_to_nmiles(leg_distance_m)),
    }
}

/// Running total for one ordered pass over the leg list
#[derive(Debug, Clone, Default)]
pub struct LegAccumulator {
    running_total_nm: f64,
    invalid: bool,
}

impl LegAccumulator {
    /// Start a pass with a zero total
    pub fn new() -> Self {
        Self::default()
    }

    /// Current running total in NM
    pub fn running_total_nm(&self) -> f64 {
        self.running_total_nm
    }

    /// Whether the total is waiting for a reanchor
    pub fn is_invalid(&self) -> bool {
        self.invalid
    }

    /// Evaluate the next leg in order and return its cumulative distance
    pub fn evaluate(
        &mut self,
        leg: &LegTelemetryState,
        anchor: &AnchorContext<'_>,
    ) -> CumulativeDistance {
        match accumulation_step(leg, anchor) {
            AccumulationStep::Reanchor(nm) => {
                tracing::trace!(leg = %leg.name, nm, "reanchored running distance");
                self.running_total_nm = nm;
                self.invalid = false;
                CumulativeDistance::Nmiles(nm)
            }
            AccumulationStep::NoData => CumulativeDistance::Unavailable,
            AccumulationStep::Unresolved => {
                tracing::trace!(leg = %leg.name, "running distance unresolved");
                self.invalid = true;
                CumulativeDistance::Unavailable
            }
            AccumulationStep::Advance(_) if self.invalid => CumulativeDistance::Unavailable,
            AccumulationStep::Advance(nm) => {
                self.running_total_nm += nm;
                CumulativeDistance::Nmiles(self.running_total_nm)
            }
        }
    }
}

/// Cumulative distance for every leg, in leg order
pub fn accumulate_route(
    legs: &[LegTelemetryState],
    anchor: &AnchorContext<'_>,
) -> Vec<CumulativeDistance> {
    let mut accumulator = LegAccumulator::new();
    let distances: Vec<CumulativeDistance> =
        legs.iter().map(|leg| accumulator.evaluate(leg, anchor)).collect();
    tracing::trace!(
        legs = legs.len(),
        total_nm = accumulator.running_total_nm(),
        "accumulated route distances"
    );
    distances
}
