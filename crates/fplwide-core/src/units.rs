//! Unit Conversion Functions
//!
//! Conversions used by the leg telemetry pipeline:
//! - Length: metres ↔ nautical miles, metres ↔ feet
//! - Time: hours ↔ milliseconds
//! - Fuel: gallons ↔ pounds (fixed avgas density), per-unit quantity and flow

use serde::{Deserialize, Serialize};

/// Metres in one nautical mile
pub const METERS_PER_NMILE: f64 = 1852.0;

/// Metres in one foot
pub const METERS_PER_FOOT: f64 = 0.3048;

/// Milliseconds in one hour
pub const MS_PER_HOUR: f64 = 3_600_000.0;

/// Pounds in one gallon of fuel
pub const POUNDS_PER_GALLON_FUEL: f64 = 6.7;

/// Convert metres to nautical miles
pub fn meters_to_nmiles(meters: f64) -> f64 {
    meters / METERS_PER_NMILE
}

/// Convert nautical miles to metres
pub fn nmiles_to_meters(nmiles: f64) -> f64 {
    nmiles * METERS_PER_NMILE
}

/// Convert metres to feet
pub fn meters_to_feet(meters: f64) -> f64 {
    meters / METERS_PER_FOOT
}

/// Convert feet to metres
pub fn feet_to_meters(feet: f64) -> f64 {
    feet * METERS_PER_FOOT
}

/// Convert hours to milliseconds
pub fn hours_to_ms(hours: f64) -> f64 {
    hours * MS_PER_HOUR
}

/// Convert gallons of fuel to pounds
pub fn gallons_to_pounds(gallons: f64) -> f64 {
    gallons * POUNDS_PER_GALLON_FUEL
}

/// Convert pounds of fuel to gallons
pub fn pounds_to_gallons(pounds: f64) -> f64 {
    pounds / POUNDS_PER_GALLON_FUEL
}

/// Unit a fuel quantity is expressed in
///
/// Flow rates use the same unit per hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuelUnit {
    /// US gallons of fuel (flow in gal/hr)
    Gallons,
    /// Pounds (flow in lb/hr)
    Pounds,
}

impl FuelUnit {
    /// Short suffix shown after a quantity
    pub fn quantity_label(self) -> &'static str {
        match self {
            FuelUnit::Gallons => "GL",
            FuelUnit::Pounds => "LB",
        }
    }

    /// Short suffix shown after a flow rate
    pub fn flow_label(self) -> &'static str {
        match self {
            FuelUnit::Gallons => "GPH",
            FuelUnit::Pounds => "PPH",
        }
    }
}

/// Convert a fuel quantity between units
pub fn convert_fuel(value: f64, from: FuelUnit, to: FuelUnit) -> f64 {
    match (from, to) {
        (FuelUnit::Gallons, FuelUnit::Pounds) => gallons_to_pounds(value),
        (FuelUnit::Pounds, FuelUnit::Gallons) => pounds_to_gallons(value),
        (FuelUnit::Gallons, FuelUnit::Gallons) | (FuelUnit::Pounds, FuelUnit::Pounds) => value,
    }
}

/// Convert a fuel flow rate between units (per hour on both sides)
pub fn convert_fuel_flow(rate: f64, from: FuelUnit, to: FuelUnit) -> f64 {
    convert_fuel(rate, from, to)
}
