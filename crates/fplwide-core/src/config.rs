//! Display profile configuration
//!
//! A product variant of the wide flight-plan page differs only in the units its
//! fuel channels report and in its column headers. Both are described by a
//! `DisplayProfile` instead of a separate component per variant.

use crate::error::ConfigError;
use crate::units::{convert_fuel, convert_fuel_flow, FuelUnit};
use serde::{Deserialize, Serialize};

/// Column header wording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderStyle {
    /// "CUM DIS" / "CUM ETE"
    Cumulative,
    /// "DIS" / "ETE"
    PerLeg,
}

/// Units and labels for one product variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayProfile {
    /// Profile name
    pub name: String,
    /// Unit of the fuel quantity channel
    pub fuel_quantity_unit: FuelUnit,
    /// Unit (per hour) of the fuel flow channel
    pub fuel_flow_unit: FuelUnit,
    /// Unit fuel remaining and endurance are computed in
    pub display_fuel_unit: FuelUnit,
    /// Column header wording
    pub header_style: HeaderStyle,
}

impl Default for DisplayProfile {
    fn default() -> Self {
        Self::volumetric()
    }
}

impl DisplayProfile {
    /// Gallon-based fuel channels, shown in pounds
    pub fn volumetric() -> Self {
        Self {
            name: "volumetric".to_string(),
            fuel_quantity_unit: FuelUnit::Gallons,
            fuel_flow_unit: FuelUnit::Gallons,
            display_fuel_unit: FuelUnit::Pounds,
            header_style: HeaderStyle::Cumulative,
        }
    }

    /// Pound-based fuel channels
    pub fn mass() -> Self {
        Self {
            name: "mass".to_string(),
            fuel_quantity_unit: FuelUnit::Pounds,
            fuel_flow_unit: FuelUnit::Pounds,
            display_fuel_unit: FuelUnit::Pounds,
            header_style: HeaderStyle::PerLeg,
        }
    }

    /// Parse and validate a profile from JSON text
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let profile: DisplayProfile = serde_json::from_str(json)?;
        profile.validate()?;
        tracing::debug!(
            name = %profile.name,
            quantity = ?profile.fuel_quantity_unit,
            flow = ?profile.fuel_flow_unit,
            "loaded display profile"
        );
        Ok(profile)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the profile is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::InvalidValueError {
                field: "name".to_string(),
                message: "profile name must not be empty".to_string(),
            });
        }
        if self.fuel_quantity_unit != self.fuel_flow_unit {
            tracing::warn!(
                name = %self.name,
                "fuel quantity and flow channels use different units"
            );
        }
        Ok(())
    }

    /// Fuel quantity channel value in the display unit
    pub fn quantity_to_display(&self, quantity: f64) -> f64 {
        convert_fuel(quantity, self.fuel_quantity_unit, self.display_fuel_unit)
    }

    /// Fuel flow channel value in the display unit per hour
    pub fn flow_to_display(&self, flow: f64) -> f64 {
        convert_fuel_flow(flow, self.fuel_flow_unit, self.display_fuel_unit)
    }

    /// Header row, left to right
    pub fn column_headers(&self) -> [&'static str; 7] {
        match self.header_style {
            HeaderStyle::Cumulative => {
                ["DTK", "CUM DIS", "ALT", "Fuel REM", "CUM ETE", "ETA", "BRG"]
            }
            HeaderStyle::PerLeg => ["DTK", "DIS", "ALT", "Fuel REM", "ETE", "ETA", "BRG"],
        }
    }
}
