//! Error types for profile configuration and fix lookup

use thiserror::Error;

/// Errors that can occur while loading a display profile
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Profile parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {message}")]
    InvalidValueError { field: String, message: String },
}

/// Errors from resolving a leg's fix to an information page
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixLookupError {
    #[error("Leg type {0} has no information page")]
    NotViewable(String),

    #[error("Fix ICAO is empty")]
    EmptyIcao,

    #[error("Unknown facility type '{facility}' in ICAO '{icao}'")]
    UnknownFacilityType { icao: String, facility: char },

    #[error("Facility type '{0}' has no information page")]
    NoInformationPage(char),
}
