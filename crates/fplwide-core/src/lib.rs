//! # fplwide Core Library
//!
//! Reactive per-leg telemetry for a wide flight-plan page.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A signal graph with glitch-free, batched propagation
//! - Cumulative along-route distance with re-anchoring on the active leg
//! - Fuel remaining, endurance, ETE and ETA per leg
//! - Course, altitude and fix role formatting
//! - Display profiles for volumetric and mass fuel channels
//!
//! ## Example
//!
//! ```rust
//! use fplwide_core::prelude::*;
//!
//! let mut route = RouteTelemetry::new(DisplayProfile::mass());
//!
//! let mut leg = LegTelemetryState::new("KEMPR", LegType::TF);
//! leg.distance_m = Some(nmiles_to_meters(45.0));
//! route.rebuild(vec![leg]);
//!
//! route.tick(
//!     &TelemetryFrame::new()
//!         .with(TelemetryEvent::GroundSpeed(90.0))
//!         .with(TelemetryEvent::FuelFlow(60.0))
//!         .with(TelemetryEvent::FuelQuantity(300.0)),
//! );
//!
//! let row = route.outputs(0).unwrap();
//! assert_eq!(row.distance, "45.0");
//! assert_eq!(row.ete, "30:00");
//! assert_eq!(row.fuel_remaining, "270");
//! ```

pub mod binding;
pub mod config;
pub mod derive;
pub mod error;
pub mod route;
pub mod signal;
pub mod telemetry;
pub mod units;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::binding::{LegBinding, LegOutputs, RouteTelemetry, RowState};
    pub use crate::config::{DisplayProfile, HeaderStyle};
    pub use crate::error::{ConfigError, FixLookupError};
    pub use crate::route::{
        accumulate_route, AnchorContext, CumulativeDistance, FlightPathVector, LegType,
        LegTelemetryState,
    };
    pub use crate::signal::{Input, Signal, SignalGraph};
    pub use crate::telemetry::{TelemetryAdapter, TelemetryEvent, TelemetryFrame};
    pub use crate::units::{nmiles_to_meters, FuelUnit};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
