use fplwide_core::binding::RouteTelemetry;
use fplwide_core::config::{DisplayProfile, HeaderStyle};
use fplwide_core::route::{LegTelemetryState, LegType};
use fplwide_core::telemetry::{TelemetryEvent, TelemetryFrame};
use fplwide_core::units::{nmiles_to_meters, FuelUnit};
use pretty_assertions::assert_eq;

const HOST_PROFILE: &str = r#"{
    "name": "turboprop",
    "fuel_quantity_unit": "pounds",
    "fuel_flow_unit": "pounds",
    "display_fuel_unit": "pounds",
    "header_style": "per_leg"
}"#;

#[test]
fn test_host_profile_drives_route() -> anyhow::Result<()> {
    let profile = DisplayProfile::from_json(HOST_PROFILE)?;
    assert_eq!(profile.header_style, HeaderStyle::PerLeg);
    assert_eq!(profile.fuel_flow_unit.flow_label(), "PPH");

    let mut leg = LegTelemetryState::new("KEMPR", LegType::TF);
    leg.distance_m = Some(nmiles_to_meters(100.0));

    let mut route = RouteTelemetry::new(profile);
    route.rebuild(vec![leg]);
    route.tick(
        &TelemetryFrame::new()
            .with(TelemetryEvent::GroundSpeed(200.0))
            .with(TelemetryEvent::FuelFlow(400.0))
            .with(TelemetryEvent::FuelQuantity(1500.0)),
    );

    let row = route
        .outputs(0)
        .ok_or_else(|| anyhow::anyhow!("row 0 not mounted"))?;
    assert_eq!(row.distance, "100");
    assert_eq!(row.fuel_remaining, "1300");
    assert_eq!(row.endurance, "3+15");
    assert_eq!(route.column_headers()[1], "DIS");
    Ok(())
}

#[test]
fn test_profile_json_roundtrip() -> anyhow::Result<()> {
    let volumetric = DisplayProfile::volumetric();
    let parsed = DisplayProfile::from_json(&volumetric.to_json()?)?;
    assert_eq!(parsed, volumetric);
    assert_eq!(parsed.fuel_quantity_unit, FuelUnit::Gallons);
    Ok(())
}

#[test]
fn test_profile_rejects_bad_json() {
    assert!(DisplayProfile::from_json("{").is_err());
    assert!(DisplayProfile::from_json(r#"{"name": ""}"#).is_err());
}
