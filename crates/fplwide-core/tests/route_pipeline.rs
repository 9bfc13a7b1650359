use fplwide_core::binding::RouteTelemetry;
use fplwide_core::config::DisplayProfile;
use fplwide_core::route::{AirwayIndent, FlightPathVector, LegTelemetryState, LegType};
use fplwide_core::telemetry::{TelemetryEvent, TelemetryFrame};
use fplwide_core::units::nmiles_to_meters;
use pretty_assertions::assert_eq;
use std::cell::Cell;
use std::rc::Rc;

/// 2024-01-01T12:00:00Z
const NOON_MS: f64 = 1_704_110_400_000.0;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn tf(name: &str, nm: f64, dtk: f64) -> LegTelemetryState {
    let mut leg = LegTelemetryState::new(name, LegType::TF);
    leg.fix_icao = format!("W{name}");
    leg.distance_m = Some(nmiles_to_meters(nm));
    leg.initial_dtk_deg = Some(dtk);
    leg
}

fn cruise_frame(groundspeed_kts: f64) -> TelemetryFrame {
    TelemetryFrame::new()
        .with(TelemetryEvent::GroundSpeed(groundspeed_kts))
        .with(TelemetryEvent::FuelFlow(60.0))
        .with(TelemetryEvent::FuelQuantity(300.0))
        .with(TelemetryEvent::SimTime(NOON_MS))
}

fn column(route: &RouteTelemetry, f: impl Fn(&fplwide_core::binding::LegOutputs) -> String) -> Vec<String> {
    route.all_outputs().iter().map(f).collect()
}

#[test]
fn test_cumulative_distance_sums_legs() {
    init_tracing();
    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 10.0, 90.0), tf("B", 12.5, 95.0), tf("C", 7.5, 100.0)]);

    assert_eq!(column(&route, |o| o.distance.clone()), vec!["10.0", "22.5", "30.0"]);
    assert_eq!(column(&route, |o| o.desired_track.clone()), vec!["090", "095", "100"]);
}

#[test]
fn test_low_groundspeed_shows_placeholders() {
    init_tracing();
    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 45.0, 90.0)]);
    route.tick(&cruise_frame(30.0));

    let row = route.outputs(0).expect("row mounted");
    assert_eq!(row.distance, "45.0");
    assert_eq!(row.fuel_remaining, "_____");
    assert_eq!(row.endurance, "_____");
    assert_eq!(row.ete, "_____");
    assert_eq!(row.eta, "_____");

    route.tick(&cruise_frame(90.0));
    let row = route.outputs(0).expect("row mounted");
    assert_eq!(row.fuel_remaining, "270");
    assert_eq!(row.endurance, "4+30");
    assert_eq!(row.ete, "30:00");
    assert_eq!(row.eta, "12:30");
}

#[test]
fn test_long_leg_switches_ete_format() {
    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 180.0, 90.0)]);
    route.tick(&cruise_frame(90.0));

    let row = route.outputs(0).expect("row mounted");
    assert_eq!(row.distance, "180");
    assert_eq!(row.ete, "02+00");
    assert_eq!(row.eta, "14:00");
}

#[test]
fn test_active_leg_reanchors_following_rows() {
    init_tracing();
    let mut legs = vec![tf("A", 10.0, 90.0), tf("B", 20.0, 95.0), tf("C", 5.0, 100.0)];
    legs[0].is_behind = true;
    legs[1].is_active = true;

    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(legs);
    // no distance remaining reported yet, so nothing past the active leg is known
    assert_eq!(column(&route, |o| o.distance.clone()), vec!["____", "____", "____"]);

    route.tick(
        &TelemetryFrame::new()
            .with(TelemetryEvent::ActiveLegDistance(nmiles_to_meters(3.0)))
            .with(TelemetryEvent::ActiveLegDtk(123.4))
            .with(TelemetryEvent::ActiveLegBearing(359.6)),
    );

    assert_eq!(column(&route, |o| o.distance.clone()), vec!["____", "3.0", "8.0"]);
    assert_eq!(column(&route, |o| o.desired_track.clone()), vec!["___", "123", "100"]);
    assert_eq!(column(&route, |o| o.bearing.clone()), vec!["090", "360", "100"]);

    let active = route.outputs(1).expect("row mounted");
    assert!(active.row.active);
}

#[test]
fn test_lnav_waypoint_reanchors() {
    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 10.0, 90.0), tf("B", 20.0, 95.0), tf("C", 5.0, 100.0)]);

    route.publish(TelemetryEvent::LnavWaypoint(Some("B".to_string())));
    route.publish(TelemetryEvent::ActiveLegDistance(nmiles_to_meters(7.5)));
    assert!(route.end_tick());
    assert_eq!(column(&route, |o| o.distance.clone()), vec!["10.0", "7.5", "12.5"]);

    route.publish(TelemetryEvent::LnavWaypoint(None));
    route.end_tick();
    assert_eq!(column(&route, |o| o.distance.clone()), vec!["10.0", "30.0", "35.0"]);
}

#[test]
fn test_identical_snapshots_give_identical_outputs() {
    let legs = vec![tf("A", 10.0, 90.0), tf("B", 99.96, 95.0)];
    let frame = cruise_frame(120.0);

    let mut first = RouteTelemetry::new(DisplayProfile::mass());
    first.rebuild(legs.clone());
    first.tick(&frame);
    let before = first.all_outputs();
    first.tick(&frame);
    first.rebuild(legs.clone());
    assert_eq!(first.all_outputs(), before);

    let mut second = RouteTelemetry::new(DisplayProfile::mass());
    second.tick(&frame);
    second.rebuild(legs);
    assert_eq!(second.all_outputs(), before);
}

#[test]
fn test_tick_recomputes_each_row_once() {
    let mut legs = vec![tf("A", 10.0, 90.0), tf("B", 20.0, 95.0)];
    legs[0].is_active = true;

    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(legs);

    let runs = Rc::new(Cell::new(0));
    let counter = Rc::clone(&runs);
    let binding = route.binding(1).expect("row mounted");
    let _watch = binding.ete().map(move |ete| {
        counter.set(counter.get() + 1);
        ete.clone()
    });
    assert_eq!(runs.get(), 1);

    // distance and ground speed change in the same frame
    route.tick(
        &cruise_frame(120.0).with(TelemetryEvent::ActiveLegDistance(nmiles_to_meters(4.0))),
    );
    assert_eq!(runs.get(), 2);
    assert_eq!(route.outputs(1).map(|o| o.ete), Some("12:00".to_string()));

    // nothing this row reads changed
    route.tick(&TelemetryFrame::new().with(TelemetryEvent::SimTime(NOON_MS + 1_000.0)));
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_volumetric_profile_converts_fuel() {
    let mut route = RouteTelemetry::new(DisplayProfile::volumetric());
    route.rebuild(vec![tf("A", 40.0, 90.0)]);
    route.tick(
        &TelemetryFrame::new()
            .with(TelemetryEvent::GroundSpeed(80.0))
            .with(TelemetryEvent::FuelFlow(8.0))
            .with(TelemetryEvent::FuelQuantity(40.0)),
    );

    let row = route.outputs(0).expect("row mounted");
    // 268 lb on board, 26.8 lb burned
    assert_eq!(row.fuel_remaining, "241");
    assert_eq!(row.endurance, "4+30");
    assert_eq!(
        route.column_headers(),
        ["DTK", "CUM DIS", "ALT", "Fuel REM", "CUM ETE", "ETA", "BRG"]
    );
}

#[test]
fn test_collapsed_airway_rows() {
    let mut member = tf("M1", 30.0, 45.0);
    member.is_collapsed = true;
    member.is_airway_fix = true;
    let mut exit = tf("EXIT", 8.0, 50.0);
    exit.is_collapsed = true;
    exit.is_airway_fix = true;
    exit.is_airway_exit_fix = true;
    exit.airway_distance_m = Some(nmiles_to_meters(50.0));

    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 10.0, 90.0), member, exit]);

    // the collapsed member keeps its place in the pass but gets no row
    assert!(route.binding(1).is_none());
    let shown = route.all_outputs();
    assert_eq!(shown.len(), 2);
    assert_eq!(route.visible_outputs(), shown);
    let exit_row = &shown[1];
    assert_eq!(exit_row.name, "EXIT");
    assert_eq!(exit_row.distance, "90.0");
    assert_eq!(exit_row.desired_track, "___");
    assert_eq!(exit_row.bearing, "___");
    assert_eq!(exit_row.row.indent, AirwayIndent::ExitFix);
}

#[test]
fn test_unknown_distance_remaining_blanks_later_rows() {
    let mut legs = vec![tf("A", 20.0, 90.0), tf("B", 5.0, 95.0)];
    legs[0].is_active = true;

    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(legs);
    route.tick(
        &TelemetryFrame::new()
            .with(TelemetryEvent::GroundSpeed(100.0))
            .with(TelemetryEvent::FuelFlow(60.0))
            .with(TelemetryEvent::FuelQuantity(300.0)),
    );

    let later = route.outputs(1).expect("row mounted");
    assert_eq!(later.distance, "____");
    assert_eq!(later.ete, "_____");
    assert_eq!(later.fuel_remaining, "_____");
    assert_eq!(later.eta, "_____");

    route.tick(&TelemetryFrame::new().with(TelemetryEvent::ActiveLegDistance(nmiles_to_meters(4.0))));
    let later = route.outputs(1).expect("row mounted");
    assert_eq!(later.distance, "9.0");
    assert_eq!(later.fuel_remaining, "295");
}

#[test]
fn test_airway_exit_without_aggregate_blanks_later_rows() {
    let mut exit = tf("EXIT", 8.0, 50.0);
    exit.is_collapsed = true;
    exit.is_airway_fix = true;
    exit.is_airway_exit_fix = true;

    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 10.0, 90.0), exit, tf("B", 5.0, 90.0)]);
    assert_eq!(column(&route, |o| o.distance.clone()), vec!["10.0", "____", "____"]);
}

#[test]
fn test_hold_row() {
    let mut hold = LegTelemetryState::new("HOLD", LegType::HM);
    hold.fix_icao = "WHOLD".to_string();
    hold.distance_m = Some(nmiles_to_meters(40.0));
    hold.course_deg = Some(270.0);
    hold.flight_path = vec![
        FlightPathVector::new(nmiles_to_meters(20.0)),
        FlightPathVector::new(nmiles_to_meters(2.0)),
    ];

    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 10.0, 90.0), hold, tf("B", 5.0, 90.0)]);

    let row = route.outputs(1).expect("row mounted");
    assert!(row.row.hold);
    assert_eq!(row.distance, "12.0");
    assert_eq!(row.desired_track, "270");
    assert_eq!(route.outputs(2).map(|o| o.distance), Some("17.0".to_string()));
}

#[test]
fn test_altitude_and_fix_role_columns() {
    let mut faf = tf("FAF", 10.0, 90.0);
    faf.fix_type = fplwide_core::route::FixTypeFlags::FAF;
    faf.target_altitude_m = Some(609.6);

    let mut runway = tf("RW27", 5.0, 270.0);
    runway.fix_icao = "R  KXYZ RW27".to_string();
    runway.target_altitude_m = Some(30.0);

    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![faf, runway]);

    let rows = route.all_outputs();
    assert_eq!(rows[0].fix_type, " faf");
    assert_eq!(rows[0].altitude, "2000FT");
    assert_eq!(rows[1].fix_type, "");
    assert_eq!(rows[1].altitude, "");
}

#[test]
fn test_rebuild_drops_rows_past_the_end() {
    let mut route = RouteTelemetry::new(DisplayProfile::mass());
    route.rebuild(vec![tf("A", 10.0, 90.0), tf("B", 20.0, 95.0), tf("C", 5.0, 100.0)]);
    assert_eq!(route.all_outputs().len(), 3);

    route.rebuild(vec![tf("C", 5.0, 100.0)]);
    let rows = route.all_outputs();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "C");
    assert_eq!(rows[0].distance, "5.0");
    assert_eq!(route.distances().len(), 1);
}
