//! Per-Leg Binding
//!
//! `RouteTelemetry` owns one signal graph per route: the leg list and every
//! telemetry channel are inputs, the accumulation pass is one derived cell over
//! the leg list and the anchor channels, and each mounted row is a
//! `LegBinding` of derived cells reading its slot of that pass.
//!
//! Route rebuilds and telemetry frames are each committed in a single batch, so
//! a row never combines a fresh distance with a stale ground speed.

use crate::config::DisplayProfile;
use crate::derive::{
    endurance, eta, ete, fix_type_label, format_fuel, fuel_remaining, AltitudeDisplay,
    CourseInputs,
};
use crate::route::{
    accumulate_route, AirwayIndent, AnchorContext, CumulativeDistance, LegTelemetryState,
};
use crate::signal::{AnySignal, Input, Signal, SignalGraph};
use crate::telemetry::{TelemetryAdapter, TelemetryEvent, TelemetryFrame, TelemetryInputs};
use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Formatted values for one row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LegOutputs {
    /// Fix name
    pub name: String,
    /// Fix role suffix (" faf", " hdg", ...)
    pub fix_type: &'static str,
    /// Desired track
    pub desired_track: String,
    /// Cumulative distance
    pub distance: String,
    /// Altitude column
    pub altitude: String,
    /// Fuel on board at the fix
    pub fuel_remaining: String,
    /// Endurance at the fix
    pub endurance: String,
    /// Estimated time en route
    pub ete: String,
    /// Estimated time of arrival
    pub eta: String,
    /// Bearing
    pub bearing: String,
    /// Presentation flags
    pub row: RowState,
}

/// Presentation flags for a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RowState {
    /// Row is shown and can take focus
    pub visible: bool,
    /// Leg is being flown
    pub active: bool,
    /// Leg is a holding pattern
    pub hold: bool,
    /// Airway indentation
    pub indent: AirwayIndent,
}

impl RowState {
    const EMPTY: RowState = RowState {
        visible: false,
        active: false,
        hold: false,
        indent: AirwayIndent::None,
    };

    fn for_leg(leg: &LegTelemetryState) -> Self {
        Self {
            visible: leg.is_visible(),
            active: leg.is_active,
            hold: leg.is_hold(),
            indent: leg.airway_indent(),
        }
    }
}

/// Route-level cells a binding reads from
#[derive(Clone)]
struct RouteSignals {
    legs: Signal<Vec<LegTelemetryState>>,
    distances: Signal<Vec<CumulativeDistance>>,
    telemetry: TelemetryInputs,
    profile: Rc<DisplayProfile>,
}

/// Derived cells for one mounted row
pub struct LegBinding {
    index: usize,
    name: Signal<String>,
    fix_type: Signal<&'static str>,
    desired_track: Signal<String>,
    distance: Signal<CumulativeDistance>,
    distance_text: Signal<String>,
    altitude: Signal<String>,
    fuel_remaining: Signal<Option<f64>>,
    fuel_text: Signal<String>,
    endurance: Signal<String>,
    ete: Signal<String>,
    eta: Signal<String>,
    bearing: Signal<String>,
    row: Signal<RowState>,
}

impl LegBinding {
    fn mount(route: &RouteSignals, index: usize) -> Self {
        let graph = route.legs.graph();
        let t = &route.telemetry;

        let leg = route.legs.map(move |legs| legs.get(index).cloned());
        let is_behind = leg.map(|leg| leg.as_ref().map_or(true, |l| l.is_behind));
        let distance = route.distances.map(move |d| {
            d.get(index).copied().unwrap_or(CumulativeDistance::Unavailable)
        });

        let name = leg.map(|leg| leg.as_ref().map(|l| l.name.clone()).unwrap_or_default());
        let fix_type = leg.map(|leg| {
            leg.as_ref().map_or("", |l| {
                fix_type_label(l.fix_type, &l.name, l.classification())
            })
        });
        let altitude = leg.map(|leg| {
            leg.as_ref()
                .map(|l| AltitudeDisplay::for_leg(l).to_string())
                .unwrap_or_default()
        });
        let row = leg.map(|leg| leg.as_ref().map_or(RowState::EMPTY, RowState::for_leg));

        let courses = graph.map3(
            &leg,
            &t.active_leg_dtk_deg,
            &t.active_leg_bearing_deg,
            |leg, dtk, brg| {
                leg.as_ref()
                    .map_or(CourseInputs::NONE, |l| CourseInputs::select(l, *dtk, *brg))
            },
        );
        let desired_track = graph.map2(&courses, &is_behind, |c, behind| c.dtk_text(*behind));
        let bearing = courses.map(CourseInputs::bearing_text);

        let distance_text = distance.map(|d| d.to_string());

        let fuel_remaining = {
            let profile = Rc::clone(&route.profile);
            let (d, behind) = (distance.clone(), is_behind.clone());
            let (gs, flow, qty) = (
                t.groundspeed_kts.signal().clone(),
                t.fuel_flow.signal().clone(),
                t.fuel_quantity.signal().clone(),
            );
            graph.combine(
                &[
                    &distance as &dyn AnySignal,
                    &is_behind,
                    &t.groundspeed_kts,
                    &t.fuel_flow,
                    &t.fuel_quantity,
                ],
                move || {
                    fuel_remaining(d.get(), behind.get(), gs.get(), flow.get(), qty.get(), &profile)
                },
            )
        };
        let fuel_text = fuel_remaining.map(|f| format_fuel(*f));
        let endurance = {
            let profile = Rc::clone(&route.profile);
            graph.map2(&fuel_remaining, &t.fuel_flow, move |fuel, flow| {
                endurance(*fuel, *flow, &profile)
            })
        };

        let ete = graph.map3(&distance, &is_behind, &t.groundspeed_kts, |d, behind, gs| {
            ete(*d, *behind, *gs)
        });
        let eta = graph.map4(
            &distance,
            &is_behind,
            &t.groundspeed_kts,
            &t.sim_time_ms,
            |d, behind, gs, now| eta(*d, *behind, *gs, *now),
        );

        tracing::trace!(index, "mounted leg binding");

        Self {
            index,
            name,
            fix_type,
            desired_track,
            distance,
            distance_text,
            altitude,
            fuel_remaining,
            fuel_text,
            endurance,
            ete,
            eta,
            bearing,
            row,
        }
    }

    /// Position of the bound leg in the route
    pub fn index(&self) -> usize {
        self.index
    }

    /// Cumulative distance cell
    pub fn distance(&self) -> &Signal<CumulativeDistance> {
        &self.distance
    }

    /// Fuel on board at the fix, in the display unit
    pub fn fuel_remaining(&self) -> &Signal<Option<f64>> {
        &self.fuel_remaining
    }

    /// Estimated time en route cell
    pub fn ete(&self) -> &Signal<String> {
        &self.ete
    }

    /// Snapshot of every formatted value
    pub fn outputs(&self) -> LegOutputs {
        LegOutputs {
            name: self.name.get(),
            fix_type: self.fix_type.get(),
            desired_track: self.desired_track.get(),
            distance: self.distance_text.get(),
            altitude: self.altitude.get(),
            fuel_remaining: self.fuel_text.get(),
            endurance: self.endurance.get(),
            ete: self.ete.get(),
            eta: self.eta.get(),
            bearing: self.bearing.get(),
            row: self.row.get(),
        }
    }
}

/// Leg telemetry for one route: inputs, accumulation and mounted rows
pub struct RouteTelemetry {
    graph: SignalGraph,
    profile: Rc<DisplayProfile>,
    telemetry: TelemetryAdapter,
    legs: Input<Vec<LegTelemetryState>>,
    signals: RouteSignals,
    bindings: BTreeMap<usize, LegBinding>,
}

impl RouteTelemetry {
    /// Create an empty route using `profile` for fuel units
    pub fn new(profile: DisplayProfile) -> Self {
        let graph = SignalGraph::new();
        let profile = Rc::new(profile);
        let telemetry = TelemetryAdapter::new(&graph);
        let legs: Input<Vec<LegTelemetryState>> = graph.create(Vec::new());

        let t = telemetry.inputs();
        let distances = graph.map3(
            &legs,
            &t.lnav_waypoint,
            &t.active_leg_distance_m,
            |legs, waypoint, distance_m| {
                accumulate_route(legs, &AnchorContext::new(waypoint.as_deref(), *distance_m))
            },
        );

        let signals = RouteSignals {
            legs: legs.signal().clone(),
            distances,
            telemetry: t.clone(),
            profile: Rc::clone(&profile),
        };

        Self {
            graph,
            profile,
            telemetry,
            legs,
            signals,
            bindings: BTreeMap::new(),
        }
    }

    /// Signal graph backing this route
    pub fn graph(&self) -> &SignalGraph {
        &self.graph
    }

    /// Display profile in use
    pub fn profile(&self) -> &DisplayProfile {
        &self.profile
    }

    /// Header row for the current profile
    pub fn column_headers(&self) -> [&'static str; 7] {
        self.profile.column_headers()
    }

    /// Telemetry input cells
    pub fn telemetry(&self) -> &TelemetryInputs {
        self.telemetry.inputs()
    }

    /// Telemetry adapter, for hosts that publish events or pump a source
    pub fn telemetry_adapter(&mut self) -> &mut TelemetryAdapter {
        &mut self.telemetry
    }

    /// Number of legs in the current route
    pub fn leg_count(&self) -> usize {
        self.legs.with(Vec::len)
    }

    /// Cumulative distance of every leg from the latest pass
    pub fn distances(&self) -> Vec<CumulativeDistance> {
        self.signals.distances.get()
    }

    /// Replace the leg list and mount a row for every visible leg
    ///
    /// Hidden legs still take part in accumulation but get no row. Rows past
    /// the end of the new list, or whose leg is now hidden, are unmounted.
    pub fn rebuild(&mut self, legs: Vec<LegTelemetryState>) {
        let count = legs.len();
        let visible: Vec<bool> = legs.iter().map(LegTelemetryState::is_visible).collect();
        let graph = self.graph.clone();
        graph.batch(|| {
            self.legs.set(legs);
            self.bindings
                .retain(|index, _| visible.get(*index).copied().unwrap_or(false));
            for index in 0..count {
                self.mount(index);
            }
        });
        tracing::debug!(legs = count, mounted = self.bindings.len(), "route rebuilt");
    }

    /// Mount the row for `index`; returns false when already mounted, hidden or out of range
    pub fn mount(&mut self, index: usize) -> bool {
        let visible = self
            .legs
            .with(|legs| legs.get(index).is_some_and(LegTelemetryState::is_visible));
        if !visible || self.bindings.contains_key(&index) {
            return false;
        }
        self.bindings
            .insert(index, LegBinding::mount(&self.signals, index));
        true
    }

    /// Tear down the row for `index`; returns false when it was not mounted
    pub fn unmount(&mut self, index: usize) -> bool {
        let removed = self.bindings.remove(&index).is_some();
        if removed {
            tracing::trace!(index, "unmounted leg binding");
        }
        removed
    }

    /// Mounted binding for `index`
    pub fn binding(&self, index: usize) -> Option<&LegBinding> {
        self.bindings.get(&index)
    }

    /// Commit one telemetry frame
    pub fn tick(&mut self, frame: &TelemetryFrame) {
        self.telemetry.apply_frame(frame);
    }

    /// Buffer a channel update until `end_tick`
    pub fn publish(&mut self, event: TelemetryEvent) {
        self.telemetry.publish(event);
    }

    /// Commit buffered channel updates
    pub fn end_tick(&mut self) -> bool {
        self.telemetry.end_tick()
    }

    /// Outputs of a mounted row
    pub fn outputs(&self, index: usize) -> Option<LegOutputs> {
        self.bindings.get(&index).map(LegBinding::outputs)
    }

    /// Outputs of every mounted row, in leg order
    pub fn all_outputs(&self) -> Vec<LegOutputs> {
        self.bindings.values().map(LegBinding::outputs).collect()
    }

    /// Outputs of mounted rows that are shown
    pub fn visible_outputs(&self) -> Vec<LegOutputs> {
        self.bindings
            .values()
            .map(LegBinding::outputs)
            .filter(|o| o.row.visible)
            .collect()
    }
}
