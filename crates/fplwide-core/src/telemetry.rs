//! Telemetry Source Adapter
//!
//! Republishes the host's live channels as input cells. Values are passed
//! through in the units the host reports; the `DisplayProfile` says what those
//! units are.
//!
//! Channel updates for one host frame are buffered and committed together so
//! every derived cell sees the whole frame at once.

use crate::signal::{Input, SignalGraph};
use serde::{Deserialize, Serialize};

/// Default for channels whose absence is signalled by a negative value
/// (bearings, tracks, distance remaining)
pub const NO_VALUE: f64 = -1.0;

/// A live channel exposed by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryChannel {
    /// Ground speed in knots
    GroundSpeed,
    /// Fuel flow, per hour, in the profile's flow unit
    FuelFlow,
    /// Fuel on board in the profile's quantity unit
    FuelQuantity,
    /// Simulator clock, epoch milliseconds
    SimTime,
    /// Bearing to the active fix, degrees
    ActiveLegBearing,
    /// Desired track of the active leg, degrees
    ActiveLegDtk,
    /// Distance remaining to the active fix, metres
    ActiveLegDistance,
    /// Identifier of the fix the navigation computer is tracking
    LnavWaypoint,
}

/// One channel update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "value", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Ground speed in knots
    GroundSpeed(f64),
    /// Fuel flow per hour
    FuelFlow(f64),
    /// Fuel on board
    FuelQuantity(f64),
    /// Simulator clock, epoch milliseconds
    SimTime(f64),
    /// Bearing to the active fix, degrees
    ActiveLegBearing(f64),
    /// Desired track of the active leg, degrees
    ActiveLegDtk(f64),
    /// Distance remaining to the active fix, metres
    ActiveLegDistance(f64),
    /// Tracked fix identifier, `None` when nothing is tracked
    LnavWaypoint(Option<String>),
}

impl TelemetryEvent {
    /// Channel this event updates
    pub fn channel(&self) -> TelemetryChannel {
        match self {
            TelemetryEvent::GroundSpeed(_) => TelemetryChannel::GroundSpeed,
            TelemetryEvent::FuelFlow(_) => TelemetryChannel::FuelFlow,
            TelemetryEvent::FuelQuantity(_) => TelemetryChannel::FuelQuantity,
            TelemetryEvent::SimTime(_) => TelemetryChannel::SimTime,
            TelemetryEvent::ActiveLegBearing(_) => TelemetryChannel::ActiveLegBearing,
            TelemetryEvent::ActiveLegDtk(_) => TelemetryChannel::ActiveLegDtk,
            TelemetryEvent::ActiveLegDistance(_) => TelemetryChannel::ActiveLegDistance,
            TelemetryEvent::LnavWaypoint(_) => TelemetryChannel::LnavWaypoint,
        }
    }
}

/// Channel values for one host frame; `None` leaves a channel unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryFrame {
    /// Ground speed in knots
    pub groundspeed_kts: Option<f64>,
    /// Fuel flow per hour
    pub fuel_flow: Option<f64>,
    /// Fuel on board
    pub fuel_quantity: Option<f64>,
    /// Simulator clock, epoch milliseconds
    pub sim_time_ms: Option<f64>,
    /// Bearing to the active fix, degrees
    pub active_leg_bearing_deg: Option<f64>,
    /// Desired track of the active leg, degrees
    pub active_leg_dtk_deg: Option<f64>,
    /// Distance remaining to the active fix, metres
    pub active_leg_distance_m: Option<f64>,
    /// Tracked fix identifier (outer `None` leaves it unchanged)
    ///
    /// In JSON an absent field leaves the channel unchanged and `null` clears it.
    #[serde(
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub lnav_waypoint: Option<Option<String>>,
}

/// Maps a present field (including `null`) to `Some`; absence falls back to the default
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl TelemetryFrame {
    /// Create an empty frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold an event into the frame; later events win
    pub fn merge(&mut self, event: TelemetryEvent) {
        match event {
            TelemetryEvent::GroundSpeed(v) => self.groundspeed_kts = Some(v),
            TelemetryEvent::FuelFlow(v) => self.fuel_flow = Some(v),
            TelemetryEvent::FuelQuantity(v) => self.fuel_quantity = Some(v),
            TelemetryEvent::SimTime(v) => self.sim_time_ms = Some(v),
            TelemetryEvent::ActiveLegBearing(v) => self.active_leg_bearing_deg = Some(v),
            TelemetryEvent::ActiveLegDtk(v) => self.active_leg_dtk_deg = Some(v),
            TelemetryEvent::ActiveLegDistance(v) => self.active_leg_distance_m = Some(v),
            TelemetryEvent::LnavWaypoint(ident) => self.lnav_waypoint = Some(ident),
        }
    }

    /// Builder form of `merge`
    pub fn with(mut self, event: TelemetryEvent) -> Self {
        self.merge(event);
        self
    }

    /// Whether the frame updates no channel
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Host-side source polled once per frame
pub trait TelemetrySource {
    /// Channel values that changed since the previous poll
    fn poll(&mut self) -> TelemetryFrame;
}

/// Authoritative active-leg state from the flight management system
pub trait ActiveLegService {
    /// Distance remaining to the active fix, metres (negative when unknown)
    fn active_leg_distance_m(&self) -> f64;

    /// Desired track of the active leg, degrees (negative when unknown)
    fn active_leg_dtk_deg(&self) -> f64;
}

/// Input cells for every telemetry channel
#[derive(Debug, Clone)]
pub struct TelemetryInputs {
    /// Ground speed in knots (default 0)
    pub groundspeed_kts: Input<f64>,
    /// Fuel flow per hour (default 0)
    pub fuel_flow: Input<f64>,
    /// Fuel on board (default 0)
    pub fuel_quantity: Input<f64>,
    /// Simulator clock, epoch milliseconds (default 0)
    pub sim_time_ms: Input<f64>,
    /// Bearing to the active fix (default `NO_VALUE`)
    pub active_leg_bearing_deg: Input<f64>,
    /// Desired track of the active leg (default `NO_VALUE`)
    pub active_leg_dtk_deg: Input<f64>,
    /// Distance remaining to the active fix (default `NO_VALUE`)
    pub active_leg_distance_m: Input<f64>,
    /// Tracked fix identifier (default `None`)
    pub lnav_waypoint: Input<Option<String>>,
}

impl TelemetryInputs {
    /// Create every channel on `graph` with its declared default
    pub fn new(graph: &SignalGraph) -> Self {
        Self {
            groundspeed_kts: graph.create(0.0),
            fuel_flow: graph.create(0.0),
            fuel_quantity: graph.create(0.0),
            sim_time_ms: graph.create(0.0),
            active_leg_bearing_deg: graph.create(NO_VALUE),
            active_leg_dtk_deg: graph.create(NO_VALUE),
            active_leg_distance_m: graph.create(NO_VALUE),
            lnav_waypoint: graph.create(None),
        }
    }

    /// Write every channel present in `frame` (propagation is the caller's batch)
    fn write(&self, frame: &TelemetryFrame) {
        let scalars = [
            (&self.groundspeed_kts, frame.groundspeed_kts),
            (&self.fuel_flow, frame.fuel_flow),
            (&self.fuel_quantity, frame.fuel_quantity),
            (&self.sim_time_ms, frame.sim_time_ms),
            (&self.active_leg_bearing_deg, frame.active_leg_bearing_deg),
            (&self.active_leg_dtk_deg, frame.active_leg_dtk_deg),
            (&self.active_leg_distance_m, frame.active_leg_distance_m),
        ];
        for (input, value) in scalars {
            if let Some(value) = value {
                input.set(value);
            }
        }
        if let Some(ident) = &frame.lnav_waypoint {
            self.lnav_waypoint.set(ident.clone());
        }
    }
}

/// Buffers channel updates and commits them as one propagation per frame
#[derive(Debug)]
pub struct TelemetryAdapter {
    graph: SignalGraph,
    inputs: TelemetryInputs,
    pending: TelemetryFrame,
}

impl TelemetryAdapter {
    /// Create the channel inputs on `graph`
    pub fn new(graph: &SignalGraph) -> Self {
        Self {
            graph: graph.clone(),
            inputs: TelemetryInputs::new(graph),
            pending: TelemetryFrame::default(),
        }
    }

    /// Channel input cells
    pub fn inputs(&self) -> &TelemetryInputs {
        &self.inputs
    }

    /// Buffer a channel update until `end_tick`
    pub fn publish(&mut self, event: TelemetryEvent) {
        self.pending.merge(event);
    }

    /// Buffer the active-leg service's current values until `end_tick`
    pub fn sync_active_leg(&mut self, service: &impl ActiveLegService) {
        self.publish(TelemetryEvent::ActiveLegDistance(service.active_leg_distance_m()));
        self.publish(TelemetryEvent::ActiveLegDtk(service.active_leg_dtk_deg()));
    }

    /// Whether updates are waiting for `end_tick`
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Commit buffered updates in one batch; returns false when nothing was pending
    pub fn end_tick(&mut self) -> bool {
        if self.pending.is_empty() {
            return false;
        }
        let frame = std::mem::take(&mut self.pending);
        self.apply_frame(&frame);
        true
    }

    /// Write a whole frame in one batch
    pub fn apply_frame(&self, frame: &TelemetryFrame) {
        self.graph.batch(|| self.inputs.write(frame));
        tracing::trace!(?frame, "telemetry frame committed");
    }

    /// Poll `source` and commit its frame together with anything buffered
    pub fn pump(&mut self, source: &mut impl TelemetrySource) -> bool {
        let frame = source.poll();
        merge_frames(&mut self.pending, frame);
        self.end_tick()
    }
}

fn merge_frames(into: &mut TelemetryFrame, from: TelemetryFrame) {
    let TelemetryFrame {
        groundspeed_kts,
        fuel_flow,
        fuel_quantity,
        sim_time_ms,
        active_leg_bearing_deg,
        active_leg_dtk_deg,
        active_leg_distance_m,
        lnav_waypoint,
    } = from;
    into.groundspeed_kts = groundspeed_kts.or(into.groundspeed_kts);
    into.fuel_flow = fuel_flow.or(into.fuel_flow);
    into.fuel_quantity = fuel_quantity.or(into.fuel_quantity);
    into.sim_time_ms = sim_time_ms.or(into.sim_time_ms);
    into.active_leg_bearing_deg = active_leg_bearing_deg.or(into.active_leg_bearing_deg);
    into.active_leg_dtk_deg = active_leg_dtk_deg.or(into.active_leg_dtk_deg);
    into.active_leg_distance_m = active_leg_distance_m.or(into.active_leg_distance_m);
    if lnav_waypoint.is_some() {
        into.lnav_waypoint = lnav_waypoint;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FixedSource(Vec<TelemetryFrame>);

    impl TelemetrySource for FixedSource {
        fn poll(&mut self) -> TelemetryFrame {
            if self.0.is_empty() {
                TelemetryFrame::default()
            } else {
                self.0.remove(0)
            }
        }
    }

    struct Fms {
        distance_m: f64,
        dtk_deg: f64,
    }

    impl ActiveLegService for Fms {
        fn active_leg_distance_m(&self) -> f64 {
            self.distance_m
        }

        fn active_leg_dtk_deg(&self) -> f64 {
            self.dtk_deg
        }
    }

    #[test]
    fn test_declared_defaults() {
        let graph = SignalGraph::new();
        let adapter = TelemetryAdapter::new(&graph);
        let inputs = adapter.inputs();
        assert_eq!(inputs.groundspeed_kts.get(), 0.0);
        assert_eq!(inputs.fuel_flow.get(), 0.0);
        assert_eq!(inputs.active_leg_bearing_deg.get(), NO_VALUE);
        assert_eq!(inputs.lnav_waypoint.get(), None);
    }

    #[test]
    fn test_events_wait_for_end_tick() {
        let graph = SignalGraph::new();
        let mut adapter = TelemetryAdapter::new(&graph);
        adapter.publish(TelemetryEvent::GroundSpeed(120.0));
        adapter.publish(TelemetryEvent::LnavWaypoint(Some("KPDX".to_string())));
        assert!(adapter.has_pending());
        assert_eq!(adapter.inputs().groundspeed_kts.get(), 0.0);

        assert!(adapter.end_tick());
        assert_eq!(adapter.inputs().groundspeed_kts.get(), 120.0);
        assert_eq!(adapter.inputs().lnav_waypoint.get().as_deref(), Some("KPDX"));
        assert!(!adapter.end_tick());
    }

    #[test]
    fn test_frame_commits_as_one_propagation() {
        let graph = SignalGraph::new();
        let mut adapter = TelemetryAdapter::new(&graph);
        let inputs = adapter.inputs().clone();

        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let hours = graph.map2(
            &inputs.fuel_quantity,
            &inputs.fuel_flow,
            move |qty, flow| {
                counter.set(counter.get() + 1);
                if *flow > 0.0 { qty / flow } else { 0.0 }
            },
        );

        adapter.publish(TelemetryEvent::FuelQuantity(300.0));
        adapter.publish(TelemetryEvent::FuelFlow(60.0));
        adapter.end_tick();

        assert_eq!(hours.get(), 5.0);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_pump_merges_source_over_pending() {
        let graph = SignalGraph::new();
        let mut adapter = TelemetryAdapter::new(&graph);
        adapter.sync_active_leg(&Fms {
            distance_m: 9260.0,
            dtk_deg: 271.0,
        });
        let mut source = FixedSource(vec![TelemetryFrame::new()
            .with(TelemetryEvent::GroundSpeed(95.0))
            .with(TelemetryEvent::ActiveLegDtk(272.0))]);

        assert!(adapter.pump(&mut source));
        let inputs = adapter.inputs();
        assert_eq!(inputs.groundspeed_kts.get(), 95.0);
        assert_eq!(inputs.active_leg_distance_m.get(), 9260.0);
        assert_eq!(inputs.active_leg_dtk_deg.get(), 272.0);

        assert!(!adapter.pump(&mut source));
    }

    #[test]
    fn test_frame_json_can_clear_waypoint() {
        let clear: TelemetryFrame = serde_json::from_str(r#"{"lnav_waypoint": null}"#).unwrap();
        assert_eq!(clear.lnav_waypoint, Some(None));

        let untouched: TelemetryFrame = serde_json::from_str(r#"{"groundspeed_kts": 120.0}"#).unwrap();
        assert_eq!(untouched.lnav_waypoint, None);

        let set: TelemetryFrame = serde_json::from_str(r#"{"lnav_waypoint": "KEMPR"}"#).unwrap();
        assert_eq!(set.lnav_waypoint, Some(Some("KEMPR".to_string())));

        let json = serde_json::to_string(&clear).unwrap();
        assert!(json.contains(r#""lnav_waypoint":null"#));
        let roundtrip: TelemetryFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(roundtrip, clear);
        assert!(!serde_json::to_string(&untouched).unwrap().contains("lnav_waypoint"));

        let graph = SignalGraph::new();
        let adapter = TelemetryAdapter::new(&graph);
        adapter.apply_frame(&set);
        assert_eq!(adapter.inputs().lnav_waypoint.get(), Some("KEMPR".to_string()));
        adapter.apply_frame(&untouched);
        assert_eq!(adapter.inputs().lnav_waypoint.get(), Some("KEMPR".to_string()));
        adapter.apply_frame(&clear);
        assert_eq!(adapter.inputs().lnav_waypoint.get(), None);
    }

    #[test]
    fn test_event_channel_and_json_shape() {
        let event = TelemetryEvent::FuelFlow(9.5);
        assert_eq!(event.channel(), TelemetryChannel::FuelFlow);
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"channel":"fuel_flow","value":9.5}"#);
    }
}
