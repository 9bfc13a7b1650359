//! Leg state as delivered by the flight plan feed
//!
//! A `LegTelemetryState` is rebuilt wholesale whenever the route changes.
//! Everything downstream dispatches on `LegClassification`, derived from the
//! ARINC 424 leg type by one exhaustive match.

use crate::error::FixLookupError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Leg name the flight plan uses for manually sequenced heading legs
pub const MANUAL_SEQUENCE_LEG_NAME: &str = "MANSEQ";

/// ARINC 424 path-and-terminator leg type
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LegType {
    /// Type not reported
    #[default]
    Unknown,
    /// Arc to fix (DME arc)
    AF,
    /// Course to altitude
    CA,
    /// Course to DME distance
    CD,
    /// Course to fix
    CF,
    /// Course to intercept
    CI,
    /// Course to radial
    CR,
    /// Direct to fix
    DF,
    /// Fix to altitude
    FA,
    /// Track from fix for a distance
    FC,
    /// Track from fix to DME distance
    FD,
    /// From fix to manual termination
    FM,
    /// Hold to altitude
    HA,
    /// Hold to fix (single circuit)
    HF,
    /// Hold to manual termination
    HM,
    /// Initial fix
    IF,
    /// Procedure turn
    PI,
    /// Constant radius arc
    RF,
    /// Track to fix
    TF,
    /// Heading to altitude
    VA,
    /// Heading to DME distance
    VD,
    /// Heading to intercept
    VI,
    /// Heading to manual termination
    VM,
    /// Heading to radial
    VR,
    /// Route discontinuity
    Discontinuity,
    /// Discontinuity the route passes through
    ThruDiscontinuity,
}

impl fmt::Display for LegType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl LegType {
    /// Leg types whose fix has an information page
    pub fn is_viewable(self) -> bool {
        matches!(
            self,
            LegType::AF | LegType::CF | LegType::DF | LegType::IF | LegType::RF | LegType::TF
        )
    }
}

/// How a heading leg terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadingTermination {
    /// Reaching an altitude (VA)
    Altitude,
    /// Reaching a DME distance (VD)
    Distance,
    /// Intercepting the next leg (VI)
    Intercept,
    /// Crossing a radial (VR)
    Radial,
    /// Pilot action (VM, FM)
    Manual,
}

/// Holding pattern variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HoldKind {
    /// Terminates at the fix after one circuit (HF)
    ToFix,
    /// Continues until the pilot exits (HM)
    Manual,
    /// Terminates reaching an altitude (HA)
    ToAltitude,
}

/// Leg classification driving accumulation and display rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LegClassification {
    /// Normal fix-to-fix geometry
    PointToPoint,
    /// Heading leg terminated by a condition rather than a fix
    HeadingTo(HeadingTermination),
    /// Racetrack holding pattern
    Hold(HoldKind),
    /// Route discontinuity
    Discontinuity,
    /// Direct-to override leg
    DirectTo,
}

impl LegClassification {
    /// Classify a leg from its type and direct-to flag
    pub fn from_leg(leg_type: LegType, is_direct_to: bool) -> Self {
        if is_direct_to {
            return LegClassification::DirectTo;
        }
        match leg_type {
            LegType::HF => LegClassification::Hold(HoldKind::ToFix),
            LegType::HM => LegClassification::Hold(HoldKind::Manual),
            LegType::HA => LegClassification::Hold(HoldKind::ToAltitude),
            LegType::VA => LegClassification::HeadingTo(HeadingTermination::Altitude),
            LegType::VD => LegClassification::HeadingTo(HeadingTermination::Distance),
            LegType::VI => LegClassification::HeadingTo(HeadingTermination::Intercept),
            LegType::VR => LegClassification::HeadingTo(HeadingTermination::Radial),
            LegType::VM | LegType::FM => {
                LegClassification::HeadingTo(HeadingTermination::Manual)
            }
            LegType::Discontinuity | LegType::ThruDiscontinuity => {
                LegClassification::Discontinuity
            }
            LegType::Unknown
            | LegType::AF
            | LegType::CA
            | LegType::CD
            | LegType::CF
            | LegType::CI
            | LegType::CR
            | LegType::DF
            | LegType::FA
            | LegType::FC
            | LegType::FD
            | LegType::IF
            | LegType::PI
            | LegType::RF
            | LegType::TF => LegClassification::PointToPoint,
        }
    }
}

/// Procedure fix role flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FixTypeFlags(pub u8);

impl FixTypeFlags {
    /// No special role
    pub const NONE: FixTypeFlags = FixTypeFlags(0);
    /// Initial approach fix
    pub const IAF: FixTypeFlags = FixTypeFlags(1 << 0);
    /// Intermediate fix
    pub const IF: FixTypeFlags = FixTypeFlags(1 << 1);
    /// Missed approach point
    pub const MAP: FixTypeFlags = FixTypeFlags(1 << 2);
    /// Final approach fix
    pub const FAF: FixTypeFlags = FixTypeFlags(1 << 3);
    /// Missed approach holding point
    pub const MAHP: FixTypeFlags = FixTypeFlags(1 << 4);

    /// Whether every bit of `other` is set
    pub fn contains(self, other: FixTypeFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for FixTypeFlags {
    type Output = FixTypeFlags;

    fn bitor(self, rhs: FixTypeFlags) -> FixTypeFlags {
        FixTypeFlags(self.0 | rhs.0)
    }
}

/// Flight plan segment a leg belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SegmentType {
    /// Origin airport
    Origin,
    /// Departure procedure
    Departure,
    /// Enroute
    #[default]
    Enroute,
    /// Arrival procedure
    Arrival,
    /// Approach procedure
    Approach,
    /// Destination airport
    Destination,
    /// Missed approach procedure
    MissedApproach,
}

/// One vector of a leg's calculated flight path
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FlightPathVector {
    /// Vector length in metres
    pub distance_m: f64,
}

impl FlightPathVector {
    /// Create a vector of the given length
    pub fn new(distance_m: f64) -> Self {
        Self { distance_m }
    }
}

/// Indentation of an airway row under its entry fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AirwayIndent {
    /// Not part of an airway
    None,
    /// Airway exit fix
    ExitFix,
    /// Fix inside an airway
    Member,
}

/// Facility category encoded in the first character of an ICAO string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacilityKind {
    /// `A`
    Airport,
    /// `W`
    Intersection,
    /// `V`
    Vor,
    /// `N`
    Ndb,
    /// `U`
    User,
    /// `R`
    Runway,
    /// `S`
    VisualApproach,
}

impl FacilityKind {
    /// Facility type of an ICAO string
    pub fn from_icao(icao: &str) -> Result<Self, FixLookupError> {
        let first = icao.chars().next().ok_or(FixLookupError::EmptyIcao)?;
        match first {
            'A' => Ok(FacilityKind::Airport),
            'W' => Ok(FacilityKind::Intersection),
            'V' => Ok(FacilityKind::Vor),
            'N' => Ok(FacilityKind::Ndb),
            'U' => Ok(FacilityKind::User),
            'R' => Ok(FacilityKind::Runway),
            'S' => Ok(FacilityKind::VisualApproach),
            other => Err(FixLookupError::UnknownFacilityType {
                icao: icao.to_string(),
                facility: other,
            }),
        }
    }

    fn type_char(self) -> char {
        match self {
            FacilityKind::Airport => 'A',
            FacilityKind::Intersection => 'W',
            FacilityKind::Vor => 'V',
            FacilityKind::Ndb => 'N',
            FacilityKind::User => 'U',
            FacilityKind::Runway => 'R',
            FacilityKind::VisualApproach => 'S',
        }
    }
}

/// Information page the host opens for a fix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfoPage {
    /// Airport information
    Airport,
    /// Intersection information
    Intersection,
    /// VOR information
    Vor,
    /// NDB information
    Ndb,
}

impl InfoPage {
    /// View name registered with the host view service
    pub fn view_name(self) -> &'static str {
        match self {
            InfoPage::Airport => "AirportInformation",
            InfoPage::Intersection => "IntersectionInformation",
            InfoPage::Vor => "VorInformation",
            InfoPage::Ndb => "NdbInformation",
        }
    }
}

/// Per-leg state from the flight plan feed
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegTelemetryState {
    /// Fix identifier shown on the row
    pub name: String,
    /// ARINC 424 leg type
    pub leg_type: LegType,
    /// Fix ICAO string (first character is the facility type)
    pub fix_icao: String,
    /// Leg is a direct-to override
    pub is_direct_to: bool,
    /// Leg belongs to the missed approach
    pub is_missed_approach: bool,
    /// Leg is currently being flown
    pub is_active: bool,
    /// Leg is behind the aircraft
    pub is_behind: bool,
    /// Leg is folded into a collapsed airway
    pub is_collapsed: bool,
    /// Leg belongs to an airway
    pub is_airway_fix: bool,
    /// Leg is the exit fix of an airway
    pub is_airway_exit_fix: bool,
    /// Segment the leg belongs to
    pub segment_type: SegmentType,
    /// Procedure fix role
    pub fix_type: FixTypeFlags,
    /// Published course in degrees (used by holds)
    pub course_deg: Option<f64>,
    /// Initial desired track in degrees
    pub initial_dtk_deg: Option<f64>,
    /// VNAV target altitude in metres
    pub target_altitude_m: Option<f64>,
    /// Constraint altitude the VNAV solution cannot meet, in metres
    pub invalid_constraint_altitude_m: Option<f64>,
    /// Altitude is advisory only
    pub is_advisory: bool,
    /// Altitude was edited by the pilot
    pub is_user_constraint: bool,
    /// Computed fix-to-fix distance in metres
    pub distance_m: Option<f64>,
    /// Cumulative distance including turn transitions, in metres
    pub cumulative_distance_with_transitions_m: Option<f64>,
    /// Aggregate distance of a collapsed airway, in metres
    pub airway_distance_m: Option<f64>,
    /// Calculated flight path vectors, in order
    pub flight_path: Vec<FlightPathVector>,
}

impl LegTelemetryState {
    /// Create a leg with the given name and type and default flags
    pub fn new(name: impl Into<String>, leg_type: LegType) -> Self {
        Self {
            name: name.into(),
            leg_type,
            ..Self::default()
        }
    }

    /// Classification derived from the leg type and direct-to flag
    pub fn classification(&self) -> LegClassification {
        LegClassification::from_leg(self.leg_type, self.is_direct_to)
    }

    /// Whether the leg is any holding pattern variant
    pub fn is_hold(&self) -> bool {
        matches!(self.classification(), LegClassification::Hold(_))
    }

    /// Whether the row is shown
    ///
    /// Collapsed airway members, discontinuities and direct-to overrides stay
    /// in the route but get no row.
    pub fn is_visible(&self) -> bool {
        if self.is_collapsed && !self.is_airway_exit_fix {
            return false;
        }
        match self.classification() {
            LegClassification::Discontinuity | LegClassification::DirectTo => false,
            LegClassification::PointToPoint
            | LegClassification::HeadingTo(_)
            | LegClassification::Hold(_) => true,
        }
    }

    /// Whether the row can take focus
    pub fn is_selectable(&self) -> bool {
        self.is_visible()
    }

    /// Indentation of the row within an airway
    pub fn airway_indent(&self) -> AirwayIndent {
        match (self.is_airway_fix, self.is_airway_exit_fix) {
            (false, _) => AirwayIndent::None,
            (true, true) => AirwayIndent::ExitFix,
            (true, false) => AirwayIndent::Member,
        }
    }

    /// Length of the final flight path vector, or zero when there is none
    pub fn final_vector_distance_m(&self) -> f64 {
        self.flight_path
            .last()
            .map(|v| v.distance_m)
            .filter(|d| d.is_finite())
            .unwrap_or(0.0)
            .max(0.0)
    }

    /// Whether the fix is a runway
    pub fn is_runway_fix(&self) -> bool {
        self.fix_icao.starts_with('R')
    }

    /// Information page for this leg's fix
    pub fn info_page(&self) -> Result<InfoPage, FixLookupError> {
        if !self.leg_type.is_viewable() {
            return Err(FixLookupError::NotViewable(self.leg_type.to_string()));
        }
        match FacilityKind::from_icao(&self.fix_icao)? {
            FacilityKind::Airport => Ok(InfoPage::Airport),
            FacilityKind::Intersection => Ok(InfoPage::Intersection),
            FacilityKind::Vor => Ok(InfoPage::Vor),
            FacilityKind::Ndb => Ok(InfoPage::Ndb),
            kind @ (FacilityKind::User | FacilityKind::Runway | FacilityKind::VisualApproach) => {
                Err(FixLookupError::NoInformationPage(kind.type_char()))
            }
        }
    }
}
