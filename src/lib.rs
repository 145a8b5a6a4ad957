//! Birth-chart computation core.
//!
//! Given birth coordinates, a civil date and a local time, the crate
//! resolves the historical UTC offset (including DST), normalizes the
//! birth instant to UTC, queries an ephemeris provider for ten bodies,
//! derives sign placements and the Ascendant/Midheaven angles, and
//! produces aspects, a planetary dignity table and the twelve equal
//! houses with their triplicity rulers.
//!
//! The ephemeris itself is an external capability: implement
//! [`EphemerisProvider`] (and optionally [`HouseSystemProvider`]) and
//! hand both to a [`ChartContext`].

use serde::{Serialize, Serializer};
use std::fmt;

pub mod aspects;
pub mod chart;
pub mod dignity;
pub mod engine;
pub mod ephemeris;
pub mod geocode;
pub mod houses;
pub mod signs;
pub mod timezone;

pub use aspects::{detect_aspects, AspectCategory, AspectInfo};
pub use chart::{compute_chart, compute_chart_for_city, ChartError, ChartReport, ChartRequest};
pub use dignity::{score_chart, Dignity, DignityRow, DignityTable};
pub use engine::ChartContext;
pub use ephemeris::{
    julian_day, EclipticPosition, EphemerisError, EphemerisProvider, HouseAngles, HouseSystem,
    HouseSystemProvider,
};
pub use geocode::{CachedGeocoder, GeoCandidate, GeocodeError, Geocoder};
pub use houses::{
    build_houses, is_dry_birth, BirthType, Element, HouseRecord, HousesAnalysis, TriplicityRulers,
};
pub use signs::{Sign, SignPosition};
pub use timezone::{
    determine_dst, estimate_timezone, resolve_timezone, to_utc, Hemisphere, TimezoneInfo,
    TimezoneTable, TimezoneTableEntry, UtcConversion, UtcSource, ZoneSource,
};

// ---------------------------
// ## Celestial bodies
// ---------------------------

/// The ten bodies a chart is computed for. The five outer bodies are
/// observed as their system barycenters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub enum Body {
    Sun,
    Moon,
    Mercury,
    Venus,
    Mars,
    Jupiter,
    Saturn,
    Uranus,
    Neptune,
    Pluto,
}

impl Body {
    pub const ALL: [Body; 10] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
        Body::Pluto,
    ];

    /// The seven bodies that take part in aspect detection and dignity
    /// scoring.
    pub const TRADITIONAL: [Body; 7] = [
        Body::Sun,
        Body::Moon,
        Body::Mercury,
        Body::Venus,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
    ];

    pub fn is_traditional(self) -> bool {
        matches!(
            self,
            Body::Sun
                | Body::Moon
                | Body::Mercury
                | Body::Venus
                | Body::Mars
                | Body::Jupiter
                | Body::Saturn
        )
    }

    /// True for bodies queried as system barycenters rather than planet
    /// centers.
    pub fn is_barycentric(self) -> bool {
        matches!(
            self,
            Body::Jupiter | Body::Saturn | Body::Uranus | Body::Neptune | Body::Pluto
        )
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Body::Sun => "Sun",
            Body::Moon => "Moon",
            Body::Mercury => "Mercury",
            Body::Venus => "Venus",
            Body::Mars => "Mars",
            Body::Jupiter => "Jupiter",
            Body::Saturn => "Saturn",
            Body::Uranus => "Uranus",
            Body::Neptune => "Neptune",
            Body::Pluto => "Pluto",
        };
        write!(f, "{}", name)
    }
}

/// A point placed on the chart wheel: a body or one of the two angles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChartPoint {
    Body(Body),
    Ascendant,
    Midheaven,
}

impl ChartPoint {
    pub fn is_traditional(self) -> bool {
        matches!(self, ChartPoint::Body(b) if b.is_traditional())
    }
}

impl fmt::Display for ChartPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ChartPoint::Body(body) => write!(f, "{}", body),
            ChartPoint::Ascendant => write!(f, "ASC"),
            ChartPoint::Midheaven => write!(f, "MC"),
        }
    }
}

impl Serialize for ChartPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------
// ## Positions and places
// ---------------------------

/// Ecliptic placement of one chart point. Created by the position
/// engine and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyPosition {
    #[serde(rename = "name")]
    pub point: ChartPoint,
    /// Ecliptic longitude in degrees, `[0, 360)`.
    pub longitude: f64,
    pub sign: Sign,
    pub sign_position: SignPosition,
}

impl BodyPosition {
    pub fn new(point: ChartPoint, longitude: f64) -> Self {
        let longitude = longitude.rem_euclid(360.0);
        BodyPosition {
            point,
            longitude,
            sign: Sign::from_longitude(longitude),
            sign_position: SignPosition::from_longitude(longitude),
        }
    }
}

/// A geocoded birth place. The country is free text and is matched
/// case-insensitively by substring, so both English and local spellings
/// work.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing)]
    pub country: String,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64, country: impl Into<String>) -> Self {
        Coordinates {
            latitude,
            longitude,
            country: country.into(),
        }
    }

    pub fn hemisphere(&self) -> Hemisphere {
        if self.latitude >= 0.0 {
            Hemisphere::North
        } else {
            Hemisphere::South
        }
    }
}
