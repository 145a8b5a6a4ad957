//! External capability seams: the ephemeris and the optional precision
//! house-system computation.
//!
//! The core never computes raw celestial mechanics itself; it asks an
//! [`EphemerisProvider`] for apparent ecliptic positions and sidereal
//! time. Implementations wrap whatever data source is available (a JPL
//! kernel reader, a Swiss Ephemeris binding, a fixed table in tests)
//! and perform their own UTC-to-internal timescale conversion.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::Body;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EphemerisError {
    #[error("no ephemeris coverage for {body} at {instant}")]
    OutOfRange { body: Body, instant: DateTime<Utc> },
    #[error("failed to compute position for {body}: {message}")]
    Calculation { body: Body, message: String },
    #[error("sidereal time unavailable at {instant}: {message}")]
    SiderealTime {
        instant: DateTime<Utc>,
        message: String,
    },
    #[error("house computation failed: {message}")]
    Houses { message: String },
}

/// Apparent geocentric ecliptic coordinates of one body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EclipticPosition {
    /// Degrees along the ecliptic; not yet normalized.
    pub longitude: f64,
    /// Degrees of ecliptic latitude.
    pub latitude: f64,
    /// Distance from the observer, in AU.
    pub distance: f64,
}

pub trait EphemerisProvider: Send + Sync {
    /// Apparent ecliptic position of `body` as seen from Earth at
    /// `instant`. Outer bodies are observed as their barycenters.
    fn apparent_ecliptic_position(
        &self,
        body: Body,
        instant: DateTime<Utc>,
    ) -> Result<EclipticPosition, EphemerisError>;

    /// Greenwich apparent sidereal time at `instant`, in hours.
    fn sidereal_time(&self, instant: DateTime<Utc>) -> Result<f64, EphemerisError>;
}

// ---------------------------
// ## Precision house systems
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HouseSystem {
    Placidus,
}

impl HouseSystem {
    /// Single-letter system code as used by precision house engines.
    pub fn code(self) -> u8 {
        match self {
            HouseSystem::Placidus => b'P',
        }
    }
}

/// Angles returned by a precision house computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HouseAngles {
    pub ascendant: f64,
    pub midheaven: f64,
    pub armc: f64,
    pub vertex: f64,
}

/// Optional capability: when absent, the engine transparently uses the
/// approximate sidereal-time path for the angles instead.
pub trait HouseSystemProvider: Send + Sync {
    fn houses(
        &self,
        julian_day: f64,
        latitude: f64,
        longitude: f64,
        system: HouseSystem,
    ) -> Result<HouseAngles, EphemerisError>;
}

/// UTC instant to Julian Day (UT scale).
pub fn julian_day(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_millis() as f64 / 86_400_000.0 + 2_440_587.5
}
