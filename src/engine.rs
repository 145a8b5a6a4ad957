//! Position engine: turns a UTC instant into chart-point placements.
//!
//! A [`ChartContext`] is built once at startup from the loaded
//! resources (ephemeris provider, optional precision house provider,
//! timezone table) and shared read-only across requests. Provider
//! failures never escape: the engine retries through the legacy
//! local-time path and ultimately returns an empty position list,
//! which downstream stages treat as "chart unavailable".

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use log::warn;
use std::sync::Arc;

use crate::ephemeris::{
    julian_day, EphemerisError, EphemerisProvider, HouseSystem, HouseSystemProvider,
};
use crate::timezone::TimezoneTable;
use crate::{Body, BodyPosition, ChartPoint};

/// Mean obliquity of the ecliptic used by the approximate angle path.
const MEAN_OBLIQUITY_DEG: f64 = 23.4367;

/// Offset the legacy recalculation path anchors reformatted local
/// times at.
const LEGACY_OFFSET_HOURS: i32 = 1;

/// Immutable per-process computation context.
pub struct ChartContext {
    ephemeris: Arc<dyn EphemerisProvider>,
    angles: Box<dyn AngleStrategy>,
    timezone_table: TimezoneTable,
}

impl ChartContext {
    /// Build a context. When a house-system provider is available the
    /// angles use it; otherwise the approximate sidereal-time path is
    /// selected, with no difference in response shape.
    pub fn new(
        ephemeris: Arc<dyn EphemerisProvider>,
        houses: Option<Arc<dyn HouseSystemProvider>>,
        timezone_table: TimezoneTable,
    ) -> Self {
        let approximate = ApproximateAngles {
            ephemeris: Arc::clone(&ephemeris),
        };
        let angles: Box<dyn AngleStrategy> = match houses {
            Some(provider) => Box::new(PreciseAngles {
                provider,
                fallback: approximate,
            }),
            None => Box::new(approximate),
        };
        ChartContext {
            ephemeris,
            angles,
            timezone_table,
        }
    }

    pub fn timezone_table(&self) -> &TimezoneTable {
        &self.timezone_table
    }

    /// Positions of the ten bodies at `utc`, plus Ascendant and
    /// Midheaven when the birth place is known. Never fails: provider
    /// errors degrade to the legacy path and finally to an empty list.
    pub fn positions_at(
        &self,
        utc: DateTime<Utc>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Vec<BodyPosition> {
        match self.compute_positions(utc, latitude, longitude) {
            Ok(positions) => positions,
            Err(err) => {
                warn!("position computation failed: {}; retrying via local-time path", err);
                self.positions_local(
                    &utc.format("%d/%m/%Y").to_string(),
                    &utc.format("%H:%M").to_string(),
                    latitude,
                    longitude,
                )
            }
        }
    }

    /// Legacy path: parse a `dd/mm/YYYY HH:MM` civil string (an ISO
    /// date is normalized first), anchor it at the fixed legacy offset
    /// and compute from the resulting instant. Returns an empty list
    /// when parsing or the provider fails.
    pub fn positions_local(
        &self,
        date: &str,
        time: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Vec<BodyPosition> {
        let date = if date.contains('-') {
            match chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(parsed) => parsed.format("%d/%m/%Y").to_string(),
                Err(_) => date.to_string(),
            }
        } else {
            date.to_string()
        };

        let civil = format!("{} {}", date, time);
        let local = match NaiveDateTime::parse_from_str(&civil, "%d/%m/%Y %H:%M") {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!("legacy path cannot parse {:?} ({}); no chart computed", civil, err);
                return Vec::new();
            }
        };

        let zone = match FixedOffset::east_opt(LEGACY_OFFSET_HOURS * 3600) {
            Some(zone) => zone,
            None => return Vec::new(),
        };
        let utc = match zone.from_local_datetime(&local).single() {
            Some(dt) => dt.with_timezone(&Utc),
            None => return Vec::new(),
        };

        match self.compute_positions(utc, latitude, longitude) {
            Ok(positions) => positions,
            Err(err) => {
                warn!("legacy path failed as well: {}; no chart computed", err);
                Vec::new()
            }
        }
    }

    fn compute_positions(
        &self,
        utc: DateTime<Utc>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Vec<BodyPosition>, EphemerisError> {
        let mut positions = Vec::with_capacity(Body::ALL.len() + 2);
        for body in Body::ALL {
            let ecliptic = self.ephemeris.apparent_ecliptic_position(body, utc)?;
            positions.push(BodyPosition::new(ChartPoint::Body(body), ecliptic.longitude));
        }

        if let (Some(lat), Some(lon)) = (latitude, longitude) {
            let (asc, mc) = self.angles.ascendant_midheaven(utc, lat, lon);
            positions.push(BodyPosition::new(ChartPoint::Ascendant, asc));
            positions.push(BodyPosition::new(ChartPoint::Midheaven, mc));
        }

        Ok(positions)
    }
}

// ---------------------------
// ## Angle strategies
// ---------------------------

/// Ascendant/Midheaven computation, selected at context construction.
/// Implementations return degrees in `[0, 360)` and default both
/// angles to 0° rather than failing.
trait AngleStrategy: Send + Sync {
    fn ascendant_midheaven(&self, utc: DateTime<Utc>, latitude: f64, longitude: f64) -> (f64, f64);
}

/// Delegates to the precision house engine (Placidus), dropping back
/// to the approximate path when the call fails.
struct PreciseAngles {
    provider: Arc<dyn HouseSystemProvider>,
    fallback: ApproximateAngles,
}

impl AngleStrategy for PreciseAngles {
    fn ascendant_midheaven(&self, utc: DateTime<Utc>, latitude: f64, longitude: f64) -> (f64, f64) {
        match self
            .provider
            .houses(julian_day(utc), latitude, longitude, HouseSystem::Placidus)
        {
            Ok(angles) => (
                angles.ascendant.rem_euclid(360.0),
                angles.midheaven.rem_euclid(360.0),
            ),
            Err(err) => {
                warn!("house provider failed: {}; using approximate angles", err);
                self.fallback.ascendant_midheaven(utc, latitude, longitude)
            }
        }
    }
}

/// Sidereal-time approximation of the angles.
#[derive(Clone)]
struct ApproximateAngles {
    ephemeris: Arc<dyn EphemerisProvider>,
}

impl ApproximateAngles {
    fn compute(
        &self,
        utc: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
    ) -> Result<(f64, f64), EphemerisError> {
        let gst = self.ephemeris.sidereal_time(utc)?;
        let lst = (gst * 15.0 + longitude).rem_euclid(360.0);
        let mc = lst;

        let lat_rad = latitude.to_radians();
        let ra_rad = lst.to_radians();
        let eps_rad = MEAN_OBLIQUITY_DEG.to_radians();

        let tan_asc =
            ra_rad.cos() / (ra_rad.sin() * eps_rad.cos() + lat_rad.tan() * eps_rad.sin());
        let mut asc = (-tan_asc).atan().to_degrees();

        // Quadrant correction: atan only covers half the circle.
        if (0.0..=180.0).contains(&lst) {
            if ra_rad.cos() > 0.0 {
                asc = (asc + 180.0) % 360.0;
            }
        } else if ra_rad.cos() < 0.0 {
            asc = (asc + 180.0) % 360.0;
        }

        Ok((asc.rem_euclid(360.0), mc))
    }
}

impl AngleStrategy for ApproximateAngles {
    fn ascendant_midheaven(&self, utc: DateTime<Utc>, latitude: f64, longitude: f64) -> (f64, f64) {
        match self.compute(utc, latitude, longitude) {
            Ok(angles) => angles,
            Err(err) => {
                warn!("approximate angle path failed: {}; angles default to 0", err);
                (0.0, 0.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{EclipticPosition, HouseAngles};
    use approx::assert_relative_eq;
    use chrono::{TimeZone, Timelike};
    use std::sync::Mutex;

    /// Ephemeris double: every body at a fixed longitude, configurable
    /// sidereal time, optional failure window.
    struct FixedEphemeris {
        gst_hours: f64,
        fail_at_hour: Option<u32>,
        queried: Mutex<Vec<DateTime<Utc>>>,
    }

    impl FixedEphemeris {
        fn new(gst_hours: f64) -> Self {
            FixedEphemeris {
                gst_hours,
                fail_at_hour: None,
                queried: Mutex::new(Vec::new()),
            }
        }
    }

    impl EphemerisProvider for FixedEphemeris {
        fn apparent_ecliptic_position(
            &self,
            body: Body,
            instant: DateTime<Utc>,
        ) -> Result<EclipticPosition, EphemerisError> {
            if Some(instant.hour()) == self.fail_at_hour {
                return Err(EphemerisError::OutOfRange { body, instant });
            }
            self.queried.lock().unwrap().push(instant);
            Ok(EclipticPosition {
                longitude: 40.0,
                latitude: 0.0,
                distance: 1.0,
            })
        }

        fn sidereal_time(&self, instant: DateTime<Utc>) -> Result<f64, EphemerisError> {
            if Some(instant.hour()) == self.fail_at_hour {
                return Err(EphemerisError::SiderealTime {
                    instant,
                    message: "no coverage".to_string(),
                });
            }
            Ok(self.gst_hours)
        }
    }

    struct FixedHouses;

    impl HouseSystemProvider for FixedHouses {
        fn houses(
            &self,
            _julian_day: f64,
            _latitude: f64,
            _longitude: f64,
            _system: HouseSystem,
        ) -> Result<HouseAngles, EphemerisError> {
            Ok(HouseAngles {
                ascendant: 123.4,
                midheaven: 33.4,
                armc: 30.0,
                vertex: 200.0,
            })
        }
    }

    struct BrokenHouses;

    impl HouseSystemProvider for BrokenHouses {
        fn houses(
            &self,
            _julian_day: f64,
            _latitude: f64,
            _longitude: f64,
            _system: HouseSystem,
        ) -> Result<HouseAngles, EphemerisError> {
            Err(EphemerisError::Houses {
                message: "unavailable".to_string(),
            })
        }
    }

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 6, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn ten_bodies_without_a_birth_place() {
        let ctx = ChartContext::new(
            Arc::new(FixedEphemeris::new(0.0)),
            None,
            TimezoneTable::default(),
        );
        let positions = ctx.positions_at(instant(), None, None);
        assert_eq!(positions.len(), 10);
        assert!(positions.iter().all(|p| matches!(p.point, ChartPoint::Body(_))));
    }

    #[test]
    fn angles_are_appended_with_a_birth_place() {
        let ctx = ChartContext::new(
            Arc::new(FixedEphemeris::new(0.0)),
            None,
            TimezoneTable::default(),
        );
        let positions = ctx.positions_at(instant(), Some(40.0), Some(-3.7));
        assert_eq!(positions.len(), 12);
        assert_eq!(positions[10].point, ChartPoint::Ascendant);
        assert_eq!(positions[11].point, ChartPoint::Midheaven);
    }

    #[test]
    fn precise_path_takes_provider_angles_verbatim() {
        let ctx = ChartContext::new(
            Arc::new(FixedEphemeris::new(0.0)),
            Some(Arc::new(FixedHouses)),
            TimezoneTable::default(),
        );
        let positions = ctx.positions_at(instant(), Some(40.0), Some(-3.7));
        assert_relative_eq!(positions[10].longitude, 123.4);
        assert_relative_eq!(positions[11].longitude, 33.4);
    }

    #[test]
    fn broken_house_provider_drops_to_the_approximate_path() {
        let eph = Arc::new(FixedEphemeris::new(0.0));
        let ctx = ChartContext::new(eph, Some(Arc::new(BrokenHouses)), TimezoneTable::default());
        let positions = ctx.positions_at(instant(), Some(0.0), Some(0.0));
        // gst 0h at the equator and prime meridian: MC 0°, ASC 90°.
        assert_relative_eq!(positions[10].longitude, 90.0, epsilon = 1e-9);
        assert_relative_eq!(positions[11].longitude, 0.0);
    }

    #[test]
    fn approximate_mc_is_the_local_sidereal_time() {
        let ctx = ChartContext::new(
            Arc::new(FixedEphemeris::new(10.0)),
            None,
            TimezoneTable::default(),
        );
        let positions = ctx.positions_at(instant(), Some(40.0), Some(30.0));
        // lst = 10h * 15 + 30 = 180.
        assert_relative_eq!(positions[11].longitude, 180.0);
    }

    #[test]
    fn ascendant_stays_in_range_across_latitudes_and_times() {
        for gst in [0.0, 5.5, 12.0, 18.25, 23.9] {
            for lat in [-66.0, -40.0, 0.0, 40.0, 66.0] {
                let ctx = ChartContext::new(
                    Arc::new(FixedEphemeris::new(gst)),
                    None,
                    TimezoneTable::default(),
                );
                let positions = ctx.positions_at(instant(), Some(lat), Some(-3.7));
                let asc = positions[10].longitude;
                assert!((0.0..360.0).contains(&asc), "asc {} out of range", asc);
            }
        }
    }

    #[test]
    fn sidereal_failure_defaults_both_angles_to_zero() {
        let mut eph = FixedEphemeris::new(0.0);
        eph.fail_at_hour = None;
        let eph = Arc::new(eph);

        struct NoSidereal(Arc<FixedEphemeris>);
        impl EphemerisProvider for NoSidereal {
            fn apparent_ecliptic_position(
                &self,
                body: Body,
                instant: DateTime<Utc>,
            ) -> Result<EclipticPosition, EphemerisError> {
                self.0.apparent_ecliptic_position(body, instant)
            }
            fn sidereal_time(&self, instant: DateTime<Utc>) -> Result<f64, EphemerisError> {
                Err(EphemerisError::SiderealTime {
                    instant,
                    message: "unavailable".to_string(),
                })
            }
        }

        let ctx = ChartContext::new(Arc::new(NoSidereal(eph)), None, TimezoneTable::default());
        let positions = ctx.positions_at(instant(), Some(40.0), Some(-3.7));
        assert_eq!(positions.len(), 12);
        assert_relative_eq!(positions[10].longitude, 0.0);
        assert_relative_eq!(positions[11].longitude, 0.0);
    }

    #[test]
    fn primary_failure_retries_through_the_legacy_path() {
        let mut eph = FixedEphemeris::new(0.0);
        // Fails at 10:00 UTC; the legacy path re-anchors the same civil
        // time at +1h, shifting the query to 09:00.
        eph.fail_at_hour = Some(10);
        let eph = Arc::new(eph);
        let ctx = ChartContext::new(Arc::clone(&eph) as Arc<dyn EphemerisProvider>, None, TimezoneTable::default());

        let positions = ctx.positions_at(instant(), Some(40.0), Some(-3.7));
        assert_eq!(positions.len(), 12);
        let queried = eph.queried.lock().unwrap();
        assert!(queried.iter().all(|t| t.hour() == 9));
    }

    #[test]
    fn total_failure_returns_an_empty_list() {
        struct AlwaysFails;
        impl EphemerisProvider for AlwaysFails {
            fn apparent_ecliptic_position(
                &self,
                body: Body,
                instant: DateTime<Utc>,
            ) -> Result<EclipticPosition, EphemerisError> {
                Err(EphemerisError::OutOfRange { body, instant })
            }
            fn sidereal_time(&self, instant: DateTime<Utc>) -> Result<f64, EphemerisError> {
                Err(EphemerisError::SiderealTime {
                    instant,
                    message: "no coverage".to_string(),
                })
            }
        }

        let ctx = ChartContext::new(Arc::new(AlwaysFails), None, TimezoneTable::default());
        let positions = ctx.positions_at(instant(), Some(0.0), Some(0.0));
        assert!(positions.is_empty());
    }

    #[test]
    fn legacy_path_accepts_iso_dates() {
        let eph = Arc::new(FixedEphemeris::new(0.0));
        let ctx = ChartContext::new(Arc::clone(&eph) as Arc<dyn EphemerisProvider>, None, TimezoneTable::default());
        let positions = ctx.positions_local("2000-06-15", "12:00", None, None);
        assert_eq!(positions.len(), 10);
        let queried = eph.queried.lock().unwrap();
        // 12:00 at +1h is 11:00 UTC.
        assert!(queried.iter().all(|t| t.hour() == 11));
    }

    #[test]
    fn legacy_path_with_garbage_input_returns_empty() {
        let ctx = ChartContext::new(
            Arc::new(FixedEphemeris::new(0.0)),
            None,
            TimezoneTable::default(),
        );
        assert!(ctx.positions_local("junk", "12:00", None, None).is_empty());
    }
}
