//! The fourteen-segment partition of the ecliptic.
//!
//! Unlike the conventional twelve equal signs, this zodiac divides the
//! 360° circle into fourteen segments of unequal span (6° to 36°,
//! summing to 360). Aries starts at 354° and wraps through 0°.

use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, serde::Deserialize)]
pub enum Sign {
    Aries,
    Taurus,
    Gemini,
    Cancer,
    Leo,
    Virgo,
    Libra,
    Scorpio,
    Ophiuchus,
    Sagittarius,
    Capricorn,
    Aquarius,
    Pegasus,
    Pisces,
}

/// `(sign, start_degree, span_degrees)` in lookup order. The spans sum
/// to 360 and the segment starts double as the angularity boundaries
/// used by dignity scoring.
pub const SEGMENTS: [(Sign, f64, f64); 14] = [
    (Sign::Aries, 354.0, 36.0),
    (Sign::Taurus, 30.0, 30.0),
    (Sign::Gemini, 60.0, 30.0),
    (Sign::Cancer, 90.0, 30.0),
    (Sign::Leo, 120.0, 30.0),
    (Sign::Virgo, 150.0, 36.0),
    (Sign::Libra, 186.0, 24.0),
    (Sign::Scorpio, 210.0, 30.0),
    (Sign::Ophiuchus, 240.0, 12.0),
    (Sign::Sagittarius, 252.0, 18.0),
    (Sign::Capricorn, 270.0, 36.0),
    (Sign::Aquarius, 306.0, 18.0),
    (Sign::Pegasus, 324.0, 6.0),
    (Sign::Pisces, 330.0, 24.0),
];

impl Sign {
    /// Sign containing the given ecliptic longitude. The input is
    /// normalized modulo 360 first.
    pub fn from_longitude(longitude: f64) -> Sign {
        let lon = longitude.rem_euclid(360.0);
        for &(sign, start, span) in &SEGMENTS {
            if start + span > 360.0 {
                // Segment wrapping through 0° (Aries).
                let end = (start + span) % 360.0;
                if lon >= start || lon < end {
                    return sign;
                }
            } else if lon >= start && lon < start + span {
                return sign;
            }
        }
        // Unreachable while the table partitions the full circle; the
        // partition test guards the table.
        Sign::Aries
    }

    /// Start degree of this sign's segment.
    pub fn start(self) -> f64 {
        self.segment().0
    }

    /// Width of this sign's segment in degrees.
    pub fn span(self) -> f64 {
        self.segment().1
    }

    fn segment(self) -> (f64, f64) {
        for &(sign, start, span) in &SEGMENTS {
            if sign == self {
                return (start, span);
            }
        }
        unreachable!("sign missing from segment table")
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Sign::Aries => "Aries",
            Sign::Taurus => "Taurus",
            Sign::Gemini => "Gemini",
            Sign::Cancer => "Cancer",
            Sign::Leo => "Leo",
            Sign::Virgo => "Virgo",
            Sign::Libra => "Libra",
            Sign::Scorpio => "Scorpio",
            Sign::Ophiuchus => "Ophiuchus",
            Sign::Sagittarius => "Sagittarius",
            Sign::Capricorn => "Capricorn",
            Sign::Aquarius => "Aquarius",
            Sign::Pegasus => "Pegasus",
            Sign::Pisces => "Pisces",
        };
        write!(f, "{}", name)
    }
}

/// Degrees travelled into the sign containing `longitude`, always in
/// `[0, span)` of that sign.
pub fn degrees_in_sign(longitude: f64) -> f64 {
    let lon = longitude.rem_euclid(360.0);
    let sign = Sign::from_longitude(lon);
    let (start, span) = (sign.start(), sign.span());

    let mut degrees = if start + span > 360.0 && lon < start {
        // Wrapping segment, longitude past 0°.
        lon + (360.0 - start)
    } else {
        lon - start
    };
    if degrees < 0.0 {
        degrees += 360.0;
    }
    if degrees >= span {
        degrees %= span;
    }
    degrees
}

/// Integer degree/minute position within a sign, displayed `D° MM'`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SignPosition {
    pub degrees: u32,
    pub minutes: u32,
}

impl SignPosition {
    pub fn from_longitude(longitude: f64) -> Self {
        let within = degrees_in_sign(longitude);
        let degrees = within as u32;
        let minutes = ((within - degrees as f64) * 60.0) as u32;
        SignPosition { degrees, minutes }
    }
}

impl fmt::Display for SignPosition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}° {:02}'", self.degrees, self.minutes)
    }
}

impl Serialize for SignPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn spans_sum_to_full_circle() {
        let total: f64 = SEGMENTS.iter().map(|&(_, _, span)| span).sum();
        assert_relative_eq!(total, 360.0);
    }

    #[test]
    fn partition_has_no_gaps_or_overlaps() {
        // Sweep the circle in quarter-degree steps and count matching
        // segments directly; exactly one must claim each longitude.
        for step in 0..1440 {
            let lon = step as f64 * 0.25;
            let matches = SEGMENTS
                .iter()
                .filter(|&&(_, start, span)| {
                    if start + span > 360.0 {
                        lon >= start || lon < (start + span) % 360.0
                    } else {
                        lon >= start && lon < start + span
                    }
                })
                .count();
            assert_eq!(matches, 1, "longitude {} matched {} segments", lon, matches);
        }
    }

    #[test]
    fn lookup_at_segment_edges() {
        assert_eq!(Sign::from_longitude(354.0), Sign::Aries);
        assert_eq!(Sign::from_longitude(0.0), Sign::Aries);
        assert_eq!(Sign::from_longitude(29.99), Sign::Aries);
        assert_eq!(Sign::from_longitude(30.0), Sign::Taurus);
        assert_eq!(Sign::from_longitude(186.0), Sign::Libra);
        assert_eq!(Sign::from_longitude(209.99), Sign::Libra);
        assert_eq!(Sign::from_longitude(240.0), Sign::Ophiuchus);
        assert_eq!(Sign::from_longitude(251.99), Sign::Ophiuchus);
        assert_eq!(Sign::from_longitude(324.0), Sign::Pegasus);
        assert_eq!(Sign::from_longitude(329.99), Sign::Pegasus);
        assert_eq!(Sign::from_longitude(353.99), Sign::Pisces);
    }

    #[test]
    fn lookup_normalizes_input() {
        assert_eq!(Sign::from_longitude(360.0), Sign::Aries);
        assert_eq!(Sign::from_longitude(-6.0), Sign::Aries);
        assert_eq!(Sign::from_longitude(720.0 + 120.0), Sign::Leo);
    }

    #[test]
    fn degrees_in_sign_stays_below_span() {
        for step in 0..3600 {
            let lon = step as f64 * 0.1;
            let sign = Sign::from_longitude(lon);
            let within = degrees_in_sign(lon);
            assert!(
                (0.0..sign.span()).contains(&within),
                "longitude {} gave {} within {:?} (span {})",
                lon,
                within,
                sign,
                sign.span()
            );
        }
    }

    #[test]
    fn degrees_in_sign_across_the_wrap() {
        // Aries runs 354°..30°; 10° of longitude is 16° into the sign.
        assert_relative_eq!(degrees_in_sign(10.0), 16.0);
        assert_relative_eq!(degrees_in_sign(355.0), 1.0);
        assert_relative_eq!(degrees_in_sign(0.0), 6.0);
    }

    #[test]
    fn sign_position_formats_with_padded_minutes() {
        let pos = SignPosition::from_longitude(0.0);
        assert_eq!(pos.to_string(), "6° 00'");
        let pos = SignPosition::from_longitude(35.5);
        assert_eq!(pos.to_string(), "5° 30'");
        let pos = SignPosition::from_longitude(65.125);
        assert_eq!(pos.to_string(), "5° 07'");
    }
}
