//! Pairwise aspect detection among the traditional bodies.
//!
//! Every unordered pair of the seven traditional bodies is classified,
//! plus each traditional body against the Ascendant when one is
//! present. Classification works on the minimal angular separation
//! with a 2° orb, relevant categories checked first.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::{BodyPosition, ChartPoint};

/// Orb within which a separation still counts as an aspect.
pub const ORB: f64 = 2.0;

const HARMONIC_RELEVANT: [f64; 4] = [0.0, 60.0, 120.0, 180.0];
const INHARMONIC_RELEVANT: [f64; 3] = [30.0, 90.0, 150.0];
const HARMONIC: [f64; 12] = [
    12.0, 24.0, 36.0, 48.0, 72.0, 84.0, 96.0, 108.0, 132.0, 144.0, 156.0, 168.0,
];
const INHARMONIC: [f64; 12] = [
    6.0, 18.0, 42.0, 54.0, 66.0, 78.0, 102.0, 114.0, 126.0, 138.0, 162.0, 174.0,
];

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AspectCategory {
    HarmonicRelevant,
    InharmonicRelevant,
    Harmonic,
    Inharmonic,
}

impl AspectCategory {
    /// Contribution to a body's dignity score.
    pub fn points(self) -> i32 {
        match self {
            AspectCategory::HarmonicRelevant => 6,
            AspectCategory::InharmonicRelevant => -6,
            AspectCategory::Harmonic => 1,
            AspectCategory::Inharmonic => -1,
        }
    }
}

impl fmt::Display for AspectCategory {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AspectCategory::HarmonicRelevant => "Harmonic-Relevant",
            AspectCategory::InharmonicRelevant => "Inharmonic-Relevant",
            AspectCategory::Harmonic => "Harmonic",
            AspectCategory::Inharmonic => "Inharmonic",
        };
        write!(f, "{}", name)
    }
}

/// One detected aspect. Serializes (and displays) as the descriptive
/// string the response payload carries, e.g.
/// `"Sun Harmonic-Relevant Moon (120.00°)"`.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectInfo {
    pub first: ChartPoint,
    pub second: ChartPoint,
    pub category: AspectCategory,
    /// Measured separation in degrees, `[0, 180]`.
    pub angle: f64,
}

impl AspectInfo {
    pub fn involves(&self, point: ChartPoint) -> bool {
        self.first == point || self.second == point
    }
}

impl fmt::Display for AspectInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} {} {} ({:.2}°)",
            self.first, self.category, self.second, self.angle
        )
    }
}

impl Serialize for AspectInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Minimal angular separation between two longitudes, in `[0, 180]`.
pub fn angular_separation(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs().rem_euclid(360.0);
    if diff > 180.0 {
        360.0 - diff
    } else {
        diff
    }
}

/// Category for a separation, or `None` when no aspect angle is within
/// orb.
pub fn classify(angle: f64) -> Option<AspectCategory> {
    let within = |targets: &[f64]| targets.iter().any(|t| (angle - t).abs() <= ORB);

    if within(&HARMONIC_RELEVANT) {
        Some(AspectCategory::HarmonicRelevant)
    } else if within(&INHARMONIC_RELEVANT) {
        Some(AspectCategory::InharmonicRelevant)
    } else if within(&HARMONIC) {
        Some(AspectCategory::Harmonic)
    } else if within(&INHARMONIC) {
        Some(AspectCategory::Inharmonic)
    } else {
        None
    }
}

/// Detect every aspect in the chart.
pub fn detect_aspects(positions: &[BodyPosition]) -> Vec<AspectInfo> {
    let traditional: Vec<&BodyPosition> = positions
        .iter()
        .filter(|p| p.point.is_traditional())
        .collect();
    let ascendant = positions
        .iter()
        .find(|p| p.point == ChartPoint::Ascendant);

    let mut aspects = Vec::new();
    for (i, first) in traditional.iter().enumerate() {
        for second in &traditional[i + 1..] {
            let angle = angular_separation(first.longitude, second.longitude);
            if let Some(category) = classify(angle) {
                aspects.push(AspectInfo {
                    first: first.point,
                    second: second.point,
                    category,
                    angle,
                });
            }
        }

        if let Some(asc) = ascendant {
            let angle = angular_separation(first.longitude, asc.longitude);
            if let Some(category) = classify(angle) {
                aspects.push(AspectInfo {
                    first: first.point,
                    second: asc.point,
                    category,
                    angle,
                });
            }
        }
    }
    aspects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Body;
    use approx::assert_relative_eq;

    fn at(body: Body, longitude: f64) -> BodyPosition {
        BodyPosition::new(ChartPoint::Body(body), longitude)
    }

    #[test]
    fn separation_is_symmetric_and_bounded() {
        let pairs = [(10.0, 350.0), (0.0, 180.0), (123.4, 10.0), (359.9, 0.1)];
        for (a, b) in pairs {
            let forward = angular_separation(a, b);
            let backward = angular_separation(b, a);
            assert_relative_eq!(forward, backward);
            assert!((0.0..=180.0).contains(&forward));
        }
        assert_relative_eq!(angular_separation(10.0, 350.0), 20.0);
        assert_relative_eq!(angular_separation(359.0, 1.0), 2.0);
    }

    #[test]
    fn relevant_angles_classify_first() {
        assert_eq!(classify(0.0), Some(AspectCategory::HarmonicRelevant));
        assert_eq!(classify(60.0), Some(AspectCategory::HarmonicRelevant));
        assert_eq!(classify(121.9), Some(AspectCategory::HarmonicRelevant));
        assert_eq!(classify(180.0), Some(AspectCategory::HarmonicRelevant));
        assert_eq!(classify(30.0), Some(AspectCategory::InharmonicRelevant));
        assert_eq!(classify(91.5), Some(AspectCategory::InharmonicRelevant));
        assert_eq!(classify(150.0), Some(AspectCategory::InharmonicRelevant));
    }

    #[test]
    fn minor_angles_classify_after_relevant_ones() {
        assert_eq!(classify(72.0), Some(AspectCategory::Harmonic));
        assert_eq!(classify(144.0), Some(AspectCategory::Harmonic));
        assert_eq!(classify(42.0), Some(AspectCategory::Inharmonic));
        assert_eq!(classify(174.0), Some(AspectCategory::Inharmonic));
    }

    #[test]
    fn orb_is_inclusive_at_two_degrees() {
        assert_eq!(classify(62.0), Some(AspectCategory::HarmonicRelevant));
        assert_eq!(classify(58.0), Some(AspectCategory::HarmonicRelevant));
        // 2.5° away from the sextile, and no other angle is close.
        assert_eq!(classify(57.5), None);
    }

    #[test]
    fn unclassifiable_angles_yield_nothing() {
        assert_eq!(classify(15.0), None);
        assert_eq!(classify(51.0), None);
        assert_eq!(classify(99.0), None);
    }

    #[test]
    fn only_traditional_bodies_pair_up() {
        let positions = vec![
            at(Body::Sun, 0.0),
            at(Body::Moon, 120.0),
            at(Body::Uranus, 60.0),
            at(Body::Pluto, 180.0),
        ];
        let aspects = detect_aspects(&positions);
        assert_eq!(aspects.len(), 1);
        assert_eq!(aspects[0].first, ChartPoint::Body(Body::Sun));
        assert_eq!(aspects[0].second, ChartPoint::Body(Body::Moon));
        assert_eq!(aspects[0].category, AspectCategory::HarmonicRelevant);
    }

    #[test]
    fn ascendant_aspects_each_traditional_body() {
        let positions = vec![
            at(Body::Sun, 0.0),
            at(Body::Moon, 90.0),
            BodyPosition::new(ChartPoint::Ascendant, 180.0),
        ];
        let aspects = detect_aspects(&positions);
        // Sun-Moon square, Sun-ASC opposition, Moon-ASC square.
        assert_eq!(aspects.len(), 3);
        assert!(aspects
            .iter()
            .any(|a| a.involves(ChartPoint::Ascendant) && a.involves(ChartPoint::Body(Body::Sun))));
        assert!(aspects
            .iter()
            .any(|a| a.involves(ChartPoint::Ascendant) && a.involves(ChartPoint::Body(Body::Moon))));
    }

    #[test]
    fn midheaven_takes_no_part_in_aspects() {
        let positions = vec![
            at(Body::Sun, 0.0),
            BodyPosition::new(ChartPoint::Midheaven, 120.0),
        ];
        assert!(detect_aspects(&positions).is_empty());
    }

    #[test]
    fn display_carries_two_decimals() {
        let info = AspectInfo {
            first: ChartPoint::Body(Body::Sun),
            second: ChartPoint::Ascendant,
            category: AspectCategory::HarmonicRelevant,
            angle: 119.876,
        };
        assert_eq!(info.to_string(), "Sun Harmonic-Relevant ASC (119.88°)");
    }

    #[test]
    fn no_duplicate_pairs() {
        let positions: Vec<BodyPosition> = Body::TRADITIONAL
            .iter()
            .enumerate()
            .map(|(i, &b)| at(b, i as f64 * 60.0))
            .collect();
        let aspects = detect_aspects(&positions);
        for (i, a) in aspects.iter().enumerate() {
            for b in &aspects[i + 1..] {
                assert!(
                    !(a.first == b.first && a.second == b.second),
                    "duplicate pair {} {}",
                    a,
                    b
                );
            }
        }
    }
}
