//! The twelve equal houses, their elements and triplicity rulers.

use serde::{Serialize, Serializer};
use std::fmt;

use crate::dignity::house_number;
use crate::signs::Sign;
use crate::{Body, BodyPosition, ChartPoint};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Element {
    Air,
    Earth,
    Water,
    Fire,
}

impl Element {
    /// Element of a sign. The grouping follows the fourteen-sign
    /// tabulation, which places some signs unconventionally.
    pub fn of(sign: Sign) -> Element {
        match sign {
            Sign::Gemini | Sign::Aquarius | Sign::Ophiuchus | Sign::Libra => Element::Air,
            Sign::Taurus | Sign::Capricorn | Sign::Virgo => Element::Earth,
            Sign::Scorpio | Sign::Cancer | Sign::Pisces | Sign::Pegasus => Element::Water,
            Sign::Aries | Sign::Leo | Sign::Sagittarius => Element::Fire,
        }
    }

    /// The three ruling bodies of this element's triplicity.
    pub fn triplicity_rulers(self) -> TriplicityRulers {
        match self {
            Element::Air => TriplicityRulers {
                moist: Body::Mercury,
                dry: Body::Saturn,
                participating: Body::Jupiter,
            },
            Element::Earth => TriplicityRulers {
                moist: Body::Venus,
                dry: Body::Mercury,
                participating: Body::Moon,
            },
            Element::Fire => TriplicityRulers {
                moist: Body::Sun,
                dry: Body::Saturn,
                participating: Body::Mars,
            },
            Element::Water => TriplicityRulers {
                moist: Body::Moon,
                dry: Body::Mars,
                participating: Body::Jupiter,
            },
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Element::Air => "Air",
            Element::Earth => "Earth",
            Element::Water => "Water",
            Element::Fire => "Fire",
        };
        write!(f, "{}", name)
    }
}

/// Triplicity rulers in moist/dry/participating order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct TriplicityRulers {
    pub moist: Body,
    pub dry: Body,
    pub participating: Body,
}

/// Fixed meaning attached to each house, in house order.
const HOUSE_MEANINGS: [&str; 12] = [
    "ORGAN OF INTELLIGENCE",
    "OBJECT OF SUSTENANCE",
    "OBJECT OF INTELLIGENCE",
    "MIND",
    "INTELLIGENCE",
    "OBJECT OF THE MIND",
    "OBJECT OF RELATIONSHIP",
    "ORGAN OF THE MIND",
    "ORGAN OF RELATIONSHIP",
    "JOINS THE ORGAN OF SUSTENANCE WITH THE OBJECT OF RELATIONSHIP",
    "JOINS THE OBJECT OF SUSTENANCE WITH THE ORGAN OF RELATIONSHIP",
    "ORGAN OF SUSTENANCE",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HouseRecord {
    pub house_number: u32,
    pub element: Element,
    pub sign: Sign,
    #[serde(serialize_with = "cusp_degrees")]
    pub cusp_longitude: f64,
    pub meaning: &'static str,
    pub triplicity_rulers: TriplicityRulers,
}

fn cusp_degrees<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{:.2}°", value))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BirthType {
    Dry,
    Moist,
}

impl fmt::Display for BirthType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BirthType::Dry => write!(f, "dry"),
            BirthType::Moist => write!(f, "moist"),
        }
    }
}

/// Houses plus the birth-type classification, as carried in the
/// response payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HousesAnalysis {
    pub houses: Vec<HouseRecord>,
    pub birth_type: BirthType,
}

/// Build the twelve equal houses from the Ascendant. Returns an empty
/// list when the chart has no Ascendant. The `is_dry` flag is accepted
/// alongside the positions but the ruler order does not currently vary
/// with it.
pub fn build_houses(positions: &[BodyPosition], is_dry: bool) -> Vec<HouseRecord> {
    let _ = is_dry;
    let Some(asc) = positions.iter().find(|p| p.point == ChartPoint::Ascendant) else {
        return Vec::new();
    };

    (0..12)
        .map(|i| {
            let cusp = (asc.longitude + 30.0 * i as f64).rem_euclid(360.0);
            let sign = Sign::from_longitude(cusp);
            let element = Element::of(sign);
            HouseRecord {
                house_number: i + 1,
                element,
                sign,
                cusp_longitude: cusp,
                meaning: HOUSE_MEANINGS[i as usize],
                triplicity_rulers: element.triplicity_rulers(),
            }
        })
        .collect()
}

/// A birth is dry when the Sun occupies houses 6 through 11. Defaults
/// to moist when the Sun or the Ascendant is missing.
pub fn is_dry_birth(positions: &[BodyPosition]) -> bool {
    let sun = positions
        .iter()
        .find(|p| p.point == ChartPoint::Body(Body::Sun));
    let asc = positions.iter().find(|p| p.point == ChartPoint::Ascendant);
    let (Some(sun), Some(asc)) = (sun, asc) else {
        return false;
    };

    let house = house_number(sun.longitude, asc.longitude);
    (6..=11).contains(&house)
}
