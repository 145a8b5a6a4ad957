//! Dignity scoring: essential dignity by sign, house rulership,
//! angularity and aspect totals for the seven traditional bodies.

use serde::Serialize;
use std::fmt;

use crate::aspects::AspectInfo;
use crate::signs::{Sign, SEGMENTS};
use crate::{Body, BodyPosition, ChartPoint};

/// Orb around a segment boundary that counts as angular.
const ANGULAR_ORB: f64 = 1.0;

/// Points awarded when a body sits within orb of a segment boundary.
const ANGULAR_POINTS: i32 = 6;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dignity {
    Exaltation,
    Domicile,
    Exile,
    Fall,
}

impl Dignity {
    pub const ALL: [Dignity; 4] = [
        Dignity::Exaltation,
        Dignity::Domicile,
        Dignity::Exile,
        Dignity::Fall,
    ];

    pub fn points(self) -> i32 {
        match self {
            Dignity::Exaltation => 6,
            Dignity::Domicile => 3,
            Dignity::Exile => 3,
            Dignity::Fall => 0,
        }
    }
}

impl fmt::Display for Dignity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Dignity::Exaltation => "exaltation",
            Dignity::Domicile => "domicile",
            Dignity::Exile => "exile",
            Dignity::Fall => "fall",
        };
        write!(f, "{}", name)
    }
}

/// Signs holding each dignity for a traditional body. `None` for the
/// outer bodies, which are not scored.
fn sign_dignities(body: Body) -> Option<[(Dignity, &'static [Sign]); 4]> {
    use Sign::*;
    let table = match body {
        Body::Sun => [
            (Dignity::Exaltation, &[Leo, Aries, Capricorn, Virgo][..]),
            (Dignity::Domicile, &[Scorpio, Gemini, Pegasus][..]),
            (Dignity::Exile, &[Taurus, Sagittarius][..]),
            (Dignity::Fall, &[Cancer, Pisces, Libra, Aquarius, Ophiuchus][..]),
        ],
        Body::Moon => [
            (Dignity::Exaltation, &[Cancer, Pisces, Libra, Aquarius, Ophiuchus][..]),
            (Dignity::Domicile, &[Taurus, Sagittarius][..]),
            (Dignity::Exile, &[Scorpio, Gemini, Pegasus][..]),
            (Dignity::Fall, &[Leo, Aries, Capricorn, Virgo][..]),
        ],
        Body::Mercury => [
            (Dignity::Exaltation, &[Gemini, Capricorn, Virgo][..]),
            (Dignity::Domicile, &[Leo, Aries, Scorpio, Pegasus][..]),
            (Dignity::Exile, &[Cancer, Pisces, Sagittarius][..]),
            (Dignity::Fall, &[Taurus, Libra, Aquarius, Ophiuchus][..]),
        ],
        Body::Venus => [
            (Dignity::Exaltation, &[Taurus, Libra, Aquarius, Ophiuchus][..]),
            (Dignity::Domicile, &[Cancer, Pisces, Sagittarius][..]),
            (Dignity::Exile, &[Leo, Aries, Scorpio, Pegasus][..]),
            (Dignity::Fall, &[Gemini, Capricorn, Virgo][..]),
        ],
        Body::Mars => [
            (Dignity::Exaltation, &[Leo, Aries, Scorpio, Pegasus][..]),
            (Dignity::Domicile, &[Gemini, Capricorn, Virgo][..]),
            (Dignity::Exile, &[Taurus, Libra, Aquarius, Ophiuchus][..]),
            (Dignity::Fall, &[Cancer, Pisces, Sagittarius][..]),
        ],
        Body::Jupiter => [
            (Dignity::Exaltation, &[Cancer, Pisces, Sagittarius][..]),
            (Dignity::Domicile, &[Taurus, Libra, Aquarius, Ophiuchus][..]),
            (Dignity::Exile, &[Gemini, Capricorn, Virgo][..]),
            (Dignity::Fall, &[Leo, Aries, Scorpio, Pegasus][..]),
        ],
        Body::Saturn => [
            (Dignity::Exaltation, &[Ophiuchus, Gemini, Sagittarius][..]),
            (Dignity::Domicile, &[Leo, Aries, Libra, Aquarius][..]),
            (Dignity::Exile, &[Cancer, Pisces, Capricorn, Virgo][..]),
            (Dignity::Fall, &[Taurus, Scorpio, Pegasus][..]),
        ],
        _ => return None,
    };
    Some(table)
}

/// Houses each dignity category rules for a traditional body.
fn house_dignities(body: Body) -> Option<[(Dignity, &'static [u32]); 4]> {
    let table = match body {
        Body::Sun => [
            (Dignity::Exaltation, &[1, 5, 6, 10][..]),
            (Dignity::Domicile, &[3, 8][..]),
            (Dignity::Exile, &[2, 9][..]),
            (Dignity::Fall, &[4, 7, 11, 12][..]),
        ],
        Body::Moon => [
            (Dignity::Exaltation, &[4, 7, 11, 12][..]),
            (Dignity::Domicile, &[2, 9][..]),
            (Dignity::Exile, &[3, 8][..]),
            (Dignity::Fall, &[1, 5, 6, 10][..]),
        ],
        Body::Mercury => [
            (Dignity::Exaltation, &[3, 6, 10][..]),
            (Dignity::Domicile, &[5, 1, 8][..]),
            (Dignity::Exile, &[4, 9, 12][..]),
            (Dignity::Fall, &[2, 7, 11][..]),
        ],
        Body::Venus => [
            (Dignity::Exaltation, &[2, 7, 11][..]),
            (Dignity::Domicile, &[4, 9, 12][..]),
            (Dignity::Exile, &[5, 1, 8][..]),
            (Dignity::Fall, &[3, 6, 10][..]),
        ],
        Body::Mars => [
            (Dignity::Exaltation, &[5, 1, 8][..]),
            (Dignity::Domicile, &[3, 6, 10][..]),
            (Dignity::Exile, &[2, 7, 11][..]),
            (Dignity::Fall, &[4, 9, 12][..]),
        ],
        Body::Jupiter => [
            (Dignity::Exaltation, &[4, 9, 12][..]),
            (Dignity::Domicile, &[2, 7, 11][..]),
            (Dignity::Exile, &[3, 6, 10][..]),
            (Dignity::Fall, &[5, 1, 8][..]),
        ],
        Body::Saturn => [
            (Dignity::Exaltation, &[3, 9][..]),
            (Dignity::Domicile, &[1, 5, 7, 11][..]),
            (Dignity::Exile, &[4, 6, 10, 12][..]),
            (Dignity::Fall, &[2, 8][..]),
        ],
        _ => return None,
    };
    Some(table)
}

// ---------------------------
// ## Scoring
// ---------------------------

/// Equal house containing `longitude`, counted from the Ascendant.
pub fn house_number(longitude: f64, asc_longitude: f64) -> u32 {
    let diff = (longitude - asc_longitude).rem_euclid(360.0);
    let mut house = 1 + (diff / 30.0) as u32;
    if house > 12 {
        house -= 12;
    }
    house
}

/// Essential dignity points for a body by the sign it occupies. Sign
/// sets are checked independently and accumulate.
pub fn essential_dignity_points(body: Body, longitude: f64) -> i32 {
    let sign = Sign::from_longitude(longitude);
    let Some(table) = sign_dignities(body) else {
        return 0;
    };
    table
        .iter()
        .filter(|(_, signs)| signs.contains(&sign))
        .map(|(dignity, _)| dignity.points())
        .sum()
}

/// Angularity points: awarded when the longitude lies within orb of
/// any segment boundary of the sign table.
pub fn angularity_points(longitude: f64) -> i32 {
    let lon = longitude.rem_euclid(360.0);
    for &(_, start, _) in &SEGMENTS {
        if (lon - start).abs() <= ANGULAR_ORB {
            return ANGULAR_POINTS;
        }
    }
    0
}

/// Sum of aspect contributions over every aspect mentioning the body.
pub fn aspect_points(body: Body, aspects: &[AspectInfo]) -> i32 {
    aspects
        .iter()
        .filter(|a| a.involves(ChartPoint::Body(body)))
        .map(|a| a.category.points())
        .sum()
}

/// House-rulership points: the first dignity category whose house set
/// contains the computed house wins.
pub fn house_points(body: Body, house: u32) -> i32 {
    let Some(table) = house_dignities(body) else {
        return 0;
    };
    for (dignity, houses) in table {
        if houses.contains(&house) {
            return dignity.points();
        }
    }
    0
}

/// Scoring row for one traditional body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DignityRow {
    pub body: Body,
    pub sign: Sign,
    pub house: u32,
    pub house_points: i32,
    pub dignity_points: i32,
    pub angular_points: i32,
    pub aspect_points: i32,
    pub total: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DignityTable {
    pub rows: Vec<DignityRow>,
    pub grand_total: i32,
}

/// Score every traditional body in the chart. Without an Ascendant the
/// houses cannot be anchored and the table is empty.
pub fn score_chart(positions: &[BodyPosition], aspects: &[AspectInfo]) -> DignityTable {
    let Some(asc) = positions.iter().find(|p| p.point == ChartPoint::Ascendant) else {
        return DignityTable::default();
    };

    let mut rows = Vec::new();
    let mut grand_total = 0;
    for position in positions {
        let ChartPoint::Body(body) = position.point else {
            continue;
        };
        if !body.is_traditional() {
            continue;
        }

        let house = house_number(position.longitude, asc.longitude);
        let house_points = house_points(body, house);
        let dignity_points = essential_dignity_points(body, position.longitude);
        let angular_points = angularity_points(position.longitude);
        let aspect_points = aspect_points(body, aspects);
        let total = house_points + dignity_points + angular_points + aspect_points;
        grand_total += total;

        rows.push(DignityRow {
            body,
            sign: position.sign,
            house,
            house_points,
            dignity_points,
            angular_points,
            aspect_points,
            total,
        });
    }

    DignityTable { rows, grand_total }
}
