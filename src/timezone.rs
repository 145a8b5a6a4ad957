//! Historical timezone resolution and UTC normalization.
//!
//! Offsets come from three places, tried in order: hard-coded country
//! rules (Spain, Argentina, Mexico), a nearest-offset search over the
//! preloaded timezone table, and a solar estimate from the longitude
//! (15° per hour). Every degraded path is logged and labelled with a
//! [`ZoneSource`] / [`UtcSource`] so callers can tell which one fired.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use crate::Coordinates;

// ---------------------------
// ## Timezone data model
// ---------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    North,
    South,
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Hemisphere::North => write!(f, "north"),
            Hemisphere::South => write!(f, "south"),
        }
    }
}

/// Which resolution path produced a [`TimezoneInfo`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneSource {
    /// A hard-coded country rule matched.
    CountryRule,
    /// Nearest-offset search over the timezone table.
    TableLookup,
    /// Table was empty; name synthesized from the longitude estimate.
    Synthesized,
    /// Longitude-only estimate (degraded path, no DST applied).
    LongitudeEstimate,
    /// Everything failed; UTC assumed.
    DefaultUtc,
}

/// Resolved zone for one request. Both abbreviation fields carry the
/// currently active abbreviation. `longitude` is only recorded by the
/// estimate path so the UTC normalizer can re-derive an offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimezoneInfo {
    pub name: String,
    /// Signed UTC offset in hours; fractional offsets occur in table
    /// lookups.
    pub offset: f64,
    #[serde(rename = "abbreviation_STD")]
    pub abbr_std: String,
    #[serde(rename = "abbreviation_DST")]
    pub abbr_dst: String,
    pub is_dst: bool,
    pub hemisphere: Hemisphere,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    pub source: ZoneSource,
}

/// One row of the preloaded timezone table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimezoneTableEntry {
    pub zone: String,
    pub country_code: String,
    pub abbreviation: String,
    /// UNIX reference timestamp of the observation.
    pub timestamp: i64,
    /// UTC offset in seconds.
    pub utc_offset: f64,
    /// 1 when the zone observes DST at the reference timestamp.
    pub dst: u8,
}

/// Read-only table of zone observations, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct TimezoneTable {
    entries: Vec<TimezoneTableEntry>,
}

impl TimezoneTable {
    pub fn new(entries: Vec<TimezoneTableEntry>) -> Self {
        TimezoneTable { entries }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let table = Self::parse(&text);
        debug!("loaded timezone table: {} entries", table.len());
        Ok(table)
    }

    /// Parse comma-separated rows. Rows with fewer than six fields are
    /// skipped; malformed numeric fields default to zero.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let fields: Vec<&str> = line.split(',').map(str::trim).collect();
                if fields.len() < 6 {
                    return None;
                }
                Some(TimezoneTableEntry {
                    zone: fields[0].to_string(),
                    country_code: fields[1].to_string(),
                    abbreviation: fields[2].to_string(),
                    timestamp: fields[3].parse().unwrap_or(0),
                    utc_offset: fields[4].parse().unwrap_or(0.0),
                    dst: fields[5].parse().unwrap_or(0),
                })
            })
            .collect();
        TimezoneTable { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry whose offset is numerically closest to the estimate.
    fn nearest_offset(&self, estimated_hours: f64) -> Option<&TimezoneTableEntry> {
        let mut closest: Option<&TimezoneTableEntry> = None;
        let mut min_diff = f64::INFINITY;
        for entry in &self.entries {
            let diff = (entry.utc_offset / 3600.0 - estimated_hours).abs();
            if diff < min_diff {
                min_diff = diff;
                closest = Some(entry);
            }
        }
        closest
    }
}

// ---------------------------
// ## DST rules
// ---------------------------

/// Southern-hemisphere countries known to observe DST; everywhere else
/// south of the equator the answer is no.
const SOUTH_DST_COUNTRIES: [&str; 5] =
    ["australia", "new zealand", "nueva zelanda", "chile", "paraguay"];

/// Whether `date` falls inside the DST window for the given place,
/// using per-country historical rules with the day-25 approximation of
/// the last-Sunday boundaries.
pub fn determine_dst(date: NaiveDate, hemisphere: Hemisphere, coords: &Coordinates) -> bool {
    let year = date.year();
    let month = date.month();
    let day = date.day();
    let country = coords.country.to_lowercase();

    if country.contains("spain") || country.contains("españa") {
        return if year < 1974 {
            false
        } else if year <= 1975 {
            // 1974-1975: April 13 through October 6.
            (month > 4 && month < 10) || (month == 4 && day >= 13) || (month == 10 && day <= 6)
        } else if year <= 1996 {
            month > 3 && month < 10
        } else {
            // EU rule, last Sunday of March to last Sunday of October.
            (month > 3 && month < 10)
                || (month == 3 && day >= 25)
                || (month == 10 && day <= 25)
        };
    }

    match hemisphere {
        Hemisphere::North => {
            if year < 1970 {
                return false;
            }
            (month > 3 && month < 10) || (month == 3 && day >= 25) || (month == 10 && day <= 25)
        }
        Hemisphere::South => {
            if !SOUTH_DST_COUNTRIES.iter().any(|c| country.contains(c)) {
                return false;
            }
            // Mirrored season: late October through late March.
            month < 3 || month > 10 || (month == 3 && day <= 25) || (month == 10 && day >= 25)
        }
    }
}

// ---------------------------
// ## Resolver
// ---------------------------

/// Resolve the zone for a birth place and date. Never fails: an
/// unparseable date degrades to [`estimate_timezone`].
pub fn resolve_timezone(coords: &Coordinates, date: &str, table: &TimezoneTable) -> TimezoneInfo {
    let date = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("unparseable birth date {:?} ({}); estimating timezone from longitude", date, err);
            return estimate_timezone(coords);
        }
    };

    let hemisphere = coords.hemisphere();
    let is_dst = determine_dst(date, hemisphere, coords);
    let estimated_offset = (coords.longitude / 15.0).round();

    if let Some(info) = country_rule(coords, is_dst, hemisphere) {
        debug!("timezone from country rule: {} offset {}", info.name, info.offset);
        return info;
    }

    if let Some(entry) = table.nearest_offset(estimated_offset) {
        let mut offset = entry.utc_offset / 3600.0;
        if is_dst && entry.dst == 1 {
            offset += 1.0;
        }
        debug!("timezone from table: {} offset {} dst {}", entry.zone, offset, is_dst);
        return TimezoneInfo {
            name: entry.zone.clone(),
            offset,
            abbr_std: entry.abbreviation.clone(),
            abbr_dst: entry.abbreviation.clone(),
            is_dst,
            hemisphere,
            longitude: None,
            source: ZoneSource::TableLookup,
        };
    }

    // No table loaded; synthesize a name from the solar estimate.
    warn!("timezone table empty; synthesizing GMT{:+} from longitude", estimated_offset as i32);
    let abbr = format!("GMT{:+}", estimated_offset as i32);
    TimezoneInfo {
        name: format!("Estimated/GMT{:+}", estimated_offset as i32),
        offset: estimated_offset,
        abbr_std: abbr.clone(),
        abbr_dst: abbr,
        is_dst,
        hemisphere,
        longitude: None,
        source: ZoneSource::Synthesized,
    }
}

fn country_rule(coords: &Coordinates, is_dst: bool, hemisphere: Hemisphere) -> Option<TimezoneInfo> {
    let country = coords.country.to_lowercase();

    let (name, offset, abbr) = if country.contains("spain") || country.contains("españa") {
        if is_dst {
            ("Europe/Madrid", 2.0, "CEST")
        } else {
            ("Europe/Madrid", 1.0, "CET")
        }
    } else if country.contains("argentina") {
        // Argentina does not currently observe DST.
        ("America/Argentina/Buenos_Aires", -3.0, "ART")
    } else if country.contains("mexico") || country.contains("méxico") {
        if is_dst {
            ("America/Mexico_City", -5.0, "CDT")
        } else {
            ("America/Mexico_City", -6.0, "CST")
        }
    } else {
        return None;
    };

    Some(TimezoneInfo {
        name: name.to_string(),
        offset,
        abbr_std: abbr.to_string(),
        abbr_dst: abbr.to_string(),
        is_dst,
        hemisphere,
        longitude: None,
        source: ZoneSource::CountryRule,
    })
}

/// Longitude-only estimate, used when the resolver cannot run its full
/// rule set. Country overrides still apply (without DST); US longitudes
/// map onto a coarse four-band approximation of the continental zones.
pub fn estimate_timezone(coords: &Coordinates) -> TimezoneInfo {
    if !coords.longitude.is_finite() || !coords.latitude.is_finite() {
        warn!("coordinates unusable for estimation; defaulting to UTC");
        return utc_default();
    }

    let lon = coords.longitude;
    let country = coords.country.to_lowercase();

    let offset = if country.contains("spain") || country.contains("españa") {
        1.0
    } else if country.contains("argentina") {
        -3.0
    } else if country.contains("mexico") || country.contains("méxico") {
        -6.0
    } else if country.contains("united states") || country.contains("estados unidos") {
        if lon < -100.0 {
            -8.0 // Pacific
        } else if lon < -90.0 {
            -7.0 // Mountain
        } else if lon < -75.0 {
            -6.0 // Central
        } else {
            -5.0 // Eastern
        }
    } else {
        (lon / 15.0).round()
    };

    let name = format!("GMT{:+}", offset as i32);
    TimezoneInfo {
        name: name.clone(),
        offset,
        abbr_std: name.clone(),
        abbr_dst: name,
        is_dst: false,
        hemisphere: coords.hemisphere(),
        longitude: Some(lon),
        source: ZoneSource::LongitudeEstimate,
    }
}

fn utc_default() -> TimezoneInfo {
    TimezoneInfo {
        name: "UTC".to_string(),
        offset: 0.0,
        abbr_std: "UTC".to_string(),
        abbr_dst: "UTC".to_string(),
        is_dst: false,
        hemisphere: Hemisphere::North,
        longitude: None,
        source: ZoneSource::DefaultUtc,
    }
}

// ---------------------------
// ## UTC normalizer
// ---------------------------

/// Which normalization path produced a [`UtcConversion`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtcSource {
    /// The resolved zone offset was attached.
    ZoneOffset,
    /// Offset re-derived from the recorded longitude.
    LongitudeEstimate,
    /// No usable offset; the input was taken as already UTC.
    AssumedUtc,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtcConversion {
    pub utc: DateTime<Utc>,
    pub source: UtcSource,
}

/// Combine a local `"YYYY-MM-DD"` date and `"HH:MM"` time with the
/// resolved zone into a UTC instant. The offset already folds in DST;
/// it is not re-validated here. Returns `None` only when the civil
/// string cannot be parsed at all.
pub fn to_utc(date: &str, time: &str, tz: &TimezoneInfo) -> Option<UtcConversion> {
    let civil = format!("{} {}", date, time);
    let local = match NaiveDateTime::parse_from_str(&civil, "%Y-%m-%d %H:%M") {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!("unparseable local time {:?} ({})", civil, err);
            return None;
        }
    };

    let offset_seconds = (tz.offset * 3600.0).round() as i32;
    if let Some(zone) = FixedOffset::east_opt(offset_seconds) {
        if let Some(dt) = zone.from_local_datetime(&local).single() {
            return Some(UtcConversion {
                utc: dt.with_timezone(&Utc),
                source: UtcSource::ZoneOffset,
            });
        }
    }
    warn!("could not attach offset {} to {}; falling back", tz.offset, civil);

    // Degraded: longitude-derived offset if the resolver recorded one.
    if let Some(lon) = tz.longitude {
        let estimated = (lon / 15.0).round() as i32 * 3600;
        if let Some(zone) = FixedOffset::east_opt(estimated) {
            if let Some(dt) = zone.from_local_datetime(&local).single() {
                warn!("using longitude-estimated offset {}h", estimated / 3600);
                return Some(UtcConversion {
                    utc: dt.with_timezone(&Utc),
                    source: UtcSource::LongitudeEstimate,
                });
            }
        }
    }

    warn!("assuming input time {} was already UTC", civil);
    Some(UtcConversion {
        utc: Utc.from_utc_datetime(&local),
        source: UtcSource::AssumedUtc,
    })
}
