//! Request validation and full chart assembly.
//!
//! `compute_chart` is the pure pipeline over already-geocoded
//! coordinates; `compute_chart_for_city` adds the geocoding step in
//! front of it. Both produce the complete response payload the
//! embedding HTTP layer serializes.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aspects::{detect_aspects, AspectInfo};
use crate::dignity::{score_chart, DignityTable};
use crate::engine::ChartContext;
use crate::geocode::{CachedGeocoder, GeocodeError, Geocoder};
use crate::houses::{build_houses, is_dry_birth, BirthType, HousesAnalysis};
use crate::timezone::{resolve_timezone, to_utc, TimezoneInfo, UtcConversion};
use crate::{BodyPosition, Coordinates};

/// One chart request as received from the boundary layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub city: String,
    pub date: String,
    pub time: String,
}

/// Errors surfaced to the caller. Everything else degrades inside the
/// pipeline instead of failing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("city not specified")]
    CityMissing,
    #[error("could not resolve city: {0}")]
    Geocode(#[from] GeocodeError),
}

/// The full response payload. An empty `positions` list means no chart
/// could be computed for the instant; the dependent tables are then
/// empty as well, with the structural shape unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartReport {
    pub positions: Vec<BodyPosition>,
    pub coordinates: Coordinates,
    pub city: String,
    pub timezone: TimezoneInfo,
    pub local_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_time: Option<String>,
    pub aspects: Vec<AspectInfo>,
    pub dignity_table: DignityTable,
    pub houses_analysis: HousesAnalysis,
}

/// Geocode the city, then run the pipeline on the first candidate.
pub fn compute_chart_for_city<G: Geocoder>(
    ctx: &ChartContext,
    geocoder: &CachedGeocoder<G>,
    request: &ChartRequest,
) -> Result<ChartReport, ChartError> {
    if request.city.trim().is_empty() {
        return Err(ChartError::CityMissing);
    }

    let candidates = geocoder.lookup(&request.city, &request.date, &request.time)?;
    let first = candidates.first().ok_or(GeocodeError::NotFound)?;
    let coords = Coordinates::new(first.lat, first.lon, first.country.clone());

    Ok(compute_chart(
        ctx,
        &coords,
        &first.formatted,
        &request.date,
        &request.time,
    ))
}

/// Run the derivation pipeline for known coordinates. Infallible by
/// design: every stage degrades rather than failing.
pub fn compute_chart(
    ctx: &ChartContext,
    coords: &Coordinates,
    city: &str,
    date: &str,
    time: &str,
) -> ChartReport {
    let timezone = resolve_timezone(coords, date, ctx.timezone_table());
    let conversion = to_utc(date, time, &timezone);

    let positions = match conversion {
        Some(UtcConversion { utc, .. }) => {
            ctx.positions_at(utc, Some(coords.latitude), Some(coords.longitude))
        }
        None => {
            warn!("no UTC instant available; trying the legacy local-time path");
            ctx.positions_local(date, time, Some(coords.latitude), Some(coords.longitude))
        }
    };

    let aspects = detect_aspects(&positions);
    let dignity_table = score_chart(&positions, &aspects);
    let dry = is_dry_birth(&positions);
    let houses = build_houses(&positions, dry);

    ChartReport {
        aspects,
        dignity_table,
        houses_analysis: HousesAnalysis {
            houses,
            birth_type: if dry { BirthType::Dry } else { BirthType::Moist },
        },
        local_time: format!("{} {}", date, time),
        utc_time: conversion.map(|c| c.utc.format("%Y-%m-%d %H:%M").to_string()),
        timezone,
        coordinates: coords.clone(),
        city: city.to_string(),
        positions,
    }
}
