//! Coordinate codec: one canonical `GeoPoint` behind every stored encoding.
//!
//! Accepted encodings:
//! - WKT point literals, `POINT(lng lat)`, optionally prefixed with `SRID=4326;`
//! - JSON objects with numeric `lat` and `lng` (or `lon`) members, either as a
//!   parsed value or as JSON text
//!
//! [`encode`] writes the WKT form and round-trips exactly through [`decode`].

use crate::error::DecodeError;
use crate::record::RawCoordinates;
use geoquery_types::{CoordinateError, GeoPoint};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    #[serde(alias = "lon")]
    lng: f64,
}

/// Decode stored coordinates into a `GeoPoint`.
///
/// # Examples
///
/// ```rust
/// use geoquery::codec::decode;
/// use geoquery::RawCoordinates;
///
/// let p = decode(&RawCoordinates::from("POINT(37.6176 55.7558)")).unwrap();
/// assert_eq!((p.lat(), p.lng()), (55.7558, 37.6176));
///
/// assert!(decode(&RawCoordinates::from("not-a-point")).is_err());
/// ```
pub fn decode(raw: &RawCoordinates) -> Result<GeoPoint, DecodeError> {
    match raw {
        RawCoordinates::Text(text) => decode_str(text),
        RawCoordinates::Object(value) => decode_json(value),
    }
}

/// Decode a textual coordinate value (WKT or JSON text).
pub fn decode_str(text: &str) -> Result<GeoPoint, DecodeError> {
    let text = text.trim();
    if text.starts_with('{') {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| DecodeError::malformed(format!("invalid JSON coordinates: {}", e)))?;
        return decode_json(&value);
    }
    decode_wkt(text)
}

/// Decode a JSON object carrying `lat`/`lng`.
pub fn decode_json(value: &serde_json::Value) -> Result<GeoPoint, DecodeError> {
    if !value.is_object() {
        return Err(DecodeError::malformed(format!(
            "expected a JSON object, got: {}",
            value
        )));
    }
    let LatLng { lat, lng } = LatLng::deserialize(value)
        .map_err(|e| DecodeError::malformed(format!("expected numeric lat/lng: {}", e)))?;
    checked_point(lat, lng)
}

/// Encode a point as WKT, `POINT(lng lat)`.
///
/// `f64`'s `Display` is the shortest representation that parses back to the
/// same value, which is what makes `decode(encode(p)) == p` exact.
pub fn encode(point: &GeoPoint) -> String {
    format!("POINT({} {})", point.lng(), point.lat())
}

fn decode_wkt(text: &str) -> Result<GeoPoint, DecodeError> {
    let body = strip_srid(text)?;
    let is_point = body
        .get(..5)
        .is_some_and(|keyword| keyword.eq_ignore_ascii_case("POINT"));
    if !is_point {
        return Err(DecodeError::malformed(format!("not a WKT point: {:?}", text)));
    }

    // the WKT parser stops after the first geometry; nothing may follow it
    let single = body.ends_with(')')
        && body.matches('(').count() == 1
        && body.matches(')').count() == 1;
    if !single {
        return Err(DecodeError::malformed(format!(
            "expected a single WKT point: {:?}",
            text
        )));
    }

    let parsed = wkt::Wkt::<f64>::from_str(body)
        .map_err(|e| DecodeError::malformed(format!("WKT parse error: {:?}", e)))?;
    let point: geo::Point<f64> = parsed
        .try_into()
        .map_err(|e: wkt::conversion::Error| {
            DecodeError::malformed(format!("WKT is not a 2D point: {:?}", e))
        })?;

    checked_point(point.y(), point.x())
}

/// Only WGS 84 (`SRID=4326`) is accepted; other reference systems would be
/// read as degrees and land in the wrong place.
fn strip_srid(text: &str) -> Result<&str, DecodeError> {
    let Some((prefix, rest)) = text.split_once(';') else {
        return Ok(text);
    };
    let Some(srid) = prefix
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("SRID="))
        .and_then(|_| prefix.get(5..))
    else {
        return Ok(text);
    };

    match srid.trim().parse::<u32>() {
        Ok(4326) => Ok(rest.trim_start()),
        _ => Err(DecodeError::malformed(format!(
            "unsupported SRID {:?}, expected 4326",
            srid
        ))),
    }
}

fn checked_point(lat: f64, lng: f64) -> Result<GeoPoint, DecodeError> {
    GeoPoint::new(lat, lng).map_err(|e| match e {
        CoordinateError::NonFinite { .. } => DecodeError::malformed(e.to_string()),
        _ => DecodeError::out_of_range(e.to_string()),
    })
}
