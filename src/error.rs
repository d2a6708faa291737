//! Error types for geoquery.

use crate::backend::BackendError;
use geoquery_types::CoordinateError;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the query service.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoQueryError {
    /// Malformed point, bounds, radius or zoom, or a conflicting query spec.
    #[error("invalid query: {0}")]
    Validation(String),

    /// A single record's coordinates could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The indexed path could not answer (unreachable, missing capability,
    /// query error or timeout).
    #[error("spatial index unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The row source backing the fallback path failed.
    #[error("row source error: {0}")]
    Backend(#[from] BackendError),

    /// Both the indexed and the fallback path failed for one request.
    #[error("query failed on both paths (indexed: {indexed}; fallback: {fallback})")]
    FallbackExhausted { indexed: String, fallback: String },

    /// The caller's cancellation token fired.
    #[error("query cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<CoordinateError> for GeoQueryError {
    fn from(err: CoordinateError) -> Self {
        GeoQueryError::Validation(err.to_string())
    }
}

/// Why a raw coordinate value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeReason {
    /// Not a recognised encoding, or not numeric where numbers are required.
    Malformed,
    /// Well-formed but outside the valid latitude/longitude range.
    OutOfRange,
}

impl fmt::Display for DecodeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeReason::Malformed => f.write_str("malformed"),
            DecodeReason::OutOfRange => f.write_str("out_of_range"),
        }
    }
}

/// A coordinate value that could not be turned into a `GeoPoint`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} coordinates: {detail}")]
pub struct DecodeError {
    pub reason: DecodeReason,
    pub detail: String,
}

impl DecodeError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            reason: DecodeReason::Malformed,
            detail: detail.into(),
        }
    }

    pub fn out_of_range(detail: impl Into<String>) -> Self {
        Self {
            reason: DecodeReason::OutOfRange,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoQueryError>;
