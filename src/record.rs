//! Property rows as handed over by the storage layer.
//!
//! The query core only reads these; it never writes property rows back.

use serde::{Deserialize, Serialize};

/// Coordinates exactly as stored, before decoding.
///
/// Rows written by different parts of the application carry either a WKT
/// string (`"POINT(37.6176 55.7558)"`), a JSON string, or a JSON object with
/// `lat`/`lng` members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawCoordinates {
    Text(String),
    Object(serde_json::Value),
}

impl From<&str> for RawCoordinates {
    fn from(text: &str) -> Self {
        RawCoordinates::Text(text.to_string())
    }
}

impl From<String> for RawCoordinates {
    fn from(text: String) -> Self {
        RawCoordinates::Text(text)
    }
}

impl From<serde_json::Value> for RawCoordinates {
    fn from(value: serde_json::Value) -> Self {
        RawCoordinates::Object(value)
    }
}

/// The non-spatial attributes filters are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropertyAttributes {
    pub price: f64,
    pub region_id: Option<i64>,
    pub property_class_id: Option<i64>,
}

/// A property row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub id: i64,
    pub coordinates: RawCoordinates,
    pub price: f64,
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub property_class_id: Option<i64>,
    #[serde(default = "PropertyRecord::default_active")]
    pub is_active: bool,
}

impl PropertyRecord {
    const fn default_active() -> bool {
        true
    }

    /// An active row with no region or class.
    pub fn new(id: i64, coordinates: impl Into<RawCoordinates>, price: f64) -> Self {
        Self {
            id,
            coordinates: coordinates.into(),
            price,
            region_id: None,
            property_class_id: None,
            is_active: true,
        }
    }

    pub fn with_region(mut self, region_id: i64) -> Self {
        self.region_id = Some(region_id);
        self
    }

    pub fn with_property_class(mut self, property_class_id: i64) -> Self {
        self.property_class_id = Some(property_class_id);
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn attributes(&self) -> PropertyAttributes {
        PropertyAttributes {
            price: self.price,
            region_id: self.region_id,
            property_class_id: self.property_class_id,
        }
    }
}
