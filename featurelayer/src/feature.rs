//! GeoJSON feature collection model for building footprints.
//!
//! Only `height` is interpreted by this crate. Every other property is kept
//! verbatim so downstream consumers receive what the service sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A `[lon, lat]` or `[lon, lat, z]` position.
pub type Position = Vec<f64>;

/// Footprint geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    /// Any other GeoJSON geometry type; carried but not measured.
    #[serde(other)]
    Unsupported,
}

/// Properties attached to a building footprint.
///
/// Identifier and provenance fields are kept as raw JSON because services
/// disagree on their types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildingProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ogc_fid: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    /// Building height in metres.
    #[serde(default)]
    pub height: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Value>,

    /// Height uncertainty (variance) in metres.
    #[serde(default, rename = "var", skip_serializing_if = "Option::is_none")]
    pub variance: Option<Value>,

    /// Properties this crate does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single building footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub geometry: Option<Geometry>,

    #[serde(default)]
    pub properties: BuildingProperties,
}

impl Feature {
    /// Height in metres, treating a missing value as zero.
    pub fn height_or_zero(&self) -> f64 {
        self.properties.height.unwrap_or(0.0)
    }
}

/// A GeoJSON `FeatureCollection` of building footprints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,

    /// Top-level members such as `totalFeatures` or `crs`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureCollection {
    /// Parse a collection from a JSON response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    /// Number of features in the collection.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check whether the collection has no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
