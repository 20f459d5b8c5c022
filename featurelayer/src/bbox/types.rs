//! Bounding box and cache key types.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Default number of decimal places used when quantizing coordinates.
///
/// Three decimal degrees is roughly 100 m at the equator.
pub const DEFAULT_PRECISION: u32 = 3;

/// Largest supported quantization precision.
pub const MAX_PRECISION: u32 = 10;

/// Errors raised while building or quantizing a bounding box.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BboxError {
    /// A coordinate was NaN or infinite.
    #[error("Non-finite {axis} coordinate: {value}")]
    NonFinite { axis: &'static str, value: f64 },

    /// Requested precision exceeds [`MAX_PRECISION`].
    #[error("Precision {0} exceeds maximum of {MAX_PRECISION} decimal places")]
    PrecisionTooLarge(u32),

    /// Text could not be parsed as `west,south,east,north`.
    #[error("Invalid bounding box '{input}': {reason}")]
    Parse { input: String, reason: String },
}

/// Axis-aligned geographic rectangle in EPSG:4326 degrees.
///
/// Ordering (`west < east`, `south < north`) is not enforced; boxes come from
/// a map viewport and are assumed valid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Creates a bounding box from its four edges.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Creates a bounding box from `[west, south, east, north]`.
    pub fn from_array(values: [f64; 4]) -> Self {
        Self::new(values[0], values[1], values[2], values[3])
    }

    /// Returns the edges as `[west, south, east, north]`.
    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    /// Checks that every coordinate is finite.
    pub fn validate(&self) -> Result<(), BboxError> {
        let axes = [
            ("west", self.west),
            ("south", self.south),
            ("east", self.east),
            ("north", self.north),
        ];
        for (axis, value) in axes {
            if !value.is_finite() {
                return Err(BboxError::NonFinite { axis, value });
            }
        }
        Ok(())
    }

    /// Width of the box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height of the box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Returns a copy shifted by the given offsets in degrees.
    pub fn translate(&self, d_lon: f64, d_lat: f64) -> Self {
        Self::new(
            self.west + d_lon,
            self.south + d_lat,
            self.east + d_lon,
            self.north + d_lat,
        )
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.west, self.south, self.east, self.north)
    }
}

impl FromStr for BoundingBox {
    type Err = BboxError;

    /// Parses `west,south,east,north`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_error = |reason: String| BboxError::Parse {
            input: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(parse_error(format!(
                "expected 4 comma-separated values, got {}",
                parts.len()
            )));
        }

        let mut values = [0.0; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse::<f64>()
                .map_err(|e| parse_error(format!("'{}': {}", part, e)))?;
        }

        let bbox = Self::from_array(values);
        bbox.validate()?;
        Ok(bbox)
    }
}

/// Cache and request identity for a (layer, quantized bounding box) pair.
///
/// Two viewports that round to the same grid cell produce equal keys.
/// Geometric overlap plays no part in identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuantizedKey(String);

impl QuantizedKey {
    pub(crate) fn from_parts(layer: &str, coords: &str) -> Self {
        Self(format!("{}|{}", layer, coords))
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the layer part of the key.
    pub fn layer(&self) -> &str {
        self.0.rsplit_once('|').map(|(layer, _)| layer).unwrap_or("")
    }
}

impl fmt::Display for QuantizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
