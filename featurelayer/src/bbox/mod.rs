//! Bounding box quantization.
//!
//! Snaps continuous viewport extents to a decimal grid so that near-identical
//! viewports share a cache key. Camera jitter below the grid step during
//! interaction then maps to the same key instead of defeating the cache.
//!
//! # Example
//!
//! ```
//! use featurelayer::bbox::{quantize, BoundingBox, DEFAULT_PRECISION};
//!
//! let a = BoundingBox::new(11.57512, 48.13701, 11.59004, 48.14498);
//! let b = BoundingBox::new(11.57508, 48.13697, 11.58996, 48.14502);
//!
//! let key_a = quantize("buildings", &a, DEFAULT_PRECISION).unwrap();
//! let key_b = quantize("buildings", &b, DEFAULT_PRECISION).unwrap();
//! assert_eq!(key_a, key_b);
//! assert_eq!(key_a.as_str(), "buildings|11.575,48.137,11.590,48.145");
//! ```

mod types;

pub use types::{BboxError, BoundingBox, QuantizedKey, DEFAULT_PRECISION, MAX_PRECISION};

/// Rounds a single coordinate to `precision` decimal places.
///
/// Uses round-half-away-from-zero. Negative zero is normalised to zero so
/// the textual key does not depend on the sign of an empty offset.
#[inline]
pub fn quantize_coord(value: f64, precision: u32) -> f64 {
    let scale = 10f64.powi(precision as i32);
    let rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Snaps every edge of `bbox` to the grid.
///
/// The snapped box is what gets requested from the feature service, so a
/// cached collection always belongs to exactly its key's extent.
pub fn snap(bbox: &BoundingBox, precision: u32) -> Result<BoundingBox, BboxError> {
    check_precision(precision)?;
    bbox.validate()?;

    let [w, s, e, n] = bbox.to_array().map(|v| quantize_coord(v, precision));
    Ok(BoundingBox::new(w, s, e, n))
}

/// Derives the cache key for `bbox` on `layer`.
///
/// The four rounded coordinates are joined in west, south, east, north order
/// and combined with the layer identifier.
///
/// # Errors
///
/// Returns [`BboxError::NonFinite`] for NaN or infinite coordinates and
/// [`BboxError::PrecisionTooLarge`] above [`MAX_PRECISION`].
pub fn quantize(layer: &str, bbox: &BoundingBox, precision: u32) -> Result<QuantizedKey, BboxError> {
    let snapped = snap(bbox, precision)?;
    let p = precision as usize;
    let coords = format!(
        "{:.*},{:.*},{:.*},{:.*}",
        p, snapped.west, p, snapped.south, p, snapped.east, p, snapped.north
    );
    Ok(QuantizedKey::from_parts(layer, &coords))
}

fn check_precision(precision: u32) -> Result<(), BboxError> {
    if precision > MAX_PRECISION {
        return Err(BboxError::PrecisionTooLarge(precision));
    }
    Ok(())
}
