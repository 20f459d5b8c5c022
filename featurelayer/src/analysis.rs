//! Building height statistics, filtering and footprint area.
//!
//! Pure functions over a [`FeatureCollection`]; nothing here touches the
//! network or the cache.

use std::fmt;

use serde_json::Value;

use crate::feature::{Feature, FeatureCollection, Geometry, Position};

/// Metres per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Histogram bin edges in metres: `[min, max)`.
const HISTOGRAM_BINS: [(f64, f64, &str); 6] = [
    (0.0, 10.0, "0-10m"),
    (10.0, 20.0, "10-20m"),
    (20.0, 30.0, "20-30m"),
    (30.0, 50.0, "30-50m"),
    (50.0, 100.0, "50-100m"),
    (100.0, f64::INFINITY, "100m+"),
];

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub count: usize,
    /// Share of features with a height, 0 to 100.
    pub percentage: f64,
}

/// Height summary of a collection.
///
/// Only positive heights count as "with height"; min, max, average and the
/// histogram are computed over those.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightStats {
    pub count: usize,
    pub with_height: usize,
    pub no_height: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub histogram: Vec<HistogramBin>,
}

/// Summarise building heights. `None` for an empty collection.
pub fn compute_height_stats(collection: &FeatureCollection) -> Option<HeightStats> {
    if collection.is_empty() {
        return None;
    }

    let heights: Vec<f64> = collection
        .features
        .iter()
        .filter_map(|f| f.properties.height)
        .filter(|h| *h > 0.0)
        .collect();

    let count = collection.len();
    let with_height = heights.len();
    let mut counts = [0usize; HISTOGRAM_BINS.len()];
    let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);

    for &h in &heights {
        min = min.min(h);
        max = max.max(h);
        sum += h;
        if let Some(i) = HISTOGRAM_BINS
            .iter()
            .position(|(lo, hi, _)| h >= *lo && h < *hi)
        {
            counts[i] += 1;
        }
    }

    let histogram = HISTOGRAM_BINS
        .iter()
        .zip(counts)
        .map(|(&(lo, hi, label), n)| HistogramBin {
            label,
            min: lo,
            max: hi,
            count: n,
            percentage: if with_height == 0 {
                0.0
            } else {
                n as f64 / with_height as f64 * 100.0
            },
        })
        .collect();

    if with_height == 0 {
        min = 0.0;
        max = 0.0;
    }

    Some(HeightStats {
        count,
        with_height,
        no_height: count - with_height,
        min,
        max,
        avg: if with_height == 0 {
            0.0
        } else {
            sum / with_height as f64
        },
        histogram,
    })
}

impl fmt::Display for HeightStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Buildings: {} ({} with height, {} without)",
            self.count, self.with_height, self.no_height
        )?;
        writeln!(
            f,
            "Height: min {:.1} m, max {:.1} m, avg {:.1} m",
            self.min, self.max, self.avg
        )?;
        for bin in &self.histogram {
            writeln!(
                f,
                "  {:>8}  {:>6}  {:5.1}%",
                bin.label, bin.count, bin.percentage
            )?;
        }
        Ok(())
    }
}

fn in_range(feature: &Feature, min: f64, max: f64) -> bool {
    let h = feature.height_or_zero();
    h >= min && h <= max
}

/// Copy of `collection` keeping features whose height lies in `[min, max]`.
///
/// Missing heights count as 0. Collection-level members are preserved.
pub fn filter_by_height(collection: &FeatureCollection, min: f64, max: f64) -> FeatureCollection {
    FeatureCollection {
        features: collection
            .features
            .iter()
            .filter(|f| in_range(f, min, max))
            .cloned()
            .collect(),
        extra: collection.extra.clone(),
    }
}

/// Number of features whose height lies in `[min, max]`.
pub fn count_in_height_range(features: &[Feature], min: f64, max: f64) -> usize {
    features.iter().filter(|f| in_range(f, min, max)).count()
}

/// Area of a closed ring in square metres.
///
/// Coordinates are projected relative to the first vertex with an
/// equirectangular approximation at the ring's mean latitude.
fn ring_area(ring: &[Position]) -> f64 {
    if ring.len() < 4 {
        return 0.0;
    }
    let valid = ring.iter().all(|p| p.len() >= 2);
    if !valid {
        return 0.0;
    }

    let mean_lat = ring.iter().map(|p| p[1]).sum::<f64>() / ring.len() as f64;
    let m_lon = METERS_PER_DEGREE * mean_lat.to_radians().cos();
    let (ref_lon, ref_lat) = (ring[0][0], ring[0][1]);

    let points: Vec<(f64, f64)> = ring[..ring.len() - 1]
        .iter()
        .map(|p| ((p[0] - ref_lon) * m_lon, (p[1] - ref_lat) * METERS_PER_DEGREE))
        .collect();

    let n = points.len();
    let twice_area: f64 = (0..n)
        .map(|i| {
            let (x1, y1) = points[i];
            let (x2, y2) = points[(i + 1) % n];
            x1 * y2 - x2 * y1
        })
        .sum();

    twice_area.abs() / 2.0
}

fn polygon_rings_area(rings: &[Vec<Position>]) -> f64 {
    match rings.split_first() {
        Some((outer, holes)) => ring_area(outer) - holes.iter().map(|h| ring_area(h)).sum::<f64>(),
        None => 0.0,
    }
}

/// Footprint area of a polygonal geometry in square metres.
///
/// Holes are subtracted; multipolygon parts are summed. Other geometry
/// types have no area.
pub fn polygon_area_m2(geometry: &Geometry) -> f64 {
    match geometry {
        Geometry::Polygon { coordinates } => polygon_rings_area(coordinates),
        Geometry::MultiPolygon { coordinates } => {
            coordinates.iter().map(|p| polygon_rings_area(p)).sum()
        }
        Geometry::Unsupported => 0.0,
    }
}

/// Human-readable label for a building property key.
pub fn property_label(key: &str) -> &str {
    match key {
        "ogc_fid" => "Feature ID",
        "id" => "Building ID",
        "height" => "Height",
        "source" => "Data Source",
        "region" => "Region",
        "var" | "variance" => "Height Variance",
        other => other,
    }
}

/// Display string for a property value.
///
/// Heights and variances are shown in metres with one decimal; null is
/// `N/A`.
pub fn format_property_value(key: &str, value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::Number(n) if matches!(key, "height" | "var" | "variance") => match n.as_f64() {
            Some(v) => format!("{:.1} m", v),
            None => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::BuildingProperties;
    use serde_json::json;

    fn building(height: Option<f64>) -> Feature {
        Feature {
            id: None,
            geometry: None,
            properties: BuildingProperties {
                height,
                ..Default::default()
            },
        }
    }

    fn collection(heights: &[Option<f64>]) -> FeatureCollection {
        FeatureCollection {
            features: heights.iter().map(|h| building(*h)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_stats_empty_is_none() {
        assert!(compute_height_stats(&FeatureCollection::default()).is_none());
    }

    #[test]
    fn test_stats_basic() {
        let data = collection(&[Some(5.0), Some(15.0), Some(120.0), None, Some(0.0)]);
        let stats = compute_height_stats(&data).unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.with_height, 3);
        assert_eq!(stats.no_height, 2);
        assert_eq!(stats.min, 5.0);
        assert_eq!(stats.max, 120.0);
        assert!((stats.avg - 140.0 / 3.0).abs() < 1e-9);

        let counts: Vec<usize> = stats.histogram.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 1, 0, 0, 0, 1]);
        assert!((stats.histogram[0].percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_bin_edges() {
        let data = collection(&[Some(10.0), Some(50.0), Some(100.0)]);
        let stats = compute_height_stats(&data).unwrap();
        let counts: Vec<usize> = stats.histogram.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![0, 1, 0, 0, 1, 1]);
    }

    #[test]
    fn test_stats_without_heights() {
        let stats = compute_height_stats(&collection(&[None, Some(0.0)])).unwrap();
        assert_eq!(stats.with_height, 0);
        assert_eq!(stats.min, 0.0);
        assert_eq!(stats.max, 0.0);
        assert_eq!(stats.avg, 0.0);
        assert!(stats.histogram.iter().all(|b| b.count == 0 && b.percentage == 0.0));
    }

    #[test]
    fn test_filter_inclusive_and_missing_as_zero() {
        let data = collection(&[None, Some(10.0), Some(20.0), Some(20.5)]);

        let filtered = filter_by_height(&data, 0.0, 20.0);
        assert_eq!(filtered.len(), 3);

        let filtered = filter_by_height(&data, 10.0, 20.0);
        assert_eq!(filtered.len(), 2);
        assert_eq!(count_in_height_range(&data.features, 10.0, 20.0), 2);
    }

    fn square(lon: f64, lat: f64, size: f64) -> Vec<Position> {
        vec![
            vec![lon, lat],
            vec![lon + size, lat],
            vec![lon + size, lat + size],
            vec![lon, lat + size],
            vec![lon, lat],
        ]
    }

    #[test]
    fn test_area_at_equator() {
        let geometry = Geometry::Polygon {
            coordinates: vec![square(0.0, 0.0, 0.001)],
        };
        // (0.001 * 111320)^2, with a tiny cosine correction at 0.0004 deg.
        let area = polygon_area_m2(&geometry);
        assert!((area - 12_392.1).abs() < 1.0, "area was {}", area);
    }

    #[test]
    fn test_area_hole_subtracted() {
        let geometry = Geometry::Polygon {
            coordinates: vec![square(0.0, 0.0, 0.002), square(0.0005, 0.0005, 0.001)],
        };
        let outer = polygon_area_m2(&Geometry::Polygon {
            coordinates: vec![square(0.0, 0.0, 0.002)],
        });
        let hole = polygon_area_m2(&Geometry::Polygon {
            coordinates: vec![square(0.0005, 0.0005, 0.001)],
        });
        assert!((polygon_area_m2(&geometry) - (outer - hole)).abs() < 1e-6);
    }

    #[test]
    fn test_area_multipolygon_sums_parts() {
        let part = vec![square(11.0, 48.0, 0.001)];
        let single = polygon_area_m2(&Geometry::Polygon {
            coordinates: part.clone(),
        });
        let multi = polygon_area_m2(&Geometry::MultiPolygon {
            coordinates: vec![part.clone(), part],
        });
        assert!((multi - 2.0 * single).abs() < 1e-6);
    }

    #[test]
    fn test_area_shrinks_with_latitude() {
        let equator = polygon_area_m2(&Geometry::Polygon {
            coordinates: vec![square(0.0, 0.0, 0.001)],
        });
        let munich = polygon_area_m2(&Geometry::Polygon {
            coordinates: vec![square(11.0, 48.0, 0.001)],
        });
        assert!(munich < equator);
    }

    #[test]
    fn test_area_degenerate() {
        let triangle_open = Geometry::Polygon {
            coordinates: vec![vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]]],
        };
        assert_eq!(polygon_area_m2(&triangle_open), 0.0);
        assert_eq!(polygon_area_m2(&Geometry::Unsupported), 0.0);
        assert_eq!(
            polygon_area_m2(&Geometry::Polygon {
                coordinates: Vec::new()
            }),
            0.0
        );
    }

    #[test]
    fn test_format_property_value() {
        assert_eq!(format_property_value("height", &json!(12.34)), "12.3 m");
        assert_eq!(format_property_value("var", &json!(2)), "2.0 m");
        assert_eq!(format_property_value("height", &Value::Null), "N/A");
        assert_eq!(format_property_value("region", &json!("Bavaria")), "Bavaria");
        assert_eq!(format_property_value("ogc_fid", &json!(42)), "42");
    }

    #[test]
    fn test_property_label() {
        assert_eq!(property_label("ogc_fid"), "Feature ID");
        assert_eq!(property_label("var"), "Height Variance");
        assert_eq!(property_label("custom"), "custom");
    }
}
