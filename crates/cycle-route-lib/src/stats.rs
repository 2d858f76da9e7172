//! Summary statistics over rows and route features

use crate::{CoordinateRow, RouteFeature, RouteFeatureCollection};
use geo::Rect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Earth's radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Information about a feature collection
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollectionInfo {
    /// Number of routes with geometry
    pub route_count: usize,
    /// Total number of line points
    pub total_points: usize,
    /// Total length in meters
    pub total_distance_meters: f64,
}

/// Mean `(latitude, longitude)` of the rows, `None` when there are none
pub fn centroid(rows: &[CoordinateRow]) -> Option<(f64, f64)> {
    if rows.is_empty() {
        return None;
    }
    let n = rows.len() as f64;
    let (lat_sum, lon_sum) = rows
        .iter()
        .fold((0.0, 0.0), |(lat, lon), row| (lat + row.latitude, lon + row.longitude));
    Some((lat_sum / n, lon_sum / n))
}

/// Bounding box of the rows with `x` = longitude and `y` = latitude
pub fn bounding_box(rows: &[CoordinateRow]) -> Option<Rect<f64>> {
    let first = rows.first()?.coord();
    let (min, max) = rows.iter().skip(1).fold((first, first), |(min, max), row| {
        let c = row.coord();
        (
            geo::Coord {
                x: min.x.min(c.x),
                y: min.y.min(c.y),
            },
            geo::Coord {
                x: max.x.max(c.x),
                y: max.y.max(c.y),
            },
        )
    });
    Some(Rect::new(min, max))
}

/// Great-circle distance between two `(lon, lat)` coordinates in meters
pub fn haversine_distance(a: geo::Coord<f64>, b: geo::Coord<f64>) -> f64 {
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let delta_lat = (b.y - a.y).to_radians();
    let delta_lon = (b.x - a.x).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Length of a route in meters
pub fn route_length_meters(feature: &RouteFeature) -> f64 {
    feature
        .line
        .0
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}

impl RouteFeatureCollection {
    /// Route count, point count and total length
    pub fn info(&self) -> CollectionInfo {
        CollectionInfo {
            route_count: self.len(),
            total_points: self.total_points(),
            total_distance_meters: self.features().iter().map(route_length_meters).sum(),
        }
    }
}
