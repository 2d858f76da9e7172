//! Coordinate row storage

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One validated record of the coordinate file
///
/// Latitude and longitude are always finite. The sequence index and route id
/// may be missing when their cells failed numeric coercion.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoordinateRow {
    /// Ordering of the point within its route
    pub sequence: Option<f64>,
    /// Route the point belongs to
    pub route_id: Option<i64>,
    /// WGS84 latitude in degrees
    pub latitude: f64,
    /// WGS84 longitude in degrees
    pub longitude: f64,
    /// Zero-based index of the source record this row came from
    pub record: usize,
}

impl CoordinateRow {
    pub fn new(sequence: Option<f64>, route_id: Option<i64>, latitude: f64, longitude: f64) -> Self {
        Self {
            sequence,
            route_id,
            latitude,
            longitude,
            record: 0,
        }
    }

    /// Attach the source record index
    pub fn with_record(mut self, record: usize) -> Self {
        self.record = record;
        self
    }

    /// The point as a `(longitude, latitude)` coordinate
    #[inline]
    pub fn coord(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coord_is_lon_lat() {
        let row = CoordinateRow::new(Some(1.0), Some(3), 37.5, 127.25);
        let coord = row.coord();
        assert_eq!(coord.x, 127.25);
        assert_eq!(coord.y, 37.5);
    }

    #[test]
    fn test_with_record() {
        let row = CoordinateRow::new(None, None, 0.0, 0.0).with_record(42);
        assert_eq!(row.record, 42);
    }
}
