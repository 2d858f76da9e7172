//! Route geometry construction
//!
//! Groups validated rows by route id, orders every group by its sequence index
//! and turns each group into a `LineString` of `(longitude, latitude)` points.

use crate::CoordinateRow;
use geo::{Coord, LineString};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum number of points a route needs to form a line
pub const MIN_ROUTE_POINTS: usize = 2;

/// Options for the geometry builder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BuildOptions {
    /// Collapse consecutive identical coordinates within a route
    pub dedupe_consecutive: bool,
}

/// A single route rendered as a line
#[derive(Debug, Clone, PartialEq)]
pub struct RouteFeature {
    pub route_id: i64,
    /// Points in sequence order, `x` = longitude and `y` = latitude
    pub line: LineString<f64>,
}

impl RouteFeature {
    pub fn point_count(&self) -> usize {
        self.line.0.len()
    }

    /// Points as `[longitude, latitude]` pairs
    pub fn positions(&self) -> Vec<[f64; 2]> {
        self.line.0.iter().map(|c| [c.x, c.y]).collect()
    }
}

/// All emitted route features, ordered by route id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteFeatureCollection {
    features: Vec<RouteFeature>,
}

impl RouteFeatureCollection {
    /// Wrap already validated features
    pub(crate) fn from_features(features: Vec<RouteFeature>) -> Self {
        Self { features }
    }

    pub fn features(&self) -> &[RouteFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn route_ids(&self) -> Vec<i64> {
        self.features.iter().map(|f| f.route_id).collect()
    }

    pub fn get(&self, route_id: i64) -> Option<&RouteFeature> {
        self.features.iter().find(|f| f.route_id == route_id)
    }

    pub fn total_points(&self) -> usize {
        self.features.iter().map(RouteFeature::point_count).sum()
    }
}

/// What the builder left out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Rows without a route id
    pub unassigned_rows: usize,
    /// Rows without a sequence index
    pub unsequenced_rows: usize,
    /// Routes with fewer than two usable points
    pub degenerate_routes: Vec<i64>,
}

/// Build the feature collection with default options
pub fn build_feature_collection(rows: &[CoordinateRow]) -> RouteFeatureCollection {
    build_with_options(rows, &BuildOptions::default()).0
}

/// Build the feature collection and report which rows and routes were skipped
pub fn build_with_options(
    rows: &[CoordinateRow],
    options: &BuildOptions,
) -> (RouteFeatureCollection, BuildReport) {
    #[cfg(feature = "profiling")]
    profiling::scope!("builder::build_with_options");

    let mut report = BuildReport::default();

    // Single pass, rows keep their input order inside each group
    let mut groups: BTreeMap<i64, Vec<(f64, Coord<f64>)>> = BTreeMap::new();
    for row in rows {
        let Some(route_id) = row.route_id else {
            report.unassigned_rows += 1;
            continue;
        };
        let Some(sequence) = row.sequence else {
            report.unsequenced_rows += 1;
            continue;
        };
        // Adding 0.0 turns -0.0 into 0.0 so both sort as equal
        groups
            .entry(route_id)
            .or_default()
            .push((sequence + 0.0, row.coord()));
    }

    let mut features = Vec::with_capacity(groups.len());
    for (route_id, mut points) in groups {
        // Stable: equal sequence values keep their input order
        points.sort_by(|(a, _), (b, _)| a.total_cmp(b));

        let mut coords: Vec<Coord<f64>> = points.into_iter().map(|(_, coord)| coord).collect();
        if options.dedupe_consecutive {
            coords.dedup();
        }

        if coords.len() < MIN_ROUTE_POINTS {
            report.degenerate_routes.push(route_id);
            continue;
        }

        features.push(RouteFeature {
            route_id,
            line: LineString::new(coords),
        });
    }

    if report.unassigned_rows + report.unsequenced_rows > 0 || !report.degenerate_routes.is_empty()
    {
        tracing::debug!(
            "Skipped {} rows without route id, {} rows without sequence, {} degenerate routes",
            report.unassigned_rows,
            report.unsequenced_rows,
            report.degenerate_routes.len()
        );
    }

    (RouteFeatureCollection::from_features(features), report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sequence: f64, route_id: i64, lat: f64, lon: f64) -> CoordinateRow {
        CoordinateRow::new(Some(sequence), Some(route_id), lat, lon)
    }

    #[test]
    fn test_single_point_route_is_excluded() {
        let rows = vec![
            row(2.0, 1, 37.1, 127.1),
            row(1.0, 1, 37.0, 127.0),
            row(1.0, 2, 36.0, 126.0),
        ];
        let (collection, report) = build_with_options(&rows, &BuildOptions::default());

        assert_eq!(collection.len(), 1);
        let feature = &collection.features()[0];
        assert_eq!(feature.route_id, 1);
        assert_eq!(feature.positions(), vec![[127.0, 37.0], [127.1, 37.1]]);
        assert_eq!(report.degenerate_routes, vec![2]);
    }

    #[test]
    fn test_signed_zero_sequences_keep_input_order() {
        let rows = vec![row(0.0, 1, 10.0, 20.0), row(-0.0, 1, 11.0, 21.0)];
        let collection = build_feature_collection(&rows);
        assert_eq!(collection.features()[0].positions(), vec![[20.0, 10.0], [21.0, 11.0]]);

        let rows = vec![row(-0.0, 1, 10.0, 20.0), row(0.0, 1, 11.0, 21.0)];
        let collection = build_feature_collection(&rows);
        assert_eq!(collection.features()[0].positions(), vec![[20.0, 10.0], [21.0, 11.0]]);
    }

    #[test]
    fn test_empty_input_yields_empty_collection() {
        let collection = build_feature_collection(&[]);
        assert!(collection.is_empty());
        assert_eq!(collection.total_points(), 0);
    }

    #[test]
    fn test_points_follow_sequence_order() {
        let sequences = [5.0, 3.0, 9.0, 1.0, 7.0];
        let rows: Vec<_> = sequences
            .iter()
            .map(|&seq| row(seq, 4, 35.0 + seq, 128.0 + seq))
            .collect();

        let collection = build_feature_collection(&rows);
        let feature = collection.get(4).unwrap();

        assert_eq!(feature.point_count(), rows.len());
        let latitudes: Vec<f64> = feature.line.0.iter().map(|c| c.y).collect();
        assert_eq!(latitudes, vec![36.0, 38.0, 40.0, 42.0, 44.0]);
    }

    #[test]
    fn test_equal_sequences_keep_input_order() {
        let rows = vec![
            row(1.0, 1, 10.0, 20.0),
            row(1.0, 1, 11.0, 21.0),
            row(0.0, 1, 9.0, 19.0),
        ];
        let collection = build_feature_collection(&rows);
        assert_eq!(
            collection.features()[0].positions(),
            vec![[19.0, 9.0], [20.0, 10.0], [21.0, 11.0]]
        );
    }

    #[test]
    fn test_rows_without_ids_or_sequence_are_skipped() {
        let rows = vec![
            CoordinateRow::new(Some(1.0), None, 1.0, 1.0),
            CoordinateRow::new(None, Some(1), 2.0, 2.0),
            row(1.0, 1, 3.0, 3.0),
            row(2.0, 1, 4.0, 4.0),
        ];
        let (collection, report) = build_with_options(&rows, &BuildOptions::default());

        assert_eq!(report.unassigned_rows, 1);
        assert_eq!(report.unsequenced_rows, 1);
        assert_eq!(collection.features()[0].point_count(), 2);
    }

    #[test]
    fn test_feature_count_matches_qualifying_groups() {
        let mut rows = Vec::new();
        for route_id in 0..6 {
            // Odd routes get a single point
            let points = if route_id % 2 == 0 { 3 } else { 1 };
            for seq in 0..points {
                rows.push(row(seq as f64, route_id, seq as f64, route_id as f64));
            }
        }

        let (collection, report) = build_with_options(&rows, &BuildOptions::default());
        assert_eq!(collection.route_ids(), vec![0, 2, 4]);
        assert_eq!(report.degenerate_routes, vec![1, 3, 5]);
        assert!(collection.features().iter().all(|f| f.point_count() >= 2));
    }

    #[test]
    fn test_features_are_ordered_by_route_id() {
        let rows = vec![
            row(1.0, 9, 1.0, 1.0),
            row(2.0, 9, 2.0, 2.0),
            row(1.0, 3, 1.0, 1.0),
            row(2.0, 3, 2.0, 2.0),
        ];
        assert_eq!(build_feature_collection(&rows).route_ids(), vec![3, 9]);
    }

    #[test]
    fn test_dedupe_consecutive() {
        let rows = vec![
            row(1.0, 1, 37.0, 127.0),
            row(2.0, 1, 37.0, 127.0),
            row(3.0, 1, 37.1, 127.1),
            row(1.0, 2, 36.0, 126.0),
            row(2.0, 2, 36.0, 126.0),
        ];

        let plain = build_feature_collection(&rows);
        assert_eq!(plain.get(1).unwrap().point_count(), 3);
        assert_eq!(plain.get(2).unwrap().point_count(), 2);

        let options = BuildOptions {
            dedupe_consecutive: true,
        };
        let (deduped, report) = build_with_options(&rows, &options);
        assert_eq!(deduped.get(1).unwrap().point_count(), 2);
        // Collapsing route 2 leaves a single point
        assert!(deduped.get(2).is_none());
        assert_eq!(report.degenerate_routes, vec![2]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let rows = vec![
            row(2.0, 2, 36.1, 126.1),
            row(1.0, 2, 36.0, 126.0),
            row(1.0, 1, 37.0, 127.0),
            row(2.0, 1, 37.1, 127.1),
        ];
        assert_eq!(build_feature_collection(&rows), build_feature_collection(&rows));
    }
}
