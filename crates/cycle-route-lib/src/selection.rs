//! Route selection and filtering

use crate::{CoordinateRow, DataError, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Sorted distinct route ids present in the rows
pub fn available_route_ids(rows: &[CoordinateRow]) -> Vec<i64> {
    rows.iter()
        .filter_map(|row| row.route_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// The set of route ids the user wants to see
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RouteSelection {
    ids: BTreeSet<i64>,
}

impl RouteSelection {
    /// Select every route present in the rows
    pub fn all(rows: &[CoordinateRow]) -> Self {
        Self::from_ids(available_route_ids(rows))
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_ids<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn contains(&self, route_id: i64) -> bool {
        self.ids.contains(&route_id)
    }

    pub fn select(&mut self, route_id: i64) {
        self.ids.insert(route_id);
    }

    pub fn deselect(&mut self, route_id: i64) {
        self.ids.remove(&route_id);
    }

    /// Flip the state of one route, returning whether it is now selected
    pub fn toggle(&mut self, route_id: i64) -> bool {
        if self.ids.remove(&route_id) {
            false
        } else {
            self.ids.insert(route_id);
            true
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Selected ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    /// Keep only ids that exist in `available`
    pub fn retain_available(&mut self, available: &[i64]) {
        self.ids.retain(|id| available.binary_search(id).is_ok());
    }

    /// Rows whose route id is selected
    ///
    /// Returns [`DataError::EmptySelection`] when nothing is selected or no
    /// row matches, so callers can prompt for a broader selection.
    pub fn filter_rows(&self, rows: &[CoordinateRow]) -> Result<Vec<CoordinateRow>> {
        if self.ids.is_empty() {
            return Err(DataError::EmptySelection);
        }

        let filtered: Vec<CoordinateRow> = rows
            .iter()
            .filter(|row| row.route_id.is_some_and(|id| self.ids.contains(&id)))
            .cloned()
            .collect();

        if filtered.is_empty() {
            return Err(DataError::EmptySelection);
        }
        Ok(filtered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_feature_collection;

    fn rows() -> Vec<CoordinateRow> {
        vec![
            CoordinateRow::new(Some(1.0), Some(3), 37.0, 127.0),
            CoordinateRow::new(Some(2.0), Some(3), 37.1, 127.1),
            CoordinateRow::new(Some(1.0), Some(1), 36.0, 126.0),
            CoordinateRow::new(Some(2.0), Some(1), 36.1, 126.1),
            CoordinateRow::new(Some(1.0), None, 35.0, 125.0),
        ]
    }

    #[test]
    fn test_available_route_ids_sorted_and_distinct() {
        assert_eq!(available_route_ids(&rows()), vec![1, 3]);
        assert!(available_route_ids(&[]).is_empty());
    }

    #[test]
    fn test_unselected_route_is_absent() {
        let rows = rows();
        let selection = RouteSelection::from_ids([1]);
        let filtered = selection.filter_rows(&rows).unwrap();

        assert_eq!(filtered.len(), 2);
        let collection = build_feature_collection(&filtered);
        assert_eq!(collection.route_ids(), vec![1]);
        assert!(collection.get(3).is_none());
    }

    #[test]
    fn test_empty_selection_is_advisory() {
        let err = RouteSelection::none().filter_rows(&rows()).unwrap_err();
        assert!(matches!(err, DataError::EmptySelection));
        assert!(err.is_advisory());

        // Selected id that matches nothing
        let err = RouteSelection::from_ids([42]).filter_rows(&rows()).unwrap_err();
        assert!(matches!(err, DataError::EmptySelection));
    }

    #[test]
    fn test_toggle_and_all() {
        let rows = rows();
        let mut selection = RouteSelection::all(&rows);
        assert_eq!(selection.ids().collect::<Vec<_>>(), vec![1, 3]);

        assert!(!selection.toggle(3));
        assert!(!selection.contains(3));
        assert!(selection.toggle(3));
        assert!(selection.contains(3));

        selection.deselect(1);
        selection.deselect(3);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_retain_available() {
        let mut selection = RouteSelection::from_ids([1, 2, 3]);
        selection.retain_available(&[1, 3, 5]);
        assert_eq!(selection.ids().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(selection.len(), 2);
    }
}
