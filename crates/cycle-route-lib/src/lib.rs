//! Cycle Route Library - Route Geometry Construction Pipeline
//!
//! This library turns a tabular file of cycling-route coordinates into one
//! `LineString` per route, ready for drawing on a map or exporting as GeoJSON.
//!
//! # Architecture
//!
//! - **[`loader`]**: Decodes and parses the CSV source into validated [`CoordinateRow`]s
//! - **[`builder`]**: Groups rows by route id, orders them and emits [`RouteFeature`]s
//! - **[`RouteSelection`]**: User-facing route filter
//! - **[`RouteDataCache`]**: Caller-owned cache of loaded row sets
//! - **[`export`]**: GeoJSON and GPX interchange
//!
//! # Example
//!
//! ```
//! use cycle_route_lib::{CoordinateRow, build_feature_collection};
//!
//! let rows = vec![
//!     CoordinateRow::new(Some(2.0), Some(1), 37.1, 127.1),
//!     CoordinateRow::new(Some(1.0), Some(1), 37.0, 127.0),
//!     CoordinateRow::new(Some(1.0), Some(2), 36.0, 126.0),
//! ];
//! let collection = build_feature_collection(&rows);
//!
//! // Route 2 has a single point and cannot form a line
//! assert_eq!(collection.len(), 1);
//! assert_eq!(collection.features()[0].route_id, 1);
//! ```

pub mod builder;
mod cache;
pub mod export;
pub mod loader;
mod row;
mod selection;
pub mod stats;

// Public API exports
pub use builder::{
    BuildOptions, BuildReport, RouteFeature, RouteFeatureCollection, build_feature_collection,
    build_with_options,
};
pub use cache::RouteDataCache;
pub use loader::{ColumnNames, LoadReport, LoaderConfig, load_csv, load_from_reader};
pub use row::CoordinateRow;
pub use selection::{RouteSelection, available_route_ids};
pub use stats::CollectionInfo;

/// Error types for the route pipeline
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The source could not be read or lacks the required columns
    #[error("Route data unavailable ({source_name}): {reason}")]
    DataUnavailable { source_name: String, reason: String },

    #[error("Unknown text encoding: {0}")]
    UnknownEncoding(String),

    /// The active selection matches no rows
    #[error("No routes selected")]
    EmptySelection,

    #[error("Invalid feature: {0}")]
    InvalidFeature(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    pub(crate) fn unavailable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Short, non-technical message suitable for showing to the user
    pub fn user_message(&self) -> String {
        match self {
            Self::DataUnavailable { source_name, reason } => {
                format!("Could not load route data from {source_name}: {reason}")
            }
            Self::UnknownEncoding(label) => {
                format!("The text encoding \"{label}\" is not supported")
            }
            Self::EmptySelection => "Select at least one route to display".to_string(),
            Self::InvalidFeature(reason) => format!("The route file is not valid: {reason}"),
            Self::GeoJson(_) | Self::Json(_) => "The route file is not valid GeoJSON".to_string(),
            Self::Gpx(_) => "The routes could not be written as GPX".to_string(),
            Self::Io(e) => format!("File access failed: {e}"),
        }
    }

    /// Whether this is an advisory condition rather than a failure
    pub fn is_advisory(&self) -> bool {
        matches!(self, Self::EmptySelection)
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
