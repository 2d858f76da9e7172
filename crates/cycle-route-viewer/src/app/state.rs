//! Application state management
//!
//! Holds the loaded coordinate rows, the route selection and the feature
//! collection built from it, plus runtime UI settings.

use crate::app::settings::Settings;
use cycle_route_lib::{
    BuildOptions, BuildReport, CollectionInfo, CoordinateRow, DataError, LoaderConfig,
    RouteDataCache, RouteFeatureCollection, RouteSelection, available_route_ids,
    build_with_options, export, stats,
};
use egui::Color32;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default route color when routes are not colored individually
pub const ROUTE_COLOR: Color32 = Color32::from_rgb(0, 128, 255);

/// Fill color of point markers
pub const POINT_COLOR: Color32 = Color32::from_rgba_premultiplied(140, 0, 0, 140);

/// Map center used before anything is loaded (South Korea)
pub const FALLBACK_CENTER: (f64, f64) = (36.5, 127.8);

pub const MIN_LINE_WIDTH: f32 = 1.0;
pub const MAX_LINE_WIDTH: f32 = 10.0;
pub const MIN_ZOOM: u8 = 5;
pub const MAX_ZOOM: u8 = 12;

/// Main application state
pub struct AppState {
    /// Currently opened CSV and its rows
    pub source: SourceState,

    /// Routes the user wants to see
    pub selection: RouteSelection,

    /// Rows of the selected routes, in file order
    pub filtered_rows: Arc<Vec<CoordinateRow>>,

    /// Features built from `filtered_rows`
    pub features: Arc<RouteFeatureCollection>,

    /// What the last build skipped
    pub build_report: BuildReport,

    /// Advisory shown instead of the map contents (e.g. nothing selected)
    pub advisory: Option<String>,

    /// Current UI settings
    pub ui_settings: UiSettings,

    /// Statistics about the displayed data
    pub stats: Stats,

    /// Outcome of the last export
    pub last_export: Option<ExportStatus>,

    /// Show file picker dialog
    pub show_picker: bool,

    /// Export requested from the UI, handled by the save dialog
    pub pending_export: Option<ExportFormat>,

    /// Recenter the map on the displayed rows next frame
    pub pending_recenter: bool,

    /// Route ids to select on the next load instead of all routes
    initial_routes: Option<Vec<i64>>,

    build_options: BuildOptions,
    cache: RouteDataCache,
}

/// The CSV being viewed
#[derive(Default)]
pub struct SourceState {
    pub path: Option<PathBuf>,
    pub loader_config: LoaderConfig,
    pub rows: Arc<Vec<CoordinateRow>>,
    /// Sorted distinct route ids in `rows`
    pub route_ids: Vec<i64>,
    /// Message of the last failed load
    pub error: Option<String>,
}

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone)]
pub struct UiSettings {
    /// Route line width in pixels
    pub line_width: f32,

    /// Map zoom level applied when recentering
    pub zoom_level: u8,

    /// Draw a marker at every coordinate
    pub show_points: bool,

    /// One color per route instead of a single route color
    pub color_by_route: bool,

    /// Map tiles provider
    pub tiles_provider: TilesProvider,

    /// Whether sidebar is open
    pub sidebar_open: bool,

    /// Current active tab in sidebar
    pub active_tab: SidebarTab,

    /// Show the raw coordinate table
    pub show_data_table: bool,

    /// Encoding label being edited in the settings tab
    pub encoding_input: String,
}

/// Sidebar tabs
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SidebarTab {
    Routes,
    Settings,
}

/// Available map tile providers
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TilesProvider {
    OpenStreetMap,
    OpenTopoMap,
    CyclOSM,
}

impl TilesProvider {
    pub fn attribution(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "© OpenStreetMap contributors",
            Self::OpenTopoMap => "© OpenTopoMap (CC-BY-SA)",
            Self::CyclOSM => "© CyclOSM & OpenStreetMap contributors",
        }
    }

    pub fn all() -> &'static [Self] {
        &[Self::OpenStreetMap, Self::OpenTopoMap, Self::CyclOSM]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenStreetMap => "OpenStreetMap",
            Self::OpenTopoMap => "OpenTopoMap",
            Self::CyclOSM => "CyclOSM",
        }
    }

    pub fn from_name(name: &str) -> Self {
        Self::all()
            .iter()
            .copied()
            .find(|provider| provider.name() == name)
            .unwrap_or(Self::OpenStreetMap)
    }
}

/// Export file formats
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExportFormat {
    GeoJson,
    Gpx,
}

impl ExportFormat {
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::GeoJson => &["geojson", "json"],
            Self::Gpx => &["gpx"],
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::GeoJson => export::DEFAULT_EXPORT_FILE_NAME,
            Self::Gpx => "cross_country_routes.gpx",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::GeoJson => "GeoJSON",
            Self::Gpx => "GPX",
        }
    }
}

/// Result of the last export
#[derive(Clone, Debug, PartialEq)]
pub enum ExportStatus {
    Written(PathBuf),
    Failed(String),
}

/// Statistics about displayed data
#[derive(Default)]
pub struct Stats {
    pub info: CollectionInfo,

    /// Rows read from the current source
    pub rows_loaded: usize,

    /// Rows of the selected routes
    pub rows_selected: usize,

    /// Last rebuild time in milliseconds
    pub last_build_time_ms: f64,
}

impl AppState {
    /// Create new application state from CLI settings
    pub fn new(settings: &Settings) -> Self {
        let ui_settings = UiSettings {
            line_width: settings.line_width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH),
            zoom_level: settings.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            encoding_input: settings.encoding.clone(),
            ..Default::default()
        };

        Self {
            source: SourceState {
                path: settings.startup_csv(),
                loader_config: settings.loader_config(),
                ..Default::default()
            },
            selection: RouteSelection::none(),
            filtered_rows: Arc::default(),
            features: Arc::default(),
            build_report: BuildReport::default(),
            advisory: None,
            ui_settings,
            stats: Stats::default(),
            last_export: None,
            show_picker: false,
            pending_export: None,
            pending_recenter: false,
            initial_routes: (!settings.routes.is_empty()).then(|| settings.routes.clone()),
            build_options: settings.build_options(),
            cache: RouteDataCache::default(),
        }
    }

    /// Load the source path set at startup, if any
    pub fn load_initial(&mut self) {
        if let Some(path) = self.source.path.clone() {
            let _ = self.open_source(path);
        }
    }

    /// Load a CSV and display all of its routes
    pub fn open_source(&mut self, path: PathBuf) -> Result<(), String> {
        profiling::scope!("open_source");

        // Pending route ids only apply to the source they were chosen for
        if self.source.path.as_ref() != Some(&path) {
            self.initial_routes = None;
        }

        let rows = match self.cache.load(&path, &self.source.loader_config) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!("Failed to load {}: {}", path.display(), e);
                let message = e.user_message();
                self.source.path = Some(path);
                self.source.error = Some(message.clone());
                self.source.rows = Arc::default();
                self.source.route_ids.clear();
                self.selection = RouteSelection::none();
                self.rebuild();
                return Err(message);
            }
        };

        self.source.path = Some(path);
        self.source.error = None;
        self.source.route_ids = available_route_ids(&rows);
        self.source.rows = rows;
        self.stats.rows_loaded = self.source.rows.len();

        self.selection = match self.initial_routes.take() {
            Some(ids) => {
                let mut selection = RouteSelection::from_ids(ids);
                selection.retain_available(&self.source.route_ids);
                selection
            }
            None => RouteSelection::from_ids(self.source.route_ids.iter().copied()),
        };

        tracing::info!(
            "Opened {} routes ({} rows)",
            self.source.route_ids.len(),
            self.source.rows.len()
        );

        self.rebuild();
        self.pending_recenter = true;
        Ok(())
    }

    /// Re-read the current source from disk, keeping the selection
    pub fn reload(&mut self) -> Result<(), String> {
        let Some(path) = self.source.path.clone() else {
            return Ok(());
        };
        self.cache.invalidate(&path);
        // After a failed load the selection is empty; keep the ids still pending
        if self.source.error.is_none() {
            self.initial_routes = Some(self.selection.ids().collect());
        }
        self.open_source(path)
    }

    /// Change the text encoding and reload
    pub fn set_encoding(&mut self, encoding: String) -> Result<(), String> {
        self.source.loader_config.encoding = encoding;
        self.reload()
    }

    /// Filter the rows to the selection and rebuild the route features
    pub fn rebuild(&mut self) {
        profiling::scope!("rebuild");

        let start = instant::Instant::now();
        match self.selection.filter_rows(&self.source.rows) {
            Ok(rows) => {
                let (features, report) = build_with_options(&rows, &self.build_options);
                if !report.degenerate_routes.is_empty() {
                    tracing::debug!(
                        "Routes without enough points: {:?}",
                        report.degenerate_routes
                    );
                }
                self.filtered_rows = Arc::new(rows);
                self.features = Arc::new(features);
                self.build_report = report;
                self.advisory = None;
            }
            Err(e) => {
                if !e.is_advisory() {
                    tracing::warn!("Filtering routes failed: {}", e);
                }
                self.filtered_rows = Arc::default();
                self.features = Arc::default();
                self.build_report = BuildReport::default();
                self.advisory = self
                    .source
                    .path
                    .is_some()
                    .then(|| DataError::EmptySelection.user_message());
            }
        }

        self.stats.info = self.features.info();
        self.stats.rows_selected = self.filtered_rows.len();
        self.stats.last_build_time_ms = start.elapsed().as_secs_f64() * 1000.0;
    }

    pub fn toggle_route(&mut self, route_id: i64) {
        self.selection.toggle(route_id);
        self.rebuild();
    }

    pub fn select_all(&mut self) {
        self.selection = RouteSelection::from_ids(self.source.route_ids.iter().copied());
        self.rebuild();
    }

    pub fn select_none(&mut self) {
        self.selection = RouteSelection::none();
        self.rebuild();
    }

    /// Mean position of the displayed rows
    pub fn center(&self) -> Option<(f64, f64)> {
        stats::centroid(&self.filtered_rows)
    }

    /// Write the displayed routes to a file
    pub fn export_to(&mut self, format: ExportFormat, path: &Path) {
        let result = match format {
            ExportFormat::GeoJson => export::write_geojson_file(path, &self.features),
            ExportFormat::Gpx => export::write_gpx_file(path, &self.features),
        };
        self.last_export = Some(match result {
            Ok(()) => ExportStatus::Written(path.to_path_buf()),
            Err(e) => {
                tracing::error!("Export to {} failed: {}", path.display(), e);
                ExportStatus::Failed(e.user_message())
            }
        });
    }

    /// Source file and selected route ids, for the map caption
    pub fn caption(&self) -> String {
        let file = self
            .source
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "-".to_string());
        let ids: Vec<String> = self.selection.ids().map(|id| id.to_string()).collect();
        let ids = if ids.is_empty() {
            "none".to_string()
        } else {
            ids.join(", ")
        };
        format!("CSV file: {file} | Selected routes: {ids}")
    }

    /// Line color of a route
    pub fn route_color(route_id: i64, color_by_route: bool) -> Color32 {
        if color_by_route {
            Self::get_track_color(route_id.unsigned_abs() as usize)
        } else {
            ROUTE_COLOR
        }
    }

    /// Generate a color for a track based on its index
    pub fn get_track_color(index: usize) -> Color32 {
        // Golden angle spreads neighbouring indices apart
        let hue = (index as f32 * 137.508) % 360.0;
        let saturation = 0.7;
        let value = 0.9;

        let c = value * saturation;
        let x = c * (1.0 - ((hue / 60.0) % 2.0 - 1.0).abs());
        let m = value - c;

        let (r, g, b) = if hue < 60.0 {
            (c, x, 0.0)
        } else if hue < 120.0 {
            (x, c, 0.0)
        } else if hue < 180.0 {
            (0.0, c, x)
        } else if hue < 240.0 {
            (0.0, x, c)
        } else if hue < 300.0 {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };

        Color32::from_rgb(
            ((r + m) * 255.0) as u8,
            ((g + m) * 255.0) as u8,
            ((b + m) * 255.0) as u8,
        )
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            line_width: 4.0,
            zoom_level: 7,
            show_points: true,
            color_by_route: false,
            tiles_provider: TilesProvider::OpenStreetMap,
            sidebar_open: true,
            active_tab: SidebarTab::Routes,
            show_data_table: false,
            encoding_input: LoaderConfig::default().encoding,
        }
    }
}

impl Stats {
    /// Format distance as human-readable string
    pub fn format_distance(&self) -> String {
        let meters = self.info.total_distance_meters;
        let km = meters / 1000.0;
        if km < 1.0 {
            format!("{:.0} m", meters)
        } else if km < 100.0 {
            format!("{:.2} km", km)
        } else {
            format!("{:.0} km", km)
        }
    }

    /// Format point count with thousands separators
    pub fn format_points(&self) -> String {
        format_number_with_commas(self.info.total_points)
    }

    pub fn format_rows(&self) -> String {
        format!(
            "{} / {}",
            format_number_with_commas(self.rows_selected),
            format_number_with_commas(self.rows_loaded)
        )
    }
}

/// Helper to format numbers with comma separators
fn format_number_with_commas(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    const CSV: &str = "순서,국토종주 자전거길,위도(LINE_XP),경도(LINE_YP)\n\
                       2,1,37.1,127.1\n1,1,37.0,127.0\n\
                       1,2,36.0,126.0\n2,2,36.2,126.2\n3,2,36.4,126.4\n\
                       1,3,35.0,129.0\n";

    fn temp_csv() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn state_for(file: &tempfile::NamedTempFile, extra: &[&str]) -> AppState {
        let path = file.path().to_string_lossy().to_string();
        let mut args = vec!["cycle-route-viewer", "--csv", path.as_str(), "--encoding", "utf-8"];
        args.extend_from_slice(extra);
        let mut state = AppState::new(&Settings::parse_from(args));
        state.load_initial();
        state
    }

    #[test]
    fn test_open_selects_all_routes() {
        let file = temp_csv();
        let state = state_for(&file, &[]);

        assert_eq!(state.source.route_ids, vec![1, 2, 3]);
        assert_eq!(state.selection.len(), 3);
        // Route 3 has a single point
        assert_eq!(state.features.route_ids(), vec![1, 2]);
        assert_eq!(state.build_report.degenerate_routes, vec![3]);
        assert_eq!(state.stats.rows_loaded, 6);
        assert!(state.pending_recenter);
        assert!(state.advisory.is_none());
    }

    #[test]
    fn test_initial_route_selection() {
        let file = temp_csv();
        let state = state_for(&file, &["--route", "2", "--route", "99"]);

        assert_eq!(state.selection.ids().collect::<Vec<_>>(), vec![2]);
        assert_eq!(state.features.route_ids(), vec![2]);
        assert_eq!(state.filtered_rows.len(), 3);
    }

    #[test]
    fn test_toggle_and_empty_selection() {
        let file = temp_csv();
        let mut state = state_for(&file, &[]);

        state.toggle_route(1);
        assert_eq!(state.features.route_ids(), vec![2]);

        state.select_none();
        assert!(state.features.is_empty());
        assert_eq!(
            state.advisory.as_deref(),
            Some("Select at least one route to display")
        );
        assert_eq!(state.caption().split(" | ").nth(1), Some("Selected routes: none"));

        state.select_all();
        assert!(state.advisory.is_none());
        assert_eq!(state.features.len(), 2);
    }

    #[test]
    fn test_reload_keeps_selection() {
        let file = temp_csv();
        let mut state = state_for(&file, &[]);
        state.toggle_route(2);

        state.reload().unwrap();
        assert_eq!(state.selection.ids().collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_failed_reload_keeps_selection() {
        let file = temp_csv();
        let mut state = state_for(&file, &[]);
        state.toggle_route(3);

        assert!(state.set_encoding("klingon".to_string()).is_err());
        assert!(state.source.error.is_some());
        assert!(state.selection.is_empty());

        // A second failure must not overwrite the pending ids
        assert!(state.reload().is_err());

        state.set_encoding("utf-8".to_string()).unwrap();
        assert!(state.source.error.is_none());
        assert_eq!(state.selection.ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(state.features.route_ids(), vec![1, 2]);
        assert!(state.advisory.is_none());
    }

    #[test]
    fn test_pending_routes_do_not_carry_to_another_file() {
        let file = temp_csv();
        let settings = Settings::parse_from([
            "cycle-route-viewer",
            "--csv",
            "/no/such/file.csv",
            "--encoding",
            "utf-8",
            "--route",
            "2",
        ]);
        let mut state = AppState::new(&settings);
        state.load_initial();
        assert!(state.source.error.is_some());

        state.open_source(file.path().to_path_buf()).unwrap();
        assert_eq!(state.selection.ids().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_source_reports_error() {
        let settings = Settings::parse_from(["cycle-route-viewer", "--csv", "/no/such/file.csv"]);
        let mut state = AppState::new(&settings);
        state.load_initial();

        assert!(state.source.error.is_some());
        assert!(state.features.is_empty());
        assert!(state.center().is_none());
    }

    #[test]
    fn test_center_and_caption() {
        let file = temp_csv();
        let state = state_for(&file, &["--route", "1"]);

        let (lat, lon) = state.center().unwrap();
        assert!((lat - 37.05).abs() < 1e-9);
        assert!((lon - 127.05).abs() < 1e-9);
        assert!(state.caption().ends_with("Selected routes: 1"));
    }

    #[test]
    fn test_export_geojson() {
        let file = temp_csv();
        let mut state = state_for(&file, &[]);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ExportFormat::GeoJson.default_file_name());

        state.export_to(ExportFormat::GeoJson, &path);
        assert_eq!(state.last_export, Some(ExportStatus::Written(path.clone())));

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed = export::from_geojson_str(&text).unwrap();
        assert_eq!(parsed.route_ids(), vec![1, 2]);
    }

    #[test]
    fn test_settings_are_clamped() {
        let settings = Settings::parse_from(["cycle-route-viewer", "--line-width", "25", "--zoom", "2"]);
        let state = AppState::new(&settings);
        assert_eq!(state.ui_settings.line_width, MAX_LINE_WIDTH);
        assert_eq!(state.ui_settings.zoom_level, MIN_ZOOM);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number_with_commas(0), "0");
        assert_eq!(format_number_with_commas(1234567), "1,234,567");
        assert_eq!(TilesProvider::from_name("CyclOSM"), TilesProvider::CyclOSM);
        assert_eq!(TilesProvider::from_name("other"), TilesProvider::OpenStreetMap);
    }
}
