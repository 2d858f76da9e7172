//! Application module
//!
//! Full-screen map of the selected cycling routes with:
//! - Toggleable sidebar with tabs (Routes and Settings)
//! - Drag-and-drop of coordinate CSV files
//! - GeoJSON and GPX export of the displayed routes
//! - Raw data table window

mod plugin;
pub(crate) mod settings;
mod state;
mod ui_panels;

use crate::app::plugin::{PointPlugin, RoutePlugin};
use crate::app::settings::Settings;
use crate::app::state::{
    AppState, FALLBACK_CENTER, MAX_LINE_WIDTH, MAX_ZOOM, MIN_LINE_WIDTH, MIN_ZOOM, SidebarTab,
    TilesProvider,
};
use eframe::egui;
use walkers::{
    HttpTiles, Map, MapMemory, TileId,
    sources::{Attribution, OpenStreetMap, TileSource},
};

/// Storage key of [`PersistedSettings`]
const PERSISTED_SETTINGS_KEY: &str = "persisted_settings";

/// OpenTopoMap tile source
pub struct OpenTopoMap;

impl TileSource for OpenTopoMap {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://tile.opentopomap.org/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© OpenTopoMap (CC-BY-SA)",
            url: "https://opentopomap.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        17
    }
}

/// CyclOSM tile source, a cycling-oriented OpenStreetMap style
pub struct CyclOsm;

impl TileSource for CyclOsm {
    fn tile_url(&self, tile_id: TileId) -> String {
        format!(
            "https://a.tile-cyclosm.openstreetmap.fr/cyclosm/{}/{}/{}.png",
            tile_id.zoom, tile_id.x, tile_id.y
        )
    }

    fn attribution(&self) -> Attribution {
        Attribution {
            text: "© CyclOSM & OpenStreetMap contributors",
            url: "https://www.cyclosm.org/",
            logo_light: None,
            logo_dark: None,
        }
    }

    fn max_zoom(&self) -> u8 {
        20
    }
}

/// Persisted settings (no row data, the CSV is re-read on start)
#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedSettings {
    line_width: f32,
    zoom_level: u8,
    show_points: bool,
    color_by_route: bool,
    sidebar_open: bool,
    active_tab: String,
    tiles_provider: String,
    /// CSV that was open, reloaded on start
    source_path: Option<String>,
    encoding: String,
    selected_routes: Vec<i64>,
}

/// Main application structure
pub struct CycleRouteViewerApp {
    /// Application state (rows, selection, UI settings, etc.)
    state: AppState,

    tiles_osm: HttpTiles,
    tiles_otm: HttpTiles,
    tiles_cyclosm: HttpTiles,

    /// Map state (camera position, zoom, etc.)
    map_memory: MapMemory,

    /// Show help overlay
    show_help: bool,
}

impl CycleRouteViewerApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let cli_args = Settings::from_cli();

        let mut state = if !cli_args.ignore_persisted {
            match cc.storage {
                Some(storage) => Self::load_persisted_settings(storage, &cli_args),
                None => AppState::new(&cli_args),
            }
        } else {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
            AppState::new(&cli_args)
        };

        state.load_initial();

        let tiles_osm = HttpTiles::new(OpenStreetMap, cc.egui_ctx.clone());
        let tiles_otm = HttpTiles::new(OpenTopoMap, cc.egui_ctx.clone());
        let tiles_cyclosm = HttpTiles::new(CyclOsm, cc.egui_ctx.clone());

        let mut map_memory = MapMemory::default();
        let _ = map_memory.set_zoom(state.ui_settings.zoom_level as f64);

        Self {
            state,
            tiles_osm,
            tiles_otm,
            tiles_cyclosm,
            map_memory,
            show_help: false,
        }
    }

    /// Load persisted settings from storage
    fn load_persisted_settings(storage: &dyn eframe::Storage, cli_args: &Settings) -> AppState {
        if let Some(json) = storage.get_string(PERSISTED_SETTINGS_KEY)
            && !json.is_empty()
            && let Ok(settings) = serde_json::from_str::<PersistedSettings>(&json)
        {
            tracing::info!("Restored settings");
            return Self::state_from_persisted_settings(settings, cli_args);
        }

        tracing::info!("No persisted settings found, starting fresh");
        AppState::new(cli_args)
    }

    /// Restore UI settings, and the persisted source unless `--csv` names one
    fn state_from_persisted_settings(settings: PersistedSettings, cli_args: &Settings) -> AppState {
        let mut cli_args = cli_args.clone();
        if cli_args.csv.is_none()
            && let Some(path) = settings.source_path.map(std::path::PathBuf::from)
            && path.exists()
        {
            cli_args.csv = Some(path);
            cli_args.encoding = settings.encoding;
            if cli_args.routes.is_empty() {
                cli_args.routes = settings.selected_routes;
            }
        }

        let mut state = AppState::new(&cli_args);
        let ui = &mut state.ui_settings;
        ui.line_width = settings.line_width.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH);
        ui.zoom_level = settings.zoom_level.clamp(MIN_ZOOM, MAX_ZOOM);
        ui.show_points = settings.show_points;
        ui.color_by_route = settings.color_by_route;
        ui.sidebar_open = settings.sidebar_open;
        ui.tiles_provider = TilesProvider::from_name(&settings.tiles_provider);
        ui.active_tab = match settings.active_tab.as_str() {
            "Settings" => SidebarTab::Settings,
            _ => SidebarTab::Routes,
        };
        state
    }

    /// Center the map on the displayed rows at the chosen zoom level
    fn recenter(&mut self) {
        let (lat, lon) = self.state.center().unwrap_or(FALLBACK_CENTER);
        self.map_memory.center_at(walkers::lat_lon(lat, lon));
        let _ = self
            .map_memory
            .set_zoom(self.state.ui_settings.zoom_level as f64);

        tracing::trace!(
            "Centered on ({:.5}, {:.5}) at zoom {}",
            lat,
            lon,
            self.state.ui_settings.zoom_level
        );
    }
}

#[profiling::all_functions]
impl eframe::App for CycleRouteViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.input(|i| {
            if i.key_pressed(egui::Key::F1) {
                self.show_help = !self.show_help;
            }
            if i.key_pressed(egui::Key::H) && i.modifiers.ctrl {
                self.show_help = !self.show_help;
            }
            if i.key_pressed(egui::Key::O) && i.modifiers.ctrl {
                self.state.show_picker = true;
            }
        });

        ui_panels::handle_drag_and_drop(ctx, &mut self.state);
        ui_panels::show_file_picker(&mut self.state);
        ui_panels::show_export_dialog(&mut self.state);

        if self.state.pending_recenter {
            self.state.pending_recenter = false;
            self.recenter();
        }

        if self.show_help {
            ui_panels::help_overlay(ctx, &mut self.show_help);
        }

        ui_panels::render_sidebar(ctx, &mut self.state);
        ui_panels::data_table_window(ctx, &mut self.state);

        let features = self.state.features.clone();
        let rows = self.state.filtered_rows.clone();
        let line_width = self.state.ui_settings.line_width;
        let color_by_route = self.state.ui_settings.color_by_route;
        let show_points = self.state.ui_settings.show_points;
        let tiles_provider = self.state.ui_settings.tiles_provider;
        let attribution_text = tiles_provider.attribution();
        let (center_lat, center_lon) = self.state.center().unwrap_or(FALLBACK_CENTER);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                profiling::scope!("map_panel");

                let tiles: &mut HttpTiles = match tiles_provider {
                    TilesProvider::OpenStreetMap => &mut self.tiles_osm,
                    TilesProvider::OpenTopoMap => &mut self.tiles_otm,
                    TilesProvider::CyclOSM => &mut self.tiles_cyclosm,
                };

                let mut map = Map::new(
                    Some(tiles),
                    &mut self.map_memory,
                    walkers::lat_lon(center_lat, center_lon),
                )
                .with_plugin(RoutePlugin::new(features, line_width, color_by_route));
                if show_points {
                    map = map.with_plugin(PointPlugin::new(rows));
                }

                ui.add(map);

                ui_panels::render_caption(ui, &self.state);
                ui_panels::render_advisory(ui, &self.state);
                ui_panels::sidebar_toggle_button(ui, &mut self.state);

                let painter = ui.painter();
                let screen_rect = ui.max_rect();
                painter.text(
                    screen_rect.center_bottom() + egui::vec2(0.0, -5.0),
                    egui::Align2::CENTER_BOTTOM,
                    attribution_text,
                    egui::FontId::proportional(10.0),
                    egui::Color32::from_black_alpha(180),
                );
            });
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let ui = &self.state.ui_settings;
        let settings = PersistedSettings {
            line_width: ui.line_width,
            zoom_level: ui.zoom_level,
            show_points: ui.show_points,
            color_by_route: ui.color_by_route,
            sidebar_open: ui.sidebar_open,
            active_tab: format!("{:?}", ui.active_tab),
            tiles_provider: ui.tiles_provider.name().to_string(),
            source_path: self
                .state
                .source
                .path
                .as_ref()
                .map(|p| p.to_string_lossy().to_string()),
            encoding: self.state.source.loader_config.encoding.clone(),
            selected_routes: self.state.selection.ids().collect(),
        };

        if let Ok(json) = serde_json::to_string(&settings) {
            storage.set_string(PERSISTED_SETTINGS_KEY, json);
            tracing::debug!("Saved settings on exit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn persisted(line_width: f32, zoom_level: u8) -> PersistedSettings {
        PersistedSettings {
            line_width,
            zoom_level,
            show_points: false,
            color_by_route: true,
            sidebar_open: false,
            active_tab: "Settings".to_string(),
            tiles_provider: "OpenTopoMap".to_string(),
            source_path: None,
            encoding: "utf-8".to_string(),
            selected_routes: Vec::new(),
        }
    }

    #[test]
    fn test_restored_settings_are_clamped() {
        let cli_args = Settings::parse_from(["cycle-route-viewer"]);

        let state =
            CycleRouteViewerApp::state_from_persisted_settings(persisted(40.0, 30), &cli_args);
        assert_eq!(state.ui_settings.line_width, MAX_LINE_WIDTH);
        assert_eq!(state.ui_settings.zoom_level, MAX_ZOOM);

        let state =
            CycleRouteViewerApp::state_from_persisted_settings(persisted(0.0, 0), &cli_args);
        assert_eq!(state.ui_settings.line_width, MIN_LINE_WIDTH);
        assert_eq!(state.ui_settings.zoom_level, MIN_ZOOM);
    }

    #[test]
    fn test_restored_ui_settings() {
        let cli_args = Settings::parse_from(["cycle-route-viewer"]);
        let state =
            CycleRouteViewerApp::state_from_persisted_settings(persisted(6.0, 9), &cli_args);

        let ui = &state.ui_settings;
        assert_eq!(ui.line_width, 6.0);
        assert_eq!(ui.zoom_level, 9);
        assert!(!ui.show_points);
        assert!(ui.color_by_route);
        assert_eq!(ui.active_tab, SidebarTab::Settings);
        assert_eq!(ui.tiles_provider, TilesProvider::OpenTopoMap);
    }
}
