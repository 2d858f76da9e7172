//! UI panels for the application
//!
//! Sidebar with the route selection, display settings and export actions,
//! plus the overlays drawn on top of the map.

use crate::app::state::{
    AppState, ExportFormat, ExportStatus, MAX_LINE_WIDTH, MAX_ZOOM, MIN_LINE_WIDTH, MIN_ZOOM,
    SidebarTab, TilesProvider,
};
use cycle_route_lib::CoordinateRow;
use egui::{Color32, RichText, Ui};

/// Minimum column width of the data table
const TABLE_COLUMN_WIDTH: f32 = 80.0;

/// Render the sidebar toggle button (overlaid on top-right of map)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());

    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };

    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.ui_settings.sidebar_open {
        "✕"
    } else {
        "☰"
    };

    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Source file and selected routes, top-left of the map
pub fn render_caption(ui: &mut Ui, state: &AppState) {
    let rect = ui.max_rect();
    let painter = ui.painter();
    let galley = painter.layout(
        state.caption(),
        egui::FontId::proportional(13.0),
        Color32::WHITE,
        (rect.width() - 80.0).max(100.0),
    );
    let pos = rect.left_top() + egui::vec2(14.0, 14.0);
    let background = egui::Rect::from_min_size(pos, galley.size()).expand(6.0);
    painter.rect_filled(background, 6.0, Color32::from_black_alpha(170));
    painter.galley(pos, galley, Color32::WHITE);
}

/// Centered notice when there is nothing to draw
pub fn render_advisory(ui: &mut Ui, state: &AppState) {
    let message = match (&state.source.error, &state.advisory) {
        (Some(error), _) => error.as_str(),
        (None, Some(advisory)) => advisory.as_str(),
        (None, None) => return,
    };

    let rect = ui.max_rect();
    let painter = ui.painter();
    let galley = painter.layout(
        format!("⚠ {message}"),
        egui::FontId::proportional(16.0),
        Color32::WHITE,
        (rect.width() * 0.6).max(200.0),
    );
    let pos = rect.center() - galley.size() / 2.0;
    let background = egui::Rect::from_min_size(pos, galley.size()).expand(12.0);
    painter.rect_filled(background, 10.0, Color32::from_rgba_unmultiplied(120, 80, 0, 210));
    painter.galley(pos, galley, Color32::WHITE);
}

/// Render the main sidebar (responsive: side on landscape, bottom on portrait)
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.sidebar_open {
        return;
    }

    let screen_size = ctx.viewport_rect().size();
    let is_portrait = screen_size.y > screen_size.x;

    if is_portrait {
        egui::TopBottomPanel::bottom("main_sidebar")
            .default_height(280.0)
            .min_height(180.0)
            .max_height(ctx.viewport_rect().height() * 0.6)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state));
    } else {
        egui::SidePanel::right("main_sidebar")
            .default_width(300.0)
            .min_width(260.0)
            .max_width(450.0)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state));
    }
}

fn render_sidebar_content(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Routes,
            "🚲 Routes",
        );
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Settings,
            "⚙ Settings",
        );
    });

    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| match state.ui_settings.active_tab {
            SidebarTab::Routes => render_routes_tab(ui, state),
            SidebarTab::Settings => render_settings_tab(ui, state),
        });
}

/// Render the Routes tab
fn render_routes_tab(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        if ui.button("📂 Open CSV...").clicked() {
            state.show_picker = true;
        }
        let has_source = state.source.path.is_some();
        if ui
            .add_enabled(has_source, egui::Button::new("🔄 Reload"))
            .clicked()
        {
            let _ = state.reload();
        }
        if ui
            .add_enabled(!state.filtered_rows.is_empty(), egui::Button::new("🎯 Center"))
            .clicked()
        {
            state.pending_recenter = true;
        }
    });

    ui.add_space(8.0);

    if let Some(error) = &state.source.error {
        ui.label(RichText::new(format!("⚠ {error}")).color(Color32::RED));
        ui.add_space(8.0);
    }

    ui.separator();
    render_stats_section(ui, state);
    ui.add_space(8.0);
    ui.separator();

    render_route_list(ui, state);

    ui.add_space(8.0);
    ui.separator();
    render_export_section(ui, state);

    ui.add_space(8.0);
    ui.separator();
    ui.checkbox(&mut state.ui_settings.show_data_table, "📋 Show raw data");
}

/// Render statistics section
fn render_stats_section(ui: &mut Ui, state: &AppState) {
    ui.label(RichText::new("📊 Statistics").strong());
    ui.add_space(4.0);

    egui::Grid::new("stats_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Routes:");
            ui.label(
                RichText::new(format!(
                    "{} shown / {} in file",
                    state.stats.info.route_count,
                    state.source.route_ids.len()
                ))
                .strong(),
            );
            ui.end_row();

            ui.label("Rows:");
            ui.label(RichText::new(state.stats.format_rows()).strong());
            ui.end_row();

            ui.label("Line Points:");
            ui.label(RichText::new(state.stats.format_points()).strong());
            ui.end_row();

            ui.label("Distance:");
            ui.label(RichText::new(state.stats.format_distance()).strong());
            ui.end_row();

            if state.stats.last_build_time_ms > 0.0 {
                ui.label("Build Time:");
                ui.label(format!("{:.1} ms", state.stats.last_build_time_ms));
                ui.end_row();
            }
        });

    let report = &state.build_report;
    if !report.degenerate_routes.is_empty() {
        let ids: Vec<String> = report
            .degenerate_routes
            .iter()
            .map(|id| id.to_string())
            .collect();
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!(
                "Not drawn (fewer than two points): {}",
                ids.join(", ")
            ))
            .small()
            .color(ui.visuals().warn_fg_color),
        );
    }
    if report.unsequenced_rows > 0 {
        ui.label(
            RichText::new(format!(
                "{} rows without a sequence value skipped",
                report.unsequenced_rows
            ))
            .small()
            .weak(),
        );
    }
}

/// Checkbox per route id, with select all / none
fn render_route_list(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.label(RichText::new("🛣 Routes").strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.small_button("None").clicked() {
                state.select_none();
            }
            if ui.small_button("All").clicked() {
                state.select_all();
            }
        });
    });
    ui.add_space(4.0);

    if state.source.route_ids.is_empty() {
        ui.label(RichText::new("No routes loaded").weak());
        return;
    }

    let mut toggled = None;
    let color_by_route = state.ui_settings.color_by_route;

    egui::ScrollArea::vertical()
        .id_salt("route_list_scroll")
        .max_height(240.0)
        .show(ui, |ui| {
            for &route_id in &state.source.route_ids {
                ui.horizontal(|ui| {
                    let mut checked = state.selection.contains(route_id);
                    if ui
                        .checkbox(&mut checked, format!("Route {route_id}"))
                        .changed()
                    {
                        toggled = Some(route_id);
                    }

                    let (swatch, _) =
                        ui.allocate_exact_size(egui::vec2(18.0, 4.0), egui::Sense::hover());
                    ui.painter().rect_filled(
                        swatch,
                        1.0,
                        AppState::route_color(route_id, color_by_route),
                    );

                    if let Some(feature) = state.features.get(route_id) {
                        ui.label(
                            RichText::new(format!("{} pts", feature.point_count()))
                                .small()
                                .weak(),
                        );
                    }
                });
            }
        });

    if let Some(route_id) = toggled {
        state.toggle_route(route_id);
    }

    if let Some(advisory) = &state.advisory {
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!("⚠ {advisory}"))
                .strong()
                .color(ui.visuals().warn_fg_color),
        );
    }
}

fn render_export_section(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("💾 Export").strong());
    ui.add_space(4.0);

    let can_export = !state.features.is_empty();
    ui.horizontal(|ui| {
        for format in [ExportFormat::GeoJson, ExportFormat::Gpx] {
            if ui
                .add_enabled(can_export, egui::Button::new(format.label()))
                .clicked()
            {
                state.pending_export = Some(format);
            }
        }
    });

    match &state.last_export {
        Some(ExportStatus::Written(path)) => {
            ui.label(
                RichText::new(format!("✓ Saved {}", path.display()))
                    .small()
                    .color(Color32::GREEN),
            );
        }
        Some(ExportStatus::Failed(message)) => {
            ui.label(RichText::new(format!("⚠ {message}")).small().color(Color32::RED));
        }
        None => {}
    }
}

/// Render the Settings tab
fn render_settings_tab(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("🎨 Map Display").strong());
    ui.add_space(6.0);

    egui::Grid::new("display_grid")
        .num_columns(2)
        .spacing([12.0, 8.0])
        .show(ui, |ui| {
            ui.label("Line Width:");
            ui.add(
                egui::Slider::new(
                    &mut state.ui_settings.line_width,
                    MIN_LINE_WIDTH..=MAX_LINE_WIDTH,
                )
                .suffix(" px")
                .step_by(1.0),
            );
            ui.end_row();

            ui.label("Zoom Level:");
            if ui
                .add(egui::Slider::new(
                    &mut state.ui_settings.zoom_level,
                    MIN_ZOOM..=MAX_ZOOM,
                ))
                .changed()
            {
                state.pending_recenter = true;
            }
            ui.end_row();

            ui.label("Points:");
            ui.checkbox(&mut state.ui_settings.show_points, "Mark every coordinate");
            ui.end_row();

            ui.label("Colors:");
            ui.checkbox(&mut state.ui_settings.color_by_route, "One color per route");
            ui.end_row();
        });

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("📄 Data Source").strong());
    ui.add_space(6.0);

    ui.horizontal(|ui| {
        ui.label("Encoding:");
        ui.add(egui::TextEdit::singleline(&mut state.ui_settings.encoding_input).desired_width(90.0));
        let changed = state.ui_settings.encoding_input != state.source.loader_config.encoding;
        if ui.add_enabled(changed, egui::Button::new("Apply")).clicked() {
            let encoding = state.ui_settings.encoding_input.trim().to_string();
            let _ = state.set_encoding(encoding);
        }
    });
    let columns = &state.source.loader_config.columns;
    ui.label(
        RichText::new(format!(
            "Columns: {}, {}, {}, {}",
            columns.sequence, columns.route_id, columns.latitude, columns.longitude
        ))
        .small()
        .weak(),
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("🗺 Map Tiles").strong());
    ui.add_space(6.0);

    for provider in TilesProvider::all() {
        let selected = state.ui_settings.tiles_provider == *provider;
        if ui.selectable_label(selected, provider.name()).clicked() {
            state.ui_settings.tiles_provider = *provider;
        }
    }

    ui.add_space(4.0);
    ui.label(
        RichText::new(state.ui_settings.tiles_provider.attribution())
            .small()
            .italics()
            .weak(),
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("ℹ About").strong());
    ui.add_space(4.0);
    ui.label(RichText::new("Cycle Route Viewer").small());
    ui.label(
        RichText::new("Cross-country cycling routes from coordinate CSV files")
            .small()
            .weak(),
    );
    ui.add_space(4.0);
    ui.label(RichText::new("Keyboard shortcuts:").small());
    ui.label(RichText::new("  F1 / Ctrl+H - Toggle help").small().weak());
    ui.label(RichText::new("  Ctrl+O - Open CSV").small().weak());
}

/// Raw coordinate rows of the selected routes
pub fn data_table_window(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.show_data_table {
        return;
    }

    let mut open = true;
    egui::Window::new("📋 Route Data")
        .open(&mut open)
        .default_size([520.0, 360.0])
        .resizable(true)
        .show(ctx, |ui| render_data_table(ui, state));
    state.ui_settings.show_data_table = open;
}

fn render_data_table(ui: &mut Ui, state: &AppState) {
    let rows = &state.filtered_rows;
    if rows.is_empty() {
        ui.label(RichText::new("No rows for the current selection").weak());
        return;
    }

    let columns = &state.source.loader_config.columns;
    egui::Grid::new("data_header")
        .num_columns(5)
        .min_col_width(TABLE_COLUMN_WIDTH)
        .show(ui, |ui| {
            ui.label(RichText::new("Record").strong());
            ui.label(RichText::new(&columns.sequence).strong());
            ui.label(RichText::new(&columns.route_id).strong());
            ui.label(RichText::new(&columns.latitude).strong());
            ui.label(RichText::new(&columns.longitude).strong());
            ui.end_row();
        });
    ui.separator();

    let row_height = ui.text_style_height(&egui::TextStyle::Body);
    egui::ScrollArea::vertical()
        .id_salt("data_table_scroll")
        .auto_shrink([false, false])
        .show_rows(ui, row_height, rows.len(), |ui, range| {
            egui::Grid::new("data_rows")
                .num_columns(5)
                .min_col_width(TABLE_COLUMN_WIDTH)
                .striped(true)
                .show(ui, |ui| {
                    for row in &rows[range] {
                        data_row(ui, row);
                    }
                });
        });
}

fn data_row(ui: &mut Ui, row: &CoordinateRow) {
    ui.label(row.record.to_string());
    ui.label(row.sequence.map_or_else(|| "-".to_string(), |s| s.to_string()));
    ui.label(row.route_id.map_or_else(|| "-".to_string(), |id| id.to_string()));
    ui.label(format!("{:.6}", row.latitude));
    ui.label(format!("{:.6}", row.longitude));
    ui.end_row();
}

/// Show file picker dialog
pub fn show_file_picker(state: &mut AppState) {
    if !state.show_picker {
        return;
    }
    state.show_picker = false;

    if let Some(path) = rfd::FileDialog::new()
        .add_filter("CSV Files", &["csv"])
        .set_title("Select Route Coordinate CSV")
        .pick_file()
    {
        let _ = state.open_source(path);
    }
}

/// Show save dialog for a requested export
pub fn show_export_dialog(state: &mut AppState) {
    let Some(format) = state.pending_export.take() else {
        return;
    };

    if let Some(path) = rfd::FileDialog::new()
        .add_filter(format.label(), format.extensions())
        .set_file_name(format.default_file_name())
        .set_title(format!("Export Routes as {}", format.label()))
        .save_file()
    {
        state.export_to(format, &path);
    }
}

/// Help overlay
pub fn help_overlay(ctx: &egui::Context, show_help: &mut bool) {
    egui::Window::new("Help")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.heading("Cycle Route Viewer");
            ui.add_space(8.0);

            ui.label("Shows cross-country cycling routes from a coordinate CSV file.");
            ui.add_space(12.0);

            ui.label(RichText::new("Loading Routes").strong());
            ui.label("• Click 'Open CSV...' in the sidebar");
            ui.label("• Or drag and drop a CSV file onto the window");
            ui.label("• Change the text encoding in Settings if labels look garbled");
            ui.add_space(8.0);

            ui.label(RichText::new("Routes").strong());
            ui.label("• Tick routes in the sidebar to show or hide them");
            ui.label("• Hover a line to see its route id");
            ui.label("• Export the shown routes as GeoJSON or GPX");
            ui.add_space(8.0);

            ui.label(RichText::new("Navigation").strong());
            ui.label("• Scroll wheel to zoom, drag to pan");
            ui.label("• 'Center' or the zoom slider recenters on the routes");
            ui.add_space(8.0);

            ui.label(RichText::new("Keyboard Shortcuts").strong());
            ui.label("• F1 or Ctrl+H - Toggle this help");
            ui.label("• Ctrl+O - Open CSV");
            ui.add_space(12.0);

            if ui.button("Close").clicked() {
                *show_help = false;
            }
        });
}

/// Handle drag and drop of CSV files
pub fn handle_drag_and_drop(ctx: &egui::Context, state: &mut AppState) {
    let hovered_files = ctx.input(|i| !i.raw.hovered_files.is_empty());
    let dropped_files: Vec<_> = ctx.input(|i| i.raw.dropped_files.clone());

    if hovered_files {
        let painter = ctx.layer_painter(egui::LayerId::new(
            egui::Order::Foreground,
            egui::Id::new("drop_preview"),
        ));
        let screen_rect = ctx.content_rect();
        let bg_size = egui::vec2(340.0, 80.0);
        let bg_rect = egui::Rect::from_center_size(screen_rect.center(), bg_size);
        painter.rect_filled(bg_rect, 16.0, Color32::from_black_alpha(180));
        painter.text(
            screen_rect.center(),
            egui::Align2::CENTER_CENTER,
            "📂 Drop a CSV file here",
            egui::FontId::proportional(32.0),
            Color32::WHITE,
        );
    }

    // Only the last dropped CSV is opened
    let csv = dropped_files
        .into_iter()
        .filter_map(|file| file.path)
        .rfind(|path| {
            path.extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        });
    if let Some(path) = csv {
        let _ = state.open_source(path);
    }
}
