#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use cycle_route_viewer::CycleRouteViewerApp;

fn main() {
    cycle_route_viewer::native_main("Cycle Route Viewer", |cc| {
        Box::new(CycleRouteViewerApp::new(cc))
    });
}
