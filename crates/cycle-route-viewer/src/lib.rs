//! Cycle Route Viewer - Application Library
//!
//! Interactive map of the cross-country cycling routes loaded by
//! `cycle-route-lib`.

mod app;
mod run;

pub use app::CycleRouteViewerApp;
pub use run::{native_main, setup_logging};
