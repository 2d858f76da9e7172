use clap::Parser;
use cycle_route_lib::{BuildOptions, ColumnNames, LoaderConfig};
use std::path::PathBuf;

/// File looked up in the working directory when no `--csv` is given
pub const DEFAULT_CSV_FILE: &str = "★국토종주 자전거길 노선좌표.csv";

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Cycle Route Viewer - Interactive map of cross-country cycling routes
pub struct Settings {
    /// Route coordinate CSV to load on startup
    #[clap(short, long, value_name = "FILE")]
    pub csv: Option<PathBuf>,

    /// Text encoding of the CSV file (e.g. cp949, euc-kr, utf-8)
    #[clap(short, long, default_value = "cp949")]
    pub encoding: String,

    /// Route ids shown initially (all routes when omitted)
    #[clap(short, long = "route", value_name = "ID")]
    pub routes: Vec<i64>,

    /// Route line width in pixels (1-10)
    #[clap(long, default_value = "4.0")]
    pub line_width: f32,

    /// Initial zoom level (5-12)
    #[clap(long, default_value = "7")]
    pub zoom: u8,

    /// Header of the sequence column
    #[clap(long, default_value = "순서")]
    pub sequence_column: String,

    /// Header of the route id column
    #[clap(long, default_value = "국토종주 자전거길")]
    pub route_column: String,

    /// Header of the latitude column
    #[clap(long, default_value = "위도(LINE_XP)")]
    pub latitude_column: String,

    /// Header of the longitude column
    #[clap(long, default_value = "경도(LINE_YP)")]
    pub longitude_column: String,

    /// Collapse consecutive duplicate coordinates within a route
    #[clap(long, default_value = "false")]
    pub dedupe: bool,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}

impl Settings {
    /// Parse the process arguments, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            encoding: self.encoding.clone(),
            columns: ColumnNames {
                sequence: self.sequence_column.clone(),
                route_id: self.route_column.clone(),
                latitude: self.latitude_column.clone(),
                longitude: self.longitude_column.clone(),
            },
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            dedupe_consecutive: self.dedupe,
        }
    }

    /// The CSV to open at startup: `--csv`, or the default file if present
    pub fn startup_csv(&self) -> Option<PathBuf> {
        self.csv.clone().or_else(|| {
            let default = PathBuf::from(DEFAULT_CSV_FILE);
            default.exists().then_some(default)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse_from(["cycle-route-viewer"]);
        assert_eq!(settings.encoding, "cp949");
        assert_eq!(settings.line_width, 4.0);
        assert_eq!(settings.zoom, 7);
        assert!(settings.routes.is_empty());
        assert_eq!(settings.loader_config(), LoaderConfig::default());
        assert!(!settings.build_options().dedupe_consecutive);
    }

    #[test]
    fn test_repeated_routes_and_columns() {
        let settings = Settings::parse_from([
            "cycle-route-viewer",
            "--csv",
            "routes.csv",
            "--route",
            "3",
            "-r",
            "7",
            "--latitude-column",
            "lat",
            "--dedupe",
        ]);
        assert_eq!(settings.routes, vec![3, 7]);
        assert_eq!(settings.loader_config().columns.latitude, "lat");
        assert_eq!(settings.startup_csv(), Some(PathBuf::from("routes.csv")));
        assert!(settings.build_options().dedupe_consecutive);
    }
}
