//! GeoJSON and GPX interchange
//!
//! The GeoJSON form is a `FeatureCollection` of `LineString` features, each
//! carrying its integer `route_id` property and `[longitude, latitude]`
//! positions.

use crate::builder::MIN_ROUTE_POINTS;
use crate::{DataError, Result, RouteFeature, RouteFeatureCollection};
use geo::{Coord, LineString};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use std::path::Path;

/// MIME type of exported GeoJSON
pub const GEOJSON_MIME: &str = "application/geo+json";

/// MIME type of exported GPX
pub const GPX_MIME: &str = "application/gpx+xml";

/// File name offered for GeoJSON downloads
pub const DEFAULT_EXPORT_FILE_NAME: &str = "cross_country_routes.geojson";

/// Name of the route id property
pub const ROUTE_ID_PROPERTY: &str = "route_id";

/// Convert the collection into a GeoJSON `FeatureCollection`
pub fn to_geojson(collection: &RouteFeatureCollection) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: collection.features().iter().map(feature_to_geojson).collect(),
        foreign_members: None,
    }
}

fn feature_to_geojson(feature: &RouteFeature) -> Feature {
    let positions: Vec<Vec<f64>> = feature.line.0.iter().map(|c| vec![c.x, c.y]).collect();

    let mut properties = JsonObject::new();
    properties.insert(
        ROUTE_ID_PROPERTY.to_string(),
        serde_json::Value::from(feature.route_id),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::LineString(positions))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Serialize the collection as GeoJSON text
///
/// `pretty` indents with two spaces. Non-ASCII text is written as-is.
pub fn to_geojson_string(collection: &RouteFeatureCollection, pretty: bool) -> Result<String> {
    let feature_collection = to_geojson(collection);
    let text = if pretty {
        serde_json::to_string_pretty(&feature_collection)?
    } else {
        serde_json::to_string(&feature_collection)?
    };
    Ok(text)
}

/// Parse GeoJSON text produced by [`to_geojson_string`]
pub fn from_geojson_str(text: &str) -> Result<RouteFeatureCollection> {
    let feature_collection = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(DataError::InvalidFeature(
                "expected a FeatureCollection".to_string(),
            ));
        }
    };

    let features = feature_collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| feature_from_geojson(index, feature))
        .collect::<Result<Vec<_>>>()?;

    Ok(RouteFeatureCollection::from_features(features))
}

fn feature_from_geojson(index: usize, feature: Feature) -> Result<RouteFeature> {
    let invalid = |reason: &str| DataError::InvalidFeature(format!("feature {index}: {reason}"));

    let route_id = feature
        .property(ROUTE_ID_PROPERTY)
        .and_then(|value| {
            value.as_i64().or_else(|| {
                value
                    .as_f64()
                    .filter(|v| v.fract() == 0.0)
                    .map(|v| v as i64)
            })
        })
        .ok_or_else(|| invalid("missing integer route_id"))?;

    let positions = match feature.geometry.map(|geometry| geometry.value) {
        Some(Value::LineString(positions)) => positions,
        Some(_) => return Err(invalid("geometry is not a LineString")),
        None => return Err(invalid("no geometry")),
    };

    let coords = positions
        .iter()
        .map(|position| match position.as_slice() {
            [lon, lat, ..] => Ok(Coord { x: *lon, y: *lat }),
            _ => Err(invalid("position with fewer than two values")),
        })
        .collect::<Result<Vec<_>>>()?;

    if coords.len() < MIN_ROUTE_POINTS {
        return Err(invalid("LineString with fewer than two positions"));
    }

    Ok(RouteFeature {
        route_id,
        line: LineString::new(coords),
    })
}

/// Convert the collection into GPX 1.1, one track per route
pub fn to_gpx(collection: &RouteFeatureCollection) -> gpx::Gpx {
    let mut gpx = gpx::Gpx::default();
    gpx.version = gpx::GpxVersion::Gpx11;
    gpx.creator = Some(env!("CARGO_PKG_NAME").to_string());

    for feature in collection.features() {
        let mut segment = gpx::TrackSegment::default();
        segment.points = feature
            .line
            .0
            .iter()
            .map(|c| gpx::Waypoint::new(geo::Point::new(c.x, c.y)))
            .collect();

        let mut track = gpx::Track::default();
        track.name = Some(format!("route {}", feature.route_id));
        track.segments.push(segment);
        gpx.tracks.push(track);
    }

    gpx
}

/// Write pretty GeoJSON to a file
pub fn write_geojson_file<P: AsRef<Path>>(
    path: P,
    collection: &RouteFeatureCollection,
) -> Result<()> {
    let text = to_geojson_string(collection, true)?;
    std::fs::write(path.as_ref(), text)?;
    tracing::info!(
        "Exported {} routes to {}",
        collection.len(),
        path.as_ref().display()
    );
    Ok(())
}

/// Write GPX to a file
pub fn write_gpx_file<P: AsRef<Path>>(path: P, collection: &RouteFeatureCollection) -> Result<()> {
    let file = std::fs::File::create(path.as_ref())?;
    gpx::write(&to_gpx(collection), std::io::BufWriter::new(file))?;
    tracing::info!(
        "Exported {} routes to {}",
        collection.len(),
        path.as_ref().display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoordinateRow, LoaderConfig, build_feature_collection, load_from_reader};

    fn sample() -> RouteFeatureCollection {
        let rows = vec![
            CoordinateRow::new(Some(2.0), Some(1), 37.12345678901234, 127.1),
            CoordinateRow::new(Some(1.0), Some(1), 37.0, 127.98765432109876),
            CoordinateRow::new(Some(1.0), Some(2), 36.0, 126.0),
            CoordinateRow::new(Some(1.0), Some(5), 35.5, 129.1),
            CoordinateRow::new(Some(2.0), Some(5), 35.6, 129.2),
            CoordinateRow::new(Some(3.0), Some(5), 35.7, 129.3),
        ];
        build_feature_collection(&rows)
    }

    #[test]
    fn test_geojson_shape() {
        let text = to_geojson_string(&sample(), false).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);

        let first = &features[0];
        assert_eq!(first["type"], "Feature");
        assert_eq!(first["properties"]["route_id"], 1);
        assert!(first["properties"]["route_id"].is_i64());
        assert_eq!(first["geometry"]["type"], "LineString");
        assert_eq!(
            first["geometry"]["coordinates"][0],
            serde_json::json!([127.98765432109876, 37.0])
        );
    }

    #[test]
    fn test_round_trip_preserves_ids_and_coordinates() {
        let collection = sample();
        for pretty in [false, true] {
            let text = to_geojson_string(&collection, pretty).unwrap();
            let parsed = from_geojson_str(&text).unwrap();
            assert_eq!(parsed, collection);
        }
    }

    #[test]
    fn test_empty_collection_round_trip() {
        let empty = build_feature_collection(&[]);
        let text = to_geojson_string(&empty, true).unwrap();
        assert!(from_geojson_str(&text).unwrap().is_empty());
    }

    #[test]
    fn test_pipeline_output_is_byte_identical() {
        let csv = "순서,국토종주 자전거길,위도(LINE_XP),경도(LINE_YP)\n\
                   2,1,37.1,127.1\n1,1,37.0,127.0\n1,2,36.0,126.0\n2,2,36.5,126.5\n";
        let run = || {
            let rows = load_from_reader(csv.as_bytes(), &LoaderConfig::utf8()).unwrap();
            to_geojson_string(&build_feature_collection(&rows), true).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_rejects_invalid_features() {
        let point = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
            "properties":{"route_id":1},"geometry":{"type":"Point","coordinates":[1.0,2.0]}}]}"#;
        assert!(matches!(
            from_geojson_str(point),
            Err(DataError::InvalidFeature(_))
        ));

        let no_id = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
            "properties":{},"geometry":{"type":"LineString","coordinates":[[1.0,2.0],[3.0,4.0]]}}]}"#;
        assert!(matches!(
            from_geojson_str(no_id),
            Err(DataError::InvalidFeature(_))
        ));

        let short = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
            "properties":{"route_id":3},"geometry":{"type":"LineString","coordinates":[[1.0,2.0]]}}]}"#;
        assert!(matches!(
            from_geojson_str(short),
            Err(DataError::InvalidFeature(_))
        ));

        let not_collection = r#"{"type":"Point","coordinates":[1.0,2.0]}"#;
        assert!(matches!(
            from_geojson_str(not_collection),
            Err(DataError::InvalidFeature(_))
        ));

        assert!(from_geojson_str("not json").is_err());
    }

    #[test]
    fn test_gpx_has_one_track_per_route() {
        let gpx = to_gpx(&sample());
        assert_eq!(gpx.tracks.len(), 2);
        assert_eq!(gpx.tracks[0].name.as_deref(), Some("route 1"));
        assert_eq!(gpx.tracks[1].segments[0].points.len(), 3);

        let first = gpx.tracks[0].segments[0].points[0].point();
        assert_eq!(first.x(), 127.98765432109876);
        assert_eq!(first.y(), 37.0);
    }

    #[test]
    fn test_write_files() {
        let dir = tempfile::tempdir().unwrap();
        let collection = sample();

        let geojson_path = dir.path().join(DEFAULT_EXPORT_FILE_NAME);
        write_geojson_file(&geojson_path, &collection).unwrap();
        let text = std::fs::read_to_string(&geojson_path).unwrap();
        assert_eq!(from_geojson_str(&text).unwrap(), collection);

        let gpx_path = dir.path().join("routes.gpx");
        write_gpx_file(&gpx_path, &collection).unwrap();
        let file = std::fs::File::open(&gpx_path).unwrap();
        let gpx = gpx::read(std::io::BufReader::new(file)).unwrap();
        assert_eq!(gpx.tracks.len(), 2);
    }
}
