//! GeoJSON encoding of features, with EPSG:4326 coordinates on the wire.

use super::{SyncError, SyncResult};
use crate::feature::{Feature, FeatureId};
use crate::geometry::Geometry;
use crate::projection::{geometry_from_lon_lat, geometry_to_lon_lat};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Deserialize)]
struct WireFeature {
    #[serde(default)]
    id: Option<FeatureId>,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    properties: Option<WireProperties>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    layer_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum WireGeometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    LineString { coordinates: Vec<Vec<f64>> },
    #[serde(other)]
    Unsupported,
}

fn position(coordinates: &[f64]) -> Option<Point> {
    match coordinates {
        [lon, lat, ..] => Some(Point::new(*lon, *lat)),
        _ => None,
    }
}

fn positions(coordinates: &[Vec<f64>]) -> Option<Vec<Point>> {
    coordinates.iter().map(|c| position(c)).collect()
}

fn coordinates(points: &[Point]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

/// Decode a geometry object into projected coordinates.
fn read_geometry(value: Value) -> SyncResult<Option<Geometry>> {
    let geometry = match serde_json::from_value(value)? {
        WireGeometry::Polygon { coordinates } => coordinates
            .iter()
            .map(|ring| positions(ring))
            .collect::<Option<Vec<_>>>()
            .map(Geometry::polygon_with_holes),
        WireGeometry::LineString { coordinates } => positions(&coordinates).map(Geometry::line),
        WireGeometry::Unsupported => return Ok(None),
    };
    let geometry = geometry.ok_or_else(|| SyncError::Decode("position with fewer than 2 values".to_string()))?;
    Ok(Some(geometry_from_lon_lat(&geometry)))
}

/// Decode a FeatureCollection. Features without a usable line or polygon
/// geometry are skipped.
pub fn read_features(collection: Value) -> SyncResult<Vec<Feature>> {
    let features = match collection {
        Value::Object(mut map) => match map.remove("features") {
            Some(Value::Array(features)) => features,
            Some(Value::Null) | None => Vec::new(),
            Some(other) => {
                return Err(SyncError::Decode(format!("expected a feature array, got {}", other)));
            }
        },
        other => {
            return Err(SyncError::Decode(format!("expected a FeatureCollection, got {}", other)));
        }
    };

    let mut result = Vec::with_capacity(features.len());
    for value in features {
        let wire: WireFeature = match serde_json::from_value(value) {
            Ok(wire) => wire,
            Err(e) => {
                log::warn!("Skipping malformed feature: {}", e);
                continue;
            }
        };
        let Some(geometry) = wire.geometry else {
            log::warn!("Skipping feature {:?} without geometry", wire.id);
            continue;
        };
        let geometry = match read_geometry(geometry) {
            Ok(Some(geometry)) => geometry,
            Ok(None) => {
                log::warn!("Skipping feature {:?} with unsupported geometry", wire.id);
                continue;
            }
            Err(e) => {
                log::warn!("Skipping feature {:?}: {}", wire.id, e);
                continue;
            }
        };

        let properties = wire.properties.unwrap_or_default();
        let layer_type = properties.layer_type.or(properties.layer).unwrap_or_default();
        let mut feature = Feature::new(geometry, layer_type);
        feature.id = wire.id;
        feature.color = properties.color;
        result.push(feature);
    }
    Ok(result)
}

/// Encode a feature as a GeoJSON Feature object in longitude/latitude.
pub fn write_feature(feature: &Feature) -> Value {
    let geometry = match geometry_to_lon_lat(&feature.geometry) {
        Geometry::LineString(points) => json!({
            "type": "LineString",
            "coordinates": coordinates(&points),
        }),
        Geometry::Polygon(rings) => json!({
            "type": "Polygon",
            "coordinates": rings.iter().map(|ring| coordinates(ring)).collect::<Vec<_>>(),
        }),
    };
    let properties = WireProperties {
        layer_type: Some(feature.layer_type.clone()),
        layer: None,
        color: Some(feature.color().to_string()),
    };

    let mut object = json!({
        "type": "Feature",
        "geometry": geometry,
        "properties": properties,
    });
    if let (Some(id), Value::Object(map)) = (&feature.id, &mut object) {
        map.insert("id".to_string(), json!(id));
    }
    object
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::from_lon_lat;

    #[test]
    fn test_read_projects_coordinates() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": 12,
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[30.0, 50.0], [30.1, 50.0], [30.1, 50.1], [30.0, 50.0]]]
                },
                "properties": { "layer_type": "Parcels", "color": "blue" }
            }]
        });
        let features = read_features(collection).unwrap();
        assert_eq!(features.len(), 1);
        let feature = &features[0];
        assert_eq!(feature.id, Some(FeatureId::Number(12)));
        assert_eq!(feature.layer_type, "Parcels");
        assert_eq!(feature.color.as_deref(), Some("blue"));
        let first = feature.geometry.paths()[0][0];
        assert!(first.distance(from_lon_lat(30.0, 50.0)) < 1e-6);
        assert_eq!(feature.geometry.vertex_count(0), 3);
    }

    #[test]
    fn test_read_skips_unsupported_geometry() {
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "id": "a", "geometry": { "type": "Point", "coordinates": [1.0, 2.0] }, "properties": {} },
                { "type": "Feature", "id": "b", "geometry": null, "properties": null },
                { "type": "Feature", "id": "c", "geometry": { "type": "LineString", "coordinates": [[1.0], [2.0, 3.0]] } },
                {
                    "type": "Feature",
                    "id": "d",
                    "geometry": { "type": "LineString", "coordinates": [[1.0, 2.0], [2.0, 3.0]] },
                    "properties": { "layer": "Roads" }
                }
            ]
        });
        let features = read_features(collection).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, Some(FeatureId::from("d")));
        assert_eq!(features[0].layer_type, "Roads");
        assert_eq!(features[0].color(), "blue");
    }

    #[test]
    fn test_read_skips_malformed_properties() {
        let polygon = json!({
            "type": "Polygon",
            "coordinates": [[[0.0, 0.0], [0.1, 0.0], [0.1, 0.1], [0.0, 0.0]]]
        });
        let collection = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": 1,
                    "geometry": polygon,
                    "properties": { "layer_type": "Buildings" }
                },
                {
                    "type": "Feature",
                    "id": 2,
                    "geometry": polygon,
                    "properties": { "layer_type": "Buildings", "color": 16711680 }
                },
                {
                    "type": "Feature",
                    "id": 3.5,
                    "geometry": polygon,
                    "properties": { "layer_type": 7 }
                }
            ]
        });
        let features = read_features(collection).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id, Some(FeatureId::Number(1)));
    }

    #[test]
    fn test_read_rejects_non_collection() {
        assert!(matches!(read_features(json!([1, 2])), Err(SyncError::Decode(_))));
        assert!(read_features(json!({ "type": "FeatureCollection" })).unwrap().is_empty());
    }

    #[test]
    fn test_write_unprojects_and_omits_missing_id() {
        let feature = Feature::new(
            Geometry::polygon(vec![
                from_lon_lat(10.0, 20.0),
                from_lon_lat(11.0, 20.0),
                from_lon_lat(11.0, 21.0),
            ]),
            "Buildings",
        );
        let value = write_feature(&feature);
        assert_eq!(value["type"], "Feature");
        assert!(value.get("id").is_none());
        assert_eq!(value["properties"]["layer_type"], "Buildings");
        assert_eq!(value["properties"]["color"], "red");
        assert!(value["properties"].get("layer").is_none());

        let ring = value["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 4);
        let lon = ring[1][0].as_f64().unwrap();
        let lat = ring[1][1].as_f64().unwrap();
        assert!((lon - 11.0).abs() < 1e-9);
        assert!((lat - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_write_includes_id() {
        let feature = Feature::new(Geometry::line(vec![Point::ZERO, Point::new(1.0, 1.0)]), "Parcels").with_id(5);
        let value = write_feature(&feature);
        assert_eq!(value["id"], 5);
        assert_eq!(value["geometry"]["type"], "LineString");
    }
}
