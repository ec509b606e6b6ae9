//! Conversion between geographic (EPSG:4326) and spherical mercator (EPSG:3857) coordinates.
//!
//! Geometry lives in projected meters inside the core; the feature store speaks
//! longitude/latitude degrees on the wire.

use crate::geometry::Geometry;
use kurbo::Point;
use std::f64::consts::PI;

/// Radius of the sphere used by spherical mercator.
pub const MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude beyond which spherical mercator is undefined.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

/// Half the width of the projected world.
pub const HALF_SIZE: f64 = PI * MERCATOR_RADIUS;

/// Project a longitude/latitude pair (degrees) to mercator meters.
pub fn from_lon_lat(lon: f64, lat: f64) -> Point {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = MERCATOR_RADIUS * lon.to_radians();
    let y = MERCATOR_RADIUS * (PI * (lat + 90.0) / 360.0).tan().ln();
    Point::new(x, y.clamp(-HALF_SIZE, HALF_SIZE))
}

/// Unproject mercator meters to a longitude/latitude pair (degrees).
///
/// The returned point carries longitude in `x` and latitude in `y`.
pub fn to_lon_lat(point: Point) -> Point {
    let lon = (point.x / MERCATOR_RADIUS).to_degrees();
    let lat = 360.0 * (point.y / MERCATOR_RADIUS).exp().atan() / PI - 90.0;
    Point::new(lon, lat)
}

/// Project a whole geometry from longitude/latitude to mercator.
pub fn geometry_from_lon_lat(geometry: &Geometry) -> Geometry {
    geometry.map_points(|p| from_lon_lat(p.x, p.y))
}

/// Unproject a whole geometry from mercator to longitude/latitude.
pub fn geometry_to_lon_lat(geometry: &Geometry) -> Geometry {
    geometry.map_points(to_lon_lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_maps_to_origin() {
        let p = from_lon_lat(0.0, 0.0);
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-9);
    }

    #[test]
    fn test_known_coordinate() {
        let p = from_lon_lat(10.0, 50.0);
        assert!((p.x - 1_113_194.907_932_735_7).abs() < 1e-6);
        assert!((p.y - 6_446_275.841_017_158).abs() < 1e-6);
    }

    #[test]
    fn test_inverse_recovers_degrees() {
        let lon_lat = to_lon_lat(from_lon_lat(27.561, 53.902));
        assert!((lon_lat.x - 27.561).abs() < 1e-9);
        assert!((lon_lat.y - 53.902).abs() < 1e-9);
    }

    #[test]
    fn test_polar_latitude_is_clamped() {
        let north = from_lon_lat(0.0, 90.0);
        assert!(north.y.is_finite());
        assert!(north.y <= HALF_SIZE);
    }
}
