//! Spherical length and area of projected geometries, and their display text.

use crate::geometry::Geometry;
use crate::projection::to_lon_lat;
use kurbo::Point;

/// Mean earth radius used for measurements, in meters.
pub const DEFAULT_RADIUS: f64 = 6_371_008.8;

/// Great-circle distance between two longitude/latitude points (degrees).
pub fn haversine_distance(a: Point, b: Point, radius: f64) -> f64 {
    let lat1 = a.y.to_radians();
    let lat2 = b.y.to_radians();
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (b.x - a.x).to_radians() / 2.0;
    let h = half_dlat.sin().powi(2) + half_dlon.sin().powi(2) * lat1.cos() * lat2.cos();
    2.0 * radius * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Signed spherical area of a longitude/latitude ring (degrees).
fn ring_area(ring: &[Point], radius: f64) -> f64 {
    let Some(&last) = ring.last() else {
        return 0.0;
    };
    let mut area = 0.0;
    let (mut x1, mut y1) = (last.x, last.y);
    for p in ring {
        area += (p.x - x1).to_radians() * (2.0 + y1.to_radians().sin() + p.y.to_radians().sin());
        x1 = p.x;
        y1 = p.y;
    }
    area * radius * radius / 2.0
}

/// Length in meters of a projected geometry, summed over every path.
pub fn length(geometry: &Geometry) -> f64 {
    geometry
        .paths()
        .iter()
        .map(|path| {
            path.windows(2)
                .map(|pair| haversine_distance(to_lon_lat(pair[0]), to_lon_lat(pair[1]), DEFAULT_RADIUS))
                .sum::<f64>()
        })
        .sum()
}

/// Area in square meters of a projected polygon: exterior minus holes. Lines have no area.
pub fn area(geometry: &Geometry) -> f64 {
    let Geometry::Polygon(rings) = geometry else {
        return 0.0;
    };
    rings
        .iter()
        .enumerate()
        .map(|(index, ring)| {
            let lon_lat: Vec<Point> = ring.iter().copied().map(to_lon_lat).collect();
            let ring_area = ring_area(&lon_lat, DEFAULT_RADIUS).abs();
            if index == 0 { ring_area } else { -ring_area }
        })
        .sum()
}

/// Display text for a measured length: kilometers above 1000 m, whole meters otherwise.
pub fn format_length(length: f64) -> String {
    if length > 1000.0 {
        format!("{} km", to_fixed(length / 1000.0, 2))
    } else {
        format!("{} m", to_fixed(length, 0))
    }
}

/// Display text for a measured area: km² above 1 000 000 m², hectares above 10 000 m², m² otherwise.
pub fn format_area(area: f64) -> String {
    if area > 1_000_000.0 {
        format!("{} km²", to_fixed(area / 1_000_000.0, 2))
    } else if area > 10_000.0 {
        format!("{} ha", to_fixed(area / 10_000.0, 2))
    } else {
        format!("{} m²", to_fixed(area, 0))
    }
}

/// Fixed-point rendering that rounds exact ties away from zero.
///
/// `format!("{:.N}")` rounds ties to even (`2.5` becomes `"2"`); label text
/// must round them up (`"3"`), so the exact decimal expansion of the value is
/// rounded by hand. Values of 1e21 and above are rendered in full.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    // A double has at most 1074 fractional decimal digits, so this is exact.
    let exact = format!("{:.1100}", value.abs());
    let (int_part, frac_part) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> = int_part
        .bytes()
        .chain(frac_part.bytes().chain(std::iter::repeat(b'0')).take(digits))
        .collect();

    if frac_part.as_bytes().get(digits).is_some_and(|&d| d >= b'5') {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == b'9' {
                *digit = b'0';
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, b'1');
        }
    }

    let split = kept.len() - digits;
    let mut out = String::with_capacity(kept.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    out.extend(kept[..split].iter().map(|&b| b as char));
    if digits > 0 {
        out.push('.');
        out.extend(kept[split..].iter().map(|&b| b as char));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::from_lon_lat;

    #[test]
    fn test_format_length() {
        assert_eq!(format_length(999.0), "999 m");
        assert_eq!(format_length(1000.0), "1000 m");
        assert_eq!(format_length(1000.01), "1.00 km");
        assert_eq!(format_length(2500.0), "2.50 km");
        assert_eq!(format_length(0.0), "0 m");
        assert_eq!(format_length(12.5), "13 m");
    }

    #[test]
    fn test_format_area() {
        assert_eq!(format_area(9999.0), "9999 m²");
        assert_eq!(format_area(10_000.0), "10000 m²");
        assert_eq!(format_area(10_001.0), "1.00 ha");
        assert_eq!(format_area(1_000_000.0), "100.00 ha");
        assert_eq!(format_area(1_000_001.0), "1.00 km²");
        assert_eq!(format_area(12_363_718_145.18), "12363.72 km²");
    }

    #[test]
    fn test_to_fixed_rounds_ties_up() {
        assert_eq!(to_fixed(0.5, 0), "1");
        assert_eq!(to_fixed(2.5, 0), "3");
        assert_eq!(to_fixed(1.125, 2), "1.13");
        assert_eq!(to_fixed(9.995, 2), "9.99"); // 9.995 is stored below the tie
        assert_eq!(to_fixed(1.005, 2), "1.00");
    }

    #[test]
    fn test_to_fixed_carries() {
        assert_eq!(to_fixed(9.999, 2), "10.00");
        assert_eq!(to_fixed(99.5, 0), "100");
        assert_eq!(to_fixed(0.0, 2), "0.00");
        assert_eq!(to_fixed(-1.5, 0), "-2");
    }

    #[test]
    fn test_to_fixed_non_finite() {
        assert_eq!(to_fixed(f64::NAN, 2), "NaN");
        assert_eq!(to_fixed(f64::INFINITY, 0), "Infinity");
    }

    #[test]
    fn test_length_of_one_degree_along_equator() {
        let line = Geometry::line(vec![from_lon_lat(0.0, 0.0), from_lon_lat(1.0, 0.0)]);
        assert!((length(&line) - 111_195.080_233_532_9).abs() < 1e-3);
    }

    #[test]
    fn test_length_sums_segments() {
        let line = Geometry::line(vec![
            from_lon_lat(0.0, 0.0),
            from_lon_lat(1.0, 0.0),
            from_lon_lat(1.0, 1.0),
        ]);
        assert!((length(&line) - 2.0 * 111_195.080_233_532_9).abs() < 1e-2);
    }

    #[test]
    fn test_area_of_one_degree_square() {
        let square = Geometry::polygon(vec![
            from_lon_lat(0.0, 0.0),
            from_lon_lat(1.0, 0.0),
            from_lon_lat(1.0, 1.0),
            from_lon_lat(0.0, 1.0),
        ]);
        assert!((area(&square) - 12_363_718_145.18).abs() < 1.0);
    }

    #[test]
    fn test_area_ignores_winding() {
        let clockwise = Geometry::polygon(vec![
            from_lon_lat(0.0, 0.0),
            from_lon_lat(0.0, 1.0),
            from_lon_lat(1.0, 1.0),
            from_lon_lat(1.0, 0.0),
        ]);
        assert!(area(&clockwise) > 0.0);
    }

    #[test]
    fn test_line_has_no_area() {
        let line = Geometry::line(vec![from_lon_lat(0.0, 0.0), from_lon_lat(1.0, 1.0)]);
        assert_eq!(area(&line), 0.0);
    }
}
