//! Feature styling derived from category color and selection flags.

use crate::feature::Feature;
use peniko::Color;

/// Stroke width of working-layer and measurement outlines, in pixels.
pub const STROKE_WIDTH: f64 = 2.0;

/// Opacity applied to working-layer fills.
const FILL_ALPHA: u8 = 128;

/// Fill and stroke for one rendered geometry.
#[derive(Debug, Clone)]
pub struct StyleSpec {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
    /// Dash pattern in pixels; empty for a solid line.
    pub dash: Vec<f64>,
}

/// Style of a working-layer feature.
///
/// The fill comes from the feature's color at half opacity. The stroke marks
/// the selection state: yellow for the selected feature, green for its inner
/// features, dark red otherwise.
pub fn style_of(feature: &Feature, is_selected: bool, is_inner: bool) -> StyleSpec {
    let fill = parse_css_color(feature.color()).unwrap_or(Color::from_rgba8(255, 0, 0, 255));
    let rgba = fill.to_rgba8();
    let stroke = if is_selected {
        Color::from_rgba8(255, 255, 0, 255)
    } else if is_inner {
        Color::from_rgba8(0, 128, 0, 255)
    } else {
        Color::from_rgba8(139, 0, 0, 255)
    };
    StyleSpec {
        fill: Color::from_rgba8(rgba.r, rgba.g, rgba.b, FILL_ALPHA),
        stroke,
        stroke_width: STROKE_WIDTH,
        dash: Vec::new(),
    }
}

impl Feature {
    /// Style using the feature's own selection flags.
    pub fn style(&self) -> StyleSpec {
        style_of(self, self.is_selected(), self.is_inner())
    }
}

/// Style of committed measurement geometry: faint fill, dashed outline.
pub fn measure_style() -> StyleSpec {
    StyleSpec {
        fill: Color::from_rgba8(255, 255, 255, 51),
        stroke: Color::from_rgba8(0, 0, 0, 128),
        stroke_width: STROKE_WIDTH,
        dash: vec![10.0, 10.0],
    }
}

/// Parse a CSS color: a handful of named colors, `#rgb`, `#rrggbb` or `#rrggbbaa`.
pub fn parse_css_color(color: &str) -> Option<Color> {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
        return match hex.len() {
            3 => {
                // #rgb -> #rrggbb
                let r = channel(0..1)? * 17;
                let g = channel(1..2)? * 17;
                let b = channel(2..3)? * 17;
                Some(Color::from_rgba8(r, g, b, 255))
            }
            6 => Some(Color::from_rgba8(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Color::from_rgba8(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        };
    }

    let (r, g, b, a) = match color.to_ascii_lowercase().as_str() {
        "transparent" => (0, 0, 0, 0),
        "black" => (0, 0, 0, 255),
        "white" => (255, 255, 255, 255),
        "red" => (255, 0, 0, 255),
        "darkred" => (139, 0, 0, 255),
        "green" => (0, 128, 0, 255),
        "blue" => (0, 0, 255, 255),
        "yellow" => (255, 255, 0, 255),
        "orange" => (255, 165, 0, 255),
        "purple" => (128, 0, 128, 255),
        "gray" | "grey" => (128, 128, 128, 255),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, b, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{BUILDINGS, PARCELS};
    use crate::geometry::Geometry;
    use kurbo::Point;

    fn feature(category: &str) -> Feature {
        Feature::new(
            Geometry::polygon(vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)]),
            category,
        )
    }

    fn rgba(color: Color) -> (u8, u8, u8, u8) {
        let c = color.to_rgba8();
        (c.r, c.g, c.b, c.a)
    }

    #[test]
    fn test_stroke_follows_flags() {
        let f = feature(BUILDINGS);
        assert_eq!(rgba(style_of(&f, true, false).stroke), (255, 255, 0, 255));
        assert_eq!(rgba(style_of(&f, false, true).stroke), (0, 128, 0, 255));
        assert_eq!(rgba(style_of(&f, false, false).stroke), (139, 0, 0, 255));
        // Selection wins over inner.
        assert_eq!(rgba(style_of(&f, true, true).stroke), (255, 255, 0, 255));
    }

    #[test]
    fn test_fill_from_category_or_stored_color() {
        assert_eq!(rgba(feature(BUILDINGS).style().fill), (255, 0, 0, 128));
        assert_eq!(rgba(feature(PARCELS).style().fill), (0, 0, 255, 128));
        let custom = feature(PARCELS).with_color("#00ff00");
        assert_eq!(rgba(custom.style().fill), (0, 255, 0, 128));
    }

    #[test]
    fn test_parse_css_color() {
        assert_eq!(parse_css_color("#fff").map(rgba), Some((255, 255, 255, 255)));
        assert_eq!(parse_css_color("#1e1e1e").map(rgba), Some((30, 30, 30, 255)));
        assert_eq!(parse_css_color("#ff000080").map(rgba), Some((255, 0, 0, 128)));
        assert_eq!(parse_css_color("DarkRed").map(rgba), Some((139, 0, 0, 255)));
        assert!(parse_css_color("#12").is_none());
        assert!(parse_css_color("#zzzzzz").is_none());
        assert!(parse_css_color("chartreuse-ish").is_none());
    }

    #[test]
    fn test_measure_style_is_dashed() {
        let style = measure_style();
        assert_eq!(style.dash, vec![10.0, 10.0]);
        assert_eq!(style.stroke_width, STROKE_WIDTH);
    }
}
