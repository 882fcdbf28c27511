//! Point-in-shape tests for terrain rasterization.
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An override shape in terrain rules.
///
/// Shapes are tested against integer cell coordinates; `bounds` gives the
/// inclusive cell range a raster loop has to visit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    /// Axis-aligned ellipse with per-axis radii.
    Ellipse { center: Vec2, radius: Vec2 },
    /// Axis-aligned rectangle, inclusive corners `(x1, y1)..=(x2, y2)`.
    Rect { min: (i32, i32), max: (i32, i32) },
    /// Simple polygon tested by ray casting.
    Polygon { points: Vec<Vec2> },
}

impl Shape {
    /// Whether the cell `(x, y)` lies inside the shape.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        match self {
            Shape::Ellipse { center, radius } => {
                if radius.x <= 0.0 || radius.y <= 0.0 {
                    return false;
                }
                let dx = (x as f32 - center.x) / radius.x;
                let dy = (y as f32 - center.y) / radius.y;
                dx * dx + dy * dy <= 1.0
            }
            Shape::Rect { min, max } => {
                min.0 <= x && x <= max.0 && min.1 <= y && y <= max.1
            }
            Shape::Polygon { points } => point_in_polygon(x as f32, y as f32, points),
        }
    }

    /// Inclusive cell bounding box `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        match self {
            Shape::Ellipse { center, radius } => (
                (center.x - radius.x).floor() as i32 - 1,
                (center.y - radius.y).floor() as i32 - 1,
                (center.x + radius.x).ceil() as i32 + 1,
                (center.y + radius.y).ceil() as i32 + 1,
            ),
            Shape::Rect { min, max } => (min.0, min.1, max.0, max.1),
            Shape::Polygon { points } => {
                let mut min_x = f32::INFINITY;
                let mut min_y = f32::INFINITY;
                let mut max_x = f32::NEG_INFINITY;
                let mut max_y = f32::NEG_INFINITY;
                for p in points {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                if points.is_empty() {
                    return (0, 0, -1, -1);
                }
                (
                    min_x.floor() as i32,
                    min_y.floor() as i32,
                    max_x.ceil() as i32,
                    max_y.ceil() as i32,
                )
            }
        }
    }
}

/// Ray-casting point-in-polygon test.
fn point_in_polygon(x: f32, y: f32, points: &[Vec2]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = points[i];
        let pj = points[j];
        if (pi.y > y) != (pj.y > y) && x < (pj.x - pi.x) * (y - pi.y) / (pj.y - pi.y) + pi.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ellipse_contains_center_and_excludes_far_points() {
        let e = Shape::Ellipse {
            center: Vec2::new(10.0, 10.0),
            radius: Vec2::new(4.0, 2.0),
        };
        assert!(e.contains(10, 10));
        assert!(e.contains(14, 10));
        assert!(!e.contains(10, 13));
        assert!(!e.contains(15, 10));
    }

    #[test]
    fn rect_bounds_are_inclusive() {
        let r = Shape::Rect {
            min: (2, 3),
            max: (4, 5),
        };
        assert!(r.contains(2, 3));
        assert!(r.contains(4, 5));
        assert!(!r.contains(5, 5));
        assert_eq!(r.bounds(), (2, 3, 4, 5));
    }

    #[test]
    fn polygon_ray_cast_handles_concave_shape() {
        // L-shaped polygon.
        let poly = Shape::Polygon {
            points: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(10.0, 0.0),
                Vec2::new(10.0, 4.0),
                Vec2::new(4.0, 4.0),
                Vec2::new(4.0, 10.0),
                Vec2::new(0.0, 10.0),
            ],
        };
        assert!(poly.contains(2, 2));
        assert!(poly.contains(8, 2));
        assert!(poly.contains(2, 8));
        assert!(!poly.contains(8, 8));
    }

    #[test]
    fn degenerate_shapes_contain_nothing() {
        let e = Shape::Ellipse {
            center: Vec2::ZERO,
            radius: Vec2::ZERO,
        };
        assert!(!e.contains(0, 0));
        let p = Shape::Polygon { points: vec![] };
        assert!(!p.contains(0, 0));
    }
}
