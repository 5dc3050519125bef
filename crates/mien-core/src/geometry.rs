use serde::{Deserialize, Serialize};

/// A landmark coordinate in frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f32 {
        distance(*self, *other)
    }
}

impl From<(f32, f32)> for Point2D {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two points.
pub fn distance(p1: Point2D, p2: Point2D) -> f32 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_triangle() {
        let d = distance(Point2D::new(100.0, 50.0), Point2D::new(103.0, 54.0));
        assert!((d - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_symmetric() {
        let points = [
            Point2D::new(0.0, 0.0),
            Point2D::new(12.5, -3.0),
            Point2D::new(640.0, 480.0),
            Point2D::new(1919.5, 1079.25),
        ];
        for a in points {
            for b in points {
                assert_eq!(distance(a, b), distance(b, a));
            }
        }
    }

    #[test]
    fn test_self_distance_is_zero() {
        let p = Point2D::new(321.7, 88.1);
        assert_eq!(distance(p, p), 0.0);
        assert_eq!(p.distance_to(&p), 0.0);
    }

    #[test]
    fn test_frame_scale_coordinates() {
        // Full HD diagonal
        let d = distance(Point2D::new(0.0, 0.0), Point2D::new(1920.0, 1080.0));
        assert!((d - 2202.907).abs() < 1e-2);
    }
}
