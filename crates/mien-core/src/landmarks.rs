//! 68-point facial landmark sets.
//!
//! Indexing follows the standard 68-point annotation: 0-16 jaw contour,
//! 17-26 eyebrows, 27-35 nose, 36-47 eyes, 48-67 mouth. The delta catalog
//! refers to points by these indices, so the layout is a hard contract.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// Number of points in a complete landmark set.
pub const LANDMARK_COUNT: usize = 68;

/// Which side of a frame pair a landmark set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRole {
    Current,
    Previous,
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRole::Current => f.write_str("current"),
            FrameRole::Previous => f.write_str("previous"),
        }
    }
}

/// Landmark points for one face in one frame, as returned by a fitter.
///
/// The length is not enforced on construction: fitters can return short sets
/// and the delta computer rejects them with a typed error instead of indexing
/// past the end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: Vec<Point2D>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point2D>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Point2D> {
        self.points.get(index).copied()
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Copy of this set with one point moved.
    pub fn with_point(&self, index: usize, point: Point2D) -> Self {
        let mut points = self.points.clone();
        if let Some(slot) = points.get_mut(index) {
            *slot = point;
        }
        Self { points }
    }
}

impl From<Vec<Point2D>> for LandmarkSet {
    fn from(points: Vec<Point2D>) -> Self {
        Self::new(points)
    }
}

impl FromIterator<Point2D> for LandmarkSet {
    fn from_iter<I: IntoIterator<Item = Point2D>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_set_lookup() {
        let set: LandmarkSet = (0..LANDMARK_COUNT)
            .map(|i| Point2D::new(i as f32, 0.0))
            .collect();
        assert_eq!(set.len(), LANDMARK_COUNT);
        assert_eq!(set.get(67), Some(Point2D::new(67.0, 0.0)));
        assert_eq!(set.get(68), None);
    }

    #[test]
    fn test_with_point_out_of_range_is_noop() {
        let set = LandmarkSet::new(vec![Point2D::new(1.0, 1.0); 3]);
        assert_eq!(set.with_point(10, Point2D::new(9.0, 9.0)), set);
        let moved = set.with_point(1, Point2D::new(9.0, 9.0));
        assert_eq!(moved.get(1), Some(Point2D::new(9.0, 9.0)));
    }
}
