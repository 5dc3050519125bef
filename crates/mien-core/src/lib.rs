//! Frame-to-frame facial expression classification over 68-point landmarks.
//!
//! The pipeline is pure: two landmark sets (current and previous frame) go in,
//! a [`DeltaTable`] of signed pair-distance changes is computed from an explicit
//! [`DeltaCatalog`], each [`ActionUnit`] predicate is evaluated over the deltas,
//! and an ordered decision list picks the first matching [`EmotionLabel`].
//!
//! Nothing here holds state across calls. The caller owns the previous frame.

pub mod action_units;
pub mod classifier;
pub mod delta;
pub mod error;
pub mod geometry;
pub mod landmarks;

pub use action_units::{ActionUnit, ActiveUnits, Condition, DeltaSign};
pub use classifier::{Classification, DecisionRule, EmotionClassifier, EmotionLabel, DECISION_LIST};
pub use delta::{CatalogKind, DeltaCatalog, DeltaPair, DeltaTable};
pub use error::CoreError;
pub use geometry::{distance, Point2D};
pub use landmarks::{FrameRole, LandmarkSet, LANDMARK_COUNT};

#[cfg(test)]
pub(crate) mod testing {
    use crate::{LandmarkSet, Point2D, LANDMARK_COUNT};

    /// A 68-point set with every point at a distinct position.
    pub fn neutral_face() -> LandmarkSet {
        (0..LANDMARK_COUNT)
            .map(|i| {
                let angle = i as f32 * 0.7;
                let radius = 40.0 + 2.5 * i as f32;
                Point2D::new(320.0 + radius * angle.cos(), 240.0 + radius * angle.sin())
            })
            .collect()
    }
}
