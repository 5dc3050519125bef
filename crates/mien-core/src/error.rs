use thiserror::Error;

use crate::landmarks::FrameRole;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{role} landmark set has {found} points, {required} required")]
    InsufficientLandmarks {
        role: FrameRole,
        found: usize,
        required: usize,
    },

    #[error("delta key {0:?} is not in the active catalog")]
    UnknownDeltaKey(String),
}
