//! World error types.

use thiserror::Error;

use crate::position::BlockPos;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("position {0} is claimed by more than one network")]
    DuplicatePosition(BlockPos),

    #[error("snapshot JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
