//! Render failure taxonomy.
//!
//! Every failure is terminal for its request; nothing is retried and no state
//! survives into the next request.

use thiserror::Error;

use crate::decode::DecodeError;
use crate::encode::EncodeError;
use crate::store::StoreError;

/// Errors that can end a render or export request.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Malformed or missing request fields, detected before any pixel work
    #[error("Invalid input: {0}")]
    InputError(String),

    /// The asset store has no asset for the reference
    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    /// Source bytes could not be decoded
    #[error("Decode failed: {0}")]
    DecodeError(#[from] DecodeError),

    /// Degenerate output extent or compression failure
    #[error("Encode failed: {0}")]
    EncodeError(#[from] EncodeError),

    /// The user did not authorize writing the export
    #[error("Write permission denied")]
    PermissionDenied,

    /// The asset store rejected the write
    #[error("Write failed: {0}")]
    WriteError(String),
}

impl From<StoreError> for RenderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => RenderError::AssetNotFound(id),
            StoreError::WriteRejected(reason) => RenderError::WriteError(reason),
        }
    }
}
