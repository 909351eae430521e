//! Caller-visible error codes.

use std::fmt;

use luma_core::RenderError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable error code sent back over the method channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing or mistyped arguments
    BadArgs,
    /// Preview render failed
    RenderFailed,
    /// Export render or save failed
    ExportFailed,
    /// Unknown method name
    NotImplemented,
    /// Cancelled before it was accepted
    Cancelled,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadArgs => "bad_args",
            ErrorCode::RenderFailed => "render_failed",
            ErrorCode::ExportFailed => "export_failed",
            ErrorCode::NotImplemented => "not_implemented",
            ErrorCode::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error reply: a code plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct BridgeError {
    pub code: ErrorCode,
    pub message: String,
}

impl BridgeError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn bad_args(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadArgs, message)
    }

    pub fn not_implemented(method: &str) -> Self {
        Self::new(ErrorCode::NotImplemented, format!("Unknown method {}", method))
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Request cancelled before submission")
    }

    /// Map a render failure, using `failure` for everything that is not an
    /// input problem.
    pub fn from_render(err: &RenderError, failure: ErrorCode) -> Self {
        let code = match err {
            RenderError::InputError(_) => ErrorCode::BadArgs,
            _ => failure,
        };
        Self::new(code, err.to_string())
    }
}
