//! Luma Bridge - method-channel bindings for the Luma renderer
//!
//! This crate exposes `luma-core` rendering to a host process over a
//! string-keyed method channel.
//!
//! # Module Structure
//!
//! - `args` - JSON argument parsing for `renderPreview` and `exportFullRes`
//! - `error` - Caller-visible error codes
//! - `service` - Worker pool, cancellation and stale-reply filtering
//! - `channel` - The `handle_method_call` entry point
//!
//! # Usage
//!
//! ```ignore
//! let service = RenderService::new(RenderConfig::default(), store)?;
//! let (tx, rx) = std::sync::mpsc::channel();
//! handle_method_call(&service, "renderPreview", &args, &CancelToken::new(), tx)?;
//! let reply = rx.recv()?;
//! ```

mod args;
mod channel;
mod error;
mod service;

pub use args::{ExportCall, MethodCall, PreviewCall, EXPORT_FULL_RES, RENDER_PREVIEW};
pub use channel::{handle_method_call, CHANNEL_NAME};
pub use error::{BridgeError, ErrorCode};
pub use service::{CancelToken, LatestOnly, Payload, RenderService, Reply};

/// Get the version of the bridge crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
