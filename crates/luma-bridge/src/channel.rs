//! Method-channel entry point.

use std::sync::mpsc::Sender;

use serde_json::Value;
use tracing::debug;

use crate::args::MethodCall;
use crate::error::BridgeError;
use crate::service::{CancelToken, RenderService, Reply};

/// Name of the channel the host registers the handler under.
pub const CHANNEL_NAME: &str = "luma/native_renderer";

/// Parse and dispatch one method call.
///
/// Argument errors, unknown methods and pre-cancelled tokens are returned
/// synchronously and nothing is scheduled. On `Ok` the reply arrives later
/// on `replies`.
pub fn handle_method_call(
    service: &RenderService,
    method: &str,
    args: &Value,
    token: &CancelToken,
    replies: Sender<Reply>,
) -> Result<(), BridgeError> {
    let call = MethodCall::parse(method, args)?;
    debug!(method, request_id = ?call.request_id(), "Dispatching");
    service.submit(call, token, replies)
}
