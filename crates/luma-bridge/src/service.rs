//! Worker pool dispatch for parsed method calls.
//!
//! [`RenderService`] owns a dedicated rayon pool. Each accepted call runs on
//! the pool and delivers exactly one [`Reply`] on the caller's channel, tagged
//! with the caller's correlation id unchanged. The service never coalesces or
//! drops requests itself; [`LatestOnly`] is the caller-side filter for stale
//! preview results.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use luma_core::{AssetStore, ExportStatus, RenderConfig, Renderer};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::args::MethodCall;
use crate::error::{BridgeError, ErrorCode};

/// Caller-owned cancellation flag.
///
/// Only checked at submission: a request whose token is already cancelled is
/// rejected, and an accepted request always runs to completion.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Successful reply body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Encoded JPEG preview
    Bytes(Vec<u8>),
    /// Export outcome
    Status(ExportStatus),
}

/// Outcome of one accepted call.
#[derive(Debug, Clone)]
pub struct Reply {
    pub request_id: Option<i64>,
    pub method: &'static str,
    pub outcome: Result<Payload, BridgeError>,
}

/// Renderer, asset store and worker pool.
pub struct RenderService {
    renderer: Renderer,
    store: Arc<dyn AssetStore>,
    pool: ThreadPool,
}

impl RenderService {
    /// Build the service. `config.workers == 0` uses rayon's default
    /// thread count.
    pub fn new(
        config: RenderConfig,
        store: Arc<dyn AssetStore>,
    ) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("luma-render-{}", i))
            .build()?;
        info!(threads = pool.current_num_threads(), "Render pool ready");

        Ok(Self {
            renderer: Renderer::new(config),
            store,
            pool,
        })
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Run a call on the current thread.
    pub fn run(&self, call: &MethodCall) -> Reply {
        execute(&self.renderer, self.store.as_ref(), call)
    }

    /// Queue a call on the worker pool.
    ///
    /// Returns `cancelled` without scheduling anything when `token` is
    /// already cancelled. Otherwise exactly one [`Reply`] is sent on
    /// `replies`.
    pub fn submit(
        &self,
        call: MethodCall,
        token: &CancelToken,
        replies: Sender<Reply>,
    ) -> Result<(), BridgeError> {
        if token.is_cancelled() {
            debug!(
                method = call.method(),
                request_id = ?call.request_id(),
                "Rejected cancelled request"
            );
            return Err(BridgeError::cancelled());
        }

        let renderer = self.renderer.clone();
        let store = Arc::clone(&self.store);
        self.pool.spawn(move || {
            let reply = execute(&renderer, store.as_ref(), &call);
            if replies.send(reply).is_err() {
                warn!(method = call.method(), "Reply receiver dropped");
            }
        });
        Ok(())
    }
}

fn execute(renderer: &Renderer, store: &dyn AssetStore, call: &MethodCall) -> Reply {
    let outcome = match call {
        MethodCall::RenderPreview(preview) => renderer
            .render_preview(store, &preview.request)
            .map(Payload::Bytes)
            .map_err(|e| BridgeError::from_render(&e, ErrorCode::RenderFailed)),
        MethodCall::ExportFullRes(export) => renderer
            .export_full_res(store, &export.request)
            .map(Payload::Status)
            .map_err(|e| BridgeError::from_render(&e, ErrorCode::ExportFailed)),
    };
    if let Err(err) = &outcome {
        warn!(method = call.method(), code = %err.code, "{}", err.message);
    }

    Reply {
        request_id: call.request_id(),
        method: call.method(),
        outcome,
    }
}

/// Drops replies older than the newest submitted correlation id.
#[derive(Debug)]
pub struct LatestOnly {
    newest: AtomicI64,
}

impl Default for LatestOnly {
    fn default() -> Self {
        Self {
            newest: AtomicI64::new(i64::MIN),
        }
    }
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a submitted correlation id.
    pub fn submitted(&self, request_id: i64) {
        self.newest.fetch_max(request_id, Ordering::AcqRel);
    }

    pub fn is_stale(&self, request_id: i64) -> bool {
        request_id < self.newest.load(Ordering::Acquire)
    }

    /// Pass through replies that are current or carry no correlation id.
    pub fn filter(&self, reply: Reply) -> Option<Reply> {
        match reply.request_id {
            Some(id) if self.is_stale(id) => {
                debug!(request_id = id, "Dropping stale reply");
                None
            }
            _ => Some(reply),
        }
    }
}
