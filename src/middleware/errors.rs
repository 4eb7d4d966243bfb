//! Error classification and response writing.

use std::sync::Arc;

use tracing::error;

use crate::context::Context;
use crate::error::ErrorResponse;
use crate::handler::{BoxedHandler, ErasedHandler, Handler};
use crate::middleware::Mw;
use crate::request::Request;
use crate::response::Response;
use crate::shutdown::ShutdownTx;

/// Consumes every error the inner chain produces and decides what the caller
/// sees.
///
/// - A **shutdown** error writes nothing: it signals the termination conduit
///   and propagates, so the server drops the connection and begins draining.
/// - A **trusted** error becomes its intended status with a caller-safe
///   `{"error": ...}` envelope.
/// - Anything else is logged in full server-side and becomes a fixed
///   `500 {"error":"internal server error"}` — internal detail stays out of
///   the response.
///
/// Everything that can fail must run inside this layer; a handler error that
/// never passes through here would leave its request unanswered.
pub fn errors(shutdown: ShutdownTx) -> Mw {
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        let shutdown = shutdown.clone();
        let h = move |ctx: Context, req: Request| {
            let next = Arc::clone(&next);
            let shutdown = shutdown.clone();
            async move {
                let trace_id = ctx.trace_id();

                match next.call(ctx, req).await {
                    Ok(response) => Ok(response),
                    Err(err) if err.is_shutdown() => {
                        error!(trace_id = %trace_id, error = %err, "shutdown error, signaling termination");
                        shutdown.signal();
                        Err(err)
                    }
                    Err(err) => {
                        // Full detail to the log — including the audit fields
                        // of authorization rejections and the untrusted
                        // messages the caller must never see.
                        error!(trace_id = %trace_id, error = %err, "request error");

                        let envelope = ErrorResponse::from_error(&err);
                        Response::json(err.status(), &envelope)
                    }
                }
            }
        };
        h.into_boxed_handler()
    })
}
