//! Request logging middleware.

use std::sync::Arc;

use tracing::info;

use crate::context::Context;
use crate::handler::{BoxedHandler, ErasedHandler, Handler};
use crate::middleware::Mw;
use crate::request::Request;

/// Logs one `request started` and one `request completed` event per request,
/// both stamped with the trace id so the two can be correlated with anything
/// the chain logged in between.
///
/// Place it outermost so the completion event carries the status the caller
/// actually received.
pub fn logger() -> Mw {
    Arc::new(|next: BoxedHandler| -> BoxedHandler {
        let h = move |ctx: Context, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let trace_id = ctx.trace_id();
                let started_at = ctx.started_at();
                let remote_addr = ctx.remote_addr();
                let method = req.method().clone();
                let path = req.path().to_owned();

                info!(
                    trace_id = %trace_id,
                    method = %method,
                    path = %path,
                    remote_addr = %remote_addr,
                    "request started"
                );

                let result = next.call(ctx, req).await;

                match &result {
                    Ok(response) => info!(
                        trace_id = %trace_id,
                        method = %method,
                        path = %path,
                        remote_addr = %remote_addr,
                        status = response.status_code().as_u16(),
                        elapsed_us = started_at.elapsed().as_micros() as u64,
                        "request completed"
                    ),
                    // Only shutdown errors make it past the errors
                    // middleware; the connection is about to be dropped.
                    Err(err) => info!(
                        trace_id = %trace_id,
                        method = %method,
                        path = %path,
                        remote_addr = %remote_addr,
                        error = %err,
                        elapsed_us = started_at.elapsed().as_micros() as u64,
                        "request aborted"
                    ),
                }

                result
            }
        };
        h.into_boxed_handler()
    })
}
