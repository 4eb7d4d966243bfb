//! Panic containment.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler, Handler};
use crate::middleware::Mw;
use crate::request::Request;

/// Catches a panic anywhere in the inner chain and converts it into an
/// untrusted error, so one faulting request answers with a generic 500 and
/// the worker lives on to serve the next one.
///
/// Must sit inside [`errors`](crate::middleware::errors) — the converted
/// error still needs classification and a response. Execution contexts are
/// never shared between requests, so an unwound request cannot corrupt a
/// sibling's state.
pub fn panics() -> Mw {
    Arc::new(|next: BoxedHandler| -> BoxedHandler {
        let h = move |ctx: Context, req: Request| {
            let next = Arc::clone(&next);
            async move {
                match AssertUnwindSafe(next.call(ctx, req)).catch_unwind().await {
                    Ok(result) => result,
                    Err(payload) => {
                        Err(Error::untrusted(format!("panic: {}", panic_message(&payload))))
                    }
                }
            }
        };
        h.into_boxed_handler()
    })
}

fn panic_message(payload: &Box<dyn Any + Send>) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
