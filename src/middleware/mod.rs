//! Middleware: handler-to-handler transforms for cross-cutting behavior.
//!
//! A middleware takes the inner [`BoxedHandler`] and returns a new one that
//! does pre/post work around it — or short-circuits and never calls it at
//! all, which is how a failed authentication keeps a request away from
//! business logic.
//!
//! Composition is a fold in reverse registration order: the first middleware
//! listed is outermost, executing first on the way in and last on the way
//! out. The ordering is load-bearing. The canonical base stack is
//!
//! ```text
//! [logger(), errors(shutdown_tx), panics()]
//! ```
//!
//! so that panic containment sits inside error classification (a recovered
//! panic becomes an untrusted error and gets the generic-500 treatment), and
//! the logger sees the final status of every request. Route-specific
//! middleware — [`authenticate`], [`authorize`] — composes inside the base
//! stack, next to the business handler, so claims are attached by the time
//! it runs.
//!
//! A middleware is anything implementing [`Middleware`]; a plain closure
//! `Fn(BoxedHandler) -> BoxedHandler` qualifies via the blanket impl, which
//! is how the built-ins below are written.

use std::sync::Arc;

use crate::handler::BoxedHandler;

mod auth;
mod errors;
mod logger;
mod panics;

pub use auth::{authenticate, authorize};
pub use errors::errors;
pub use logger::logger;
pub use panics::panics;

/// A handler-to-handler transform. Stateless across requests except for
/// configuration captured at construction time.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// A shared middleware value, as stored in the app's stacks.
pub type Mw = Arc<dyn Middleware>;

impl<F> Middleware for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// Folds a middleware list around a handler, first entry outermost.
pub(crate) fn wrap_middleware(mw: &[Mw], handler: BoxedHandler) -> BoxedHandler {
    mw.iter().rev().fold(handler, |next, m| m.wrap(next))
}
