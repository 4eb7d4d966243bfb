//! Handler trait and type erasure.
//!
//! Every piece of endpoint logic and every middleware layer in this crate
//! conforms to one shape:
//!
//! ```text
//! async fn name(ctx: Context, req: Request) -> Result<Response, Error>
//! ```
//!
//! The shape carries the whole execution contract: a handler owns its
//! context and request outright, and it resolves to exactly one of a
//! response or an error. There is no way to answer twice and no way to
//! leave a request unanswered — the type system closes both doors.
//!
//! The route table needs to hold handlers of *different* concrete types in
//! one `HashMap<Method, Tree>`, so we erase them behind a trait object:
//!
//! ```text
//! async fn hello(ctx, req) -> Result<Response, Error>   ← user writes this
//!        ↓ app.handle(Method::GET, "/", hello, vec![])
//! hello.into_boxed_handler()                            ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(hello))                            ← heap-allocated wrapper
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(ctx, req)  at request time               ← one vtable dispatch
//! ```
//!
//! The only runtime cost per request is one Arc clone (atomic inc) plus one
//! virtual call per middleware layer — negligible next to network I/O.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future resolving to the handler outcome.
///
/// `Pin<Box<…>>` because the runtime polls the future in place; `Send +
/// 'static` so tokio may move it across worker threads.
#[doc(hidden)]
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// definition of [`BoxedHandler`], which middleware authors hold and call.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: Context, req: Request) -> BoxFuture;
}

/// A heap-allocated, type-erased handler shared across concurrent requests.
///
/// This is what middleware wraps: a [`Middleware`](crate::middleware::Middleware)
/// receives the inner `BoxedHandler` and returns a new one around it.
/// `Arc` gives cheap, thread-safe shared ownership without copying the handler.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid handler.
///
/// You never implement this yourself. It is automatically satisfied for any
/// `async fn` (or closure) with the signature:
///
/// ```text
/// async fn name(ctx: Context, req: Request) -> Result<Response, Error>
/// ```
///
/// The trait is **sealed** (via the private `Sealed` supertrait): only the
/// blanket impl below can satisfy it, which keeps the API surface stable.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

/// The sealing module. Because `Sealed` is private, external crates cannot
/// name it and therefore cannot implement `Handler` on their own types.
mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut> private::Sealed for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
}

/// Implement `Handler` for any function with the canonical signature.
///
/// `Fn(Context, Request) -> Fut` covers named `async fn` items, closures
/// returning async blocks (how the built-in middleware builds its layers),
/// and any struct implementing `Fn`.
impl<F, Fut> Handler for F
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Newtype that holds a concrete handler `F` and implements [`ErasedHandler`],
/// bridging the typed world to the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut> ErasedHandler for FnHandler<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn call(&self, ctx: Context, req: Request) -> BoxFuture {
        // The closure call runs eagerly and returns the concrete future;
        // boxing it makes the return type match the trait signature.
        Box::pin((self.0)(ctx, req))
    }
}
