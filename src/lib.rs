//! # strut
//!
//! A minimal HTTP execution framework for services behind a reverse proxy.
//! It defines the execution and failure-handling contract every route must
//! honor. Nothing more. Nothing less.
//!
//! ## The contract
//!
//! nginx handles TLS, rate limiting, slow clients, and body-size limits.
//! strut does not — the proxy does proxy things. What strut owns is the part
//! that changes between applications and must be correct under concurrent
//! load, partial failure, and hostile input:
//!
//! - **One handler shape** — every endpoint and every middleware is an
//!   `async fn(Context, Request) -> Result<Response, Error>`. A request is
//!   answered exactly once or its error propagates; the type system permits
//!   nothing else.
//! - **Ordered middleware composition** — first registered is outermost.
//!   The canonical base stack is `[logger, errors, panics]`: panics are
//!   contained innermost-of-the-three, classified by `errors`, logged by
//!   `logger` with the status the caller actually saw.
//! - **Three-way error classification** — trusted errors surface their
//!   intended status and a safe message; everything else is a generic 500
//!   with the detail kept server-side; a shutdown error writes no response
//!   at all and terminates the process gracefully.
//! - **Bearer-token auth** — JWT validation into typed [`auth::Claims`] on
//!   the execution context, and a closed set of authorization rules
//!   evaluated before business logic runs.
//! - **Graceful shutdown** — SIGTERM, Ctrl-C, and handler-raised shutdown
//!   errors converge on one termination conduit; the server stops accepting
//!   and drains in-flight requests.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strut::auth::{Auth, Rule};
//! use strut::middleware as mid;
//! use strut::{App, Context, Error, Method, Request, Response, Server, StatusCode};
//! use strut::shutdown_channel;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (shutdown_tx, shutdown_rx) = shutdown_channel();
//!     let auth = Arc::new(Auth::from_secret(b"change-me", "my-service"));
//!
//!     let app = App::new(
//!         shutdown_tx.clone(),
//!         vec![mid::logger(), mid::errors(shutdown_tx), mid::panics()],
//!     )
//!     .handle(Method::GET, "/status", status, vec![])
//!     .handle(
//!         Method::GET,
//!         "/admin/status",
//!         status,
//!         vec![mid::authenticate(Arc::clone(&auth)), mid::authorize(auth, Rule::AdminOnly)],
//!     );
//!
//!     Server::bind("0.0.0.0:3000").serve(app, shutdown_rx).await.unwrap();
//! }
//!
//! #[derive(serde::Serialize)]
//! struct Status {
//!     status: &'static str,
//! }
//!
//! async fn status(_ctx: Context, _req: Request) -> Result<Response, Error> {
//!     Response::json(StatusCode::OK, &Status { status: "OK" })
//! }
//! ```

mod app;
mod context;
mod error;
mod handler;
mod request;
mod response;
mod server;
mod shutdown;

pub mod auth;
pub mod health;
pub mod middleware;

pub use app::App;
pub use context::Context;
pub use error::{Error, ErrorResponse, FieldErrors};
pub use handler::{BoxedHandler, Handler};
#[doc(hidden)]
pub use handler::{BoxFuture, ErasedHandler};
pub use request::Request;
pub use response::{Response, ResponseBuilder};
pub use server::Server;
pub use shutdown::{ShutdownRx, ShutdownTx, shutdown_channel};

// The method and status vocabulary is the `http` crate's; re-exported so
// applications depend on one crate for the whole surface.
pub use http::{Method, StatusCode};
