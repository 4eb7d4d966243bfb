//! The app runtime: route registration and request dispatch.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::Method;
use http_body_util::{BodyExt, Full};
use matchit::Router as MatchitRouter;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, ErasedHandler, Handler};
use crate::middleware::{Mw, wrap_middleware};
use crate::request::Request;
use crate::response::Response;
use crate::shutdown::ShutdownTx;

/// Deadline granted to a request when none is configured explicitly.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The application runtime.
///
/// Owns the route table (one radix tree per method, O(path-length) lookup),
/// the ordered base middleware stack applied to every route, and the send
/// half of the termination conduit. Build it once at startup — registration
/// is not concurrent — then hand it to [`Server::serve`](crate::Server::serve);
/// from that point it is read-only and shared freely across connection tasks.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use strut::auth::{Auth, Rule};
/// use strut::middleware as mid;
/// use strut::{App, Method, shutdown_channel};
/// # use strut::{Context, Error, Request, Response, StatusCode};
/// # async fn list_users(_: Context, _: Request) -> Result<Response, Error> {
/// #     Ok(Response::status(StatusCode::OK))
/// # }
///
/// let (shutdown_tx, shutdown_rx) = shutdown_channel();
/// let auth = Arc::new(Auth::from_secret(b"secret", "issuer"));
///
/// let app = App::new(
///     shutdown_tx.clone(),
///     vec![mid::logger(), mid::errors(shutdown_tx), mid::panics()],
/// )
/// .handle(
///     Method::GET,
///     "/users",
///     list_users,
///     vec![mid::authenticate(Arc::clone(&auth)), mid::authorize(auth, Rule::AdminOnly)],
/// );
/// ```
pub struct App {
    mw: Vec<Mw>,
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    not_found: BoxedHandler,
    shutdown: ShutdownTx,
    request_timeout: Duration,
}

impl App {
    /// Creates an app with the given base middleware stack.
    ///
    /// The first entry is outermost. Unmatched requests are answered by a
    /// synthetic not-found handler wrapped in the same base stack, so even a
    /// 404 is logged and classified like any other outcome.
    pub fn new(shutdown: ShutdownTx, mw: Vec<Mw>) -> Self {
        let not_found = wrap_middleware(&mw, not_found.into_boxed_handler());

        Self {
            mw,
            routes: HashMap::new(),
            not_found,
            shutdown,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Sets the wall-clock allowance granted to each request before its
    /// context reports the deadline as passed.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Registers a handler for a method + path pair. Returns `self` so
    /// registrations chain naturally.
    ///
    /// `route_mw` composes innermost, directly around the handler; the base
    /// stack composes around the result. Path parameters use `{name}`
    /// syntax — `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics on an invalid or conflicting path pattern. Registration runs
    /// at startup, where a bad route is a programming error worth dying for.
    pub fn handle(
        mut self,
        method: Method,
        path: &str,
        handler: impl Handler,
        route_mw: Vec<Mw>,
    ) -> Self {
        let handler = wrap_middleware(&route_mw, handler.into_boxed_handler());
        let handler = wrap_middleware(&self.mw, handler);

        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler)
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Requests process termination, as if a handler had returned a shutdown
    /// error.
    pub fn signal_shutdown(&self) {
        self.shutdown.signal();
    }

    /// Dispatches one request through the route table and its composed
    /// handler chain.
    ///
    /// The server calls this for every inbound request; it is also the seam
    /// for exercising an app in tests without binding a socket. The returned
    /// error is a request that must not be answered — a shutdown in flight,
    /// or a transport failure while reading the body — and the connection
    /// carrying it gets dropped.
    pub async fn dispatch<B>(
        &self,
        req: http::Request<B>,
        remote_addr: SocketAddr,
    ) -> Result<http::Response<Full<Bytes>>, Error>
    where
        B: hyper::body::Body,
        B::Error: std::error::Error + Send + Sync + 'static,
    {
        let (parts, body) = req.into_parts();
        let body = body.collect().await.map_err(Error::untrusted)?.to_bytes();

        let ctx = Context::new(remote_addr, self.request_timeout);

        let (handler, params) = match self.lookup(&parts.method, parts.uri.path()) {
            Some(found) => found,
            None => (Arc::clone(&self.not_found), HashMap::new()),
        };

        let response = handler.call(ctx, Request::new(parts, body, params)).await?;
        Ok(response.into_http())
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched
            .params
            .iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

/// Synthetic handler for unmatched routes. Wrapped in the base stack at
/// construction so a 404 is logged and classified like any other outcome.
async fn not_found(_ctx: Context, _req: Request) -> Result<Response, Error> {
    Err(Error::NotFound("path not found".to_owned()))
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::shutdown::shutdown_channel;

    fn addr() -> SocketAddr {
        "127.0.0.1:4000".parse().unwrap()
    }

    fn empty_request(method: Method, path: &str) -> http::Request<Full<Bytes>> {
        http::Request::builder()
            .method(method)
            .uri(path)
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[tokio::test]
    async fn path_params_reach_the_handler() {
        let (tx, _rx) = shutdown_channel();
        let app = App::new(tx, vec![]).handle(
            Method::GET,
            "/users/{id}",
            |_ctx: Context, req: Request| async move {
                Ok(Response::text(req.param("id").unwrap_or("missing").to_owned()))
            },
            vec![],
        );

        let resp = app.dispatch(empty_request(Method::GET, "/users/42"), addr()).await.unwrap();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"42");
    }

    #[tokio::test]
    async fn unknown_method_and_path_both_miss() {
        let (tx, _rx) = shutdown_channel();
        let app = App::new(tx, vec![]).handle(
            Method::GET,
            "/users",
            |_ctx: Context, _req: Request| async move { Ok(Response::status(StatusCode::OK)) },
            vec![],
        );

        // Without an errors middleware in the base stack the synthetic
        // not-found handler's error escapes dispatch directly.
        let err = app.dispatch(empty_request(Method::POST, "/users"), addr()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = app.dispatch(empty_request(Method::GET, "/ghosts"), addr()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
