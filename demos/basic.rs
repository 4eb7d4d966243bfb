//! Minimal strut service — public, admin-gated, and identity-scoped routes
//! plus health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/test
//!   curl http://localhost:3000/test/auth                   # 401
//!   curl -H "Authorization: Bearer $TOKEN" http://localhost:3000/test/auth
//!   curl http://localhost:3000/healthz

use std::sync::Arc;
use std::time::Duration;

use strut::auth::{Auth, Rule};
use strut::middleware as mid;
use strut::{
    App, Context, Error, Method, Request, Response, Server, StatusCode, health, shutdown_channel,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let auth = Arc::new(Auth::from_secret(b"dev-secret-do-not-deploy", "strut-demo"));

    let app = App::new(
        shutdown_tx.clone(),
        vec![mid::logger(), mid::errors(shutdown_tx), mid::panics()],
    )
    .request_timeout(Duration::from_secs(30))
    .handle(Method::GET, "/test", test, vec![])
    .handle(
        Method::GET,
        "/test/auth",
        test,
        vec![
            mid::authenticate(Arc::clone(&auth)),
            mid::authorize(Arc::clone(&auth), Rule::AdminOnly),
        ],
    )
    .handle(
        Method::GET,
        "/users/{id}",
        get_user,
        vec![
            mid::authenticate(Arc::clone(&auth)),
            mid::authorize(auth, Rule::AdminOrSubject),
        ],
    )
    .handle(Method::GET, "/healthz", health::liveness, vec![])
    .handle(Method::GET, "/readyz", health::readiness, vec![]);

    Server::bind("0.0.0.0:3000")
        .serve(app, shutdown_rx)
        .await
        .expect("server error");
}

#[derive(serde::Serialize)]
struct TestStatus {
    #[serde(rename = "Status")]
    status: &'static str,
}

// GET /test and GET /test/auth
async fn test(_ctx: Context, _req: Request) -> Result<Response, Error> {
    Response::json(StatusCode::OK, &TestStatus { status: "OK" })
}

#[derive(serde::Serialize)]
struct User {
    id: String,
    requested_by: String,
}

// GET /users/{id} — admins can fetch anyone, users only themselves.
async fn get_user(ctx: Context, req: Request) -> Result<Response, Error> {
    let id = req
        .param("id")
        .ok_or_else(|| Error::Validation("id is missing".to_owned()))?;

    // authorize() guarantees claims are present on this route.
    let requested_by = ctx.claims().map(|c| c.sub.clone()).unwrap_or_default();

    Response::json(StatusCode::OK, &User { id: id.to_owned(), requested_by })
}
