//! End-to-end tests driving a composed [`App`] through `dispatch`, the same
//! entry point the server uses — no socket required.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use jsonwebtoken::{EncodingKey, Header, get_current_timestamp};
use strut::auth::{Auth, Claims, ROLE_ADMIN, ROLE_USER, Rule};
use strut::middleware as mid;
use strut::middleware::Mw;
use strut::{
    App, BoxedHandler, Context, Error, Handler, Method, Request, Response, StatusCode,
    shutdown_channel,
};
// Needed to invoke the inner handler from hand-rolled test middleware.
use strut::ErasedHandler as _;

const SECRET: &[u8] = b"integration-secret";
const ISSUER: &str = "strut-tests";

fn addr() -> SocketAddr {
    "127.0.0.1:4000".parse().unwrap()
}

fn mint(sub: &str, roles: &[&str]) -> String {
    let claims = Claims {
        sub: sub.to_owned(),
        roles: roles.iter().map(|r| (*r).to_owned()).collect(),
        exp: get_current_timestamp() + 3600,
        iss: ISSUER.to_owned(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

async fn send(
    app: &App,
    method: Method,
    path: &str,
    token: Option<&str>,
) -> (StatusCode, Bytes) {
    let mut builder = http::Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let req = builder.body(Full::new(Bytes::new())).unwrap();

    let resp = app.dispatch(req, addr()).await.expect("request should be answered");
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn json(body: &Bytes) -> serde_json::Value {
    serde_json::from_slice(body).expect("body should be JSON")
}

async fn ok_handler(_ctx: Context, _req: Request) -> Result<Response, Error> {
    Response::json(StatusCode::OK, &serde_json::json!({ "Status": "OK" }))
}

/// Middleware that appends `name` to a shared log before calling inward.
fn recording(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> Mw {
    Arc::new(move |next: BoxedHandler| -> BoxedHandler {
        let log = Arc::clone(&log);
        let h = move |ctx: Context, req: Request| {
            let log = Arc::clone(&log);
            let next = Arc::clone(&next);
            async move {
                log.lock().unwrap().push(name);
                next.call(ctx, req).await
            }
        };
        h.into_boxed_handler()
    })
}

// ── Middleware composition ────────────────────────────────────────────────────

#[tokio::test]
async fn middleware_runs_in_declared_order_base_then_route() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (tx, _rx) = shutdown_channel();

    let handler_log = Arc::clone(&log);
    let app = App::new(
        tx,
        vec![
            recording("base-1", Arc::clone(&log)),
            recording("base-2", Arc::clone(&log)),
        ],
    )
    .handle(
        Method::GET,
        "/ordered",
        move |_ctx: Context, _req: Request| {
            let log = Arc::clone(&handler_log);
            async move {
                log.lock().unwrap().push("handler");
                Ok(Response::status(StatusCode::OK))
            }
        },
        vec![recording("route-1", Arc::clone(&log))],
    );

    let (status, _) = send(&app, Method::GET, "/ordered", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(*log.lock().unwrap(), vec!["base-1", "base-2", "route-1", "handler"]);
}

// ── Authentication & authorization ────────────────────────────────────────────

fn auth_app(tx: strut::ShutdownTx) -> (App, Arc<AtomicUsize>) {
    let auth = Arc::new(Auth::from_secret(SECRET, ISSUER));
    let hits = Arc::new(AtomicUsize::new(0));

    let handler_hits = Arc::clone(&hits);
    let app = App::new(tx.clone(), vec![mid::errors(tx), mid::panics()]).handle(
        Method::GET,
        "/test/auth",
        move |_ctx: Context, _req: Request| {
            let hits = Arc::clone(&handler_hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Response::json(StatusCode::OK, &serde_json::json!({ "Status": "OK" }))
            }
        },
        vec![
            mid::authenticate(Arc::clone(&auth)),
            mid::authorize(auth, Rule::AdminOnly),
        ],
    );

    (app, hits)
}

#[tokio::test]
async fn missing_bearer_rejects_before_the_handler_runs() {
    let (tx, _rx) = shutdown_channel();
    let (app, hits) = auth_app(tx);

    let (status, body) = send(&app, Method::GET, "/test/auth", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json(&body)["error"], "authentication failed");
    assert_eq!(hits.load(Ordering::SeqCst), 0, "business handler must not run");

    // Garbage tokens fare no better.
    let (status, _) = send(&app, Method::GET, "/test/auth", Some("not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_role_rejects_with_403_and_never_echoes_roles() {
    let (tx, _rx) = shutdown_channel();
    let (app, hits) = auth_app(tx);

    let token = mint("user-1", &[ROLE_USER]);
    let (status, body) = send(&app, Method::GET, "/test/auth", Some(&token)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json(&body)["error"], "you are not authorized for that action");

    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains(ROLE_USER), "response must not echo role details");
    assert!(!text.contains("rule_admin_only"), "response must not echo the rule");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn admin_token_reaches_the_handler() {
    let (tx, _rx) = shutdown_channel();
    let (app, hits) = auth_app(tx);

    let token = mint("admin-1", &[ROLE_ADMIN]);
    let (status, body) = send(&app, Method::GET, "/test/auth", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["Status"], "OK");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn subject_scoped_rule_gates_on_the_path_parameter() {
    let (tx, _rx) = shutdown_channel();
    let auth = Arc::new(Auth::from_secret(SECRET, ISSUER));

    let app = App::new(tx.clone(), vec![mid::errors(tx), mid::panics()]).handle(
        Method::GET,
        "/users/{id}",
        ok_handler,
        vec![
            mid::authenticate(Arc::clone(&auth)),
            mid::authorize(auth, Rule::AdminOrSubject),
        ],
    );

    let user = mint("user-1", &[ROLE_USER]);
    let admin = mint("admin-1", &[ROLE_ADMIN]);

    let (status, _) = send(&app, Method::GET, "/users/user-1", Some(&user)).await;
    assert_eq!(status, StatusCode::OK, "own record");

    let (status, _) = send(&app, Method::GET, "/users/user-2", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN, "someone else's record");

    let (status, _) = send(&app, Method::GET, "/users/user-2", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK, "admin reads anyone");
}

#[tokio::test]
async fn expired_deadline_fails_fast_with_408() {
    let (tx, _rx) = shutdown_channel();
    let auth = Arc::new(Auth::from_secret(SECRET, ISSUER));

    let app = App::new(tx.clone(), vec![mid::errors(tx), mid::panics()])
        .request_timeout(Duration::ZERO)
        .handle(
            Method::GET,
            "/test/auth",
            ok_handler,
            vec![mid::authenticate(auth)],
        );

    let token = mint("admin-1", &[ROLE_ADMIN]);
    let (status, body) = send(&app, Method::GET, "/test/auth", Some(&token)).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(json(&body)["error"], "request deadline exceeded");
}

// ── Panic containment ─────────────────────────────────────────────────────────

async fn boom(_ctx: Context, _req: Request) -> Result<Response, Error> {
    panic!("index 12 out of bounds in secret_table");
}

#[tokio::test]
async fn panicking_handler_yields_one_generic_500_and_the_app_survives() {
    let (tx, _rx) = shutdown_channel();
    let app = App::new(tx.clone(), vec![mid::errors(tx), mid::panics()])
        .handle(Method::GET, "/boom", boom, vec![])
        .handle(Method::GET, "/test", ok_handler, vec![]);

    let (status, body) = send(&app, Method::GET, "/boom", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json(&body)["error"], "internal server error");

    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("secret_table"), "panic detail must not leak");

    // The worker lives on: the next request on the same app is served.
    let (status, body) = send(&app, Method::GET, "/test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["Status"], "OK");
}

// ── Shutdown ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn shutdown_error_answers_nothing_and_signals_exactly_once() {
    let (tx, mut rx) = shutdown_channel();
    let app = Arc::new(
        App::new(tx.clone(), vec![mid::errors(tx), mid::panics()]).handle(
            Method::GET,
            "/die",
            |_ctx: Context, _req: Request| async move {
                Err(Error::shutdown("data integrity violated"))
            },
            vec![],
        ),
    );

    // Several concurrent requests all trip the shutdown path.
    let mut handles = Vec::new();
    for _ in 0..5 {
        let app = Arc::clone(&app);
        handles.push(tokio::spawn(async move {
            let req = http::Request::builder()
                .method(Method::GET)
                .uri("/die")
                .body(Full::new(Bytes::new()))
                .unwrap();
            app.dispatch(req, addr()).await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap();
        // No response was produced for any of them.
        assert!(matches!(result, Err(Error::Shutdown(_))));
    }

    // The conduit observed exactly one signal.
    rx.recv().await;
    assert!(!rx.try_recv(), "signal must collapse to one");
}

// ── End-to-end matrix ─────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_test_routes() {
    let (tx, _rx) = shutdown_channel();
    let auth = Arc::new(Auth::from_secret(SECRET, ISSUER));

    let app = App::new(tx.clone(), vec![mid::logger(), mid::errors(tx), mid::panics()])
        .handle(Method::GET, "/test", ok_handler, vec![])
        .handle(
            Method::GET,
            "/test/auth",
            ok_handler,
            vec![
                mid::authenticate(Arc::clone(&auth)),
                mid::authorize(auth, Rule::AdminOnly),
            ],
        );

    // Public route needs no credentials.
    let (status, body) = send(&app, Method::GET, "/test", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["Status"], "OK");

    // Unknown paths are a trusted 404 through the same stack.
    let (status, body) = send(&app, Method::GET, "/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json(&body)["error"], "path not found");

    // Protected route: 401 without a token, 403 without the role, 200 with it.
    let (status, _) = send(&app, Method::GET, "/test/auth", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = mint("user-1", &[ROLE_USER]);
    let (status, _) = send(&app, Method::GET, "/test/auth", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = mint("admin-1", &[ROLE_ADMIN]);
    let (status, body) = send(&app, Method::GET, "/test/auth", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json(&body)["Status"], "OK");
}
