//! Built-in health-check handlers.
//!
//! Kubernetes asks two questions:
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from the load-balancer. |
//!
//! Register both without authentication middleware — probes carry no tokens —
//! but behind the base stack, so they are logged and panic-contained like
//! everything else:
//!
//! ```rust,no_run
//! # use strut::{App, Method, health, shutdown_channel};
//! # let (tx, _rx) = shutdown_channel();
//! let app = App::new(tx, vec![])
//!     .handle(Method::GET, "/healthz", health::liveness, vec![])
//!     .handle(Method::GET, "/readyz", health::readiness, vec![]);
//! ```
//!
//! Override `readiness` with your own handler to gate on dependency health
//! (database connectivity, downstream services): answer `200 {"status":"OK"}`
//! when ready and a trusted 503 when not — never an untrusted error, which
//! would be reported as an internal failure instead of "not ready yet".

use serde::Serialize;

use crate::context::Context;
use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use http::StatusCode;

#[derive(Serialize)]
struct LivenessInfo {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "podIP", skip_serializing_if = "Option::is_none")]
    pod_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    node: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
}

/// Liveness probe handler.
///
/// Always `200 OK`: if the process can respond at all, it is alive. The body
/// carries process metadata — and, when the Kubernetes Downward API env vars
/// are set in the pod manifest, the pod, node, and namespace serving it.
pub async fn liveness(_ctx: Context, _req: Request) -> Result<Response, Error> {
    let info = LivenessInfo {
        status: "up",
        build: std::env::var("BUILD").ok(),
        host: std::env::var("HOSTNAME").ok(),
        name: std::env::var("KUBERNETES_NAME").ok(),
        pod_ip: std::env::var("KUBERNETES_POD_IP").ok(),
        node: std::env::var("KUBERNETES_NODE_NAME").ok(),
        namespace: std::env::var("KUBERNETES_NAMESPACE").ok(),
    };

    Response::json(StatusCode::OK, &info)
}

#[derive(Serialize)]
struct ReadinessInfo {
    status: &'static str,
}

/// Readiness probe handler (default implementation).
///
/// Answers `200 {"status":"OK"}` unconditionally. Replace it with your own
/// handler if the service needs a warm-up period or must verify dependency
/// health before accepting traffic.
pub async fn readiness(_ctx: Context, _req: Request) -> Result<Response, Error> {
    Response::json(StatusCode::OK, &ReadinessInfo { status: "OK" })
}
