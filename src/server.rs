//! HTTP server and graceful shutdown.
//!
//! Two things stop this server, and they converge on one path: an OS
//! termination signal (SIGTERM from the orchestrator, Ctrl-C in dev), or a
//! shutdown-classified error raised by any handler and forwarded over the
//! app's termination conduit. Either way the server:
//!
//! 1. Immediately stops `listener.accept()` — no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], letting `main` exit cleanly.
//!
//! When deployed on Kubernetes, set `terminationGracePeriodSeconds` longer
//! than your slowest request so the drain in step 2 can finish.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::app::App;
use crate::error::Error;
use crate::shutdown::ShutdownRx;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// `shutdown` is the receive half of the conduit whose send half the app
    /// and its errors middleware hold. Returns only after a full graceful
    /// shutdown: a signal (OS or conduit) followed by all in-flight requests
    /// completing.
    pub async fn serve(self, app: App, shutdown: ShutdownRx) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // Arc so the routing table is shared across concurrent connection
        // tasks without copying it.
        let app = Arc::new(app);

        info!(addr = %self.addr, "listening");

        // JoinSet tracks every spawned connection task so we can wait for
        // them all to finish during the drain.
        let mut tasks = tokio::task::JoinSet::new();

        // Pin the shutdown future so the loop can poll it repeatedly.
        let shutdown = shutdown_signal(shutdown);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // `biased` checks arms top-to-bottom: a pending shutdown
                // stops the accept loop even when more connections are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(conn) => conn,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    // TokioIo adapts tokio's AsyncRead/AsyncWrite to hyper's
                    // IO traits.
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection, not once
                        // per connection. A dispatch error is a request that
                        // must not be answered (shutdown in flight) — hyper
                        // tears the connection down without writing.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { app.dispatch(req, remote_addr).await }
                        });

                        // `auto::Builder` handles both HTTP/1.1 and HTTP/2,
                        // whatever the client negotiates.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            warn!(peer = %remote_addr, "connection closed with error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Drain: wait for every in-flight connection before returning.
        while tasks.join_next().await.is_some() {}

        info!("stopped");
        Ok(())
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first termination request from any source.
///
/// On Unix this listens for **SIGTERM** (sent by orchestrators), **SIGINT**
/// (Ctrl-C, for local dev), and the app's internal termination conduit. On
/// Windows only Ctrl-C and the conduit are available.
async fn shutdown_signal(mut conduit: ShutdownRx) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // `pending()` never resolves — on non-Unix platforms the SIGTERM arm is
    // effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
        () = conduit.recv() => {}
    }
}
