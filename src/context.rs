//! Per-request execution context.
//!
//! The app builds one [`Context`] for every inbound request and moves it by
//! value down the handler chain. Nothing is shared: the context belongs to
//! exactly one request's worker for exactly one request, so there is no
//! locking anywhere in this module. Claims are write-once — the authenticate
//! middleware attaches them, everything downstream reads them.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::auth::Claims;
use crate::error::Error;

/// State owned by a single in-flight request.
pub struct Context {
    trace_id: Uuid,
    started_at: Instant,
    deadline: Instant,
    remote_addr: SocketAddr,
    claims: Option<Claims>,
}

impl Context {
    pub(crate) fn new(remote_addr: SocketAddr, timeout: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            trace_id: Uuid::new_v4(),
            started_at,
            deadline: started_at + timeout,
            remote_addr,
            claims: None,
        }
    }

    /// The correlation id stamped on every log line for this request.
    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    /// When the app accepted this request.
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Time spent on this request so far.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// The instant after which this request should fail fast.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Peer address of the connection that carried this request.
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Fails with [`Error::Timeout`] once the deadline has passed.
    ///
    /// Handlers doing expensive work should call this between steps rather
    /// than keep working on a request nobody is waiting for.
    pub fn check_deadline(&self) -> Result<(), Error> {
        if Instant::now() >= self.deadline {
            return Err(Error::Timeout);
        }
        Ok(())
    }

    /// The authenticated identity, if the authenticate middleware ran.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    pub(crate) fn set_claims(&mut self, claims: Claims) {
        self.claims = Some(claims);
    }
}
