//! Process-wide termination conduit.
//!
//! One channel carries every reason the process should stop: a shutdown
//! error raised by a handler, or anything else that holds a sender. The
//! server merges it with SIGTERM/Ctrl-C, stops accepting connections, and
//! drains the ones in flight.
//!
//! The channel has capacity one and senders never block. Any number of
//! workers can signal concurrently — the first send fills the buffer, the
//! rest are dropped, and the receiver observes exactly one signal. A worker
//! that is already unwinding must never be parked on its own death notice.

use tokio::sync::mpsc;

/// Creates the termination conduit. Build it once in `main`, hand the sender
/// to [`App::new`](crate::App::new) and the errors middleware, and the
/// receiver to [`Server::serve`](crate::Server::serve).
pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = mpsc::channel(1);
    (ShutdownTx(tx), ShutdownRx(rx))
}

/// Send half of the termination conduit. Cheap to clone.
#[derive(Clone)]
pub struct ShutdownTx(mpsc::Sender<()>);

impl ShutdownTx {
    /// Requests process termination. Best-effort and non-blocking: if a
    /// signal is already pending, this one is redundant and is dropped.
    pub fn signal(&self) {
        let _ = self.0.try_send(());
    }
}

/// Receive half of the termination conduit.
pub struct ShutdownRx(mpsc::Receiver<()>);

impl ShutdownRx {
    /// Resolves when termination has been requested.
    pub async fn recv(&mut self) {
        self.0.recv().await;
    }

    /// Non-blocking probe, for supervisors that poll instead of awaiting.
    pub fn try_recv(&mut self) -> bool {
        self.0.try_recv().is_ok()
    }
}
