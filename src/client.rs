//! The per-connection [`ClientHandle`]: socket, wake descriptor, and the
//! lock serializing writes to that socket.
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, Notify};

/// Identifies one connected peer and owns everything needed to write back
/// to it or force it to disconnect.
///
/// Equality key is `addr` (stand-in for the socket descriptor value, per
/// spec.md §3). The per-client I/O lock lives inside this struct rather
/// than being owned by the worker task, so a `Hub::write`/`broadcast` call
/// that is mid-flight keeps the lock alive via its `Arc<ClientHandle>`
/// clone even after the worker decides to tear the connection down — this
/// closes the "mutex destroyed by the worker itself" bug flagged in
/// spec.md §9.
#[derive(Debug)]
pub struct ClientHandle {
    addr: SocketAddr,
    write_half: Mutex<OwnedWriteHalf>,
    /// Forced-disconnect wake descriptor. Signalled by `Hub::disconnect`
    /// and `Hub::shutdown`; observed by the worker's `tokio::select!`.
    wake: Notify,
    /// Set by the first call to `wake`, so a second, racing
    /// `disconnect`/`shutdown` does not re-signal a client that is
    /// already tearing down. See `wake`/`is_draining`.
    draining: AtomicBool,
    /// Set by `Hub::shutdown`/`Hub::disconnect(.., suppress_callback =
    /// true)` so the worker skips `on_client_disconnect` on teardown —
    /// avoids broadcasting into a registry that is mid-destruction
    /// (spec.md §4.4).
    suppress_callback: AtomicBool,
}

impl ClientHandle {
    pub fn new(addr: SocketAddr, write_half: OwnedWriteHalf) -> Self {
        Self {
            addr,
            write_half: Mutex::new(write_half),
            wake: Notify::new(),
            draining: AtomicBool::new(false),
            suppress_callback: AtomicBool::new(false),
        }
    }

    pub fn suppress_disconnect_callback(&self) {
        self.suppress_callback.store(true, Ordering::SeqCst);
    }

    pub fn is_disconnect_callback_suppressed(&self) -> bool {
        self.suppress_callback.load(Ordering::SeqCst)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn write_half(&self) -> &Mutex<OwnedWriteHalf> {
        &self.write_half
    }

    /// Signal the forced-disconnect wake descriptor. A no-op past the
    /// first call: once a client is draining, a second `disconnect`
    /// (e.g. a racing `shutdown` on top of an explicit per-client
    /// `disconnect`) must not re-notify a worker that may already have
    /// consumed the first wakeup and moved on to tearing the connection
    /// down, which would otherwise surface as a spurious wakeup on an
    /// already-exiting or already-reused task.
    pub fn wake(&self) {
        if self.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        self.wake.notify_one();
    }

    /// Wait for the forced-disconnect wake descriptor.
    pub async fn woken(&self) {
        self.wake.notified().await;
    }

    /// Whether `wake` has already fired for this client, so a caller
    /// about to signal a forced disconnect can skip clients that are
    /// already on their way out (`Hub::shutdown` checks this before
    /// re-disconnecting a client an earlier `Hub::disconnect` call already
    /// woke).
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}

impl PartialEq for ClientHandle {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl Eq for ClientHandle {}

/// A copied, lock-free snapshot of one registry entry, returned by
/// `ClientRegistry::head_snapshot`/`Hub::enumerate_clients`. See spec.md
/// §9's open question on `enumerate_clients`: this is redesign option (a),
/// a copied `{addr}` tuple rather than a raw node a concurrent remove
/// could invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientSnapshot {
    pub addr: SocketAddr,
}
