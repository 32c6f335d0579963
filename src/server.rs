//! The server façade: [`Hub`]'s lifecycle (`init`, `run`, `shutdown`,
//! `deinit`) and per-session operations (`write`, `broadcast`,
//! `disconnect`, `client_address`, `enumerate_clients`), plus the
//! Listener and Client Worker tasks that back them.
//!
//! This and [`crate::dispatcher`] are the two subsystems this repository
//! exists to get right; see SPEC_FULL.md §§4.2–4.4 for the design this
//! module implements.
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::client::ClientHandle;
use crate::config::HubConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{Error, Result};
use crate::registry::ClientRegistry;

/// Application-supplied callbacks, wired to the dispatcher by
/// [`crate::commands`]. Mirrors spec.md §6's four mandatory callbacks.
#[async_trait]
pub trait HubCallbacks: Send + Sync {
    async fn on_client_connect(&self, ctx: &HandlerContext);
    /// `line` is one already-read, newline-stripped command. The callback
    /// is expected to dispatch it and write a response back to `ctx.client`
    /// via [`Hub::write`].
    async fn on_data_received(&self, ctx: &HandlerContext, line: String);
    async fn on_client_disconnect(&self, ctx: &HandlerContext);
    async fn on_server_failure(&self, hub: &Arc<Hub>, error: Error);
}

/// Context passed to callbacks and, via [`crate::dispatcher::Dispatcher::execute`],
/// to every command handler. Carries the originating client and a handle
/// back to the hub so handlers can call `write`/`broadcast`, closing the
/// "global mutable application context" flag in spec.md §9: context is
/// threaded explicitly, not read from a process-global.
pub struct HandlerContext {
    pub hub: Arc<Hub>,
    pub client: Arc<ClientHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Initialized,
    Running,
    Quiescing,
}

struct RunResources {
    listener_task: JoinHandle<()>,
    notify_shutdown: broadcast::Sender<()>,
    shutdown_complete_rx: AsyncMutex<Option<mpsc::Receiver<()>>>,
}

/// The Server Instance of spec.md §3.
pub struct Hub {
    config: HubConfig,
    registry: ClientRegistry,
    dispatcher: Arc<Dispatcher>,
    callbacks: Arc<dyn HubCallbacks>,
    lifecycle: AsyncMutex<Lifecycle>,
    run: AsyncMutex<Option<RunResources>>,
}

impl Hub {
    /// Validate `config`, build an empty registry, and return a quiesced
    /// instance with no network activity yet.
    pub fn init(
        config: HubConfig,
        dispatcher: Arc<Dispatcher>,
        callbacks: Arc<dyn HubCallbacks>,
    ) -> Result<Arc<Self>> {
        if config.port == 0 && config.max_clients == 0 {
            return Err(Error::InvalidArgument("port/max_clients invalid".into()));
        }
        Ok(Arc::new(Self {
            config,
            registry: ClientRegistry::new(),
            dispatcher,
            callbacks,
            lifecycle: AsyncMutex::new(Lifecycle::Initialized),
            run: AsyncMutex::new(None),
        }))
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Bind the configured port, begin accepting, and return once the
    /// listener task is running. Not idempotent.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if *lifecycle != Lifecycle::Initialized {
            return Err(Error::AlreadyRunning);
        }

        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await.map_err(Error::NetworkFailure)?;
        info!(addr = %bind_addr, "accepting inbound connections");

        let (notify_shutdown, _) = broadcast::channel(1);
        let (shutdown_complete_tx, shutdown_complete_rx) = mpsc::channel(1);

        let hub = Arc::clone(self);
        let shutdown_rx = notify_shutdown.subscribe();
        let listener_task = tokio::spawn(accept_loop(
            hub,
            listener,
            shutdown_rx,
            shutdown_complete_tx,
        ));

        *self.run.lock().await = Some(RunResources {
            listener_task,
            notify_shutdown,
            shutdown_complete_rx: AsyncMutex::new(Some(shutdown_complete_rx)),
        });
        *lifecycle = Lifecycle::Running;
        Ok(())
    }

    /// Send all of `bytes` to `addr`'s socket, serialized by that
    /// client's I/O lock.
    pub async fn write(&self, addr: SocketAddr, bytes: &[u8]) -> Result<()> {
        let clients = self.registry.snapshot()?;
        let client = clients
            .iter()
            .find(|c| c.addr() == addr)
            .ok_or(Error::ClientDisconnected)?;
        let mut write_half = client.write_half().lock().await;
        write_half.write_all(bytes).await.map_err(Error::NetworkFailure)?;
        write_half.flush().await.map_err(Error::NetworkFailure)?;
        Ok(())
    }

    /// Write `bytes` to every registered client, in registry (insertion)
    /// order. Per the open question preserved in SPEC_FULL.md §4.4, this
    /// aborts on the first per-client write failure rather than
    /// continuing to the rest — flagged, not silently changed.
    pub async fn broadcast(&self, bytes: &[u8]) -> Result<()> {
        for client in self.registry.snapshot()? {
            let mut write_half = client.write_half().lock().await;
            write_half.write_all(bytes).await.map_err(Error::NetworkFailure)?;
            write_half.flush().await.map_err(Error::NetworkFailure)?;
        }
        Ok(())
    }

    /// Signal `addr`'s forced-disconnect wake descriptor. Returns
    /// promptly; the worker performs the actual teardown.
    pub async fn disconnect(&self, addr: SocketAddr, suppress_callback: bool) -> Result<()> {
        let clients = self.registry.snapshot()?;
        let client = clients.iter().find(|c| c.addr() == addr);
        if let Some(client) = client {
            if suppress_callback {
                client.suppress_disconnect_callback();
            }
            client.wake();
        }
        Ok(())
    }

    /// Disconnect every client (suppressing their disconnect callback,
    /// per spec.md §4.4, to avoid broadcasting into a partially
    /// destroyed registry), signal the shutdown wake descriptor, then —
    /// closing the open question from spec.md §9 — wait for the listener
    /// and every worker task to actually exit before returning.
    pub async fn shutdown(self: &Arc<Self>) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if *lifecycle == Lifecycle::Initialized {
            return Err(Error::NotStarted);
        }
        if *lifecycle == Lifecycle::Quiescing {
            return Ok(());
        }

        for client in self.registry.snapshot()? {
            if client.is_draining() {
                continue;
            }
            client.suppress_disconnect_callback();
            client.wake();
        }

        let run = self.run.lock().await.take().ok_or(Error::NotStarted)?;
        let _ = run.notify_shutdown.send(());
        *lifecycle = Lifecycle::Quiescing;
        drop(lifecycle);

        if let Err(err) = run.listener_task.await {
            warn!(%err, "listener task panicked during shutdown");
        }

        let mut shutdown_complete_rx = run.shutdown_complete_rx.lock().await.take();
        if let Some(rx) = shutdown_complete_rx.as_mut() {
            let _ = rx.recv().await;
        }

        *self.lifecycle.lock().await = Lifecycle::Initialized;
        Ok(())
    }

    /// Release the client registry. Only valid on a quiesced instance.
    pub async fn deinit(self: &Arc<Self>) -> Result<()> {
        let lifecycle = self.lifecycle.lock().await;
        if *lifecycle == Lifecycle::Running {
            return Err(Error::AlreadyRunning);
        }
        Ok(())
    }

    /// The peer address for `addr`, formatted for display.
    pub fn client_address(&self, addr: SocketAddr) -> Result<String> {
        let clients = self.registry.snapshot()?;
        clients
            .iter()
            .find(|c| c.addr() == addr)
            .map(|c| c.addr().to_string())
            .ok_or(Error::ClientDisconnected)
    }

    /// A copied snapshot of every live client, per the redesign in
    /// SPEC_FULL.md §9 (option (a): no raw head pointer).
    pub fn enumerate_clients(&self) -> Result<Vec<crate::client::ClientSnapshot>> {
        Ok(self
            .registry
            .snapshot()?
            .iter()
            .map(|c| crate::client::ClientSnapshot { addr: c.addr() })
            .collect())
    }

    pub fn max_clients(&self) -> usize {
        self.config.max_clients
    }
}

/// The Listener task body (spec.md §4.2).
async fn accept_loop(
    hub: Arc<Hub>,
    listener: TcpListener,
    mut shutdown: broadcast::Receiver<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, addr)) => {
                        let worker_shutdown = shutdown.resubscribe();
                        if let Err(err) = handle_accept(&hub, socket, addr, worker_shutdown, shutdown_complete_tx.clone()) {
                            error!(%err, %addr, "failed to register accepted connection");
                        }
                    }
                    Err(err) => {
                        error!(%err, "failed to accept inbound connection");
                        hub.callbacks.on_server_failure(&hub, Error::NetworkFailure(err)).await;
                        break;
                    }
                }
            }
            _ = shutdown.recv() => {
                info!("listener observed shutdown signal, exiting accept loop");
                break;
            }
        }
    }
}

fn handle_accept(
    hub: &Arc<Hub>,
    socket: tokio::net::TcpStream,
    addr: SocketAddr,
    shutdown: broadcast::Receiver<()>,
    shutdown_complete_tx: mpsc::Sender<()>,
) -> Result<()> {
    if hub.registry.length()? >= hub.max_clients() {
        warn!(%addr, "connection rejected: server is at max_clients capacity");
        drop(socket);
        return Ok(());
    }

    let (read_half, write_half) = socket.into_split();
    let client = Arc::new(ClientHandle::new(addr, write_half));
    hub.registry.append(Arc::clone(&client))?;

    let hub_for_worker = Arc::clone(hub);
    let client_for_worker = Arc::clone(&client);
    tokio::spawn(async move {
        let ctx = HandlerContext {
            hub: Arc::clone(&hub_for_worker),
            client: Arc::clone(&client_for_worker),
        };
        hub_for_worker.callbacks.on_client_connect(&ctx).await;
        run_worker(hub_for_worker, client_for_worker, read_half, shutdown).await;
        drop(shutdown_complete_tx);
    });

    debug!(%addr, "client connected");
    Ok(())
}

/// The Client Worker task body (spec.md §4.3). Selects on the client's
/// own wake descriptor *and* the server-wide shutdown broadcast
/// (resubscribed per worker in `accept_loop`), so a connection accepted
/// in the window between `Hub::shutdown`'s registry snapshot and
/// `accept_loop` observing the shutdown signal still wakes and drains,
/// matching the teacher's `Handler::run` selecting on `self.shutdown.recv()`.
async fn run_worker(
    hub: Arc<Hub>,
    client: Arc<ClientHandle>,
    read_half: tokio::net::tcp::OwnedReadHalf,
    mut shutdown: broadcast::Receiver<()>,
) {
    let addr = client.addr();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();

    let client_initiated = loop {
        line.clear();
        tokio::select! {
            read_result = reader.read_line(&mut line) => {
                match read_result {
                    Ok(0) => break true,
                    Ok(_) => {
                        let trimmed = line.trim_end_matches(['\r', '\n']);
                        let ctx = HandlerContext { hub: Arc::clone(&hub), client: Arc::clone(&client) };
                        hub.callbacks.on_data_received(&ctx, trimmed.to_string()).await;
                    }
                    Err(err) => {
                        warn!(%addr, %err, "client read error, treating as disconnect");
                        break true;
                    }
                }
            }
            _ = client.woken() => {
                debug!(%addr, "client worker observed forced disconnect");
                break false;
            }
            _ = shutdown.recv() => {
                debug!(%addr, "client worker observed server-wide shutdown signal");
                client.suppress_disconnect_callback();
                break false;
            }
        }
    };

    let _ = hub.registry.remove(addr);

    if client_initiated && !client.is_disconnect_callback_suppressed() {
        let ctx = HandlerContext { hub: Arc::clone(&hub), client: Arc::clone(&client) };
        hub.callbacks.on_client_disconnect(&ctx).await;
    }
}

