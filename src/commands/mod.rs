//! Application Glue: registers every command this daemon understands into
//! a [`Dispatcher`], and the [`HubCallbacks`] implementation that wires a
//! connected client's data to `Dispatcher::execute` and writes the result
//! back.
//!
//! None of the modules here are part of the core two subsystems
//! (`dispatcher.rs`, `server.rs`); they are the part of the repository
//! that is specific to *this* hub rather than to command servers in
//! general.
mod gpio;
mod session;
mod sensor;
mod system;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::Error;
use crate::hub::{GpioLine, HostStats, SensorDriver};
use crate::server::{HandlerContext, HubCallbacks};

/// Shared, read-mostly state every command handler closes over. One
/// instance is built in `bin/hubd.rs` and handed to [`register_all`].
pub struct AppState {
    pub sensor: Arc<dyn SensorDriver>,
    pub gpio: Arc<dyn GpioLine>,
    pub stats: Arc<dyn HostStats>,
}

/// Register every built-in command against `dispatcher`. Slot ids are
/// assigned in this function in registration order and are not meant to
/// be stable across versions — callers needing a specific id should
/// register directly against the [`Dispatcher`] instead.
pub fn register_all(dispatcher: &Dispatcher, state: Arc<AppState>) -> crate::error::Result<()> {
    let mut id = 0usize;
    for registration in gpio::registrations(state.clone())
        .into_iter()
        .chain(sensor::registrations(state.clone()))
        .chain(system::registrations(state.clone()))
        .chain(session::registrations())
    {
        dispatcher.register(id, registration)?;
        id += 1;
    }
    Ok(())
}

/// Pull the [`HandlerContext`] out of the opaque context handed to a
/// dispatcher handler. Every command in this module is registered via
/// [`register_all`], which is only ever called against a dispatcher
/// driven by [`AppCallbacks::on_data_received`] — so this downcast is
/// infallible in practice; a mismatch here is a programming error, not a
/// runtime condition, hence the panic rather than a new `Error` variant.
fn handler_context(context: &Arc<dyn std::any::Any + Send + Sync>) -> Arc<HandlerContext> {
    context
        .clone()
        .downcast::<HandlerContext>()
        .unwrap_or_else(|_| panic!("command handler invoked with the wrong context type"))
}

/// Marker byte prepended to every response line, mirroring the one
/// character marker the teacher's RESP `Frame` uses for
/// `SimpleString`/`SimpleError`, reused here at the text-line level.
const MARKER_OK: char = '+';
const MARKER_ERR: char = '-';

/// The default [`HubCallbacks`]: dispatches each received line through
/// the [`Dispatcher`] and writes a single marker-prefixed response line
/// back to the originating client.
pub struct AppCallbacks {
    dispatcher: Arc<Dispatcher>,
}

impl AppCallbacks {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl HubCallbacks for AppCallbacks {
    async fn on_client_connect(&self, ctx: &HandlerContext) {
        info!(addr = %ctx.client.addr(), "client connected");
    }

    async fn on_data_received(&self, ctx: &HandlerContext, line: String) {
        let context: Arc<dyn std::any::Any + Send + Sync> = Arc::new(HandlerContext {
            hub: Arc::clone(&ctx.hub),
            client: Arc::clone(&ctx.client),
        });
        let (marker, body) = match self.dispatcher.execute(&line, context).await {
            Ok(body) => (MARKER_OK, body),
            Err(err) => {
                warn!(addr = %ctx.client.addr(), %err, "command failed");
                (MARKER_ERR, err.to_string())
            }
        };
        let response = format!("{marker}{body}\n");
        if let Err(err) = ctx.hub.write(ctx.client.addr(), response.as_bytes()).await {
            warn!(addr = %ctx.client.addr(), %err, "failed to write response");
        }
    }

    async fn on_client_disconnect(&self, ctx: &HandlerContext) {
        info!(addr = %ctx.client.addr(), "client disconnected");
    }

    async fn on_server_failure(&self, hub: &Arc<crate::server::Hub>, error: Error) {
        error!(%error, "server failure");
        if let Err(err) = hub.shutdown().await {
            error!(%err, "failed to shut down after server failure");
        }
    }
}
