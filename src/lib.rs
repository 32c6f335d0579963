//! `hubd`: a multi-client command server for a small single-board
//! home-automation hub. Clients speak a newline-delimited ASCII protocol
//! over TCP; each line is tokenized into a target, an action, and
//! arguments, then routed through a fixed-capacity [`dispatcher::Dispatcher`]
//! to a registered handler.
pub mod client;
pub mod commands;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hub;
pub mod registry;
pub mod server;

pub use client::{ClientHandle, ClientSnapshot};
pub use config::{DispatcherConfig, HubConfig};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use registry::ClientRegistry;
pub use server::{HandlerContext, Hub, HubCallbacks};
