//! Server and dispatcher configuration.
//!
//! `HubConfig`/`DispatcherConfig` are the programmatic form; [`crate::bin`]
//! builds them from a `clap::Parser` CLI so the daemon is configurable
//! without code changes, the way the teacher's `LojaCli` parses into a
//! `SocketAddr` before handing it to `Client::connect`.
use crate::error::{Error, Result};

/// Target token, action token, and argument tokens are each capped to this
/// many bytes (spec size bound).
pub const DEFAULT_MAX_TOKEN_LEN: usize = 32;
/// Arguments per command (spec size bound).
pub const DEFAULT_MAX_ARGS: usize = 10;
/// Dispatcher command table capacity (spec size bound).
pub const DEFAULT_MAX_SLOTS: usize = 16;
/// Default single-space delimiter between tokens.
pub const DEFAULT_DELIMITER: &str = " ";
/// Maximum delimiter length.
pub const MAX_DELIMITER_LEN: usize = 8;

pub const DEFAULT_PORT: u16 = 7878;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_MAX_CLIENTS: usize = 32;
pub const DEFAULT_MAX_PENDING: u32 = 128;

/// Validated configuration for one [`crate::server::Hub`] instance.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub host: String,
    pub port: u16,
    /// Hard limit on concurrent accepted clients. Connections beyond this
    /// are closed immediately on accept.
    pub max_clients: usize,
    /// Backlog passed to `listen`.
    pub max_pending: u32,
}

impl HubConfig {
    pub fn new(host: impl Into<String>, port: u16, max_clients: usize, max_pending: u32) -> Result<Self> {
        if max_clients == 0 {
            return Err(Error::InvalidArgument("max_clients must be positive".into()));
        }
        if max_pending == 0 {
            return Err(Error::InvalidArgument("max_pending must be positive".into()));
        }
        Ok(Self {
            host: host.into(),
            port,
            max_clients,
            max_pending,
        })
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_clients: DEFAULT_MAX_CLIENTS,
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

/// Validated configuration for one [`crate::dispatcher::Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub delimiter: String,
    pub max_slots: usize,
    pub max_target_len: usize,
    pub max_action_len: usize,
    pub max_arg_len: usize,
    pub max_args: usize,
}

impl DispatcherConfig {
    pub fn new(delimiter: impl Into<String>) -> Result<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() || delimiter.len() > MAX_DELIMITER_LEN {
            return Err(Error::InvalidArgument(format!(
                "delimiter must be 1..={MAX_DELIMITER_LEN} bytes, got {}",
                delimiter.len()
            )));
        }
        Ok(Self {
            delimiter,
            max_slots: DEFAULT_MAX_SLOTS,
            max_target_len: DEFAULT_MAX_TOKEN_LEN,
            max_action_len: DEFAULT_MAX_TOKEN_LEN,
            max_arg_len: DEFAULT_MAX_TOKEN_LEN,
            max_args: DEFAULT_MAX_ARGS,
        })
    }

    /// Input buffer length bound, per spec.md §6:
    /// `target + 1 + action + 1 + (arg + 1) * max_args`.
    pub fn max_buffer_len(&self) -> usize {
        self.max_target_len + 1 + self.max_action_len + 1 + (self.max_arg_len + 1) * self.max_args
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER).expect("default delimiter is valid")
    }
}
