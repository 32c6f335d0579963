//! The error taxonomy shared by every layer of the hub: the server façade,
//! the dispatcher, and the registry all return this one type.
use thiserror::Error;

/// All failure kinds the hub can report, either back to a façade caller or
/// through [`crate::server::HubCallbacks::on_server_failure`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("server is already running")]
    AlreadyRunning,

    #[error("server has not been started")]
    NotStarted,

    #[error("network failure: {0}")]
    NetworkFailure(#[from] std::io::Error),

    #[error("allocation failure")]
    AllocationFailure,

    #[error("synchronization failure: {0}")]
    SynchronizationFailure(String),

    #[error("client disconnected")]
    ClientDisconnected,

    #[error("command not found")]
    CmdNotFound,

    #[error("incomplete command")]
    CmdIncomplete,

    #[error("buffer is empty")]
    BufEmpty,

    #[error("buffer exceeds the maximum length")]
    BufTooLong,

    #[error("token exceeds the maximum length")]
    TokenTooLong,

    #[error("too many arguments")]
    TooManyArgs,

    #[error("id is already taken")]
    IdAlreadyTaken,

    #[error("readiness multiplexor failure: {0}")]
    MultiplexorFailure(String),
}

pub type Result<T> = std::result::Result<T, Error>;
