// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Flow engine API errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Error {
    /// A flow is already running
    #[error("already running")]
    AlreadyRunning,

    /// Resume called on a flow that is not paused
    #[error("only paused flows can be resumed")]
    NotResumable,

    /// Cancel called with no flow running
    #[error("cannot cancel idle flow")]
    CannotCancelIdle,

    /// Unrecognised flow type
    #[error("unknown flow type: {0}")]
    UnknownFlow(String),

    /// Engine used outside of a tokio runtime
    #[error("no async runtime available")]
    NoRuntime,
}
