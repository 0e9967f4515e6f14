// Copyright (c) 2022-2023 The MobileCoin Foundation

use keycard_flow_core::StoreError;

/// Keycard flow host error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Flow engine error
    #[error(transparent)]
    Flow(#[from] keycard_flow_core::Error),

    /// Pairing store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration file error
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// Invalid log level
    #[error("invalid log level: {0}")]
    LogLevel(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
