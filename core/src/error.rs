//! Error types for the registry client.
//!
//! # Design
//! Only failures of the call itself are errors. A 4xx/5xx answer from the
//! backend is a normal envelope with `ok == false`, so there is no variant for
//! it. `Transport` and `Deserialization` stay separate: the first means no
//! response arrived, the second means a 2xx response arrived with a body that
//! is not the expected document.

use thiserror::Error;

/// Boxed transport failure carried by `ApiError::Transport`.
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused or reset, DNS failure, timeout.
    #[error("transport failure: {0}")]
    Transport(#[source] TransportSource),

    /// A success response whose body is not a valid JSON:API document of the
    /// expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Client configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ApiError::Transport(Box::new(err))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::transport(err)
    }
}
