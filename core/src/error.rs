//! Error types for the webhook bot client.
//!
//! # Design
//! Callers need to tell three failure classes apart: the HTTP round-trip
//! failed (`Transport`), the codec could not produce or parse a payload
//! (`Encode` / `Decode`), or the service answered with a nonzero `errcode`
//! (`Remote`). Each class is its own variant so a `match` is enough to decide
//! whether retrying makes sense. Remote codes are carried verbatim; no local
//! taxonomy is layered on top of them.

use thiserror::Error;

/// Errors returned by every `Bot` operation.
#[derive(Debug, Error)]
pub enum BotError {
    /// The HTTP round-trip failed before a response body could be read.
    #[error("transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The outgoing message could not be serialized.
    #[error("failed to encode request: {0}")]
    Encode(#[source] CodecError),

    /// The response body could not be parsed into the expected envelope.
    #[error("failed to decode response: {0}")]
    Decode(#[source] CodecError),

    /// The service accepted the request but reported a nonzero `errcode`.
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// Reading caller-supplied media content failed.
    #[error("failed to read media content: {0}")]
    Io(#[source] std::io::Error),

    /// The bot could not be constructed from the given settings.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BotError {
    pub fn is_transport(&self) -> bool {
        matches!(self, BotError::Transport(_))
    }

    pub fn is_codec(&self) -> bool {
        matches!(self, BotError::Encode(_) | BotError::Decode(_))
    }

    /// The remote failure, if the service rejected the call.
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            BotError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

/// A nonzero `errcode` answered by the webhook service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}]{message}")]
pub struct RemoteError {
    code: i64,
    message: String,
}

impl RemoteError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Failures raised by a `Transport` implementation.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Escape hatch for custom transports.
    #[error("{0}")]
    Other(String),
}

/// Failures raised by a `Codec` implementation.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Escape hatch for custom codecs.
    #[error("{0}")]
    Other(String),
}
