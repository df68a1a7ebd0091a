//! Node errors.
//!
//! Returned from caller-initiated operations only. Failures on background
//! tasks (accept loop, socket reads) are reported as
//! [`ChatEvent`](crate::ChatEvent)s instead.

use std::io;

use pairline_core::{SessionError, SessionState};
use pairline_crypto::CryptoError;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors from chat node operations.
#[derive(Error, Debug)]
pub enum NodeError {
    /// Host is empty or port is zero
    #[error("invalid address {host:?}:{port}")]
    InvalidAddress {
        /// Requested host
        host: String,
        /// Requested port
        port: u16,
    },

    /// A transport is active or a connect is already in flight
    #[error("already connected")]
    AlreadyConnected,

    /// Outbound connect was refused, timed out, or failed to resolve
    #[error("connect failed: {0}")]
    Connect(String),

    /// Listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested bind address
        addr: String,
        /// Underlying socket error
        source: io::Error,
    },

    /// Message is empty after trimming
    #[error("message is empty")]
    EmptyMessage,

    /// Key exchange has not completed
    #[error("keys not exchanged yet (state: {0:?})")]
    NotReady(SessionState),

    /// Peer key could not encrypt the message
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    /// Local keypair could not be generated
    #[error("key generation failed: {0}")]
    KeyGeneration(#[source] CryptoError),

    /// Session rejected the operation
    #[error("session error: {0}")]
    Session(#[source] SessionError),

    /// Transport could not accept the line
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<SessionError> for NodeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::AlreadyConnected => Self::AlreadyConnected,
            SessionError::NotReady { state } => Self::NotReady(state),
            other => Self::Session(other),
        }
    }
}
