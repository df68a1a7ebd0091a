//! Session errors.

use pairline_proto::CodecError;
use thiserror::Error;

use crate::session::SessionState;

/// Errors raised by the session state machine.
///
/// None of these tear down the transport. The driver reports them and keeps
/// reading.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A transport is already active, or a connect is already in flight
    #[error("already connected")]
    AlreadyConnected,

    /// Operation requires a completed key exchange
    #[error("session not ready: state is {state:?}")]
    NotReady {
        /// State when the operation was attempted
        state: SessionState,
    },

    /// Peer announced a key with a non-positive component
    #[error("invalid peer key: e={e}, n={n}")]
    InvalidPeerKey {
        /// Announced exponent
        e: i64,
        /// Announced modulus
        n: i64,
    },

    /// Ciphertext arrived before the peer announced its key
    #[error("message received before key exchange")]
    PrematureMessage,

    /// Key announcement arrived with no transport installed
    #[error("no transport installed")]
    NotConnected,

    /// Line could not be decoded
    #[error("malformed record: {0}")]
    Malformed(#[from] CodecError),
}
