//! Pairline protocol core.
//!
//! Pure logic for a two-party chat session: the handshake state machine
//! that gates message traffic, and the [`KeyProvider`] seam through which the
//! session reaches its asymmetric cipher. Nothing here performs I/O; the node
//! crate drives these types from its socket tasks.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod error;
pub mod provider;
pub mod session;

pub use env::Environment;
pub use error::SessionError;
pub use provider::{KeyProvider, ToyRsaProvider};
pub use session::{Session, SessionAction, SessionState};
