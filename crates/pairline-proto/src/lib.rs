//! Pairline wire protocol.
//!
//! Plain-text, newline-delimited records exchanged between two chat peers.
//! This crate only knows how to turn a [`WireRecord`] into a line and back;
//! it has no notion of connection state. Ordering rules (no message before
//! a key announcement) are enforced by the session state machine in
//! `pairline-core`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod record;

pub use errors::{CodecError, Result};
pub use record::{KEY_TAG, MSG_TAG, WireRecord};
