//! Pairline chat node.
//!
//! Production glue around [`pairline_core`]'s Sans-IO session: TCP line
//! transport, the single-slot connection manager that arbitrates between the
//! acceptor and outbound connects, and the [`ChatSession`] facade that callers
//! drive.
//!
//! # Components
//!
//! - [`ChatSession`]: send text, query state, receive [`ChatEvent`]s
//! - [`ConnectionManager`]: accept, connect, disconnect
//! - [`LineTransport`]: newline-framed TCP stream with reader/writer tasks
//! - [`EchoServer`]: loopback peer for trying a node on its own
//! - [`SystemEnv`]: OS randomness for key generation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod chat;
pub mod commands;
mod config;
mod echo;
mod error;
mod event;
mod manager;
mod shared;
mod system_env;
mod transport;

pub use chat::ChatSession;
pub use config::{DEFAULT_BIND_HOST, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PORT, NodeConfig};
pub use echo::EchoServer;
pub use error::NodeError;
pub use event::{ChatEvent, Direction};
pub use manager::ConnectionManager;
pub use pairline_core::SessionState;
pub use system_env::SystemEnv;
pub use transport::{LineHandler, LineTransport, TransportError};
