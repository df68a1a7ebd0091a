//! Events reported by a chat node.
//!
//! Everything that happens on a background task (accepts, reads, peer
//! errors) reaches the caller as a [`ChatEvent`] on an unbounded channel.
//! Events are observational: dropping the receiver does not affect the
//! session.

use std::{fmt, net::SocketAddr};

use pairline_crypto::PublicKey;

/// Which way a ciphertext travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent to the peer
    Outgoing,
    /// Received from the peer
    Incoming,
}

/// Something the operator should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Acceptor bound and waiting
    Listening {
        /// Bound address
        addr: SocketAddr,
    },

    /// Inbound connection arrived (before the accept/reject decision)
    IncomingConnection {
        /// Remote address
        peer: SocketAddr,
    },

    /// Outbound connect started
    Connecting {
        /// Target host
        host: String,
        /// Target port
        port: u16,
    },

    /// Transport installed; local key announced
    Connected {
        /// Remote address
        peer: SocketAddr,
    },

    /// Connection closed because a transport to another peer is already
    /// active
    Rejected {
        /// Remote address
        peer: SocketAddr,
    },

    /// Outbound connect failed
    ConnectFailed {
        /// Failure description
        reason: String,
    },

    /// Peer announced a valid key
    KeyExchanged {
        /// Peer's public key
        peer_key: PublicKey,
    },

    /// Local echo of a sent message
    Outgoing {
        /// Plaintext as sent
        text: String,
    },

    /// Decrypted message from the peer
    Incoming {
        /// Decrypted plaintext
        text: String,
    },

    /// Ciphertext of a message, when preview is enabled
    CipherPreview {
        /// Sent or received
        direction: Direction,
        /// Ciphertext values
        values: Vec<i64>,
    },

    /// Peer announced a key with a non-positive component
    InvalidPeerKey {
        /// Announced exponent
        e: i64,
        /// Announced modulus
        n: i64,
    },

    /// Line with a known tag failed to decode
    MalformedRecord {
        /// Decoder error
        reason: String,
    },

    /// Ciphertext arrived before the key exchange
    PrematureMessage,

    /// Key announcement arrived with no transport installed
    NotConnected,

    /// Ciphertext could not be decrypted
    DecryptionFailed {
        /// Decryption error
        reason: String,
    },

    /// Transport failed or the peer closed it
    ConnectionLost {
        /// Failure description
        reason: String,
    },

    /// Transport closed locally
    Disconnected,
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Listening { addr } => write!(f, "Listening on {addr}"),
            Self::IncomingConnection { peer } => write!(f, "Incoming connection from {peer}"),
            Self::Connecting { host, port } => write!(f, "Connecting to {host}:{port}..."),
            Self::Connected { peer } => write!(f, "Connected to {peer}! Exchanging keys..."),
            Self::Rejected { peer } => write!(f, "Rejected {peer}: already connected"),
            Self::ConnectFailed { reason } => write!(f, "Connect failed: {reason}"),
            Self::KeyExchanged { peer_key } => {
                write!(f, "Keys exchanged! Peer's public key: {peer_key}")
            },
            Self::Outgoing { text } => write!(f, "Me: {text}"),
            Self::Incoming { text } => write!(f, "Peer: {text}"),
            Self::CipherPreview { direction, values } => {
                let label = match direction {
                    Direction::Outgoing => "sent",
                    Direction::Incoming => "received",
                };
                let joined = values.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
                write!(f, "[{label}] [Length: {}] [Cipher: {joined}]", values.len())
            },
            Self::InvalidPeerKey { e, n } => {
                write!(f, "Error: peer sent an invalid key ({e}, {n})")
            },
            Self::MalformedRecord { reason } => write!(f, "Error: malformed record: {reason}"),
            Self::PrematureMessage => write!(f, "Error: received message before key exchange"),
            Self::NotConnected => write!(f, "Error: received key announcement while not connected"),
            Self::DecryptionFailed { reason } => write!(f, "Error decrypting message: {reason}"),
            Self::ConnectionLost { reason } => write!(f, "Connection lost: {reason}"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_preview_shows_length_and_values() {
        let event = ChatEvent::CipherPreview { direction: Direction::Outgoing, values: vec![42, 112] };
        assert_eq!(event.to_string(), "[sent] [Length: 2] [Cipher: 42,112]");
    }

    #[test]
    fn key_exchanged_shows_peer_key() {
        let event = ChatEvent::KeyExchanged { peer_key: PublicKey::new(19, 187) };
        assert_eq!(event.to_string(), "Keys exchanged! Peer's public key: (19, 187)");
    }

    #[test]
    fn messages_are_prefixed() {
        assert_eq!(ChatEvent::Outgoing { text: "hi".into() }.to_string(), "Me: hi");
        assert_eq!(ChatEvent::Incoming { text: "hi".into() }.to_string(), "Peer: hi");
    }

    #[test]
    fn handshake_errors_are_prefixed() {
        assert_eq!(
            ChatEvent::PrematureMessage.to_string(),
            "Error: received message before key exchange"
        );
        assert_eq!(
            ChatEvent::NotConnected.to_string(),
            "Error: received key announcement while not connected"
        );
    }
}
