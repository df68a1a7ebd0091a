//! Handshake state machine.
//!
//! Tracks key-exchange progress over the active transport and gates message
//! traffic. Uses the action pattern: methods take decoded input and return
//! actions for the driver to execute, so the machine itself performs no I/O.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐ begin_connect ┌────────────┐
//! │ Idle │──────────────>│ Connecting │
//! └──────┘<──────────────└────────────┘
//!    │ ↑   connect failed       │
//!    │ │                        │ transport installed
//!    │ │ transport lost         ↓
//!    │ │                  ┌───────────┐  valid KEY  ┌──────────────┐
//!    │ └──────────────────│ Connected │────────────>│ KeyExchanged │
//!    │                    └───────────┘             └──────────────┘
//!    └─── transport installed ──↑       transport lost → Idle
//! ```
//!
//! A peer key is only ever held in `KeyExchanged` and is cleared whenever the
//! transport goes away.

use pairline_crypto::PublicKey;
use pairline_proto::WireRecord;

use crate::error::SessionError;

/// Actions returned by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Encode this record and write it to the transport
    Send(WireRecord),

    /// Peer announced a valid key; the session is ready for messages
    PeerKeyAccepted(PublicKey),

    /// Ciphertext to decrypt with the local private key
    Deliver(Vec<i64>),
}

/// Handshake progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport and no connect in flight
    Idle,
    /// Outbound connect in flight
    Connecting,
    /// Transport installed, peer key not yet received
    Connected,
    /// Peer key received on the current transport
    KeyExchanged,
}

impl SessionState {
    /// A transport is installed.
    #[must_use]
    pub fn has_transport(self) -> bool {
        matches!(self, Self::Connected | Self::KeyExchanged)
    }
}

/// Session state machine for one local endpoint.
///
/// Lives as long as the endpoint; each transport runs the handshake afresh.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    local_key: PublicKey,
    peer_key: Option<PublicKey>,
}

impl Session {
    /// Create a session in [`SessionState::Idle`] announcing `local_key`.
    #[must_use]
    pub fn new(local_key: PublicKey) -> Self {
        Self { state: SessionState::Idle, local_key, peer_key: None }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Key announced on every new transport.
    #[must_use]
    pub fn local_key(&self) -> PublicKey {
        self.local_key
    }

    /// Peer key. `None` unless the state is `KeyExchanged`.
    #[must_use]
    pub fn peer_key(&self) -> Option<PublicKey> {
        self.peer_key
    }

    /// Mark an outbound connect as in flight.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyConnected` unless the state is `Idle`
    pub fn begin_connect(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Idle {
            return Err(SessionError::AlreadyConnected);
        }

        self.state = SessionState::Connecting;
        Ok(())
    }

    /// Outbound connect failed.
    ///
    /// Returns to `Idle` only from `Connecting`. If an inbound transport was
    /// installed while the connect was pending, that transport stays.
    pub fn connect_failed(&mut self) {
        if self.state == SessionState::Connecting {
            self.state = SessionState::Idle;
        }
    }

    /// A transport has been installed.
    ///
    /// Returns the local key announcement, which must be the first record
    /// written to the new transport.
    ///
    /// # Errors
    ///
    /// - `SessionError::AlreadyConnected` if a transport is already installed
    pub fn on_transport_installed(&mut self) -> Result<Vec<SessionAction>, SessionError> {
        if self.state.has_transport() {
            return Err(SessionError::AlreadyConnected);
        }

        self.state = SessionState::Connected;
        self.peer_key = None;

        let PublicKey { e, n } = self.local_key;
        Ok(vec![SessionAction::Send(WireRecord::KeyAnnouncement { e, n })])
    }

    /// The transport is gone. Resets to `Idle` and forgets the peer key.
    pub fn on_transport_lost(&mut self) {
        self.state = SessionState::Idle;
        self.peer_key = None;
    }

    /// Process one line read from the transport.
    ///
    /// Lines with unknown tags yield no actions.
    ///
    /// # Errors
    ///
    /// - `SessionError::Malformed` if a `KEY` or `MSG` line does not decode
    /// - Any error from [`Session::handle_record`]
    pub fn handle_line(&mut self, line: &str) -> Result<Vec<SessionAction>, SessionError> {
        match WireRecord::decode(line)? {
            Some(record) => self.handle_record(record),
            None => {
                tracing::debug!(line, "ignoring unrecognised line");
                Ok(Vec::new())
            },
        }
    }

    /// Process one decoded record.
    ///
    /// A repeated key announcement replaces the stored peer key.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` for a key announcement while no
    ///   transport is installed
    /// - `SessionError::InvalidPeerKey` if `e <= 0` or `n <= 0` (state
    ///   unchanged)
    /// - `SessionError::PrematureMessage` for ciphertext in any state
    ///   before `KeyExchanged`
    pub fn handle_record(&mut self, record: WireRecord) -> Result<Vec<SessionAction>, SessionError> {
        match record {
            WireRecord::KeyAnnouncement { e, n } => self.handle_key(PublicKey::new(e, n)),
            WireRecord::CipherMessage { values } => self.handle_message(values),
        }
    }

    fn handle_key(&mut self, key: PublicKey) -> Result<Vec<SessionAction>, SessionError> {
        if !self.state.has_transport() {
            return Err(SessionError::NotConnected);
        }

        if !key.is_valid() {
            return Err(SessionError::InvalidPeerKey { e: key.e, n: key.n });
        }

        if self.peer_key.is_some_and(|current| current != key) {
            tracing::info!(%key, "peer replaced its key");
        }

        self.peer_key = Some(key);
        self.state = SessionState::KeyExchanged;

        Ok(vec![SessionAction::PeerKeyAccepted(key)])
    }

    fn handle_message(&mut self, values: Vec<i64>) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::KeyExchanged {
            return Err(SessionError::PrematureMessage);
        }

        Ok(vec![SessionAction::Deliver(values)])
    }

    /// Peer key to encrypt outgoing text with.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotReady` unless the state is `KeyExchanged`
    pub fn encryption_key(&self) -> Result<PublicKey, SessionError> {
        match (self.state, self.peer_key) {
            (SessionState::KeyExchanged, Some(key)) => Ok(key),
            (state, _) => Err(SessionError::NotReady { state }),
        }
    }

    /// Wrap ciphertext for sending.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotReady` unless the state is `KeyExchanged`
    pub fn seal(&self, values: Vec<i64>) -> Result<WireRecord, SessionError> {
        self.encryption_key()?;
        Ok(WireRecord::CipherMessage { values })
    }
}
