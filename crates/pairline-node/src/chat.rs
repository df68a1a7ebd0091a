//! Chat session facade.
//!
//! [`ChatSession`] ties together the local keypair, the key provider, the
//! connection manager, and the handshake state machine. Callers send text and
//! query state through it; everything that happens in the background arrives
//! on the [`ChatEvent`] receiver returned by [`ChatSession::new`].

use std::sync::Arc;

use pairline_core::{KeyProvider, SessionState};
use pairline_crypto::PublicKey;
use tokio::sync::mpsc;

use crate::{
    config::NodeConfig,
    error::NodeError,
    event::{ChatEvent, Direction},
    manager::ConnectionManager,
    shared::Shared,
};

/// One chat endpoint.
///
/// Dropping the session stops the acceptor and closes the active transport.
pub struct ChatSession {
    shared: Arc<Shared>,
    manager: ConnectionManager,
}

impl ChatSession {
    /// Generate the local keypair and create an idle session.
    ///
    /// No sockets are opened until [`ConnectionManager::start_accepting`] or
    /// [`ConnectionManager::connect`] is called.
    ///
    /// # Errors
    ///
    /// - `NodeError::KeyGeneration` if the provider cannot produce a keypair
    pub fn new(
        config: NodeConfig,
        provider: Arc<dyn KeyProvider>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChatEvent>), NodeError> {
        let keys = provider.generate_key_pair().map_err(NodeError::KeyGeneration)?;
        tracing::info!(public_key = %keys.public(), "local key pair ready");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared::new(config, provider, keys, events_tx));
        let manager = ConnectionManager::new(Arc::clone(&shared));

        Ok((Self { shared, manager }, events_rx))
    }

    /// Encrypt `text` under the peer's key and send it.
    ///
    /// Surrounding whitespace is trimmed. Reports `Outgoing` (and a
    /// `CipherPreview` when preview is enabled) once the line is queued.
    ///
    /// # Errors
    ///
    /// - `NodeError::EmptyMessage` if `text` is blank
    /// - `NodeError::NotReady` before the key exchange completes (no I/O)
    /// - `NodeError::EncryptionFailed` if the provider fails or returns a
    ///   ciphertext whose length differs from the text's byte length
    /// - `NodeError::Transport` if the line cannot be queued
    pub fn send_text(&self, text: &str) -> Result<(), NodeError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(NodeError::EmptyMessage);
        }

        let slot = self.shared.lock();
        let peer_key = slot.session.encryption_key()?;

        let cipher = self
            .shared
            .provider
            .encrypt(text, &peer_key)
            .map_err(|err| NodeError::EncryptionFailed(err.to_string()))?;

        if cipher.is_empty() || cipher.len() != text.len() {
            return Err(NodeError::EncryptionFailed(format!(
                "expected {} values, provider returned {}",
                text.len(),
                cipher.len()
            )));
        }

        let Some(transport) = slot.transport() else {
            return Err(NodeError::NotReady(slot.session.state()));
        };

        let preview = self.shared.config.preview.then(|| cipher.clone());
        let record = slot.session.seal(cipher)?;
        transport.send_record(&record)?;

        // Still under the slot: the local echo precedes any reply
        if let Some(values) = preview {
            self.shared.emit(ChatEvent::CipherPreview { direction: Direction::Outgoing, values });
        }
        self.shared.emit(ChatEvent::Outgoing { text: text.to_string() });
        drop(slot);

        tracing::debug!(bytes = text.len(), "message sent");
        Ok(())
    }

    /// Process one line as if it had been read from the active transport.
    pub fn on_line_received(&self, line: &str) {
        self.shared.dispatch_line(None, line);
    }

    /// Current handshake state.
    pub fn state(&self) -> SessionState {
        self.shared.lock().session.state()
    }

    /// Local public key, announced on every new transport.
    pub fn local_public_key(&self) -> PublicKey {
        self.shared.keys.public()
    }

    /// Peer key, once exchanged on the current transport.
    pub fn peer_public_key(&self) -> Option<PublicKey> {
        self.shared.lock().session.peer_key()
    }

    /// Connection manager for accepting, connecting, and disconnecting.
    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }
}
