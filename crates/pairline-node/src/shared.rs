//! Connection slot shared by the acceptor, connector, and transport tasks.
//!
//! All mutable connection state (session, active transport, generation
//! counter) sits behind one synchronous mutex. The guard is never held across
//! an `.await`: every wait (accept, connect, read, write) happens outside it,
//! and enqueueing an outbound line never blocks.
//!
//! # Simultaneous connects
//!
//! When both endpoints dial each other at once, each sees two streams: the
//! one it opened and the one the peer opened. First-installed-wins alone
//! would let each side keep a different stream and close the other's, leaving
//! both idle. Instead, while a race is possible, the second stream is held as
//! a *contender* and both streams announce the local key. Once the
//! contender's key arrives, both sides apply the same rule: keep the stream
//! opened by the endpoint with the smaller public key, and close the other
//! without reporting it as lost.

use std::{
    cmp::Ordering,
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use pairline_core::{KeyProvider, Session, SessionAction, SessionError, SessionState};
use pairline_crypto::{KeyPair, PublicKey};
use pairline_proto::WireRecord;
use tokio::{net::TcpStream, sync::mpsc, time::Instant};

use crate::{
    config::NodeConfig,
    error::NodeError,
    event::{ChatEvent, Direction},
    transport::{LineHandler, LineTransport},
};

/// Which endpoint opened a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// Our outbound connect
    Local,
    /// Accepted from the peer
    Remote,
}

/// Installed stream and what the tie-break needs to know about it.
pub(crate) struct Link {
    pub(crate) transport: LineTransport,
    origin: Origin,
    installed_at: Instant,
    /// Accepted while our own connect was in flight
    raced_dial: bool,
}

/// State guarded by [`Shared::lock`].
pub(crate) struct Slot {
    pub(crate) session: Session,
    active: Option<Link>,
    contender: Option<Link>,
    next_generation: u64,
}

impl Slot {
    /// Active transport, if any.
    pub(crate) fn transport(&self) -> Option<&LineTransport> {
        self.active.as_ref().map(|link| &link.transport)
    }

    /// Open peer streams: the active transport plus an undecided contender.
    pub(crate) fn stream_count(&self) -> usize {
        usize::from(self.active.is_some()) + usize::from(self.contender.is_some())
    }

    fn active_generation(&self) -> Option<u64> {
        self.active.as_ref().map(|link| link.transport.generation())
    }

    fn contender_generation(&self) -> Option<u64> {
        self.contender.as_ref().map(|link| link.transport.generation())
    }

    /// A new stream of `origin` may be the other half of a simultaneous
    /// connect rather than a second peer.
    fn may_contend(&self, origin: Origin, window: Duration) -> bool {
        if self.contender.is_some() {
            return false;
        }
        let Some(active) = &self.active else {
            return false;
        };

        match origin {
            // Peer's stream was installed while our connect was in flight
            Origin::Local => active.origin == Origin::Remote && active.raced_dial,
            // Peer's connect may land shortly after ours
            Origin::Remote => {
                active.origin == Origin::Local && active.installed_at.elapsed() < window
            },
        }
    }

    /// Make `link` the active transport, closing the previous one silently.
    /// The local key already went out when `link` was opened.
    fn promote(&mut self, link: Link) {
        if let Some(previous) = self.active.replace(link) {
            previous.transport.close();
        }

        self.session.on_transport_lost();
        if let Err(err) = self.session.on_transport_installed() {
            tracing::warn!(error = %err, "session refused promoted stream");
        }
    }
}

pub(crate) struct Shared {
    slot: Mutex<Slot>,
    pub(crate) provider: Arc<dyn KeyProvider>,
    pub(crate) keys: KeyPair,
    pub(crate) config: NodeConfig,
    events: mpsc::UnboundedSender<ChatEvent>,
}

impl Shared {
    pub(crate) fn new(
        config: NodeConfig,
        provider: Arc<dyn KeyProvider>,
        keys: KeyPair,
        events: mpsc::UnboundedSender<ChatEvent>,
    ) -> Self {
        let slot = Slot {
            session: Session::new(keys.public()),
            active: None,
            contender: None,
            next_generation: 1,
        };

        Self { slot: Mutex::new(slot), provider, keys, config, events }
    }

    /// Lock the slot, recovering from poisoning.
    ///
    /// Every critical section leaves the slot consistent before anything that
    /// could panic, so a poisoned guard is still usable.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn emit(&self, event: ChatEvent) {
        tracing::trace!(%event, "event");
        // Receiver gone means nobody is listening; the session carries on
        let _ = self.events.send(event);
    }

    /// Install `stream` as the active transport.
    ///
    /// Check-empty and install happen in one critical section, so of two
    /// racing installs exactly one becomes active. The local key announcement
    /// is enqueued before the slot is released, making it the first line the
    /// peer receives. During a simultaneous connect the second stream is held
    /// as a contender until keys decide between the two.
    ///
    /// # Errors
    ///
    /// - `NodeError::AlreadyConnected` if a transport is already installed;
    ///   `stream` is closed
    /// - `NodeError::Transport` if the stream cannot be set up
    pub(crate) fn install(
        self: &Arc<Self>,
        stream: TcpStream,
        origin: Origin,
    ) -> Result<SocketAddr, NodeError> {
        let mut slot = self.lock();

        if slot.active.is_some() {
            if !slot.may_contend(origin, self.config.connect_timeout) {
                return Err(NodeError::AlreadyConnected);
            }

            let link = self.open_link(&mut slot, stream, origin, false)?;
            let PublicKey { e, n } = slot.session.local_key();
            link.transport.send_record(&WireRecord::KeyAnnouncement { e, n })?;

            let peer = link.transport.peer_addr();
            tracing::info!(%peer, ?origin, "simultaneous connect; holding stream until keys decide");
            slot.contender = Some(link);

            return Ok(peer);
        }

        let raced_dial = origin == Origin::Remote && slot.session.state() == SessionState::Connecting;
        let link = self.open_link(&mut slot, stream, origin, raced_dial)?;
        let actions = slot.session.on_transport_installed()?;

        for action in actions {
            if let SessionAction::Send(record) = action
                && let Err(err) = link.transport.send_record(&record)
            {
                slot.session.on_transport_lost();
                return Err(err.into());
            }
        }

        let peer = link.transport.peer_addr();
        tracing::info!(%peer, ?origin, generation = link.transport.generation(), "transport installed");
        slot.active = Some(link);

        // Under the slot: reported before anything read from the new stream
        self.emit(ChatEvent::Connected { peer });

        Ok(peer)
    }

    fn open_link(
        self: &Arc<Self>,
        slot: &mut Slot,
        stream: TcpStream,
        origin: Origin,
        raced_dial: bool,
    ) -> Result<Link, NodeError> {
        let generation = slot.next_generation;
        let handler: Arc<dyn LineHandler> = Arc::clone(self) as Arc<dyn LineHandler>;
        let transport = LineTransport::spawn(stream, generation, handler)?;
        slot.next_generation += 1;

        Ok(Link { transport, origin, installed_at: Instant::now(), raced_dial })
    }

    /// Feed one line into the session.
    ///
    /// `generation` is `Some` when the line comes from a transport task, and
    /// lines from a transport that is no longer installed are dropped.
    /// Decryption runs after the slot is released.
    pub(crate) fn dispatch_line(&self, generation: Option<u64>, line: &str) {
        let mut slot = self.lock();

        if generation.is_some() && generation == slot.contender_generation() {
            self.contender_line(&mut slot, line);
            return;
        }

        if generation.is_some_and(|generation| slot.active_generation() != Some(generation)) {
            tracing::debug!(?generation, "dropping line from stale transport");
            return;
        }

        let mut deliveries = Vec::new();

        match slot.session.handle_line(line) {
            Ok(actions) => {
                for action in actions {
                    match action {
                        SessionAction::PeerKeyAccepted(peer_key) => {
                            tracing::info!(%peer_key, "key exchange complete");
                            self.emit(ChatEvent::KeyExchanged { peer_key });
                        },
                        SessionAction::Deliver(values) => deliveries.push(values),
                        SessionAction::Send(record) => {
                            let sent = slot.transport().map(|t| t.send_record(&record));
                            if let Some(Err(err)) = sent {
                                tracing::warn!(error = %err, "failed to enqueue record");
                            }
                        },
                    }
                }
            },
            Err(err) => self.report_session_error(err),
        }

        drop(slot);

        for values in deliveries {
            self.deliver(values);
        }
    }

    /// Line from the contender. Only its key announcement matters: it names
    /// the peer and settles which stream survives.
    fn contender_line(&self, slot: &mut Slot, line: &str) {
        let key = match WireRecord::decode(line) {
            Ok(Some(WireRecord::KeyAnnouncement { e, n })) => PublicKey::new(e, n),
            Ok(_) | Err(_) => {
                tracing::debug!(line, "ignoring line on undecided stream");
                return;
            },
        };

        let Some(contender) = slot.contender.take() else {
            return;
        };
        let peer = contender.transport.peer_addr();

        if !key.is_valid() {
            tracing::warn!(%peer, %key, "closing undecided stream: invalid key");
            return;
        }

        if slot.session.peer_key().is_some_and(|current| current != key) {
            tracing::warn!(%peer, %key, "closing undecided stream: different peer");
            self.emit(ChatEvent::Rejected { peer });
            return;
        }

        let keep_contender = match slot.session.local_key().cmp(&key) {
            Ordering::Less => contender.origin == Origin::Local,
            Ordering::Greater => contender.origin == Origin::Remote,
            Ordering::Equal => false,
        };

        if !keep_contender {
            tracing::info!(%peer, "simultaneous connect settled; keeping current stream");
            return;
        }

        tracing::info!(%peer, "simultaneous connect settled; switching streams");
        let had_key = slot.session.peer_key() == Some(key);
        slot.promote(contender);

        match slot.session.handle_record(WireRecord::KeyAnnouncement { e: key.e, n: key.n }) {
            Ok(_) if had_key => {},
            Ok(_) => self.emit(ChatEvent::KeyExchanged { peer_key: key }),
            Err(err) => self.report_session_error(err),
        }
    }

    fn report_session_error(&self, err: SessionError) {
        match err {
            SessionError::InvalidPeerKey { e, n } => {
                tracing::warn!(e, n, "peer sent an invalid key");
                self.emit(ChatEvent::InvalidPeerKey { e, n });
            },
            SessionError::PrematureMessage => {
                tracing::warn!("message received before key exchange");
                self.emit(ChatEvent::PrematureMessage);
            },
            SessionError::NotConnected => {
                tracing::warn!("key announcement received while not connected");
                self.emit(ChatEvent::NotConnected);
            },
            SessionError::Malformed(codec) => {
                tracing::warn!(error = %codec, "malformed record");
                self.emit(ChatEvent::MalformedRecord { reason: codec.to_string() });
            },
            other => tracing::warn!(error = %other, "line rejected"),
        }
    }

    fn deliver(&self, values: Vec<i64>) {
        let result = self.provider.decrypt(&values, self.keys.private());

        if self.config.preview {
            self.emit(ChatEvent::CipherPreview { direction: Direction::Incoming, values });
        }

        match result {
            Ok(text) => self.emit(ChatEvent::Incoming { text }),
            Err(err) => {
                tracing::warn!(error = %err, "decryption failed");
                self.emit(ChatEvent::DecryptionFailed { reason: err.to_string() });
            },
        }
    }

    /// Tear down the transport of `generation` after a read or write failure.
    ///
    /// If a contender is pending, the peer settled on it: it takes over
    /// without a `ConnectionLost`.
    pub(crate) fn transport_lost(&self, generation: u64, reason: String) {
        let mut slot = self.lock();

        if slot.contender_generation() == Some(generation) {
            slot.contender = None;
            tracing::debug!(generation, %reason, "undecided stream closed");
            return;
        }

        if slot.active_generation() != Some(generation) {
            tracing::debug!(generation, %reason, "stale transport closed");
            return;
        }

        if let Some(contender) = slot.contender.take() {
            tracing::info!(%reason, "peer kept the other stream; switching");
            slot.promote(contender);
            return;
        }

        let Some(lost) = slot.active.take() else {
            return;
        };
        slot.session.on_transport_lost();
        lost.transport.close();

        tracing::info!(peer = %lost.transport.peer_addr(), %reason, "connection lost");
        self.emit(ChatEvent::ConnectionLost { reason });
    }

    /// Tear down the active transport. Returns whether one was installed.
    pub(crate) fn disconnect(&self) -> bool {
        let mut slot = self.lock();

        let Some(link) = slot.active.take() else {
            return false;
        };
        if let Some(contender) = slot.contender.take() {
            contender.transport.close();
        }
        slot.session.on_transport_lost();
        link.transport.close();

        tracing::info!(peer = %link.transport.peer_addr(), "disconnected");
        self.emit(ChatEvent::Disconnected);

        true
    }
}

impl LineHandler for Shared {
    fn on_line(&self, generation: u64, line: &str) {
        self.dispatch_line(Some(generation), line);
    }

    fn on_closed(&self, generation: u64, reason: String) {
        self.transport_lost(generation, reason);
    }
}
