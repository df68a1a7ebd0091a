//! Connection manager.
//!
//! Owns the acceptor task and the outbound connect path, and arbitrates
//! between them so that at most one transport is ever installed. The first
//! connection to be installed wins, and later inbound connections are closed
//! immediately. The exception is two peers dialing each other at once: the
//! crossing streams are settled by key order so both sides keep the same one
//! (see the `shared` module).

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use tokio::{
    net::{TcpListener, TcpStream},
    task::AbortHandle,
};

use crate::{
    error::NodeError,
    event::ChatEvent,
    shared::{Origin, Shared},
    transport::LineTransport,
};

/// Delay before retrying after a failed `accept`.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

struct Acceptor {
    handle: AbortHandle,
    local_addr: SocketAddr,
}

/// Establishes and tears down the single peer connection.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    acceptor: Mutex<Option<Acceptor>>,
}

impl ConnectionManager {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared, acceptor: Mutex::new(None) }
    }

    /// Bind `(bind_host, port)` and start accepting peers.
    ///
    /// Port 0 binds an ephemeral port; the bound address is returned. A
    /// previously running acceptor is replaced.
    ///
    /// # Errors
    ///
    /// - `NodeError::Bind` if the socket cannot be bound
    pub async fn start_accepting(&self, port: u16) -> Result<SocketAddr, NodeError> {
        let host = self.shared.config.bind_host.as_str();
        let bind_error = |source| NodeError::Bind { addr: format!("{host}:{port}"), source };

        let listener = TcpListener::bind((host, port)).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        let handle = tokio::spawn(accept_loop(listener, Arc::clone(&self.shared))).abort_handle();

        let previous = self
            .acceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Acceptor { handle, local_addr });
        if let Some(previous) = previous {
            tracing::debug!(addr = %previous.local_addr, "replacing acceptor");
            previous.handle.abort();
        }

        tracing::info!(%local_addr, "listening");
        self.shared.emit(ChatEvent::Listening { addr: local_addr });

        Ok(local_addr)
    }

    /// Stop the acceptor and release the listening socket. Idempotent.
    pub fn stop_accepting(&self) {
        let acceptor = self.acceptor.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(acceptor) = acceptor {
            tracing::info!(addr = %acceptor.local_addr, "acceptor stopped");
            acceptor.handle.abort();
        }
    }

    /// Connect to a peer and install the stream as the active transport.
    ///
    /// Bounded by the configured connect timeout. On failure the session
    /// returns to `Idle` and a `ConnectFailed` event is reported.
    ///
    /// If the peer dialed us at the same moment, the returned stream may be
    /// closed again once keys settle which of the two crossing streams
    /// survives; the session stays connected over the other one.
    ///
    /// # Errors
    ///
    /// - `NodeError::InvalidAddress` if `host` is empty or `port` is 0
    /// - `NodeError::AlreadyConnected` if a transport is active or a connect
    ///   is already in flight
    /// - `NodeError::Connect` if the connect is refused, times out, or the
    ///   host does not resolve
    pub async fn connect(&self, host: &str, port: u16) -> Result<SocketAddr, NodeError> {
        let host = host.trim();
        if host.is_empty() || port == 0 {
            return Err(NodeError::InvalidAddress { host: host.to_string(), port });
        }

        self.shared.lock().session.begin_connect()?;
        let attempt = ConnectAttempt { shared: &self.shared, armed: true };

        tracing::info!(host, port, "connecting");
        self.shared.emit(ChatEvent::Connecting { host: host.to_string(), port });

        let timeout = self.shared.config.connect_timeout;
        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(attempt.fail(err.to_string())),
            Err(_) => return Err(attempt.fail(format!("timed out after {timeout:?}"))),
        };

        attempt.disarm();

        match self.shared.install(stream, Origin::Local) {
            Ok(peer) => Ok(peer),
            Err(err) => {
                self.shared.lock().session.connect_failed();
                if matches!(err, NodeError::AlreadyConnected) {
                    tracing::info!(host, port, "already connected; dropping outbound stream");
                }
                Err(err)
            },
        }
    }

    /// Close the active transport and reset the session. Idempotent.
    ///
    /// Returns whether a transport was closed.
    pub fn disconnect(&self) -> bool {
        self.shared.disconnect()
    }

    /// A transport is installed.
    pub fn is_connected(&self) -> bool {
        self.shared.lock().transport().is_some()
    }

    /// Open peer streams. Normally 0 or 1; briefly 2 while a simultaneous
    /// connect is being settled.
    pub fn open_streams(&self) -> usize {
        self.shared.lock().stream_count()
    }

    /// Remote address of the active transport.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.lock().transport().map(LineTransport::peer_addr)
    }

    /// Address the acceptor is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.acceptor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|acceptor| acceptor.local_addr)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.stop_accepting();
        self.shared.disconnect();
    }
}

/// Returns the session to `Idle` if a connect is abandoned, including when
/// the connecting future is dropped mid-flight.
struct ConnectAttempt<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl ConnectAttempt<'_> {
    fn fail(mut self, reason: String) -> NodeError {
        self.armed = false;
        self.shared.lock().session.connect_failed();

        tracing::warn!(%reason, "connect failed");
        self.shared.emit(ChatEvent::ConnectFailed { reason: reason.clone() });

        NodeError::Connect(reason)
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectAttempt<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().session.connect_failed();
        }
    }
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            },
        };

        tracing::info!(%peer, "incoming connection");
        shared.emit(ChatEvent::IncomingConnection { peer });

        match shared.install(stream, Origin::Remote) {
            Ok(_) => {},
            Err(NodeError::AlreadyConnected) => {
                tracing::warn!(%peer, "rejected: already connected");
                shared.emit(ChatEvent::Rejected { peer });
            },
            Err(err) => tracing::warn!(%peer, error = %err, "failed to install inbound connection"),
        }
    }
}
