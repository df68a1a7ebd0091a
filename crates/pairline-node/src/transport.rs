//! Newline-delimited TCP transport.
//!
//! Provides [`LineTransport`], which owns one TCP stream and two tasks: a
//! reader that hands each received line to a [`LineHandler`], and a writer
//! that drains a FIFO channel of outbound lines. Protocol logic stays in the
//! Sans-IO session; this layer only moves lines.

use std::{io, net::SocketAddr, sync::Arc};

use pairline_proto::WireRecord;
use thiserror::Error;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::mpsc,
    task::AbortHandle,
};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Line would break framing.
    #[error("line contains a newline or carriage return")]
    EmbeddedNewline,

    /// Writer task has stopped.
    #[error("transport closed")]
    Closed,

    /// Socket setup failed.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Receives lines and closure notices from a transport's tasks.
///
/// Every call carries the generation of the transport that produced it, so
/// the handler can ignore callbacks from a transport it has already replaced.
pub trait LineHandler: Send + Sync + 'static {
    /// One line was read, without its terminator.
    fn on_line(&self, generation: u64, line: &str);

    /// The stream ended or failed. Both tasks may report the same
    /// transport, so repeats must be tolerated.
    fn on_closed(&self, generation: u64, reason: String);
}

/// Handle to an active line transport.
///
/// Dropping the handle (or calling [`LineTransport::close`]) aborts both
/// tasks, which drops both socket halves and unblocks any pending read.
#[derive(Debug)]
pub struct LineTransport {
    generation: u64,
    peer_addr: SocketAddr,
    outbound: mpsc::UnboundedSender<String>,
    reader: AbortHandle,
    writer: AbortHandle,
}

impl LineTransport {
    /// Take ownership of `stream` and start its reader and writer tasks.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - `TransportError::Io` if the peer address cannot be read
    pub fn spawn(
        stream: TcpStream,
        generation: u64,
        handler: Arc<dyn LineHandler>,
    ) -> Result<Self, TransportError> {
        let peer_addr = stream.peer_addr()?;
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(%peer_addr, error = %err, "failed to set TCP_NODELAY");
        }

        let (read_half, write_half) = stream.into_split();
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_loop(read_half, generation, Arc::clone(&handler)));
        let writer = tokio::spawn(write_loop(write_half, outbound_rx, generation, handler));

        tracing::debug!(%peer_addr, generation, "transport started");

        Ok(Self {
            generation,
            peer_addr,
            outbound,
            reader: reader.abort_handle(),
            writer: writer.abort_handle(),
        })
    }

    /// Generation assigned at install time.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Enqueue one line. The terminator is appended by the writer.
    ///
    /// Never blocks; lines are written in the order they are enqueued.
    ///
    /// # Errors
    ///
    /// - `TransportError::EmbeddedNewline` if `line` contains `\n` or `\r`
    /// - `TransportError::Closed` if the writer task has stopped
    pub fn send_line(&self, line: &str) -> Result<(), TransportError> {
        if line.contains(['\n', '\r']) {
            return Err(TransportError::EmbeddedNewline);
        }

        self.outbound.send(line.to_owned()).map_err(|_| TransportError::Closed)
    }

    /// Encode and enqueue a record.
    ///
    /// # Errors
    ///
    /// See [`LineTransport::send_line`].
    pub fn send_record(&self, record: &WireRecord) -> Result<(), TransportError> {
        self.send_line(&record.encode())
    }

    /// Stop both tasks. Idempotent.
    pub fn close(&self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl Drop for LineTransport {
    fn drop(&mut self) {
        self.close();
    }
}

async fn read_loop(read_half: OwnedReadHalf, generation: u64, handler: Arc<dyn LineHandler>) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                tracing::debug!(generation, %line, "received line");
                handler.on_line(generation, &line);
            },
            Ok(None) => {
                handler.on_closed(generation, "peer closed the connection".to_string());
                break;
            },
            Err(err) => {
                handler.on_closed(generation, err.to_string());
                break;
            },
        }
    }
}

async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<String>,
    generation: u64,
    handler: Arc<dyn LineHandler>,
) {
    while let Some(mut line) = outbound.recv().await {
        tracing::debug!(generation, %line, "sending line");
        line.push('\n');

        if let Err(err) = write_half.write_all(line.as_bytes()).await {
            handler.on_closed(generation, format!("write failed: {err}"));
            return;
        }
    }
}
