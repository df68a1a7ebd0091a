//! Echo server for local testing.
//!
//! Writes back every byte it receives. A chat node connected to it receives
//! its own key announcement, completes the handshake with itself, and sees
//! every message it sends come back as incoming.

use std::{net::SocketAddr, time::Duration};

use tokio::{
    io,
    net::{TcpListener, TcpStream},
    task::AbortHandle,
};

use crate::error::NodeError;

/// Running echo server. Dropping it stops the accept loop.
#[derive(Debug)]
pub struct EchoServer {
    local_addr: SocketAddr,
    acceptor: AbortHandle,
}

impl EchoServer {
    /// Bind `(host, port)` and start echoing.
    ///
    /// # Errors
    ///
    /// - `NodeError::Bind` if the socket cannot be bound
    pub async fn bind(host: &str, port: u16) -> Result<Self, NodeError> {
        let bind_error = |source| NodeError::Bind { addr: format!("{host}:{port}"), source };

        let listener = TcpListener::bind((host, port)).await.map_err(bind_error)?;
        let local_addr = listener.local_addr().map_err(bind_error)?;

        tracing::info!(%local_addr, "echo server listening");

        let acceptor = tokio::spawn(accept_loop(listener)).abort_handle();
        Ok(Self { local_addr, acceptor })
    }

    /// Bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting. Connections already accepted keep echoing until the
    /// client closes them.
    pub fn stop(&self) {
        self.acceptor.abort();
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn accept_loop(listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                tracing::info!(%peer, "echo client connected");
                tokio::spawn(echo(stream, peer));
            },
            Err(err) => {
                tracing::warn!(error = %err, "echo accept failed");
                tokio::time::sleep(Duration::from_millis(100)).await;
            },
        }
    }
}

async fn echo(mut stream: TcpStream, peer: SocketAddr) {
    let (mut reader, mut writer) = stream.split();

    match io::copy(&mut reader, &mut writer).await {
        Ok(bytes) => tracing::info!(%peer, bytes, "echo client disconnected"),
        Err(err) => tracing::debug!(%peer, error = %err, "echo connection ended"),
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
        time::timeout,
    };

    use super::*;

    #[tokio::test]
    async fn echoes_lines_back() {
        let server = EchoServer::bind("127.0.0.1", 0).await.unwrap();
        let stream = TcpStream::connect(server.local_addr()).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half.write_all(b"KEY:17:221\nMSG:1,2\n").await.unwrap();

        let first = timeout(Duration::from_secs(2), lines.next_line()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(2), lines.next_line()).await.unwrap().unwrap();
        assert_eq!(first.as_deref(), Some("KEY:17:221"));
        assert_eq!(second.as_deref(), Some("MSG:1,2"));
    }
}
