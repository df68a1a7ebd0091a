//! Node configuration.

use std::time::Duration;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 12345;

/// Default interface to accept on.
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Time allowed for an outbound TCP connect.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Chat node configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Interface the acceptor binds to
    pub bind_host: String,
    /// Port the acceptor binds to (0 picks an ephemeral port)
    pub listen_port: u16,
    /// Upper bound on an outbound connect
    pub connect_timeout: Duration,
    /// Report every ciphertext sent and received
    pub preview: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_host: DEFAULT_BIND_HOST.to_string(),
            listen_port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            preview: false,
        }
    }
}

impl NodeConfig {
    /// Set the bind interface.
    #[must_use]
    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    /// Set the listening port.
    #[must_use]
    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.listen_port = port;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enable or disable ciphertext preview.
    #[must_use]
    pub fn with_preview(mut self, preview: bool) -> Self {
        self.preview = preview;
        self
    }
}
