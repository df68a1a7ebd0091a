//! Pairline chat node binary.
//!
//! # Usage
//!
//! ```bash
//! # Wait for a peer on the default port
//! pairline-node
//!
//! # Connect to a peer at startup, showing ciphertext
//! pairline-node --port 12346 --connect 192.168.1.20:12345 --preview
//!
//! # Run an echo server to chat with yourself
//! pairline-node echo --port 12345
//! ```

use std::{fmt::Display, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use pairline_core::ToyRsaProvider;
use pairline_node::{
    ChatSession, DEFAULT_BIND_HOST, DEFAULT_PORT, EchoServer, NodeConfig, NodeError, SystemEnv,
    commands::{self, Command},
};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout},
    task::JoinSet,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Pairline chat node
#[derive(Parser, Debug)]
#[command(name = "pairline-node")]
#[command(about = "Peer-to-peer chat with a toy RSA key exchange")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    mode: Option<Mode>,

    /// Interface to accept peers on
    #[arg(short, long, default_value = DEFAULT_BIND_HOST)]
    bind: String,

    /// Port to accept peers on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Peer to connect to at startup (host or host:port)
    #[arg(short, long)]
    connect: Option<String>,

    /// Outbound connect timeout in milliseconds
    #[arg(long, default_value = "5000")]
    connect_timeout_ms: u64,

    /// Show the ciphertext of every message
    #[arg(long)]
    preview: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Echo every received byte back to its sender
    Echo {
        /// Port to listen on
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Some(Mode::Echo { port }) = &args.mode {
        let server = EchoServer::bind(&args.bind, *port).await?;
        tracing::info!("Echo server listening on {}", server.local_addr());
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    run_node(args).await
}

async fn run_node(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = NodeConfig::default()
        .with_bind_host(args.bind)
        .with_listen_port(args.port)
        .with_connect_timeout(Duration::from_millis(args.connect_timeout_ms))
        .with_preview(args.preview);

    let provider = Arc::new(ToyRsaProvider::new(SystemEnv::new()));
    let (session, mut events) = ChatSession::new(config.clone(), provider)?;
    let session = Arc::new(session);

    let mut out = tokio::io::stdout();
    write_line(&mut out, format!("Your public key: {}", session.local_public_key())).await?;

    session.manager().start_accepting(config.listen_port).await?;

    let mut attempts = JoinSet::new();
    if let Some(target) = &args.connect {
        let (host, port) = parse_target(target, config.listen_port)?;
        spawn_connect(&mut attempts, &session, host, port);
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = input.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = commands::parse(&line, config.listen_port) else { continue };

                match command {
                    Command::Quit => break,
                    Command::Connect { host, port } => {
                        spawn_connect(&mut attempts, &session, host, port);
                    },
                    Command::Disconnect => {
                        if !session.manager().disconnect() {
                            write_line(&mut out, "Not connected").await?;
                        }
                    },
                    Command::Key => {
                        write_line(&mut out, format!("Your public key: {}", session.local_public_key())).await?;
                        match session.peer_public_key() {
                            Some(key) => write_line(&mut out, format!("Peer public key: {key}")).await?,
                            None => write_line(&mut out, "Peer public key: (not exchanged)").await?,
                        }
                    },
                    Command::Status => {
                        let manager = session.manager();
                        let listening = manager.local_addr().map_or_else(|| "-".to_string(), |addr| addr.to_string());
                        let peer = manager.peer_addr().map_or_else(|| "-".to_string(), |addr| addr.to_string());
                        write_line(
                            &mut out,
                            format!("State: {:?} | listening: {listening} | peer: {peer}", session.state()),
                        )
                        .await?;
                    },
                    Command::Help => write_line(&mut out, commands::HELP).await?,
                    Command::Send(text) => {
                        if let Err(err) = session.send_text(&text) {
                            write_line(&mut out, format!("Error: {err}")).await?;
                        }
                    },
                    Command::Unknown { input: typed } => {
                        write_line(&mut out, format!("Unknown command {typed} (try /help)")).await?;
                    },
                    Command::InvalidArgs { command, error } => {
                        write_line(&mut out, format!("/{command}: {error}")).await?;
                    },
                }
            },
            Some(event) = events.recv() => write_line(&mut out, &event).await?,
            Some(joined) = attempts.join_next(), if !attempts.is_empty() => match joined {
                // Connect failures are already reported as events
                Ok(Ok(_) | Err(NodeError::Connect(_))) => {},
                Ok(Err(err)) => write_line(&mut out, format!("Error: {err}")).await?,
                Err(err) => tracing::warn!(error = %err, "connect task failed"),
            },
        }
    }

    session.manager().stop_accepting();
    session.manager().disconnect();

    Ok(())
}

fn spawn_connect(
    attempts: &mut JoinSet<Result<std::net::SocketAddr, NodeError>>,
    session: &Arc<ChatSession>,
    host: String,
    port: u16,
) {
    let session = Arc::clone(session);
    attempts.spawn(async move { session.manager().connect(&host, port).await });
}

/// Split `host[:port]`, falling back to `default_port`.
fn parse_target(target: &str, default_port: u16) -> Result<(String, u16), String> {
    match target.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|err| format!("invalid port in {target:?}: {err}"))?;
            Ok((host.to_string(), port))
        },
        None => Ok((target.to_string(), default_port)),
    }
}

async fn write_line(out: &mut Stdout, line: impl Display) -> std::io::Result<()> {
    out.write_all(format!("{line}\n").as_bytes()).await?;
    out.flush().await
}
