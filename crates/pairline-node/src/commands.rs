//! Operator input parsing.
//!
//! Lines starting with `/` are commands; anything else is a chat message.
//! Parsing is pure so the binary's input loop stays a thin dispatcher.

/// Usage shown by `/help`.
pub const HELP: &str = "\
Commands:
  /connect <host> [port]  connect to a peer (port defaults to the listen port)
  /disconnect             close the current connection
  /key                    show local and peer public keys
  /status                 show connection state
  /help                   show this help
  /quit                   exit
Anything else is encrypted and sent to the peer.";

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Connect to a peer.
    Connect {
        /// Target host
        host: String,
        /// Target port
        port: u16,
    },
    /// Close the active connection.
    Disconnect,
    /// Show public keys.
    Key,
    /// Show connection state.
    Status,
    /// Show usage.
    Help,
    /// Exit.
    Quit,
    /// Chat message (untrimmed).
    Send(String),
    /// Unrecognised command.
    Unknown {
        /// Command as typed
        input: String,
    },
    /// Known command with bad arguments.
    InvalidArgs {
        /// Command name
        command: &'static str,
        /// What was wrong
        error: String,
    },
}

/// Parse one input line. Returns `None` for blank input.
///
/// `default_port` is used by `/connect` when no port is given.
pub fn parse(input: &str, default_port: u16) -> Option<Command> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let Some(command) = trimmed.strip_prefix('/') else {
        return Some(Command::Send(input.to_string()));
    };

    let parts: Vec<&str> = command.split_whitespace().collect();
    let name = parts.first().copied().unwrap_or("");

    let parsed = match name {
        "connect" | "c" => parse_connect(&parts[1..], default_port),
        "disconnect" | "d" => Command::Disconnect,
        "key" | "keys" => Command::Key,
        "status" | "s" => Command::Status,
        "help" | "h" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        _ => Command::Unknown { input: trimmed.to_string() },
    };

    Some(parsed)
}

fn parse_connect(args: &[&str], default_port: u16) -> Command {
    match args {
        [host] => Command::Connect { host: (*host).to_string(), port: default_port },
        [host, port] => match port.parse::<u16>() {
            Ok(port) if port > 0 => Command::Connect { host: (*host).to_string(), port },
            _ => Command::InvalidArgs {
                command: "connect",
                error: format!("invalid port {port:?}"),
            },
        },
        _ => Command::InvalidArgs {
            command: "connect",
            error: "usage: /connect <host> [port]".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_ignored() {
        assert_eq!(parse("", 12345), None);
        assert_eq!(parse("   \t", 12345), None);
    }

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse("hello there", 12345), Some(Command::Send("hello there".into())));
    }

    #[test]
    fn connect_with_port() {
        assert_eq!(
            parse("/connect 10.0.0.2 4000", 12345),
            Some(Command::Connect { host: "10.0.0.2".into(), port: 4000 })
        );
    }

    #[test]
    fn connect_uses_default_port() {
        assert_eq!(
            parse("/connect localhost", 12345),
            Some(Command::Connect { host: "localhost".into(), port: 12345 })
        );
    }

    #[test]
    fn connect_rejects_bad_port() {
        for input in ["/connect host 0", "/connect host 70000", "/connect host abc"] {
            assert!(
                matches!(parse(input, 12345), Some(Command::InvalidArgs { command: "connect", .. })),
                "{input:?}"
            );
        }
    }

    #[test]
    fn connect_requires_host() {
        assert!(matches!(parse("/connect", 12345), Some(Command::InvalidArgs { .. })));
        assert!(matches!(parse("/connect a 1 2", 12345), Some(Command::InvalidArgs { .. })));
    }

    #[test]
    fn simple_commands() {
        assert_eq!(parse("/disconnect", 1), Some(Command::Disconnect));
        assert_eq!(parse("/key", 1), Some(Command::Key));
        assert_eq!(parse("/status", 1), Some(Command::Status));
        assert_eq!(parse("/help", 1), Some(Command::Help));
        assert_eq!(parse("/quit", 1), Some(Command::Quit));
        assert_eq!(parse("  /q  ", 1), Some(Command::Quit));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(parse("/frobnicate now", 1), Some(Command::Unknown { input: "/frobnicate now".into() }));
        assert_eq!(parse("/", 1), Some(Command::Unknown { input: "/".into() }));
    }
}
