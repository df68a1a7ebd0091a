//! Chatting with yourself through the echo server.
//!
//! The echo server reflects the node's own key announcement, so the node ends
//! up exchanging keys with itself and receiving its own messages.

use std::{sync::Arc, time::Duration};

use pairline_core::{SessionState, ToyRsaProvider};
use pairline_node::{ChatEvent, ChatSession, EchoServer, NodeConfig, SystemEnv};
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

async fn start_echo() -> EchoServer {
    EchoServer::bind("127.0.0.1", 0).await.expect("failed to bind echo server")
}

fn start_node() -> (ChatSession, UnboundedReceiver<ChatEvent>) {
    let config = NodeConfig::default().with_bind_host("127.0.0.1").with_listen_port(0);
    ChatSession::new(config, Arc::new(ToyRsaProvider::new(SystemEnv::new())))
        .expect("key generation failed")
}

async fn wait_for(
    events: &mut UnboundedReceiver<ChatEvent>,
    pred: impl Fn(&ChatEvent) -> bool,
) -> ChatEvent {
    timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

#[tokio::test]
async fn node_exchanges_keys_with_itself() {
    let echo = start_echo().await;
    let (node, mut events) = start_node();

    node.manager().connect("127.0.0.1", echo.local_addr().port()).await.unwrap();

    let event = wait_for(&mut events, |e| matches!(e, ChatEvent::KeyExchanged { .. })).await;
    assert_eq!(event, ChatEvent::KeyExchanged { peer_key: node.local_public_key() });
    assert_eq!(node.state(), SessionState::KeyExchanged);
}

#[tokio::test]
async fn own_messages_come_back_in_order() {
    let echo = start_echo().await;
    let (node, mut events) = start_node();

    node.manager().connect("127.0.0.1", echo.local_addr().port()).await.unwrap();
    wait_for(&mut events, |e| matches!(e, ChatEvent::KeyExchanged { .. })).await;

    for text in ["first", "second", "Hello, world!"] {
        node.send_text(text).unwrap();
    }

    let mut seen = Vec::new();
    while seen.len() < 6 {
        let event = wait_for(&mut events, |e| {
            matches!(e, ChatEvent::Outgoing { .. } | ChatEvent::Incoming { .. })
        })
        .await;
        seen.push(event);
    }

    let outgoing: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Outgoing { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    let incoming: Vec<_> = seen
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Incoming { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();

    assert_eq!(outgoing, ["first", "second", "Hello, world!"]);
    assert_eq!(incoming, ["first", "second", "Hello, world!"]);

    // Each message is reported as sent before its echo arrives
    let first_out = seen.iter().position(|e| matches!(e, ChatEvent::Outgoing { .. }));
    let first_in = seen.iter().position(|e| matches!(e, ChatEvent::Incoming { .. }));
    assert!(first_out < first_in);
}

#[tokio::test]
async fn stopped_echo_server_refuses_new_clients() {
    let echo = start_echo().await;
    let port = echo.local_addr().port();
    echo.stop();
    drop(echo);

    let (node, _events) = start_node();

    // Abort takes effect once the runtime drops the accept task
    let mut refused = false;
    for _ in 0..50 {
        if node.manager().connect("127.0.0.1", port).await.is_err() {
            refused = true;
            break;
        }
        node.manager().disconnect();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(refused);
    assert_eq!(node.state(), SessionState::Idle);
}
