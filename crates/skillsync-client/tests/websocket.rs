//! End-to-end tests of the WebSocket transport against an in-process server.

use futures_util::{SinkExt, StreamExt};
use skillsync_client::{
    Channel, ChannelConfig, ChannelEvent, ConnectionState, Message, Participant, Session,
    WsConnector,
};
use skillsync_core::{ClientEvent, OutgoingMessage, ServerEvent};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, watch};
use tokio_tungstenite::tungstenite::Message as Frame;

fn m1() -> Message {
    Message {
        id: "m1".into(),
        sender: Participant::new("u1", "Alice"),
        receiver: Participant::new("u2", "Bob"),
        message: "hi".into(),
        created_at: "2025-01-01T00:00:00Z".into(),
    }
}

fn config(addr: SocketAddr) -> ChannelConfig {
    let mut config = ChannelConfig::new(format!("http://{addr}/api"));
    config.handshake_timeout_secs = 1;
    config
}

fn text(event: &ServerEvent) -> Frame {
    Frame::Text(event.to_frame().unwrap().into())
}

async fn listener() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[tokio::test]
async fn exchanges_messages_over_websocket() {
    let (listener, addr) = listener().await;
    let (frames_tx, frames_rx) = oneshot::channel::<(ClientEvent, ClientEvent)>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let auth = match ws.next().await.unwrap().unwrap() {
            Frame::Text(t) => ClientEvent::from_frame(&t).unwrap(),
            other => panic!("unexpected frame {other:?}"),
        };
        ws.send(text(&ServerEvent::Connect {
            user_id: "u2".into(),
        }))
        .await
        .unwrap();
        ws.send(text(&ServerEvent::ReceiveMessage(m1()))).await.unwrap();

        let sent = loop {
            match ws.next().await.unwrap().unwrap() {
                Frame::Text(t) => break ClientEvent::from_frame(&t).unwrap(),
                _ => continue,
            }
        };
        let _ = frames_tx.send((auth, sent));
        // Hold the socket open until the client goes away.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let session = Session::new("u2", Some("Bob".into()), Some("tok-A".into()));
    let (_session_tx, session_rx) = watch::channel(Some(session));
    let config = config(addr);
    let mut channel = Channel::mount(&config, WsConnector::new(&config), session_rx)
        .await
        .unwrap();
    assert!(channel.is_connected());

    assert_eq!(
        channel.next_event().await,
        Some(ChannelEvent::Received(m1()))
    );
    assert_eq!(channel.messages(), [m1()]);

    assert!(channel.send("u1", "hello back").is_some());
    let (auth, sent) = tokio::time::timeout(Duration::from_secs(5), frames_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        auth,
        ClientEvent::Auth {
            token: "tok-A".into()
        }
    );
    assert_eq!(
        sent,
        ClientEvent::SendMessage(OutgoingMessage::new("u1", "hello back"))
    );
    assert_eq!(channel.messages().len(), 2);
}

#[tokio::test]
async fn rejected_token_leaves_channel_disconnected() {
    let (listener, addr) = listener().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _auth = ws.next().await;
        ws.send(text(&ServerEvent::ConnectError {
            message: "invalid token".into(),
        }))
        .await
        .unwrap();
        let _ = ws.close(None).await;
    });

    let session = Session::new("u2", None, Some("tok-bad".into()));
    let (_session_tx, session_rx) = watch::channel(Some(session));
    let config = config(addr);
    let mut channel = Channel::mount(&config, WsConnector::new(&config), session_rx)
        .await
        .unwrap();

    assert_eq!(channel.connection_state(), ConnectionState::Disconnected);
    assert!(channel.send("u1", "hello").is_none());
    assert!(channel.messages().is_empty());
}

#[tokio::test]
async fn silent_server_times_out_handshake() {
    let (listener, addr) = listener().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Never answer the auth frame.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let session = Session::new("u2", None, Some("tok-A".into()));
    let (_session_tx, session_rx) = watch::channel(Some(session));
    let config = config(addr);
    let channel = Channel::mount(&config, WsConnector::new(&config), session_rx)
        .await
        .unwrap();
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn server_close_reports_disconnect() {
    let (listener, addr) = listener().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let _auth = ws.next().await;
        ws.send(text(&ServerEvent::Connect {
            user_id: "u2".into(),
        }))
        .await
        .unwrap();
        ws.send(text(&ServerEvent::Disconnect {
            reason: "server shutting down".into(),
        }))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let session = Session::new("u2", None, Some("tok-A".into()));
    let (_session_tx, session_rx) = watch::channel(Some(session));
    let config = config(addr);
    let mut channel = Channel::mount(&config, WsConnector::new(&config), session_rx)
        .await
        .unwrap();
    assert!(channel.is_connected());

    let event = tokio::time::timeout(Duration::from_secs(5), channel.next_event())
        .await
        .unwrap();
    assert_eq!(
        event,
        Some(ChannelEvent::Disconnected {
            reason: "server shutting down".into()
        })
    );
    assert!(!channel.is_connected());
}

#[tokio::test]
async fn tls_endpoint_failure_leaves_channel_disconnected() {
    let (listener, addr) = listener().await;

    // Plain TCP: the TLS handshake can never complete.
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        drop(stream);
    });

    let mut config = ChannelConfig::new(format!("https://{addr}/api"));
    config.handshake_timeout_secs = 1;
    assert_eq!(config.endpoint().unwrap().scheme(), "wss");

    let session = Session::new("u2", None, Some("tok-A".into()));
    let (_session_tx, session_rx) = watch::channel(Some(session));
    let channel = Channel::mount(&config, WsConnector::new(&config), session_rx)
        .await
        .unwrap();

    assert_eq!(channel.connection_state(), ConnectionState::Disconnected);
    assert!(channel.messages().is_empty());
}
