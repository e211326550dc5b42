//! Relay server implementation.

use crate::users::Directory;
use chrono::{SecondsFormat, Utc};
use futures_util::{SinkExt, StreamExt};
use skillsync_core::{ClientEvent, Message, OutgoingMessage, Participant, ServerEvent};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tokio_tungstenite::tungstenite::Message as Frame;

/// Shared relay state.
struct RelayState {
    directory: Directory,
    /// user id -> connection id -> outbound queue
    online: HashMap<String, HashMap<u64, mpsc::UnboundedSender<String>>>,
    next_connection: u64,
    next_message: u64,
}

impl RelayState {
    fn new(directory: Directory) -> Self {
        Self {
            directory,
            online: HashMap::new(),
            next_connection: 0,
            next_message: 0,
        }
    }

    fn register(&mut self, user_id: &str, tx: mpsc::UnboundedSender<String>) -> u64 {
        self.next_connection += 1;
        let id = self.next_connection;
        self.online
            .entry(user_id.to_string())
            .or_default()
            .insert(id, tx);
        id
    }

    fn unregister(&mut self, user_id: &str, connection: u64) {
        if let Some(conns) = self.online.get_mut(user_id) {
            conns.remove(&connection);
            if conns.is_empty() {
                self.online.remove(user_id);
            }
        }
    }

    /// Stamp a message and deliver it to the receiver and back to the sender.
    /// Connections whose queue is gone are unregistered on the way.
    fn route(&mut self, sender: &Participant, outgoing: OutgoingMessage) -> anyhow::Result<Message> {
        self.next_message += 1;
        let message = Message {
            id: format!("m{}", self.next_message),
            sender: sender.clone(),
            receiver: self.directory.resolve(&outgoing.receiver_id),
            message: outgoing.message,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let frame = ServerEvent::ReceiveMessage(message.clone()).to_frame()?;

        let mut targets = vec![message.receiver.id.as_str()];
        if message.sender.id != message.receiver.id {
            targets.push(message.sender.id.as_str());
        }
        let mut dead = Vec::new();
        for user_id in targets {
            for (connection, tx) in self.online.get(user_id).into_iter().flatten() {
                if tx.send(frame.clone()).is_err() {
                    dead.push((user_id.to_string(), *connection));
                }
            }
        }
        for (user_id, connection) in dead {
            tracing::debug!("Dropping stale connection {} of {}", connection, user_id);
            self.unregister(&user_id, connection);
        }
        Ok(message)
    }
}

type SharedState = Arc<RwLock<RelayState>>;

pub async fn run(addr: SocketAddr, directory: Directory) -> anyhow::Result<()> {
    let state = Arc::new(RwLock::new(RelayState::new(directory)));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on ws://{}", addr);

    loop {
        let (stream, client_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, client_addr, state).await {
                tracing::warn!("Connection error from {}: {}", client_addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: SharedState,
) -> anyhow::Result<()> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    tracing::debug!("New connection from {}", addr);

    // Wait for auth
    let token = loop {
        let msg = stream.next().await.ok_or(anyhow::anyhow!("Connection closed"))??;
        if let Frame::Text(text) = msg {
            match ClientEvent::from_frame(&text)? {
                ClientEvent::Auth { token } => break token,
                other => tracing::warn!("Frame before auth: {:?}", other),
            }
        }
    };

    let user = state.read().await.directory.authenticate(&token).cloned();
    let Some(user) = user else {
        tracing::info!("Rejected token from {}", addr);
        let error = ServerEvent::ConnectError {
            message: "invalid token".into(),
        };
        sink.send(Frame::Text(error.to_frame()?.into())).await?;
        sink.close().await?;
        return Ok(());
    };

    let connect = ServerEvent::Connect {
        user_id: user.id.clone(),
    };
    sink.send(Frame::Text(connect.to_frame()?.into())).await?;

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let connection = state.write().await.register(&user.id, tx);
    tracing::info!("{} connected from {}", user, addr);

    // Main loop
    loop {
        tokio::select! {
            // Incoming frame from client
            msg = stream.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                };

                if let Frame::Text(text) = msg {
                    let event = match ClientEvent::from_frame(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!("Invalid frame: {}", e);
                            continue;
                        }
                    };

                    match event {
                        ClientEvent::SendMessage(outgoing) => {
                            match state.write().await.route(&user, outgoing) {
                                Ok(message) => tracing::debug!("{} -> {}: {}", message.sender.id, message.receiver.id, message.id),
                                Err(e) => tracing::warn!("Could not route message from {}: {}", user, e),
                            }
                        }
                        ClientEvent::Auth { .. } => {
                            tracing::warn!("Duplicate auth from {}", user);
                        }
                    }
                }
            }

            // Routed from another connection
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                if let Err(e) = sink.send(Frame::Text(frame.into())).await {
                    tracing::debug!("WebSocket write failed: {}", e);
                    break;
                }
            }
        }
    }

    state.write().await.unregister(&user.id, connection);
    tracing::info!("{} disconnected", user);
    Ok(())
}
