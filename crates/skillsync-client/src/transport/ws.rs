//! WebSocket transport.

use super::{Connector, Link, LinkEvent};
use crate::config::ChannelConfig;
use crate::error::TransportError;
use crate::session::Credential;
use futures_util::{SinkExt, StreamExt};
use skillsync_core::{ClientEvent, ServerEvent};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects over WebSocket only; there is no fallback transport.
#[derive(Debug, Clone)]
pub struct WsConnector {
    handshake_timeout: Duration,
    queue_capacity: usize,
}

impl WsConnector {
    pub fn new(config: &ChannelConfig) -> Self {
        // Fails only when a provider is already installed, which is fine.
        let _ = rustls::crypto::ring::default_provider().install_default();
        Self {
            handshake_timeout: config.handshake_timeout(),
            queue_capacity: config.queue_capacity.max(1),
        }
    }
}

impl Connector for WsConnector {
    async fn connect(&self, endpoint: &Url, credential: &Credential) -> Result<Link, TransportError> {
        let (socket, user_id) =
            tokio::time::timeout(self.handshake_timeout, handshake(endpoint, credential))
                .await
                .map_err(|_| TransportError::HandshakeTimeout(self.handshake_timeout))??;

        let (mut sink, mut stream) = socket.split();
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientEvent>(self.queue_capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel::<LinkEvent>(self.queue_capacity);

        // Ends when the link drops its sender, then closes the socket.
        tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                let text = match event.to_frame() {
                    Ok(text) => text,
                    Err(error) => {
                        tracing::warn!(%error, "dropping unencodable frame");
                        continue;
                    }
                };
                if let Err(error) = sink.send(Message::Text(text.into())).await {
                    tracing::debug!(%error, "websocket write failed");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => match ServerEvent::from_frame(&text) {
                        Ok(event) => {
                            tracing::debug!(?event, "frame received");
                            if inbound_tx.send(LinkEvent::Frame(event)).await.is_err() {
                                return;
                            }
                        }
                        Err(error) => tracing::warn!(%error, "skipping undecodable frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.as_str().to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "server closed connection".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => break error.to_string(),
                    None => break "transport closed".to_string(),
                }
            };
            let _ = inbound_tx.send(LinkEvent::Closed { reason }).await;
        });

        Ok(Link::new(user_id, outbound_tx, inbound_rx).with_reader(reader))
    }
}

/// Open the socket, send the auth frame, and wait for `connect` or
/// `connect_error`.
async fn handshake(endpoint: &Url, credential: &Credential) -> Result<(Socket, String), TransportError> {
    let (mut socket, _response) = tokio_tungstenite::connect_async(endpoint.as_str()).await?;

    let auth = ClientEvent::Auth {
        token: credential.expose().to_string(),
    };
    socket.send(Message::Text(auth.to_frame()?.into())).await?;

    loop {
        let msg = socket
            .next()
            .await
            .ok_or(TransportError::ClosedDuringHandshake)??;
        match msg {
            Message::Text(text) => {
                return match ServerEvent::from_frame(&text)? {
                    ServerEvent::Connect { user_id } => Ok((socket, user_id)),
                    ServerEvent::ConnectError { message } => Err(TransportError::Rejected(message)),
                    ServerEvent::ReceiveMessage(_) => {
                        Err(TransportError::UnexpectedFrame("receiveMessage"))
                    }
                    ServerEvent::Disconnect { reason } => Err(TransportError::Rejected(reason)),
                };
            }
            Message::Close(_) => return Err(TransportError::ClosedDuringHandshake),
            _ => {}
        }
    }
}
