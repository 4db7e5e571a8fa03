//! WebSocket relay transport.
//!
//! Connects to the relay address advertised by the host environment.
//!
//! # Event Loop
//!
//! The transport spawns a tokio task that:
//!
//! - Opens the connection, then reports [`TransportEvent::Opened`]
//! - Parses incoming text frames into JSON and reports them as messages
//! - Writes outbound envelopes queued by [`SocketTransport::post`]
//! - Reports [`TransportEvent::Closed`] when the connection ends
//!
//! Until the connection is open, posts are dropped rather than queued.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, from_str, to_string};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::Envelope;

use super::{EventSender, RawMessage, TransportEvent, TransportKind, TransportProvider};

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Internal commands for the event loop.
enum SocketCommand {
    /// Write a serialized envelope.
    Send(String),
    /// Close the connection.
    Close,
}

// ============================================================================
// SocketTransport
// ============================================================================

/// WebSocket connection to a relay.
pub struct SocketTransport {
    /// Relay address.
    url: Url,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<SocketCommand>,
    /// Set by the event loop while the connection is open.
    ready: Arc<AtomicBool>,
    /// Set once `close` has run.
    closed: AtomicBool,
}

impl SocketTransport {
    /// Starts connecting to `url`.
    ///
    /// Returns immediately; the transport is not ready until the
    /// [`TransportEvent::Opened`] event is reported on `events`.
    #[must_use]
    pub fn connect(url: Url, events: EventSender) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicBool::new(false));

        tokio::spawn(Self::run_event_loop(
            url.clone(),
            command_rx,
            Arc::clone(&ready),
            events,
        ));

        Self {
            url,
            command_tx,
            ready,
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the relay address.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Performs the WebSocket handshake.
    async fn open(url: &Url) -> Result<WsStream> {
        let (ws_stream, _) = connect_async(url.as_str()).await?;
        Ok(ws_stream)
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        url: Url,
        mut command_rx: mpsc::UnboundedReceiver<SocketCommand>,
        ready: Arc<AtomicBool>,
        events: EventSender,
    ) {
        let ws_stream = tokio::select! {
            result = Self::open(&url) => match result {
                Ok(ws_stream) => ws_stream,
                Err(e) => {
                    error!(%url, error = %e, "Relay connection failed");
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
            },

            // Posts are dropped while not ready, so only Close can arrive here.
            _ = command_rx.recv() => {
                debug!(%url, "Socket closed before open");
                return;
            }
        };

        info!(%url, "Relay connection established");
        ready.store(true, Ordering::SeqCst);
        let _ = events.send(TransportEvent::Opened);

        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                // Incoming frames from the relay
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_text(&text, &events);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("WebSocket closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            break;
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the transport handle
                command = command_rx.recv() => {
                    match command {
                        Some(SocketCommand::Send(json)) => {
                            if let Err(e) = ws_write.send(Message::Text(json.into())).await {
                                warn!(error = %e, "Failed to send message");
                            }
                        }

                        Some(SocketCommand::Close) | None => {
                            debug!("Closing relay connection");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }
            }
        }

        ready.store(false, Ordering::SeqCst);
        let _ = events.send(TransportEvent::Closed);

        debug!("Socket event loop terminated");
    }

    /// Parses a text frame and forwards it to the router.
    fn handle_incoming_text(text: &str, events: &EventSender) {
        match from_str::<Value>(text) {
            Ok(data) => {
                let _ = events.send(TransportEvent::Message(RawMessage::new(data, None)));
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse incoming message");
            }
        }
    }
}

impl TransportProvider for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst) && !self.closed.load(Ordering::SeqCst)
    }

    fn post(&self, envelope: &Envelope) -> Result<()> {
        if !self.is_ready() {
            debug!(id = %envelope.id, "Socket not open, message dropped");
            return Ok(());
        }

        let json = to_string(envelope)?;
        self.command_tx
            .send(SocketCommand::Send(json))
            .map_err(|_| Error::ConnectionClosed)?;

        trace!(id = %envelope.id, "Envelope queued on socket");
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.command_tx.send(SocketCommand::Close);
        debug!(url = %self.url, "Socket close requested");
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::net::TcpListener;
    use tokio::time::timeout;
    use tokio_tungstenite::accept_async;

    use crate::identifiers::MessageId;
    use crate::protocol::MessageType;

    const WAIT: Duration = Duration::from_secs(5);

    async fn local_listener() -> (TcpListener, Url) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).expect("url");
        (listener, url)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<TransportEvent>) -> TransportEvent {
        timeout(WAIT, rx.recv())
            .await
            .expect("event in time")
            .expect("event")
    }

    #[tokio::test]
    async fn test_open_send_and_receive() {
        let (listener, url) = local_listener().await;
        let (events, mut rx) = mpsc::unbounded_channel();
        let transport = SocketTransport::connect(url.clone(), events);

        let (stream, _) = listener.accept().await.expect("accept");
        let mut relay = accept_async(stream).await.expect("upgrade");

        assert_eq!(next_event(&mut rx).await, TransportEvent::Opened);
        assert!(transport.is_ready());
        assert_eq!(transport.url(), &url);

        let envelope = Envelope::request(MessageType::SetText, MessageId::from_nonce("s"), None);
        transport.post(&envelope).expect("post");

        let frame = timeout(WAIT, relay.next())
            .await
            .expect("frame in time")
            .expect("frame")
            .expect("ok frame");
        let Message::Text(text) = frame else {
            panic!("expected text frame");
        };
        let received: Envelope = serde_json::from_str(&text).expect("envelope");
        assert_eq!(received, envelope);

        relay
            .send(Message::Text("not json".into()))
            .await
            .expect("send garbage");
        let reply = json!({ "type": "setText", "id": "markwhen_s", "response": true });
        relay
            .send(Message::Text(reply.to_string().into()))
            .await
            .expect("send reply");

        assert_eq!(
            next_event(&mut rx).await,
            TransportEvent::Message(RawMessage::new(reply, None))
        );

        transport.close();
        assert!(!transport.is_ready());
    }

    #[tokio::test]
    async fn test_post_before_open_is_dropped() {
        // Accepts TCP but never completes the WebSocket handshake.
        let (_listener, url) = local_listener().await;
        let (events, _rx) = mpsc::unbounded_channel();
        let transport = SocketTransport::connect(url, events);

        let envelope = Envelope::request(MessageType::AppState, MessageId::from_nonce("d"), None);
        assert!(!transport.is_ready());
        assert!(transport.post(&envelope).is_ok());

        transport.close();
        transport.close();
    }

    #[tokio::test]
    async fn test_connection_refused_reports_closed() {
        let (listener, url) = local_listener().await;
        drop(listener);

        let (events, mut rx) = mpsc::unbounded_channel();
        let transport = SocketTransport::connect(url, events);

        assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);
        assert!(!transport.is_ready());
    }

    #[tokio::test]
    async fn test_remote_close_reports_closed() {
        let (listener, url) = local_listener().await;
        let (events, mut rx) = mpsc::unbounded_channel();
        let transport = SocketTransport::connect(url, events);

        let (stream, _) = listener.accept().await.expect("accept");
        let mut relay = accept_async(stream).await.expect("upgrade");
        assert_eq!(next_event(&mut rx).await, TransportEvent::Opened);

        relay.close(None).await.expect("close");
        assert_eq!(next_event(&mut rx).await, TransportEvent::Closed);
        assert!(!transport.is_ready());
    }
}
