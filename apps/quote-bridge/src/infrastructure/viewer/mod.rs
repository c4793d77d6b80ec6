//! Viewer WebSocket Server
//!
//! Accepts downstream viewer connections and relays every broadcast
//! event to each of them as `{type, timestamp, data}` JSON text frames.
//!
//! # Viewer protocol
//!
//! On attach a viewer immediately receives a `status` catch-up frame
//! built from the current connection stats. After that it receives every
//! quote, account activity, and status broadcast. A viewer may send
//! commands over its socket: subscription commands are forwarded through
//! the subscription façade, `get_status` is answered on that socket
//! only, and `ping` is answered with `{"type":"pong"}`. Invalid JSON
//! from a viewer is logged and ignored.
//!
//! Viewers that fall behind a broadcast channel's capacity observe a lag
//! notice and continue from the oldest retained message; the feed is
//! never stalled on a slow viewer.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use metrics::gauge;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::services::{FacadeError, SubscriptionFacade};
use crate::infrastructure::broadcast::SharedBroadcastHub;
use crate::infrastructure::upstream::messages::Command;

/// Errors from the viewer server.
#[derive(Debug, thiserror::Error)]
pub enum ViewerServerError {
    /// Could not bind the listening socket.
    #[error("failed to bind viewer listener on {addr}: {source}")]
    Bind {
        /// The address that could not be bound.
        addr: SocketAddr,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Downstream frame envelope, mirroring the upstream wire shape.
#[derive(Debug, Serialize)]
struct DownstreamFrame<'a> {
    #[serde(rename = "type")]
    frame_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
    data: serde_json::Value,
}

fn render_frame(
    frame_type: &str,
    timestamp: Option<String>,
    data: serde_json::Value,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&DownstreamFrame {
        frame_type,
        timestamp,
        data,
    })
}

/// WebSocket server for downstream viewers.
pub struct ViewerServer {
    addr: SocketAddr,
    hub: SharedBroadcastHub,
    facade: SubscriptionFacade,
    cancel: CancellationToken,
}

impl ViewerServer {
    /// Create a server that will listen on the given address.
    #[must_use]
    pub const fn new(
        addr: SocketAddr,
        hub: SharedBroadcastHub,
        facade: SubscriptionFacade,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            addr,
            hub,
            facade,
            cancel,
        }
    }

    /// Accept viewers until shutdown.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerServerError::Bind`] when the listening socket
    /// cannot be bound. Per-connection failures are logged, not returned.
    pub async fn run(self) -> Result<(), ViewerServerError> {
        let listener = TcpListener::bind(self.addr)
            .await
            .map_err(|source| ViewerServerError::Bind {
                addr: self.addr,
                source,
            })?;
        tracing::info!(addr = %self.addr, "Viewer server listening");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Viewer server shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let connection = ViewerConnection {
                                id: Uuid::new_v4(),
                                peer,
                                hub: Arc::clone(&self.hub),
                                facade: self.facade.clone(),
                                cancel: self.cancel.child_token(),
                            };
                            tokio::spawn(connection.run(stream));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept viewer connection");
                        }
                    }
                }
            }
        }
    }
}

/// One attached viewer.
struct ViewerConnection {
    id: Uuid,
    peer: SocketAddr,
    hub: SharedBroadcastHub,
    facade: SubscriptionFacade,
    cancel: CancellationToken,
}

impl ViewerConnection {
    async fn run(self, stream: TcpStream) {
        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::warn!(peer = %self.peer, error = %e, "Viewer handshake failed");
                return;
            }
        };

        // Subscribe to every channel before the catch-up push so nothing
        // sent in between is missed.
        let mut option_rx = self.hub.option_quotes_rx();
        let mut equity_rx = self.hub.equity_quotes_rx();
        let mut futures_rx = self.hub.futures_quotes_rx();
        let mut account_rx = self.hub.account_activity_rx();
        let mut status_rx = self.hub.status_rx();

        tracing::info!(
            viewer_id = %self.id,
            peer = %self.peer,
            viewers = self.hub.viewer_count(),
            "Viewer connected"
        );
        gauge!("quote_bridge_viewers").set(self.hub.viewer_count() as f64);

        let (mut write, mut read) = ws_stream.split();

        if self.send_status_snapshot(&mut write).await.is_err() {
            tracing::debug!(viewer_id = %self.id, "Viewer dropped during catch-up push");
            self.log_disconnect();
            return;
        }

        loop {
            let outbound = tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
                result = option_rx.recv() => match result {
                    Ok(msg) => render_frame(
                        "option_quote",
                        msg.timestamp,
                        serde_json::to_value(&msg.quote).unwrap_or_default(),
                    ),
                    Err(e) => { if self.note_lag("option_quote", &e) { continue } else { break } }
                },
                result = equity_rx.recv() => match result {
                    Ok(msg) => render_frame(
                        "equity_quote",
                        msg.timestamp,
                        serde_json::to_value(&msg.quote).unwrap_or_default(),
                    ),
                    Err(e) => { if self.note_lag("equity_quote", &e) { continue } else { break } }
                },
                result = futures_rx.recv() => match result {
                    Ok(msg) => render_frame(
                        "futures_quote",
                        msg.timestamp,
                        serde_json::to_value(&msg.quote).unwrap_or_default(),
                    ),
                    Err(e) => { if self.note_lag("futures_quote", &e) { continue } else { break } }
                },
                result = account_rx.recv() => match result {
                    Ok(msg) => render_frame("account_activity", msg.timestamp, msg.data),
                    Err(e) => { if self.note_lag("account_activity", &e) { continue } else { break } }
                },
                result = status_rx.recv() => match result {
                    Ok(msg) => render_frame(
                        "status",
                        msg.timestamp,
                        serde_json::to_value(&msg.status).unwrap_or_default(),
                    ),
                    Err(e) => { if self.note_lag("status", &e) { continue } else { break } }
                },
                inbound = read.next() => {
                    match inbound {
                        Some(Ok(Message::Text(text))) => {
                            if self.handle_viewer_command(&text, &mut write).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if write.send(Message::Pong(data)).await.is_err() {
                                break;
                            }
                            continue;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            tracing::debug!(viewer_id = %self.id, error = %e, "Viewer socket error");
                            break;
                        }
                    }
                }
            };

            match outbound {
                Ok(json) => {
                    if write.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(viewer_id = %self.id, error = %e, "Failed to render frame");
                }
            }
        }

        self.log_disconnect();
    }

    /// Returns `true` when the receive error was lag (keep going),
    /// `false` when the channel closed.
    fn note_lag(&self, channel: &str, error: &tokio::sync::broadcast::error::RecvError) -> bool {
        match error {
            tokio::sync::broadcast::error::RecvError::Lagged(skipped) => {
                tracing::warn!(
                    viewer_id = %self.id,
                    channel,
                    skipped,
                    "Viewer lagging; skipping ahead"
                );
                true
            }
            tokio::sync::broadcast::error::RecvError::Closed => false,
        }
    }

    async fn send_status_snapshot<W>(&self, write: &mut W) -> Result<(), ()>
    where
        W: SinkExt<Message> + Unpin,
    {
        let snapshot = self.facade.stats_snapshot();
        let data = serde_json::to_value(&snapshot).unwrap_or_default();
        match render_frame("status", Some(chrono::Utc::now().to_rfc3339()), data) {
            Ok(json) => write
                .send(Message::Text(json.into()))
                .await
                .map_err(|_| ()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to render status snapshot");
                Ok(())
            }
        }
    }

    /// Parse and act on one viewer command. `Err(())` means the socket is
    /// gone and the connection loop should exit.
    async fn handle_viewer_command<W>(&self, text: &str, write: &mut W) -> Result<(), ()>
    where
        W: SinkExt<Message> + Unpin,
    {
        let command: Command = match serde_json::from_str(text) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(viewer_id = %self.id, error = %e, "Ignoring invalid viewer command");
                return Ok(());
            }
        };

        match command {
            Command::GetStatus => self.send_status_snapshot(write).await,
            Command::Ping => {
                let pong = r#"{"type":"pong"}"#;
                write
                    .send(Message::Text(pong.into()))
                    .await
                    .map_err(|_| ())
            }
            other => {
                let name = other.name();
                match self.facade.forward_command(other) {
                    Ok(delivered) => {
                        tracing::debug!(
                            viewer_id = %self.id,
                            command = name,
                            delivered,
                            "Viewer command forwarded"
                        );
                    }
                    Err(FacadeError::EmptySymbolList) => {
                        tracing::warn!(
                            viewer_id = %self.id,
                            command = name,
                            "Viewer command had no symbols"
                        );
                    }
                }
                Ok(())
            }
        }
    }

    fn log_disconnect(&self) {
        // This connection's receivers are dropped by the time callers see
        // the log, but the count here may still include them briefly.
        tracing::info!(
            viewer_id = %self.id,
            peer = %self.peer,
            viewers = self.hub.viewer_count().saturating_sub(1),
            "Viewer disconnected"
        );
        gauge!("quote_bridge_viewers").set(self.hub.viewer_count().saturating_sub(1) as f64);
    }
}
