//! Real-time notification channel.
//!
//! One WebSocket connection at a time, owned by a supervisor task. The
//! supervisor decodes inbound frames, forwards `post_created` posts, and on
//! error or close waits a fixed delay before reconnecting. Reconnects are
//! unbounded and never back off.
//!
//! The manager's lifetime is the feed view's lifetime. `teardown` cancels the
//! mount token first, and every suspension point in the supervisor checks that
//! token, so no close event it produces can arm another reconnect.

use crate::api::Post;
use futures::StreamExt;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use url::Url;

/// Envelope type announcing a newly created post.
pub const POST_CREATED: &str = "post_created";

/// Upper bound on the close handshake during teardown.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected. After a drop, a reconnect is pending.
    Disconnected,
    Connecting,
    Connected,
    /// Torn down. Terminal.
    Closed,
}

/// What the channel reports to its consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    PostCreated(Post),
    State(ConnectionState),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("Envelope '{0}' carried no data")]
    MissingData(String),
    #[error("Malformed '{kind}' payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// Decode one text frame.
///
/// `Ok(None)` for envelope types this client does not consume.
pub fn decode_frame(text: &str) -> Result<Option<Post>, ChannelError> {
    let envelope: Envelope = serde_json::from_str(text).map_err(ChannelError::Envelope)?;
    if envelope.kind != POST_CREATED {
        tracing::debug!(kind = %envelope.kind, "Ignoring channel message");
        return Ok(None);
    }
    let data = envelope
        .data
        .ok_or_else(|| ChannelError::MissingData(envelope.kind.clone()))?;
    serde_json::from_value(data)
        .map(Some)
        .map_err(|source| ChannelError::Payload {
            kind: envelope.kind,
            source,
        })
}

/// State and wiring shared between the handle and the supervisor task.
struct Link<E> {
    url: Url,
    reconnect_delay: Duration,
    out: mpsc::Sender<E>,
    wrap: fn(ChannelEvent) -> E,
    state: Arc<watch::Sender<ConnectionState>>,
    mounted: CancellationToken,
    wake: Arc<Notify>,
}

impl<E> Link<E> {
    /// Move to `next` unless already torn down. Returns false once the consumer is gone.
    async fn transition(&self, next: ConnectionState) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == ConnectionState::Closed || *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            self.emit(ChannelEvent::State(next)).await
        } else {
            true
        }
    }

    async fn emit(&self, event: ChannelEvent) -> bool {
        self.out.send((self.wrap)(event)).await.is_ok()
    }
}

/// Owns the single real-time connection for one feed view.
pub struct ChannelManager<E> {
    link: Arc<Link<E>>,
    state_rx: watch::Receiver<ConnectionState>,
    task: Option<JoinHandle<()>>,
}

impl<E: Send + 'static> ChannelManager<E> {
    /// Create a manager. Nothing connects until [`connect`](Self::connect).
    ///
    /// Events are delivered as `wrap(event)` on `out`.
    pub fn new(
        url: Url,
        reconnect_delay: Duration,
        out: mpsc::Sender<E>,
        wrap: fn(ChannelEvent) -> E,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            link: Arc::new(Link {
                url,
                reconnect_delay,
                out,
                wrap,
                state: Arc::new(state_tx),
                mounted: CancellationToken::new(),
                wake: Arc::new(Notify::new()),
            }),
            state_rx,
            task: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Establish the connection. No-op while connecting or connected, and after teardown.
    ///
    /// The first call spawns the supervisor task, which owns the socket from
    /// then on and reconnects by itself after a drop. While a reconnect is
    /// pending, calling this again skips the remaining delay instead of
    /// spawning a second supervisor.
    ///
    /// # State transitions
    ///
    /// | Current        | Effect                                  |
    /// |----------------|-----------------------------------------|
    /// | `Disconnected` | spawn supervisor, or wake a pending one |
    /// | `Connecting`   | none                                    |
    /// | `Connected`    | none                                    |
    /// | `Closed`       | none (torn down)                        |
    pub fn connect(&mut self) {
        if self.link.mounted.is_cancelled() {
            tracing::debug!("connect ignored: channel torn down");
            return;
        }
        match self.state() {
            ConnectionState::Connecting | ConnectionState::Connected | ConnectionState::Closed => {
                return;
            }
            ConnectionState::Disconnected => {}
        }

        if self.task.as_ref().is_some_and(|t| !t.is_finished()) {
            self.link.wake.notify_one();
            return;
        }

        self.link.state.send_replace(ConnectionState::Connecting);
        let link = Arc::clone(&self.link);
        self.task = Some(tokio::spawn(supervise(link)));
    }

    /// Tear the channel down. Idempotent.
    ///
    /// Clears the mounted flag first, then lets the supervisor close the socket
    /// and cancel any armed reconnect delay.
    pub fn teardown(&mut self) {
        if self.link.mounted.is_cancelled() {
            return;
        }
        self.link.mounted.cancel();
        self.link.state.send_replace(ConnectionState::Closed);
        tracing::info!(url = %self.link.url, "Channel torn down");
    }
}

impl<E> Drop for ChannelManager<E> {
    fn drop(&mut self) {
        self.link.mounted.cancel();
    }
}

async fn supervise<E: Send + 'static>(link: Arc<Link<E>>) {
    loop {
        if link.mounted.is_cancelled() || !link.transition(ConnectionState::Connecting).await {
            break;
        }

        let attempt = tokio::select! {
            biased;
            _ = link.mounted.cancelled() => break,
            result = connect_async(link.url.as_str()) => result,
        };

        match attempt {
            Ok((ws, _response)) => {
                if !link.transition(ConnectionState::Connected).await {
                    break;
                }
                tracing::info!(url = %link.url, "Channel connected");
                match pump(ws, &link).await {
                    PumpExit::TornDown => break,
                    PumpExit::Dropped(reason) => {
                        tracing::info!(reason = %reason, "Channel disconnected");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(url = %link.url, error = %e, "Channel connect failed");
            }
        }

        if link.mounted.is_cancelled() || !link.transition(ConnectionState::Disconnected).await {
            break;
        }

        tracing::debug!(
            delay_ms = link.reconnect_delay.as_millis() as u64,
            "Channel reconnect armed"
        );
        tokio::select! {
            biased;
            _ = link.mounted.cancelled() => break,
            _ = tokio::time::sleep(link.reconnect_delay) => {}
            _ = link.wake.notified() => {}
        }
    }
    tracing::debug!("Channel supervisor stopped");
}

enum PumpExit {
    TornDown,
    Dropped(String),
}

async fn pump<E>(mut ws: WsStream, link: &Link<E>) -> PumpExit {
    loop {
        tokio::select! {
            biased;

            _ = link.mounted.cancelled() => {
                match tokio::time::timeout(CLOSE_TIMEOUT, ws.close(None)).await {
                    Ok(Err(e)) => tracing::debug!(error = %e, "Close handshake failed"),
                    Err(_) => tracing::debug!("Close handshake timed out"),
                    Ok(Ok(())) => {}
                }
                return PumpExit::TornDown;
            }

            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                    Ok(Some(post)) => {
                        tracing::debug!(post_id = %post.id, "Live post received");
                        if !link.emit(ChannelEvent::PostCreated(post)).await {
                            return PumpExit::TornDown;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping malformed channel message");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| format!("closed by server ({})", f.code))
                        .unwrap_or_else(|| "closed by server".to_string());
                    return PumpExit::Dropped(reason);
                }
                // Ping/pong are answered by tungstenite; binary frames are not part of the protocol
                Some(Ok(_)) => {}
                Some(Err(e)) => return PumpExit::Dropped(e.to_string()),
                None => return PumpExit::Dropped("stream ended".to_string()),
            }
        }
    }
}
