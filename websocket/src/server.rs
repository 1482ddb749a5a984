//! WebSocket server implementation.
//!
//! Accepts WebSocket connections at `/` and `/ws`. Every connection gets a
//! forwarder task reading the shared broadcast channel and pushing the events
//! that pass its filter. The connection's read loop handles control messages
//! (`subscribe`, `ping`) and swaps the filter in place.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info, warn};

use dustproof_types::VerifiedEvent;

use crate::subscriptions::{ClientMessage, ServerMessage, SubscriptionFilter};
use crate::{DeliveryError, WsError};

/// Default broadcast capacity. A subscriber further behind than this loses
/// the oldest events.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// An event stamped with its sequence number, serialized once for every
/// subscriber.
#[derive(Debug)]
struct Pushed {
    event: VerifiedEvent,
    json: String,
}

type Sink = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Fan-out point for verified events.
pub struct Notifier {
    tx: broadcast::Sender<Arc<Pushed>>,
    next_seq: AtomicU64,
}

impl Notifier {
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            tx,
            next_seq: AtomicU64::new(1),
        }
    }

    /// Stamp `event` with the next sequence number and hand it to every
    /// connected subscriber. Never blocks. Returns the sequence number used.
    pub fn publish(&self, event: &VerifiedEvent) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let mut event = event.clone();
        event.seq = seq;
        let json = match serde_json::to_string(&event) {
            Ok(json) => json,
            Err(e) => {
                warn!(seq, error = %e, "failed to serialize verified event");
                return seq;
            }
        };
        match self.tx.send(Arc::new(Pushed { event, json })) {
            Ok(receivers) => debug!(seq, receivers, "verified event pushed"),
            Err(_) => debug!(seq, "verified event dropped, no subscribers"),
        }
        seq
    }

    /// Number of connected subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Sequence number the next event will carry.
    pub fn next_seq(&self) -> u64 {
        self.next_seq.load(Ordering::Relaxed)
    }

    fn subscribe(&self) -> broadcast::Receiver<Arc<Pushed>> {
        self.tx.subscribe()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

/// The WebSocket server, configured with a port and shared notifier.
pub struct WebSocketServer {
    pub port: u16,
    pub notifier: Arc<Notifier>,
}

impl WebSocketServer {
    pub fn new(port: u16, notifier: Arc<Notifier>) -> Self {
        Self { port, notifier }
    }

    pub fn router(&self) -> Router {
        router(Arc::clone(&self.notifier))
    }

    /// Bind `0.0.0.0:port` and serve until `shutdown` completes.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), WsError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| WsError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!(%addr, "WebSocket server listening");
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), WsError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }
}

pub fn router(notifier: Arc<Notifier>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .with_state(notifier)
}

/// Axum handler that upgrades an HTTP request to a WebSocket connection.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(notifier): State<Arc<Notifier>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, notifier))
}

/// Handle a single WebSocket connection until the client goes away.
async fn handle_socket(socket: WebSocket, notifier: Arc<Notifier>) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let ws_sender: Sink = Arc::new(Mutex::new(ws_sender));

    let (filter_tx, filter_rx) = watch::channel(SubscriptionFilter::all());
    let forwarder = tokio::spawn(forward_events(
        notifier.subscribe(),
        Arc::clone(&ws_sender),
        filter_rx,
    ));
    debug!(subscribers = notifier.subscriber_count(), "subscriber connected");

    while let Some(msg_result) = ws_receiver.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "WebSocket receive error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let reply = handle_text_message(&text, &filter_tx);
                if let Err(e) = send_control(&ws_sender, &reply).await {
                    debug!(error = %e, "failed to reply to subscriber");
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(data) => {
                if let Err(e) = ws_sender.lock().await.send(Message::Pong(data)).await {
                    debug!(error = %e, "failed to answer ping");
                    break;
                }
            }
            _ => {}
        }
    }

    forwarder.abort();
    debug!("subscriber disconnected");
}

fn handle_text_message(text: &str, filter_tx: &watch::Sender<SubscriptionFilter>) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Subscribe { wallets }) => {
            let filter = SubscriptionFilter::wallets(wallets);
            let count = filter.len();
            filter_tx.send_replace(filter);
            ServerMessage::Ack {
                action: "subscribe".to_string(),
                wallets: count,
            }
        }
        Ok(ClientMessage::Ping) => ServerMessage::Pong,
        Err(e) => ServerMessage::Error {
            message: format!("Invalid message: {e}"),
        },
    }
}

async fn send_control(sender: &Sink, msg: &ServerMessage) -> Result<(), DeliveryError> {
    let text = serde_json::to_string(msg).map_err(|e| DeliveryError::Send(e.to_string()))?;
    send_text(sender, text).await
}

async fn send_text(sender: &Sink, text: String) -> Result<(), DeliveryError> {
    sender
        .lock()
        .await
        .send(Message::Text(text))
        .await
        .map_err(|e| DeliveryError::Send(e.to_string()))
}

/// Forwarder task: pushes every broadcast event that passes the
/// connection's current filter.
async fn forward_events(
    mut rx: broadcast::Receiver<Arc<Pushed>>,
    ws_sender: Sink,
    filter: watch::Receiver<SubscriptionFilter>,
) {
    loop {
        let pushed = match rx.recv().await {
            Ok(pushed) => pushed,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "subscriber lagged behind, events dropped");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!("{}", DeliveryError::Closed);
                break;
            }
        };
        if !filter.borrow().matches(&pushed.event) {
            continue;
        }
        if let Err(e) = send_text(&ws_sender, pushed.json.clone()).await {
            debug!(seq = pushed.event.seq, error = %e, "stopping forwarder");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dustproof_types::{EventStatus, Identity, Lamports, Timestamp, TxSignature, WalletAddress};

    fn event() -> VerifiedEvent {
        VerifiedEvent {
            status: EventStatus::Confirmed,
            identity: Identity {
                wallet_address: WalletAddress::new("W1"),
                external_id: "U1".into(),
                secondary_handle: None,
            },
            amount: Lamports::new(4210),
            verified_at: Timestamp::new(0),
            signature: TxSignature::new("s"),
            tx_id: TxSignature::new("s"),
            seq: 0,
        }
    }

    #[test]
    fn publish_without_subscribers_still_advances_seq() {
        let notifier = Notifier::new(4);
        assert_eq!(notifier.publish(&event()), 1);
        assert_eq!(notifier.publish(&event()), 2);
        assert_eq!(notifier.next_seq(), 3);
    }

    #[tokio::test]
    async fn receivers_see_stamped_events() {
        let notifier = Notifier::new(4);
        let mut rx = notifier.subscribe();
        notifier.publish(&event());
        let pushed = rx.recv().await.unwrap();
        assert_eq!(pushed.event.seq, 1);
        let json: serde_json::Value = serde_json::from_str(&pushed.json).unwrap();
        assert_eq!(json["seq"], 1);
        assert_eq!(json["status"], "confirmed");
    }

    #[tokio::test]
    async fn slow_receiver_lags_without_blocking_publish() {
        let notifier = Notifier::new(2);
        let mut slow = notifier.subscribe();
        for _ in 0..5 {
            notifier.publish(&event());
        }
        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(slow.recv().await.unwrap().event.seq, 4);
    }

    #[test]
    fn control_messages_update_filter() {
        let (tx, rx) = watch::channel(SubscriptionFilter::all());
        let reply = handle_text_message(r#"{"type":"subscribe","wallets":["W1"]}"#, &tx);
        assert_eq!(
            reply,
            ServerMessage::Ack {
                action: "subscribe".into(),
                wallets: 1
            }
        );
        assert_eq!(rx.borrow().len(), 1);
        assert!(matches!(
            handle_text_message("nonsense", &tx),
            ServerMessage::Error { .. }
        ));
    }
}
