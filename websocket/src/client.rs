//! Reconnecting event subscriber.
//!
//! Connects to a notifier endpoint, optionally narrows delivery to a set of
//! wallets, and hands each verified event to a callback. On disconnect it
//! waits with exponential backoff (1s doubling to 30s) and reconnects; the
//! backoff resets after every successful connection. Events published while
//! disconnected are lost, which an unfiltered subscriber reports from the
//! `seq` gap. Sequence numbers are global, so a wallet-filtered subscriber
//! sees jumps for every event filtered out and cannot tell them from losses.

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use dustproof_types::VerifiedEvent;
use dustproof_utils::Backoff;

use crate::subscriptions::{ClientMessage, ServerMessage};
use crate::WsError;

pub struct EventSubscriber {
    url: String,
    wallets: Vec<String>,
    backoff: Backoff,
    last_seq: Option<u64>,
}

impl EventSubscriber {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            wallets: Vec::new(),
            backoff: Backoff::reconnect(),
            last_seq: None,
        }
    }

    /// Only receive events for these wallets.
    pub fn with_wallets(mut self, wallets: Vec<String>) -> Self {
        self.wallets = wallets;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Receive events until `shutdown` completes, reconnecting as needed.
    pub async fn run<F, S>(mut self, mut on_event: F, shutdown: S)
    where
        F: FnMut(VerifiedEvent) + Send,
        S: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);
        loop {
            let result = tokio::select! {
                _ = &mut shutdown => return,
                result = self.session(&mut on_event) => result,
            };
            match result {
                Ok(()) => debug!(url = %self.url, "notifier closed the connection"),
                Err(e) => warn!(url = %self.url, error = %e, "subscriber connection failed"),
            }
            let delay = self.backoff.next_delay();
            debug!(?delay, "reconnecting after backoff");
            tokio::select! {
                _ = &mut shutdown => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One connection, from connect to close.
    async fn session<F>(&mut self, on_event: &mut F) -> Result<(), WsError>
    where
        F: FnMut(VerifiedEvent) + Send,
    {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| WsError::Connect(e.to_string()))?;
        info!(url = %self.url, "subscribed to verified events");
        self.backoff.reset();

        let (mut write, mut read) = stream.split();
        if !self.wallets.is_empty() {
            let subscribe = ClientMessage::Subscribe {
                wallets: self.wallets.clone(),
            };
            let text =
                serde_json::to_string(&subscribe).map_err(|e| WsError::Connect(e.to_string()))?;
            write
                .send(Message::Text(text))
                .await
                .map_err(|e| WsError::Connect(e.to_string()))?;
        }

        while let Some(msg) = read.next().await {
            let text = match msg {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => return Err(WsError::Connect(e.to_string())),
            };
            if let Ok(event) = serde_json::from_str::<VerifiedEvent>(&text) {
                self.note_seq(event.seq);
                on_event(event);
            } else if let Ok(ServerMessage::Error { message }) =
                serde_json::from_str::<ServerMessage>(&text)
            {
                warn!(%message, "notifier rejected a message");
            }
        }
        Ok(())
    }

    /// Record `seq` and return how many events were provably missed.
    fn note_seq(&mut self, seq: u64) -> u64 {
        let missed = match self.last_seq {
            Some(last) if self.wallets.is_empty() && seq > last + 1 => seq - last - 1,
            _ => 0,
        };
        self.last_seq = Some(seq);
        if missed > 0 {
            warn!(missed, "gap in verified events");
        }
        missed
    }
}
