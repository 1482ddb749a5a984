//! Real-time push of verified-identity events.
//!
//! - [`Notifier`]: fan-out of each event to every connected subscriber over a
//!   broadcast channel. Publishing never blocks; a slow subscriber lags and
//!   loses events rather than stalling the others.
//! - [`WebSocketServer`]: the axum endpoint subscribers connect to.
//! - [`EventSubscriber`]: a client that reconnects with exponential backoff.
//!
//! Delivery is at-most-once with no replay. Every event carries a `seq` so a
//! subscriber can tell that it missed some.

pub mod client;
pub mod error;
pub mod server;
pub mod subscriptions;

pub use client::EventSubscriber;
pub use error::{DeliveryError, WsError};
pub use server::{Notifier, WebSocketServer, DEFAULT_CHANNEL_CAPACITY};
pub use subscriptions::{ClientMessage, ServerMessage, SubscriptionFilter};
