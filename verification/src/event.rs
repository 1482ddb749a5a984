//! Fan-out of verified-identity events.

use dustproof_types::VerifiedEvent;

type Listener = Box<dyn Fn(&VerifiedEvent) + Send + Sync>;

/// Synchronous fan-out bus for verified events.
///
/// Listeners are invoked inline while the reconciler applies a batch, on
/// the blocking pool; a listener must hand the event off without blocking (the WebSocket notifier does a
/// non-blocking broadcast send).
#[derive(Default)]
pub struct VerifiedEventBus {
    listeners: Vec<Listener>,
}

impl VerifiedEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl Fn(&VerifiedEvent) + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&self, event: &VerifiedEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
