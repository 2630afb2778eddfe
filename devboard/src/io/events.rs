//! Change notifications for front-ends that mirror project documents.
//!
//! The bus is an ordinary value owned by the caller and passed to whoever
//! publishes; there is no process-wide listener registry.

use std::sync::{Arc, Mutex};

use tracing::warn;

/// A document changed on disk because of a devboard operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    TasksChanged { project: String },
    LogChanged { project: String },
}

type Listener = Arc<dyn Fn(&DocumentEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    listeners: Mutex<Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn(&DocumentEvent) + Send + Sync + 'static) {
        match self.listeners.lock() {
            Ok(mut listeners) => listeners.push(Arc::new(listener)),
            Err(_) => warn!("event bus lock poisoned, dropping subscription"),
        }
    }

    /// Deliver `event` to every listener in subscription order.
    ///
    /// Listeners run outside the lock and may subscribe or publish themselves;
    /// a listener added during delivery first sees the next event.
    pub fn publish(&self, event: &DocumentEvent) {
        let listeners = match self.listeners.lock() {
            Ok(listeners) => listeners.clone(),
            Err(_) => {
                warn!(?event, "event bus lock poisoned, dropping event");
                return;
            }
        };
        for listener in &listeners {
            listener(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.listeners.lock().map(|l| l.len()).unwrap_or(0);
        f.debug_struct("EventBus").field("listeners", &count).finish()
    }
}
