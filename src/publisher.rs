//! Notification side-channel publishers.
//!
//! A `Marketplace` mirrors every stored notification to its configured
//! publisher so in-process consumers get a push without running a store
//! subscription. Publish failures never roll back the store write they
//! mirror.

use std::fmt;
use std::sync::{Arc, Mutex};

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishError {
    message: String,
}

impl PublishError {
    pub fn new(message: impl Into<String>) -> Self {
        PublishError {
            message: message.into(),
        }
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "notification publish failed: {}", self.message)
    }
}

impl std::error::Error for PublishError {}

/// Sink for notification events mirrored out of the store.
pub trait NotificationPublisher: Send {
    /// Publish an event type plus a JSON payload.
    fn publish(&mut self, event_type: &str, payload: &str) -> Result<(), PublishError>;
}

/// Logs events to stdout, or to a shared buffer when one is attached.
pub struct LogPublisher {
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl Default for LogPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl LogPublisher {
    pub fn new() -> Self {
        LogPublisher { buffer: None }
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        LogPublisher {
            buffer: Some(buffer),
        }
    }
}

impl NotificationPublisher for LogPublisher {
    fn publish(&mut self, event_type: &str, payload: &str) -> Result<(), PublishError> {
        let line = format!("[NOTIFY] {} {}", event_type, payload);
        if let Some(buffer) = &self.buffer {
            buffer
                .lock()
                .map_err(|_| PublishError::new("publish buffer poisoned"))?
                .push(line);
        } else {
            println!("{}", line);
        }
        Ok(())
    }
}

/// Emits events through an `EventEmitter` for in-process subscribers.
///
/// Register listeners on the emitter before handing it over.
#[cfg(feature = "emitter")]
pub struct EmitterPublisher {
    emitter: EventEmitter,
}

#[cfg(feature = "emitter")]
impl EmitterPublisher {
    pub fn new(emitter: EventEmitter) -> Self {
        EmitterPublisher { emitter }
    }
}

#[cfg(feature = "emitter")]
impl NotificationPublisher for EmitterPublisher {
    fn publish(&mut self, event_type: &str, payload: &str) -> Result<(), PublishError> {
        self.emitter.emit(event_type, payload.to_string());
        Ok(())
    }
}
