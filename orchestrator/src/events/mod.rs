//! Event bus: a `tokio::sync::broadcast`-backed pub/sub carrying the exact
//! event set the core publishes. Structurally mirrors the teacher's
//! `td/src/events/bus.rs`, trimmed to the events named by this system.

mod types;

pub use types::Event;

use tokio::sync::broadcast;
use tracing::debug;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_000;

/// Central event bus. Cheap to clone via `Arc`, emits are fire-and-forget.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event. Dropped silently if there are no subscribers.
    pub fn emit(&self, event: Event) {
        debug!(event = event.name(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn emitter(&self) -> EventEmitter {
        EventEmitter { tx: self.tx.clone() }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Cheaply-cloneable handle for emitting without owning the bus.
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<Event>,
}

impl EventEmitter {
    pub fn emit(&self, event: Event) {
        let _ = self.tx.send(event);
    }

    pub fn app_error(&self, message: impl Into<String>) {
        self.emit(Event::AppError { message: message.into() });
    }

    pub fn task_failed(&self, task_id: impl Into<String>, message: impl Into<String>) {
        self.emit(Event::TaskFailed {
            task_id: task_id.into(),
            message: message.into(),
        });
    }

    pub fn context_generation_started(&self, task_id: impl Into<String>) {
        self.emit(Event::ShotgunContextGenerationStarted { task_id: task_id.into() });
    }

    pub fn context_generation_progress(&self, task_id: impl Into<String>, progress: f64) {
        self.emit(Event::ShotgunContextGenerationProgress {
            task_id: task_id.into(),
            progress,
        });
    }

    pub fn context_generation_timeout(&self, task_id: impl Into<String>) {
        self.emit(Event::ShotgunContextGenerationTimeout { task_id: task_id.into() });
    }

    pub fn context_generation_failed(&self, task_id: impl Into<String>, message: impl Into<String>) {
        self.emit(Event::ShotgunContextGenerationFailed {
            task_id: task_id.into(),
            message: message.into(),
        });
    }

    pub fn context_generation_generated(&self, task_id: impl Into<String>) {
        self.emit(Event::ShotgunContextGenerationGenerated { task_id: task_id.into() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_is_received_by_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.emit(Event::AppError { message: "boom".into() });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.name(), "app:error");
    }

    #[tokio::test]
    async fn emit_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.emit(Event::TaskFailed {
            task_id: "t1".into(),
            message: "boom".into(),
        });
    }

    #[tokio::test]
    async fn emitter_convenience_methods() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter();
        emitter.task_failed("t1", "nope");
        let event = rx.recv().await.unwrap();
        match event {
            Event::TaskFailed { task_id, message } => {
                assert_eq!(task_id, "t1");
                assert_eq!(message, "nope");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
