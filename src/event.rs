//! Lifecycle and request events, and the observer boundary they flow
//! through.
//!
//! Core components hand events to an [`EventNotifier`] and never learn who,
//! if anyone, is listening. Observers are attached once at startup; the
//! notifier traps every observer error so instrumentation can never break
//! request handling.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// The fixed event vocabulary. The wire names are part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ServerStarting,
    ServerStarted,
    ServerShuttingDown,
    ServerStopped,
    RouteRegistered,
    RequestStarted,
    RequestHandled,
    RequestNotFound,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::ServerStarting => "server.starting",
            EventKind::ServerStarted => "server.started",
            EventKind::ServerShuttingDown => "server.shutting_down",
            EventKind::ServerStopped => "server.stopped",
            EventKind::RouteRegistered => "route.registered",
            EventKind::RequestStarted => "request.started",
            EventKind::RequestHandled => "request.handled",
            EventKind::RequestNotFound => "request.not_found",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success/failure classification of an event, derived from the associated
/// HTTP status or from whether the operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventStatus {
    Success,
    Error,
}

impl EventStatus {
    /// Classify from an HTTP status code: success iff `status < 400`.
    pub fn from_http(status: u16) -> Self {
        if status < 400 {
            EventStatus::Success
        } else {
            EventStatus::Error
        }
    }
}

/// A notification emitted at a lifecycle or request milestone.
///
/// Events are ephemeral value objects: constructed, handed to the
/// notifier, never retained by the core.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub status: EventStatus,
    pub attributes: HashMap<String, String>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, status: EventStatus) -> Self {
        Self {
            kind,
            status,
            attributes: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl ToString) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }
}

/// An external collaborator that receives events.
///
/// Observers are called inline on the dispatch path and must not block;
/// expensive work (exporting, batching) has to be handed off internally.
pub trait Observer: Send + Sync {
    fn observe(&self, event: &Event) -> Result<()>;
}

/// Fans events out to zero or more observers.
///
/// The observer list is fixed before the listener starts accepting
/// requests and read-only afterwards, so concurrent `notify` calls need
/// no locking. With zero observers this is a no-op and the server behaves
/// identically.
#[derive(Default)]
pub struct EventNotifier {
    observers: Vec<Arc<dyn Observer>>,
}

impl EventNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an observer. Must happen before serving begins.
    pub fn register(&mut self, observer: Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Deliver an event to every observer. An observer error is logged
    /// and discarded, never re-raised to the caller.
    pub fn notify(&self, event: Event) {
        for observer in &self.observers {
            if let Err(error) = observer.observe(&event) {
                warn!(event = %event.kind, error = %error, "Observer failed");
            }
        }
    }
}

/// Bundled observer that mirrors every event into the log stream.
pub struct LogObserver;

impl Observer for LogObserver {
    fn observe(&self, event: &Event) -> Result<()> {
        info!(
            event = %event.kind,
            status = ?event.status,
            attributes = ?event.attributes,
            "Event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recording {
        seen: Mutex<Vec<Event>>,
    }

    impl Recording {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Observer for Recording {
        fn observe(&self, event: &Event) -> Result<()> {
            self.seen.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    struct AlwaysFails;

    impl Observer for AlwaysFails {
        fn observe(&self, _event: &Event) -> Result<()> {
            anyhow::bail!("observer blew up")
        }
    }

    #[test]
    fn test_event_wire_names() {
        assert_eq!(EventKind::ServerStarting.as_str(), "server.starting");
        assert_eq!(EventKind::ServerStopped.as_str(), "server.stopped");
        assert_eq!(EventKind::RouteRegistered.as_str(), "route.registered");
        assert_eq!(EventKind::RequestNotFound.as_str(), "request.not_found");
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(EventStatus::from_http(200), EventStatus::Success);
        assert_eq!(EventStatus::from_http(399), EventStatus::Success);
        assert_eq!(EventStatus::from_http(400), EventStatus::Error);
        assert_eq!(EventStatus::from_http(503), EventStatus::Error);
    }

    #[test]
    fn test_notify_with_zero_observers_is_noop() {
        let notifier = EventNotifier::new();
        notifier.notify(Event::new(EventKind::ServerStarted, EventStatus::Success));
    }

    #[test]
    fn test_notify_fans_out_with_attributes() {
        let recording = Recording::new();
        let mut notifier = EventNotifier::new();
        notifier.register(recording.clone());

        notifier.notify(
            Event::new(EventKind::RequestHandled, EventStatus::Success)
                .with_attr("method", "GET")
                .with_attr("url", "/ping")
                .with_attr("status", 200),
        );

        let seen = recording.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].kind, EventKind::RequestHandled);
        assert_eq!(seen[0].attributes["method"], "GET");
        assert_eq!(seen[0].attributes["status"], "200");
    }

    #[test]
    fn test_failing_observer_does_not_stop_the_rest() {
        let recording = Recording::new();
        let mut notifier = EventNotifier::new();
        notifier.register(Arc::new(AlwaysFails));
        notifier.register(recording.clone());

        notifier.notify(Event::new(EventKind::RequestStarted, EventStatus::Success));
        notifier.notify(Event::new(EventKind::RequestHandled, EventStatus::Success));

        assert_eq!(recording.seen.lock().unwrap().len(), 2);
    }
}
