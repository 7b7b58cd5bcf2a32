//! Navigation audit trail.
//!
//! Each reducer decision can be recorded as a [`NavigationAuditEvent`] with a
//! stage plus structured details, so callers can replay what the engine did
//! with a host notification without parsing log lines.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Distinct checkpoints emitted by the navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAuditStage {
    /// A stack item was appended.
    Pushed,
    /// A push targeted the path already on top.
    DuplicateIgnored,
    /// The view factory had no route for a path.
    RouteMissed,
    /// A stack item dropped its view instance.
    Evicted,
    /// An evicted item was resolved again.
    Restored,
    /// A host notification was reconciled into the stack.
    Reconciled,
    /// A modal claimed the back gesture.
    Intercepted,
    /// The compensating forward step was swallowed.
    EchoIgnored,
    /// The startup address was rewritten.
    Normalized,
    /// The current primary page changed.
    PrimarySwitched,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct NavigationAuditEvent {
    pub timestamp: SystemTime,
    pub stage: NavigationAuditStage,
    pub details: Vec<(String, Value)>,
}

impl NavigationAuditEvent {
    fn new(stage: NavigationAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

pub struct NavigationAuditEventBuilder {
    event: NavigationAuditEvent,
}

impl NavigationAuditEventBuilder {
    pub fn new(stage: NavigationAuditStage) -> Self {
        Self {
            event: NavigationAuditEvent::new(stage),
        }
    }

    pub fn detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.event.details.push((key.into(), value.into()));
        self
    }

    pub fn finish(self) -> NavigationAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait NavigationAudit: Send + Sync {
    fn record(&self, event: NavigationAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullAudit;

impl NavigationAudit for NullAudit {
    fn record(&self, _event: NavigationAuditEvent) {}
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct BufferedAudit {
    events: Mutex<Vec<NavigationAuditEvent>>,
}

impl BufferedAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NavigationAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<NavigationAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }

    pub fn count(&self, stage: NavigationAuditStage) -> usize {
        self.events()
            .iter()
            .filter(|event| event.stage == stage)
            .count()
    }
}

impl NavigationAudit for BufferedAudit {
    fn record(&self, event: NavigationAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
