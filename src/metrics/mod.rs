use crate::logging::{LogEvent, LogFields, LogLevel};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Default, Clone)]
pub struct NavigationMetrics {
    pushes: u64,
    duplicate_pushes: u64,
    route_misses: u64,
    evictions: u64,
    restores: u64,
    reconciliations: u64,
    intercepts: u64,
    echoes_ignored: u64,
    primary_switches: u64,
}

impl NavigationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_push(&mut self) {
        self.pushes = self.pushes.saturating_add(1);
    }

    pub fn record_duplicate_push(&mut self) {
        self.duplicate_pushes = self.duplicate_pushes.saturating_add(1);
    }

    pub fn record_route_miss(&mut self) {
        self.route_misses = self.route_misses.saturating_add(1);
    }

    pub fn record_evictions(&mut self, count: usize) {
        if count > 0 {
            self.evictions = self.evictions.saturating_add(count as u64);
        }
    }

    pub fn record_restore(&mut self) {
        self.restores = self.restores.saturating_add(1);
    }

    pub fn record_reconciliation(&mut self) {
        self.reconciliations = self.reconciliations.saturating_add(1);
    }

    pub fn record_intercept(&mut self) {
        self.intercepts = self.intercepts.saturating_add(1);
    }

    pub fn record_echo_ignored(&mut self) {
        self.echoes_ignored = self.echoes_ignored.saturating_add(1);
    }

    pub fn record_primary_switch(&mut self) {
        self.primary_switches = self.primary_switches.saturating_add(1);
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            pushes: self.pushes,
            duplicate_pushes: self.duplicate_pushes,
            route_misses: self.route_misses,
            evictions: self.evictions,
            restores: self.restores,
            reconciliations: self.reconciliations,
            intercepts: self.intercepts,
            echoes_ignored: self.echoes_ignored,
            primary_switches: self.primary_switches,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub pushes: u64,
    pub duplicate_pushes: u64,
    pub route_misses: u64,
    pub evictions: u64,
    pub restores: u64,
    pub reconciliations: u64,
    pub intercepts: u64,
    pub echoes_ignored: u64,
    pub primary_switches: u64,
}

impl MetricSnapshot {
    pub fn as_fields(&self) -> LogFields {
        match json!(self) {
            serde_json::Value::Object(map) => map,
            _ => LogFields::new(),
        }
    }

    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "navigation_metrics", self.as_fields())
    }
}
