use crate::error::Result;
use crate::stack::SecondaryStack;

use super::address::{LegacyPrefix, is_root_address, normalize_legacy, query_param};
use super::host::SessionHistory;
use super::record::HistoryRecord;

/// What the navigator should do with the address found at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupPlan {
    /// Nothing to reconcile; the primary surface is showing.
    Root,
    /// The address named a relay; open the relay primary page instead.
    Relay { url: String },
    /// A deep link that becomes the first stack item. `reload` is true when
    /// the host entry already carried a record, so the entries beneath it
    /// survive from the earlier session.
    DeepLink { record: HistoryRecord, reload: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupReport {
    /// `(original, rewritten)` when a legacy prefix was normalized.
    pub normalized: Option<(String, String)>,
    pub plan: StartupPlan,
}

/// Stack change implied by a host position-change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    ClearToRoot,
    Forward { index: i64, path: String },
    Noop,
    Backward { index: i64, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub action: Reconciliation,
    /// True when the record was missing or incomplete and the visible address
    /// had to stand in for it.
    pub synthesized: bool,
}

/// Bridges the secondary stack and native session history.
#[derive(Debug, Clone)]
pub struct HistorySynchronizer {
    root_path: String,
    legacy_prefixes: Vec<LegacyPrefix>,
    relay_query_key: String,
    started: bool,
}

impl HistorySynchronizer {
    pub fn new(
        root_path: impl Into<String>,
        legacy_prefixes: Vec<LegacyPrefix>,
        relay_query_key: impl Into<String>,
    ) -> Self {
        Self {
            root_path: root_path.into(),
            legacy_prefixes,
            relay_query_key: relay_query_key.into(),
            started: false,
        }
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn has_started(&self) -> bool {
        self.started
    }

    /// Normalize the initial address and decide how it enters the engine.
    /// Returns `None` on every call after the first.
    pub fn startup(&mut self, host: &mut dyn SessionHistory) -> Result<Option<StartupReport>> {
        if self.started {
            return Ok(None);
        }
        self.started = true;

        let mut address = host.current_address();
        let mut normalized = None;
        if let Some(rewritten) = normalize_legacy(&address, &self.legacy_prefixes) {
            let record = host.current_record();
            host.replace(record.as_ref(), &rewritten)?;
            normalized = Some((address, rewritten.clone()));
            address = rewritten;
        }

        let plan = if let Some(url) = query_param(&address, &self.relay_query_key) {
            StartupPlan::Relay { url }
        } else if is_root_address(&address, &self.root_path) {
            StartupPlan::Root
        } else {
            // A reload keeps the record of the entry; a fresh deep link has none.
            let previous = host.current_record().filter(|record| !record.is_root());
            let index = previous.as_ref().map_or(0, |record| record.index);
            StartupPlan::DeepLink {
                record: HistoryRecord::new(index, address),
                reload: previous.is_some(),
            }
        };

        Ok(Some(StartupReport { normalized, plan }))
    }

    /// Write the history entry for a freshly pushed item.
    pub fn record_push(&self, host: &mut dyn SessionHistory, index: i64, path: &str) -> Result<()> {
        host.write(&HistoryRecord::new(index, path), path)
    }

    /// Reset the host address to root after the stack emptied.
    pub fn reset_to_root(&self, host: &mut dyn SessionHistory) -> Result<bool> {
        if is_root_address(&host.current_address(), &self.root_path) {
            return Ok(false);
        }
        host.replace(Some(&HistoryRecord::root(&self.root_path)), &self.root_path)?;
        Ok(true)
    }

    /// Map a reported record onto a stack change.
    ///
    /// A missing record away from root is answered with a best-effort record
    /// built from the visible address: the index of the newest stack item with
    /// that path, or the next index when the path is unknown.
    pub fn classify(
        &self,
        record: Option<HistoryRecord>,
        current_address: &str,
        stack: &SecondaryStack,
    ) -> ReconcilePlan {
        let at_root = is_root_address(current_address, &self.root_path);
        let mut synthesized = false;

        let record = match record {
            Some(record) => record,
            None if at_root => HistoryRecord::root(&self.root_path),
            None => {
                synthesized = true;
                HistoryRecord::new(
                    self.synthesize_index(current_address, stack),
                    current_address,
                )
            }
        };

        let index = record.index;
        let path = match record.path {
            Some(path) => path,
            None if at_root => {
                return ReconcilePlan {
                    action: Reconciliation::ClearToRoot,
                    synthesized: true,
                };
            }
            None => {
                synthesized = true;
                current_address.to_string()
            }
        };

        let action = if index < 0 || is_root_address(&path, &self.root_path) {
            Reconciliation::ClearToRoot
        } else {
            match stack.top_index() {
                Some(top) if index == top => Reconciliation::Noop,
                Some(top) if index < top => Reconciliation::Backward { index, path },
                _ => Reconciliation::Forward { index, path },
            }
        };

        ReconcilePlan {
            action,
            synthesized,
        }
    }

    fn synthesize_index(&self, address: &str, stack: &SecondaryStack) -> i64 {
        stack
            .find_path(address)
            .or_else(|| stack.top_index().map(|top| top + 1))
            .unwrap_or(0)
    }
}
