use std::collections::VecDeque;

use crate::error::Result;

use super::record::{HistoryRecord, PositionChange};

/// Session-history primitives offered by the host environment.
pub trait SessionHistory {
    /// Create a new entry after the current one, discarding forward entries.
    fn write(&mut self, record: &HistoryRecord, address: &str) -> Result<()>;
    /// Overwrite the current entry in place.
    fn replace(&mut self, record: Option<&HistoryRecord>, address: &str) -> Result<()>;
    fn move_back(&mut self, steps: usize) -> Result<()>;
    fn move_forward(&mut self, steps: usize) -> Result<()>;
    fn current_address(&self) -> String;
    /// Record of the current entry; malformed payloads read as `None`.
    fn current_record(&self) -> Option<HistoryRecord>;
}

/// Hosts that queue position changes for the navigator to drain.
pub trait NotificationSource {
    fn take_notification(&mut self) -> Option<PositionChange>;
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    record: Option<String>,
    address: String,
}

/// In-process session history.
///
/// Cursor moves enqueue one [`PositionChange`] per call, mirroring a browser
/// that delivers a single notification for `go(-n)`.
#[derive(Debug)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    pending: VecDeque<PositionChange>,
    back_requests: Vec<usize>,
    forward_requests: Vec<usize>,
}

impl MemoryHistory {
    pub fn new(initial_address: impl Into<String>) -> Self {
        Self {
            entries: vec![HistoryEntry {
                record: None,
                address: initial_address.into(),
            }],
            cursor: 0,
            pending: VecDeque::new(),
            back_requests: Vec::new(),
            forward_requests: Vec::new(),
        }
    }

    /// Append an entry with an arbitrary raw payload, as foreign code would.
    pub fn push_foreign(&mut self, raw_record: Option<&str>, address: impl Into<String>) {
        self.append(raw_record.map(str::to_string), address.into());
    }

    /// Simulate the user pressing the back button.
    pub fn press_back(&mut self) {
        self.seek(-1);
    }

    /// Simulate the user pressing the forward button.
    pub fn press_forward(&mut self) {
        self.seek(1);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn addresses(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.address.clone())
            .collect()
    }

    /// Step counts passed to [`SessionHistory::move_back`], in call order.
    pub fn back_requests(&self) -> &[usize] {
        &self.back_requests
    }

    /// Step counts passed to [`SessionHistory::move_forward`], in call order.
    pub fn forward_requests(&self) -> &[usize] {
        &self.forward_requests
    }

    pub fn pending_notifications(&self) -> usize {
        self.pending.len()
    }

    fn append(&mut self, record: Option<String>, address: String) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry { record, address });
        self.cursor = self.entries.len() - 1;
    }

    fn seek(&mut self, delta: isize) {
        let last = self.entries.len().saturating_sub(1) as isize;
        let target = (self.cursor as isize + delta).clamp(0, last) as usize;
        if target == self.cursor {
            return;
        }
        self.cursor = target;
        let record = self.decode_current();
        self.pending.push_back(PositionChange::new(record));
    }

    fn decode_current(&self) -> Option<HistoryRecord> {
        self.entries
            .get(self.cursor)
            .and_then(|entry| entry.record.as_deref())
            .and_then(|raw| HistoryRecord::decode(raw).ok())
    }
}

impl SessionHistory for MemoryHistory {
    fn write(&mut self, record: &HistoryRecord, address: &str) -> Result<()> {
        let raw = record.encode()?;
        self.append(Some(raw), address.to_string());
        Ok(())
    }

    fn replace(&mut self, record: Option<&HistoryRecord>, address: &str) -> Result<()> {
        let raw = record.map(HistoryRecord::encode).transpose()?;
        if let Some(entry) = self.entries.get_mut(self.cursor) {
            entry.record = raw;
            entry.address = address.to_string();
        }
        Ok(())
    }

    fn move_back(&mut self, steps: usize) -> Result<()> {
        self.back_requests.push(steps);
        self.seek(-(steps as isize));
        Ok(())
    }

    fn move_forward(&mut self, steps: usize) -> Result<()> {
        self.forward_requests.push(steps);
        self.seek(steps as isize);
        Ok(())
    }

    fn current_address(&self) -> String {
        self.entries
            .get(self.cursor)
            .map(|entry| entry.address.clone())
            .unwrap_or_default()
    }

    fn current_record(&self) -> Option<HistoryRecord> {
        self.decode_current()
    }
}

impl NotificationSource for MemoryHistory {
    fn take_notification(&mut self) -> Option<PositionChange> {
        self.pending.pop_front()
    }
}
