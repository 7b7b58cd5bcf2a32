use serde::{Deserialize, Serialize};

use crate::error::{NavError, Result};

/// Index carried by the record that represents the primary surface.
pub const ROOT_INDEX: i64 = -1;

/// Payload attached to every host history entry written by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl HistoryRecord {
    pub fn new(index: i64, path: impl Into<String>) -> Self {
        Self {
            index,
            path: Some(path.into()),
        }
    }

    pub fn root(root_path: &str) -> Self {
        Self::new(ROOT_INDEX, root_path)
    }

    pub fn is_root(&self) -> bool {
        self.index < 0
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|err| NavError::MalformedRecord(err.to_string()))
    }
}

/// Host report that the session history cursor moved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionChange {
    pub record: Option<HistoryRecord>,
}

impl PositionChange {
    pub fn new(record: Option<HistoryRecord>) -> Self {
        Self { record }
    }

    pub fn to(index: i64, path: impl Into<String>) -> Self {
        Self::new(Some(HistoryRecord::new(index, path)))
    }

    pub fn without_record() -> Self {
        Self::default()
    }
}
