//! Native session-history bridge.
//!
//! `record` defines the `{index, path}` payload written into every entry,
//! `host` the primitives a host offers (plus an in-memory host), `address` the
//! startup normalization helpers, and `sync` the reconciliation rules that turn
//! host notifications into stack changes.

mod address;
mod host;
mod record;
mod sync;

pub use address::{
    AddressParts, LegacyPrefix, default_legacy_prefixes, is_root_address, normalize_legacy,
    query_param, split_address,
};
pub use host::{MemoryHistory, NotificationSource, SessionHistory};
pub use record::{HistoryRecord, PositionChange, ROOT_INDEX};
pub use sync::{HistorySynchronizer, ReconcilePlan, Reconciliation, StartupPlan, StartupReport};
