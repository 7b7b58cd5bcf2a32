use thiserror::Error;

/// Unified result type for the navdeck crate.
pub type Result<T> = std::result::Result<T, NavError>;

/// Errors surfaced by the navigation engine.
///
/// Route misses and malformed history records are normally absorbed by the
/// reducer; they only escape through helpers that callers invoke directly.
#[derive(Debug, Error)]
pub enum NavError {
    #[error("no route matches `{0}`")]
    NoRouteMatch(String),
    #[error("malformed history record: {0}")]
    MalformedRecord(String),
    #[error("unknown primary page `{0}`")]
    UnknownPrimaryPage(String),
    #[error("session history error: {0}")]
    Host(String),
    #[error("record encoding error: {0}")]
    Record(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
