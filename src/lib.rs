//! Client-side navigation engine for single-page applications.
//!
//! A [`Navigator`] keeps one persistent view per primary page, a bounded-cache
//! stack of drilled-in destinations, and keeps that stack in agreement with
//! the host's native session history so back and forward buttons, reloads and
//! deep links all land on the right view. Open modals can claim a back press,
//! and the layout compositor decides which panes are visible for the current
//! viewport.

pub mod audit;
pub mod driver;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod history;
pub mod layout;
pub mod logging;
pub mod metrics;
pub mod modal;
pub mod primary;
pub mod render;
pub mod stack;
pub mod view;
pub mod width;

pub use audit::{
    BufferedAudit, NavigationAudit, NavigationAuditEvent, NavigationAuditEventBuilder,
    NavigationAuditStage, NullAudit,
};
pub use driver::{CliDriver, CliDriverError, DriverCommand, DriverResult};
pub use engine::{NavEvent, NavigationState, Navigator, NavigatorConfig, PaneText};
pub use error::{NavError, Result};
pub use geometry::{Rect, Size};
pub use history::{
    HistoryRecord, HistorySynchronizer, LegacyPrefix, MemoryHistory, NotificationSource,
    PositionChange, ROOT_INDEX, SessionHistory,
};
pub use layout::{
    Composition, LayoutMode, LayoutPreferences, PaneContent, PinnedColumn, ViewportClass,
};
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use metrics::{MetricSnapshot, NavigationMetrics};
pub use modal::{InterceptCallback, ModalId, ModalInterceptionBridge};
pub use primary::{
    PageProps, PrimaryNavigation, PrimaryPageDefinition, PrimaryPageName, PrimaryPageRegistry,
};
pub use render::{AnsiRenderer, RendererSettings};
pub use stack::{PopOutcome, PushOutcome, SecondaryStack, StackItem};
pub use view::{
    ResolvedView, RouteTable, ScrollBehavior, TextView, View, ViewControl, ViewFactory,
};
pub use width::display_width;
