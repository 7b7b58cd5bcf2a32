use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::json;

use crate::audit::{NavigationAudit, NavigationAuditEventBuilder, NavigationAuditStage, NullAudit};
use crate::error::{NavError, Result};
use crate::history::{
    HistorySynchronizer, LegacyPrefix, NotificationSource, PositionChange, Reconciliation,
    SessionHistory, StartupPlan, default_legacy_prefixes,
};
use crate::layout::{Composition, CompositionInput, LayoutPreferences, PaneContent, PinnedColumn, ViewportClass, compose};
use crate::logging::{ENGINE_TARGET, HISTORY_TARGET, LogLevel, Logger, STACK_TARGET, event_with_fields, json_kv};
use crate::metrics::NavigationMetrics;
use crate::modal::{InterceptCallback, ModalId, ModalInterceptionBridge};
use crate::primary::{PageProps, PrimaryNavigation, PrimaryPageName, PrimaryPageRegistry};
use crate::stack::{PopOutcome, PushOutcome, RestoreOutcome, SecondaryStack};
use crate::view::{ViewFactory, ViewHandle};

/// Configuration knobs for the navigator.
#[derive(Clone)]
pub struct NavigatorConfig {
    /// Number of trailing stack items that keep their view resident. Values
    /// below one are raised to one.
    pub max_stack_size: usize,
    /// Address of the primary surface.
    pub root_path: String,
    /// Startup rewrites for bare identifier addresses.
    pub legacy_prefixes: Vec<LegacyPrefix>,
    /// Query parameter that opens the relay page at startup.
    pub relay_query_key: String,
    /// Optional structured logger used by the navigator.
    pub logger: Option<Logger>,
    /// Metrics accumulator shared with whoever emits snapshots.
    pub metrics: Option<Arc<Mutex<NavigationMetrics>>>,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            max_stack_size: 3,
            root_path: "/".to_string(),
            legacy_prefixes: default_legacy_prefixes(),
            relay_query_key: "r".to_string(),
            logger: None,
            metrics: None,
            metrics_target: "navdeck::metrics".to_string(),
        }
    }
}

impl NavigatorConfig {
    pub fn with_max_stack_size(mut self, max_stack_size: usize) -> Self {
        self.max_stack_size = max_stack_size;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(NavigationMetrics::new())));
        }
    }

    pub fn metrics_handle(&self) -> Option<Arc<Mutex<NavigationMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// Inputs the reducer accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum NavEvent {
    Navigate {
        page: PrimaryPageName,
        props: Option<PageProps>,
    },
    Push {
        path: String,
    },
    Pop,
    Clear,
    HostNotification(PositionChange),
}

/// Process-wide navigation state.
#[derive(Debug)]
pub struct NavigationState {
    pub current_primary: PrimaryPageName,
    pub secondary_stack: SecondaryStack,
    pub viewport: ViewportClass,
    active_interceptor: Option<ModalId>,
    pending_echo_ignore: bool,
}

impl NavigationState {
    fn new(current_primary: PrimaryPageName, max_stack_size: usize) -> Self {
        Self {
            current_primary,
            secondary_stack: SecondaryStack::new(max_stack_size),
            viewport: ViewportClass::Large,
            active_interceptor: None,
            pending_echo_ignore: false,
        }
    }

    pub fn is_modal_intercept_active(&self) -> bool {
        self.active_interceptor.is_some()
    }

    pub fn active_interceptor(&self) -> Option<&str> {
        self.active_interceptor.as_deref()
    }

    /// True while the echo of a compensating forward step is outstanding.
    pub fn is_echo_pending(&self) -> bool {
        self.pending_echo_ignore
    }
}

/// Text shown for a pane.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaneText {
    pub title: String,
    pub body: String,
}

/// Single-threaded reducer over [`NavEvent`]s.
///
/// Every handler runs to completion before the next event is accepted, so the
/// state needs no locking. Host notifications are the only way the stack is
/// truncated; `pop` and `clear` merely ask the host to move.
pub struct Navigator<H, F> {
    config: NavigatorConfig,
    state: NavigationState,
    primary: PrimaryPageRegistry,
    modals: ModalInterceptionBridge,
    sync: HistorySynchronizer,
    host: H,
    factory: F,
    audit: Arc<dyn NavigationAudit>,
    started_at: Instant,
}

impl<H, F> Navigator<H, F>
where
    H: SessionHistory,
    F: ViewFactory,
{
    pub fn new(config: NavigatorConfig, primary: PrimaryPageRegistry, host: H, factory: F) -> Self {
        let sync = HistorySynchronizer::new(
            config.root_path.clone(),
            config.legacy_prefixes.clone(),
            config.relay_query_key.clone(),
        );
        let state = NavigationState::new(primary.default_page(), config.max_stack_size);
        Self {
            config,
            state,
            primary,
            modals: ModalInterceptionBridge::new(),
            sync,
            host,
            factory,
            audit: Arc::new(NullAudit),
            started_at: Instant::now(),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn NavigationAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn stack(&self) -> &SecondaryStack {
        &self.state.secondary_stack
    }

    pub fn current_primary(&self) -> PrimaryPageName {
        self.state.current_primary
    }

    pub fn primary(&self) -> &PrimaryPageRegistry {
        &self.primary
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn set_viewport(&mut self, viewport: ViewportClass) {
        if self.state.viewport != viewport {
            self.state.viewport = viewport;
            self.log(
                LogLevel::Debug,
                ENGINE_TARGET,
                "viewport_changed",
                [json_kv("viewport", json!(viewport))],
            );
        }
    }

    /// One-time startup normalization of the initial host address.
    pub fn startup(&mut self) -> Result<()> {
        let Some(report) = self.sync.startup(&mut self.host)? else {
            return Ok(());
        };

        if let Some((from, to)) = &report.normalized {
            self.log(
                LogLevel::Info,
                HISTORY_TARGET,
                "startup_normalized",
                [json_kv("from", json!(from)), json_kv("to", json!(to))],
            );
            self.audit(
                NavigationAuditEventBuilder::new(NavigationAuditStage::Normalized)
                    .detail("from", from.as_str())
                    .detail("to", to.as_str()),
            );
        }

        match report.plan {
            StartupPlan::Root => {}
            StartupPlan::Relay { url } => {
                self.navigate(PrimaryPageName::Relay, Some(json!({ "url": url })))?;
            }
            StartupPlan::DeepLink { record, reload } => {
                let path = record.path.clone().unwrap_or_default();
                self.reconcile_forward(record.index, &path);
                if reload {
                    self.host.replace(Some(&record), &path)?;
                } else {
                    // A fresh deep link is the host's only entry. Turn it into
                    // root and stack the link above so clear can unwind to it.
                    self.sync.reset_to_root(&mut self.host)?;
                    self.sync.record_push(&mut self.host, record.index, &path)?;
                }
                self.log(
                    LogLevel::Info,
                    HISTORY_TARGET,
                    "startup_deep_link",
                    [
                        json_kv("index", json!(record.index)),
                        json_kv("path", json!(path)),
                        json_kv("reload", json!(reload)),
                    ],
                );
            }
        }
        Ok(())
    }

    pub fn dispatch(&mut self, event: NavEvent) -> Result<()> {
        match event {
            NavEvent::Navigate { page, props } => self.navigate(page, props).map(|_| ()),
            NavEvent::Push { path } => self.push(&path).map(|_| ()),
            NavEvent::Pop => self.pop().map(|_| ()),
            NavEvent::Clear => self.clear().map(|_| ()),
            NavEvent::HostNotification(change) => self.handle_position_change(change),
        }
    }

    /// Switch primary page. On small viewports the secondary stack is cleared
    /// first, like switching tabs.
    pub fn navigate(
        &mut self,
        page: PrimaryPageName,
        props: Option<PageProps>,
    ) -> Result<PrimaryNavigation> {
        if !self.primary.is_defined(page) {
            return Err(NavError::UnknownPrimaryPage(page.to_string()));
        }
        if self.state.viewport == ViewportClass::Small {
            self.clear()?;
        }

        let outcome = self
            .primary
            .navigate(self.state.current_primary, page, props)?;
        match outcome {
            PrimaryNavigation::Switched { created } => {
                let from = self.state.current_primary;
                self.state.current_primary = page;
                self.record_metric(NavigationMetrics::record_primary_switch);
                self.log(
                    LogLevel::Info,
                    ENGINE_TARGET,
                    "primary_navigate",
                    [
                        json_kv("from", json!(from)),
                        json_kv("to", json!(page)),
                        json_kv("created", json!(created)),
                    ],
                );
                self.audit(
                    NavigationAuditEventBuilder::new(NavigationAuditStage::PrimarySwitched)
                        .detail("page", page.as_str())
                        .detail("created", created),
                );
            }
            PrimaryNavigation::ScrolledToTop => {
                self.log(
                    LogLevel::Debug,
                    ENGINE_TARGET,
                    "primary_scroll_to_top",
                    [json_kv("page", json!(page))],
                );
            }
        }
        Ok(outcome)
    }

    /// Push `path` and write its history entry.
    pub fn push(&mut self, path: &str) -> Result<PushOutcome> {
        let outcome = self
            .state
            .secondary_stack
            .push(path, None, &self.factory);
        match &outcome {
            PushOutcome::Pushed {
                index,
                path,
                evicted,
            } => {
                self.sync.record_push(&mut self.host, *index, path)?;
                self.note_pushed(*index, path, evicted, false);
            }
            PushOutcome::DuplicateOfTop => self.note_duplicate(path),
            PushOutcome::NoRoute => self.note_route_miss(path, None),
        }
        Ok(outcome)
    }

    pub fn pop(&mut self) -> Result<PopOutcome> {
        let root = self.sync.root_path().to_string();
        let outcome = self.state.secondary_stack.pop(&mut self.host, &root)?;
        self.log(
            LogLevel::Debug,
            STACK_TARGET,
            "pop",
            [json_kv("outcome", json!(format!("{outcome:?}")))],
        );
        Ok(outcome)
    }

    /// Ask the host to unwind the whole stack in one move. Fire-and-forget:
    /// the stack empties as the resulting notifications are reconciled.
    pub fn clear(&mut self) -> Result<Option<usize>> {
        let steps = self.state.secondary_stack.clear(&mut self.host)?;
        if let Some(steps) = steps {
            self.log(
                LogLevel::Debug,
                STACK_TARGET,
                "clear_requested",
                [json_kv("steps", json!(steps))],
            );
        }
        Ok(steps)
    }

    pub fn register_modal(&mut self, id: impl Into<ModalId>, on_intercept: InterceptCallback) {
        self.modals.register(id, on_intercept);
        self.sync_interceptor();
    }

    pub fn unregister_modal(&mut self, id: &str) -> bool {
        let removed = self.modals.unregister(id);
        self.sync_interceptor();
        removed
    }

    fn sync_interceptor(&mut self) {
        self.state.active_interceptor = self.modals.active_id().map(str::to_string);
    }

    /// Reconcile a host position change.
    pub fn handle_position_change(&mut self, change: PositionChange) -> Result<()> {
        if self.state.pending_echo_ignore {
            self.state.pending_echo_ignore = false;
            self.record_metric(NavigationMetrics::record_echo_ignored);
            self.log(LogLevel::Debug, HISTORY_TARGET, "echo_ignored", std::iter::empty());
            self.audit(NavigationAuditEventBuilder::new(
                NavigationAuditStage::EchoIgnored,
            ));
            return Ok(());
        }

        if self.modals.is_active() {
            self.host.move_forward(1)?;
            let closed = self.modals.intercept();
            self.sync_interceptor();
            self.state.pending_echo_ignore = true;
            self.record_metric(NavigationMetrics::record_intercept);
            self.log(
                LogLevel::Info,
                HISTORY_TARGET,
                "intercept",
                [json_kv("modal", json!(closed))],
            );
            self.audit(
                NavigationAuditEventBuilder::new(NavigationAuditStage::Intercepted)
                    .detail("modal", json!(closed)),
            );
            return Ok(());
        }

        let address = self.host.current_address();
        let plan = self
            .sync
            .classify(change.record, &address, &self.state.secondary_stack);
        if plan.synthesized {
            self.log(
                LogLevel::Warn,
                HISTORY_TARGET,
                "record_synthesized",
                [json_kv("address", json!(address))],
            );
        }
        self.apply_reconciliation(plan.action)
    }

    fn apply_reconciliation(&mut self, action: Reconciliation) -> Result<()> {
        let (kind, index) = match &action {
            Reconciliation::ClearToRoot => ("root", None),
            Reconciliation::Forward { index, .. } => ("forward", Some(*index)),
            Reconciliation::Noop => ("noop", None),
            Reconciliation::Backward { index, .. } => ("backward", Some(*index)),
        };

        match action {
            Reconciliation::ClearToRoot => {
                self.state.secondary_stack.clear_items();
                self.sync.reset_to_root(&mut self.host)?;
            }
            Reconciliation::Noop => {}
            Reconciliation::Forward { index, path } => self.reconcile_forward(index, &path),
            Reconciliation::Backward { index, path } => {
                self.state.secondary_stack.truncate_to(index);
                if self.state.secondary_stack.is_empty() {
                    self.reconcile_forward(index, &path);
                } else {
                    self.restore_top();
                }
            }
        }

        self.record_metric(NavigationMetrics::record_reconciliation);
        self.log(
            LogLevel::Debug,
            HISTORY_TARGET,
            "reconcile",
            [
                json_kv("kind", json!(kind)),
                json_kv("index", json!(index)),
                json_kv("depth", json!(self.state.secondary_stack.len())),
            ],
        );
        self.audit(
            NavigationAuditEventBuilder::new(NavigationAuditStage::Reconciled)
                .detail("kind", kind)
                .detail("index", json!(index)),
        );
        Ok(())
    }

    /// Replay an existing history record onto the stack without writing a
    /// new entry. Unroutable records keep a placeholder item.
    fn reconcile_forward(&mut self, index: i64, path: &str) {
        match self
            .state
            .secondary_stack
            .push(path, Some(index), &self.factory)
        {
            PushOutcome::Pushed { evicted, .. } => self.note_pushed(index, path, &evicted, true),
            PushOutcome::DuplicateOfTop => self.note_duplicate(path),
            PushOutcome::NoRoute => {
                let evicted = self.state.secondary_stack.push_unresolved(path, index);
                self.note_route_miss(path, Some(index));
                self.note_evictions(&evicted);
            }
        }
    }

    fn restore_top(&mut self) {
        let outcome = self.state.secondary_stack.restore_top(&self.factory);
        let Some((index, path)) = self
            .state
            .secondary_stack
            .top()
            .map(|item| (item.index, item.path.clone()))
        else {
            return;
        };
        match outcome {
            RestoreOutcome::Restored => {
                self.record_metric(NavigationMetrics::record_restore);
                self.log(
                    LogLevel::Debug,
                    STACK_TARGET,
                    "restore",
                    [json_kv("index", json!(index)), json_kv("path", json!(path))],
                );
                self.audit(
                    NavigationAuditEventBuilder::new(NavigationAuditStage::Restored)
                        .detail("index", index)
                        .detail("path", path),
                );
            }
            RestoreOutcome::NoRoute => self.note_route_miss(&path, Some(index)),
            RestoreOutcome::AlreadyResident | RestoreOutcome::Empty => {}
        }
    }

    fn note_pushed(&self, index: i64, path: &str, evicted: &[i64], replayed: bool) {
        self.record_metric(NavigationMetrics::record_push);
        self.log(
            LogLevel::Info,
            STACK_TARGET,
            "push",
            [
                json_kv("index", json!(index)),
                json_kv("path", json!(path)),
                json_kv("replayed", json!(replayed)),
            ],
        );
        self.audit(
            NavigationAuditEventBuilder::new(NavigationAuditStage::Pushed)
                .detail("index", index)
                .detail("path", path)
                .detail("replayed", replayed),
        );
        self.note_evictions(evicted);
    }

    fn note_duplicate(&self, path: &str) {
        self.record_metric(NavigationMetrics::record_duplicate_push);
        self.log(
            LogLevel::Debug,
            STACK_TARGET,
            "push_ignored_duplicate",
            [json_kv("path", json!(path))],
        );
        self.audit(
            NavigationAuditEventBuilder::new(NavigationAuditStage::DuplicateIgnored)
                .detail("path", path),
        );
    }

    fn note_route_miss(&self, path: &str, index: Option<i64>) {
        self.record_metric(NavigationMetrics::record_route_miss);
        self.log(
            LogLevel::Warn,
            STACK_TARGET,
            "route_miss",
            [json_kv("path", json!(path)), json_kv("index", json!(index))],
        );
        self.audit(
            NavigationAuditEventBuilder::new(NavigationAuditStage::RouteMissed)
                .detail("path", path)
                .detail("index", json!(index)),
        );
    }

    fn note_evictions(&self, evicted: &[i64]) {
        if evicted.is_empty() {
            return;
        }
        self.record_metric(|metrics| metrics.record_evictions(evicted.len()));
        for index in evicted {
            self.log(
                LogLevel::Debug,
                STACK_TARGET,
                "eviction",
                [json_kv("index", json!(index))],
            );
            self.audit(
                NavigationAuditEventBuilder::new(NavigationAuditStage::Evicted)
                    .detail("index", *index),
            );
        }
    }

    /// Visible panes for the current state.
    pub fn compose(&self, preferences: LayoutPreferences, pinned: &[PinnedColumn]) -> Composition {
        compose(CompositionInput {
            viewport: self.state.viewport,
            preferences,
            pinned,
            primary: self.state.current_primary,
            stack: self.state.secondary_stack.items(),
        })
    }

    /// Mounted view behind a pane, if any.
    pub fn view_for(&self, content: &PaneContent) -> Option<ViewHandle> {
        match content {
            PaneContent::Primary(name) => self
                .primary
                .entry(*name)
                .map(|entry| entry.view.handle.clone()),
            PaneContent::StackItem { index, .. } => self
                .state
                .secondary_stack
                .get(*index)
                .and_then(|item| item.view_handle.clone()),
            PaneContent::Supplementary | PaneContent::Pinned { .. } => None,
        }
    }

    pub fn pane_text(&self, content: &PaneContent) -> PaneText {
        if let Some(view) = self.view_for(content) {
            return PaneText {
                title: view.title(),
                body: view.body(),
            };
        }
        match content {
            PaneContent::Primary(name) => PaneText {
                title: name.to_string(),
                body: String::new(),
            },
            // Evicted or unroutable items render nothing but their address.
            PaneContent::StackItem { path, .. } => PaneText {
                title: path.clone(),
                body: String::new(),
            },
            PaneContent::Supplementary => PaneText {
                title: String::new(),
                body: "Nothing open. Press : to enter a path.".to_string(),
            },
            PaneContent::Pinned { id, kind } => PaneText {
                title: kind.clone(),
                body: format!("pinned column {id}"),
            },
        }
    }

    /// Log a metrics snapshot if both a logger and metrics are configured.
    pub fn emit_metrics(&self) {
        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let event = guard
                    .snapshot(self.started_at.elapsed())
                    .to_log_event(&self.config.metrics_target);
                let _ = logger.log_event(event);
            }
        }
    }

    fn log<I>(&self, level: LogLevel, target: &str, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, target, message, fields);
            let _ = logger.log_event(event);
        }
    }

    fn record_metric(&self, apply: impl FnOnce(&mut NavigationMetrics)) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                apply(&mut guard);
            }
        }
    }

    fn audit(&self, builder: NavigationAuditEventBuilder) {
        self.audit.record(builder.finish());
    }
}

impl<H, F> Navigator<H, F>
where
    H: SessionHistory + NotificationSource,
    F: ViewFactory,
{
    /// Deliver queued host notifications one at a time. Returns how many were
    /// handled.
    pub fn pump(&mut self) -> Result<usize> {
        let mut handled = 0;
        while let Some(change) = self.host.take_notification() {
            self.handle_position_change(change)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Dispatch each event and drain the notifications it caused.
    pub fn run_scripted<I>(&mut self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = NavEvent>,
    {
        self.startup()?;
        for event in events {
            self.dispatch(event)?;
            self.pump()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;
    use crate::audit::BufferedAudit;
    use crate::history::{HistoryRecord, MemoryHistory, SessionHistory};
    use crate::layout::{Arrangement, LayoutMode};
    use crate::logging::MemorySink;
    use crate::primary::PrimaryPageDefinition;
    use crate::view::{RouteTable, TextView};

    type TestNavigator = Navigator<MemoryHistory, RouteTable>;

    fn routes() -> RouteTable {
        RouteTable::new()
            .route("/p/", |path| TextView::resolved(path, "page"))
            .route("/notes/", |path| TextView::resolved(path, "note"))
            .route("/users/", |path| TextView::resolved(path, "profile"))
            .route("/a", |path| TextView::resolved(path, ""))
            .route("/b", |path| TextView::resolved(path, ""))
            .route("/c", |path| TextView::resolved(path, ""))
    }

    fn registry() -> PrimaryPageRegistry {
        let definitions = PrimaryPageName::ALL.into_iter().map(|name| {
            PrimaryPageDefinition::new(name, move |_props| TextView::resolved(name.as_str(), ""))
        });
        PrimaryPageRegistry::new(definitions, PrimaryPageName::Home).expect("registry")
    }

    fn navigator_at(address: &str, config: NavigatorConfig) -> TestNavigator {
        let mut navigator = Navigator::new(config, registry(), MemoryHistory::new(address), routes());
        navigator.startup().expect("startup");
        navigator
    }

    fn navigator(max_stack_size: usize) -> TestNavigator {
        navigator_at(
            "/",
            NavigatorConfig::default().with_max_stack_size(max_stack_size),
        )
    }

    fn push_all(navigator: &mut TestNavigator, paths: &[&str]) {
        for path in paths {
            navigator.push(path).expect("push");
        }
    }

    #[test]
    fn indices_strictly_increase_from_bottom_to_top() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/a", "/b", "/missing", "/c", "/p/1", "/p/1", "/p/2"]);
        let indices = nav.stack().indices();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn duplicate_push_changes_nothing_and_writes_no_entry() {
        let mut nav = navigator(3);
        nav.push("/a").unwrap();
        let entries = nav.host().len();
        let handle = nav.stack().top().and_then(|item| item.view_handle.clone());

        let outcome = nav.push("/a").unwrap();
        assert_eq!(outcome, PushOutcome::DuplicateOfTop);
        assert_eq!(nav.stack().len(), 1);
        assert_eq!(nav.host().len(), entries);
        let after = nav.stack().top().and_then(|item| item.view_handle.clone());
        assert!(Arc::ptr_eq(&handle.unwrap(), &after.unwrap()));
    }

    #[test]
    fn only_trailing_window_keeps_views() {
        let mut nav = navigator(5);
        let paths: Vec<String> = (0..8).map(|n| format!("/p/{n}")).collect();
        for path in &paths {
            nav.push(path).unwrap();
        }
        let resident: Vec<i64> = nav
            .stack()
            .items()
            .iter()
            .filter(|item| item.is_resident())
            .map(|item| item.index)
            .collect();
        assert_eq!(resident, vec![3, 4, 5, 6, 7]);
        assert!(nav.stack().items()[..3]
            .iter()
            .all(|item| item.control_ref.is_none()));
    }

    #[test]
    fn going_back_to_an_evicted_item_restores_it() {
        let mut nav = navigator(3);
        let paths: Vec<String> = (0..8).map(|n| format!("/p/{n}")).collect();
        for path in &paths {
            nav.push(path).unwrap();
        }
        assert!(!nav.stack().items()[0].is_resident());

        nav.host_mut().move_back(7).unwrap();
        assert_eq!(nav.pump().unwrap(), 1);

        let top = nav.stack().top().expect("top");
        assert_eq!((top.index, top.path.as_str()), (0, "/p/0"));
        assert!(top.is_resident());
        assert_eq!(nav.stack().len(), 1);
    }

    #[test]
    fn popping_a_single_item_returns_to_root_without_host_back() {
        let mut nav = navigator(3);
        nav.push("/a").unwrap();
        let outcome = nav.pop().unwrap();

        assert_eq!(outcome, PopOutcome::CollapsedToRoot);
        assert!(nav.stack().is_empty());
        assert_eq!(nav.host().current_address(), "/");
        assert_eq!(nav.host().current_record(), Some(HistoryRecord::root("/")));
        assert!(nav.host().back_requests().is_empty());
        assert_eq!(nav.pump().unwrap(), 0);
    }

    #[test]
    fn back_with_modal_open_closes_modal_and_keeps_stack() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b"]);
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = closed.clone();
        nav.register_modal(
            "sheet",
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        assert!(nav.state().is_modal_intercept_active());

        nav.host_mut().press_back();
        nav.handle_position_change(PositionChange::to(0, "/a")).unwrap();
        // Drop the queued notification for the user's back step; it was handled
        // above.
        nav.host_mut().take_notification();

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert_eq!(nav.host().forward_requests(), &[1]);
        assert!(nav.state().is_echo_pending());
        assert!(!nav.state().is_modal_intercept_active());
        assert_eq!(nav.stack().indices(), vec![0, 1]);

        // The compensating forward step echoes back and is swallowed.
        assert_eq!(nav.pump().unwrap(), 1);
        assert!(!nav.state().is_echo_pending());
        assert_eq!(nav.stack().indices(), vec![0, 1]);
        assert_eq!(nav.host().current_address(), "/b");
    }

    #[test]
    fn modal_intercept_end_to_end_through_pump() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b"]);
        nav.register_modal("dialog", Box::new(|| {}));

        nav.host_mut().press_back();
        assert_eq!(nav.pump().unwrap(), 2);

        assert_eq!(nav.stack().indices(), vec![0, 1]);
        assert!(!nav.state().is_echo_pending());
        assert!(!nav.unregister_modal("dialog"));

        nav.host_mut().press_back();
        nav.pump().unwrap();
        assert_eq!(nav.stack().indices(), vec![0]);
    }

    #[test]
    fn back_then_forward_recreates_top_at_same_index() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b"]);
        let original = nav.stack().top().and_then(|item| item.view_handle.clone());

        nav.host_mut().press_back();
        nav.pump().unwrap();
        assert_eq!(nav.stack().indices(), vec![0]);

        nav.host_mut().press_forward();
        nav.pump().unwrap();
        let top = nav.stack().top().expect("top");
        assert_eq!((top.index, top.path.as_str()), (1, "/b"));
        let fresh = top.view_handle.clone().expect("resident");
        assert!(!Arc::ptr_eq(&original.unwrap(), &fresh));
    }

    #[test]
    fn deeper_pop_waits_for_host_notification() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b", "/c"]);
        assert_eq!(nav.pop().unwrap(), PopOutcome::HostBack);
        assert_eq!(nav.stack().len(), 3);
        nav.pump().unwrap();
        assert_eq!(nav.stack().paths(), vec!["/a", "/b"]);
    }

    #[test]
    fn clear_unwinds_in_one_host_move() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b", "/c"]);
        assert_eq!(nav.clear().unwrap(), Some(3));
        assert_eq!(nav.host().back_requests(), &[3]);
        nav.pump().unwrap();
        assert!(nav.stack().is_empty());
        assert_eq!(nav.clear().unwrap(), None);
    }

    #[test]
    fn rapid_back_presses_converge() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b", "/c"]);
        nav.host_mut().press_back();
        nav.host_mut().press_back();
        assert_eq!(nav.pump().unwrap(), 2);
        assert_eq!(nav.stack().paths(), vec!["/a"]);
        assert!(nav.stack().top().unwrap().is_resident());
    }

    #[test]
    fn push_after_back_takes_a_fresh_index() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b"]);
        nav.host_mut().press_back();
        nav.pump().unwrap();
        nav.push("/c").unwrap();
        assert_eq!(nav.stack().indices(), vec![0, 2]);
        assert_eq!(nav.host().addresses(), vec!["/", "/a", "/c"]);
        assert_eq!(nav.host().current_record(), Some(HistoryRecord::new(2, "/c")));

        nav.host_mut().press_back();
        nav.pump().unwrap();
        assert_eq!(nav.stack().paths(), vec!["/a"]);
    }

    #[test]
    fn forward_into_unroutable_record_keeps_placeholder() {
        let mut nav = navigator(3);
        nav.push("/a").unwrap();
        nav.handle_position_change(PositionChange::to(1, "/gone"))
            .unwrap();
        let top = nav.stack().top().unwrap();
        assert_eq!((top.index, top.path.as_str()), (1, "/gone"));
        assert!(!top.is_resident());
        assert_eq!(
            nav.pane_text(&PaneContent::StackItem {
                index: 1,
                path: "/gone".to_string()
            }),
            PaneText {
                title: "/gone".to_string(),
                body: String::new()
            }
        );
    }

    #[test]
    fn missing_record_away_from_root_is_synthesized() {
        let sink = MemorySink::new();
        let config = NavigatorConfig::default().with_logger(Logger::new(sink.clone()));
        let mut nav = navigator_at("/", config);
        push_all(&mut nav, &["/a", "/b"]);
        nav.host_mut().push_foreign(None, "/c");

        nav.handle_position_change(PositionChange::without_record())
            .unwrap();
        assert_eq!(nav.stack().paths(), vec!["/a", "/b", "/c"]);
        assert_eq!(nav.stack().top_index(), Some(2));
        assert!(sink.messages().iter().any(|m| m == "record_synthesized"));
    }

    #[test]
    fn missing_record_at_root_clears_stack() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b"]);
        nav.host_mut().move_back(2).unwrap();
        nav.pump().unwrap();
        assert!(nav.stack().is_empty());
        assert_eq!(nav.host().current_address(), "/");
    }

    #[test]
    fn legacy_address_becomes_first_stack_item() {
        let config = NavigatorConfig::default();
        let mut nav = navigator_at("/npub1xyz", config);
        assert_eq!(nav.host().current_address(), "/users/npub1xyz");
        assert_eq!(nav.stack().paths(), vec!["/users/npub1xyz"]);
        assert_eq!(
            nav.host().current_record(),
            Some(HistoryRecord::new(0, "/users/npub1xyz"))
        );
        assert_eq!(nav.host().addresses(), vec!["/", "/users/npub1xyz"]);

        nav.clear().unwrap();
        nav.pump().unwrap();
        assert!(nav.stack().is_empty());
        assert_eq!(nav.host().current_address(), "/");
    }

    #[test]
    fn deep_link_start_sits_above_a_root_entry() {
        let mut nav = navigator_at("/notes/x", NavigatorConfig::default());
        assert_eq!(nav.host().addresses(), vec!["/", "/notes/x"]);
        assert_eq!(nav.host().cursor(), 1);

        nav.push("/a").unwrap();
        nav.clear().unwrap();
        assert_eq!(nav.host().back_requests(), &[2]);
        nav.pump().unwrap();
        assert!(nav.stack().is_empty());
        assert_eq!(nav.host().current_address(), "/");
        assert_eq!(nav.host().current_record(), Some(HistoryRecord::root("/")));
    }

    #[test]
    fn deep_link_back_press_returns_to_primary() {
        let mut nav = navigator_at("/notes/x", NavigatorConfig::default());
        nav.host_mut().press_back();
        nav.pump().unwrap();
        assert!(nav.stack().is_empty());
    }

    #[test]
    fn small_viewport_tab_switch_after_deep_link_returns_to_primary() {
        let mut nav = navigator_at("/notes/x", NavigatorConfig::default());
        nav.set_viewport(ViewportClass::Small);
        nav.navigate(PrimaryPageName::Explore, None).unwrap();
        nav.pump().unwrap();
        assert!(nav.stack().is_empty());
        assert_eq!(nav.current_primary(), PrimaryPageName::Explore);
        assert_eq!(nav.host().current_address(), "/");
    }

    #[test]
    fn reload_keeps_recorded_index() {
        let mut host = MemoryHistory::new("/");
        let raw = HistoryRecord::new(4, "/notes/abc").encode().unwrap();
        host.push_foreign(Some(&raw), "/notes/abc");
        let mut nav = Navigator::new(NavigatorConfig::default(), registry(), host, routes());
        nav.startup().unwrap();
        assert_eq!(nav.stack().indices(), vec![4]);

        nav.push("/a").unwrap();
        assert_eq!(nav.stack().top_index(), Some(5));
    }

    #[test]
    fn relay_query_opens_relay_page() {
        let nav = navigator_at("/?r=wss%3A%2F%2Frelay.example", NavigatorConfig::default());
        assert_eq!(nav.current_primary(), PrimaryPageName::Relay);
        assert!(nav.stack().is_empty());
        let entry = nav.primary().entry(PrimaryPageName::Relay).unwrap();
        assert_eq!(
            entry.last_navigation_props,
            Some(json!({ "url": "wss://relay.example" }))
        );
    }

    #[test]
    fn startup_runs_once() {
        let mut nav = navigator_at("/notes/abc", NavigatorConfig::default());
        nav.startup().unwrap();
        assert_eq!(nav.stack().len(), 1);
    }

    #[test]
    fn small_viewport_primary_navigation_clears_stack() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b"]);
        nav.set_viewport(ViewportClass::Small);
        let outcome = nav.navigate(PrimaryPageName::Explore, None).unwrap();
        assert_eq!(outcome, PrimaryNavigation::Switched { created: true });
        nav.pump().unwrap();
        assert!(nav.stack().is_empty());
        assert_eq!(nav.current_primary(), PrimaryPageName::Explore);
    }

    #[test]
    fn undefined_primary_page_leaves_stack_and_host_alone() {
        let home_only = PrimaryPageRegistry::new(
            [PrimaryPageDefinition::new(PrimaryPageName::Home, |_| {
                TextView::resolved("home", "")
            })],
            PrimaryPageName::Home,
        )
        .unwrap();
        let mut nav = Navigator::new(
            NavigatorConfig::default(),
            home_only,
            MemoryHistory::new("/"),
            routes(),
        );
        nav.startup().unwrap();
        push_all(&mut nav, &["/a", "/b"]);
        nav.set_viewport(ViewportClass::Small);

        let err = nav.navigate(PrimaryPageName::Search, None).unwrap_err();
        assert!(matches!(err, NavError::UnknownPrimaryPage(name) if name == "search"));
        assert!(nav.host().back_requests().is_empty());
        assert_eq!(nav.pump().unwrap(), 0);
        assert_eq!(nav.stack().len(), 2);
        assert_eq!(nav.current_primary(), PrimaryPageName::Home);
    }

    #[test]
    fn large_viewport_primary_navigation_keeps_stack() {
        let mut nav = navigator(3);
        push_all(&mut nav, &["/a", "/b"]);
        nav.navigate(PrimaryPageName::Me, None).unwrap();
        nav.pump().unwrap();
        assert_eq!(nav.stack().len(), 2);
        assert_eq!(
            nav.navigate(PrimaryPageName::Me, None).unwrap(),
            PrimaryNavigation::ScrolledToTop
        );
    }

    #[test]
    fn dispatch_routes_events() {
        let mut nav = navigator(3);
        nav.run_scripted([
            NavEvent::Push { path: "/a".into() },
            NavEvent::Push { path: "/b".into() },
            NavEvent::Pop,
            NavEvent::Navigate {
                page: PrimaryPageName::Search,
                props: None,
            },
        ])
        .unwrap();
        assert_eq!(nav.stack().paths(), vec!["/a"]);
        assert_eq!(nav.current_primary(), PrimaryPageName::Search);

        nav.dispatch(NavEvent::HostNotification(PositionChange::to(-1, "/")))
            .unwrap();
        assert!(nav.stack().is_empty());
    }

    #[test]
    fn audit_and_metrics_follow_reducer_decisions() {
        let audit = Arc::new(BufferedAudit::default());
        let mut config = NavigatorConfig::default().with_max_stack_size(1);
        config.enable_metrics();
        let metrics = config.metrics_handle().unwrap();
        let mut nav = navigator_at("/", config).with_audit(audit.clone());

        push_all(&mut nav, &["/a", "/a", "/b", "/nowhere"]);
        nav.host_mut().press_back();
        nav.pump().unwrap();

        let stages = audit.stages();
        assert!(stages.contains(&NavigationAuditStage::DuplicateIgnored));
        assert!(stages.contains(&NavigationAuditStage::Evicted));
        assert!(stages.contains(&NavigationAuditStage::RouteMissed));
        assert!(stages.contains(&NavigationAuditStage::Restored));
        assert_eq!(stages.last(), Some(&NavigationAuditStage::Reconciled));

        let snapshot = metrics.lock().unwrap().snapshot(std::time::Duration::ZERO);
        assert_eq!(snapshot.pushes, 2);
        assert_eq!(snapshot.duplicate_pushes, 1);
        assert_eq!(snapshot.route_misses, 1);
        assert_eq!(snapshot.evictions, 1);
        assert_eq!(snapshot.restores, 1);
    }

    #[test]
    fn emit_metrics_logs_snapshot() {
        let sink = MemorySink::new();
        let mut config = NavigatorConfig::default().with_logger(Logger::new(sink.clone()));
        config.enable_metrics();
        let mut nav = navigator_at("/", config);
        nav.push("/a").unwrap();
        nav.emit_metrics();
        let last = sink.last().expect("metrics event");
        assert_eq!(last.message, "navigation_metrics");
        assert_eq!(last.target, "navdeck::metrics");
    }

    #[test]
    fn push_logs_structured_fields() {
        let sink = MemorySink::new();
        let config = NavigatorConfig::default().with_logger(Logger::new(sink.clone()));
        let mut nav = navigator_at("/", config);
        nav.push("/a").unwrap();
        let events = sink.events();
        let push = events
            .iter()
            .find(|event| event.message == "push")
            .expect("push event");
        assert_eq!(push.target, STACK_TARGET);
        assert_eq!(push.field("index"), Some(&json!(0)));
        assert_eq!(push.field("path"), Some(&json!("/a")));
    }

    #[test]
    fn composition_reflects_stack_top() {
        let mut nav = navigator(3);
        let standard = nav.compose(LayoutPreferences::default(), &[]);
        assert_eq!(standard.arrangement, Arrangement::TwoPane);
        assert!(standard.shows(&PaneContent::Supplementary));

        nav.push("/a").unwrap();
        let composed = nav.compose(LayoutPreferences::default(), &[]);
        let top = PaneContent::StackItem {
            index: 0,
            path: "/a".to_string(),
        };
        assert!(composed.shows(&top));
        assert_eq!(nav.pane_text(&top).title, "/a");

        let deck = LayoutPreferences {
            mode: LayoutMode::MultiColumn,
            deck: true,
        };
        assert_eq!(nav.compose(deck, &[]).drawer, Some(top));
        assert_ne!(standard.fingerprint(), composed.fingerprint());
    }

    #[test]
    fn primary_views_are_created_once() {
        let created = Arc::new(Mutex::new(0usize));
        let counter = created.clone();
        let definitions = PrimaryPageName::ALL.into_iter().map(move |name| {
            let counter = counter.clone();
            PrimaryPageDefinition::new(name, move |_| {
                *counter.lock().unwrap() += 1;
                TextView::resolved(name.as_str(), "")
            })
        });
        let primary = PrimaryPageRegistry::new(definitions, PrimaryPageName::Home).unwrap();
        let mut nav = Navigator::new(
            NavigatorConfig::default(),
            primary,
            MemoryHistory::new("/"),
            routes(),
        );
        for page in [
            PrimaryPageName::Explore,
            PrimaryPageName::Home,
            PrimaryPageName::Explore,
            PrimaryPageName::Home,
        ] {
            nav.navigate(page, None).unwrap();
        }
        assert_eq!(*created.lock().unwrap(), 2);
    }
}
