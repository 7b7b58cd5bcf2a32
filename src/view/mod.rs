//! View contracts consumed by the navigator.
//!
//! The engine never knows concrete page types. A [`ViewFactory`] turns a path
//! into a [`ResolvedView`]: an opaque [`ViewHandle`] that the renderer shows and
//! an optional [`ControlRef`] the engine uses for imperative commands.

use std::fmt;
use std::sync::{Arc, Mutex};

/// How a "scroll to top" command should animate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollBehavior {
    Smooth,
    Instant,
}

/// A mounted view instance.
pub trait View: Send + Sync {
    fn title(&self) -> String;

    fn body(&self) -> String {
        String::new()
    }
}

/// Imperative capability exposed by a mounted view.
pub trait ViewControl: Send + Sync {
    fn scroll_to_top(&self, behavior: ScrollBehavior);
}

pub type ViewHandle = Arc<dyn View>;
pub type ControlRef = Arc<dyn ViewControl>;

/// Output of a successful route match.
#[derive(Clone)]
pub struct ResolvedView {
    pub handle: ViewHandle,
    pub control: Option<ControlRef>,
}

impl ResolvedView {
    /// Wrap a view that also acts as its own control handle.
    pub fn new<V>(view: Arc<V>) -> Self
    where
        V: View + ViewControl + 'static,
    {
        Self {
            handle: view.clone(),
            control: Some(view),
        }
    }

    pub fn without_control(handle: ViewHandle) -> Self {
        Self {
            handle,
            control: None,
        }
    }
}

impl fmt::Debug for ResolvedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedView")
            .field("title", &self.handle.title())
            .field("has_control", &self.control.is_some())
            .finish()
    }
}

/// Maps a path to a freshly constructed view, or `None` when no route matches.
pub trait ViewFactory {
    fn resolve(&self, path: &str) -> Option<ResolvedView>;
}

impl<F> ViewFactory for F
where
    F: Fn(&str) -> Option<ResolvedView>,
{
    fn resolve(&self, path: &str) -> Option<ResolvedView> {
        self(path)
    }
}

/// Factory closure invoked with the full matched path.
pub type RouteFactory = Arc<dyn Fn(&str) -> ResolvedView + Send + Sync>;

/// Declarative route registered with a [`RouteTable`].
pub struct RouteDefinition {
    pub pattern: String,
    pub factory: RouteFactory,
}

impl RouteDefinition {
    /// `pattern` is either an exact path (`/settings`) or a prefix ending in
    /// `/` (`/notes/`) which matches any non-empty remainder.
    pub fn new(pattern: impl Into<String>, factory: RouteFactory) -> Self {
        Self {
            pattern: pattern.into(),
            factory,
        }
    }

    fn matches(&self, path: &str) -> bool {
        if self.pattern.ends_with('/') && self.pattern.len() > 1 {
            path.len() > self.pattern.len() && path.starts_with(&self.pattern)
        } else {
            path == self.pattern
        }
    }
}

/// Ordered route list; first match wins.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: RouteDefinition) {
        self.routes.push(definition);
    }

    pub fn route<F>(mut self, pattern: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> ResolvedView + Send + Sync + 'static,
    {
        self.register(RouteDefinition::new(pattern, Arc::new(factory)));
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl ViewFactory for RouteTable {
    fn resolve(&self, path: &str) -> Option<ResolvedView> {
        // Query and fragment never take part in matching.
        let bare = path.split(['?', '#']).next().unwrap_or(path);
        self.routes
            .iter()
            .find(|route| route.matches(bare))
            .map(|route| (route.factory)(path))
    }
}

/// Plain text view that records the scroll commands it receives.
pub struct TextView {
    title: String,
    body: String,
    scrolls: Mutex<Vec<ScrollBehavior>>,
}

impl TextView {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            scrolls: Mutex::new(Vec::new()),
        }
    }

    pub fn resolved(title: impl Into<String>, body: impl Into<String>) -> ResolvedView {
        ResolvedView::new(Arc::new(Self::new(title, body)))
    }

    pub fn scrolls(&self) -> Vec<ScrollBehavior> {
        self.scrolls
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl View for TextView {
    fn title(&self) -> String {
        self.title.clone()
    }

    fn body(&self) -> String {
        self.body.clone()
    }
}

impl ViewControl for TextView {
    fn scroll_to_top(&self, behavior: ScrollBehavior) {
        if let Ok(mut guard) = self.scrolls.lock() {
            guard.push(behavior);
        }
    }
}
