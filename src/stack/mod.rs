//! Secondary stack of drilled-in destinations.
//!
//! The stack only ever grows at the top or is truncated to a prefix. View
//! instances are kept resident for the trailing `max_stack_size` items; older
//! items keep their index and path so they can be resolved again when the
//! host walks back to them.

use std::fmt;

use crate::error::Result;
use crate::history::{HistoryRecord, SessionHistory};
use crate::view::{ControlRef, ResolvedView, ScrollBehavior, ViewFactory, ViewHandle};

pub struct StackItem {
    pub index: i64,
    pub path: String,
    pub view_handle: Option<ViewHandle>,
    pub control_ref: Option<ControlRef>,
}

impl StackItem {
    fn resolved(index: i64, path: String, view: Option<ResolvedView>) -> Self {
        let (view_handle, control_ref) = match view {
            Some(view) => (Some(view.handle), view.control),
            None => (None, None),
        };
        Self {
            index,
            path,
            view_handle,
            control_ref,
        }
    }

    pub fn is_resident(&self) -> bool {
        self.view_handle.is_some()
    }

    pub fn record(&self) -> HistoryRecord {
        HistoryRecord::new(self.index, self.path.clone())
    }

    fn evict(&mut self) -> bool {
        let was_resident = self.view_handle.take().is_some();
        self.control_ref = None;
        was_resident
    }

    fn scroll_to_top(&self, behavior: ScrollBehavior) {
        if let Some(control) = &self.control_ref {
            control.scroll_to_top(behavior);
        }
    }
}

impl fmt::Debug for StackItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StackItem")
            .field("index", &self.index)
            .field("path", &self.path)
            .field("resident", &self.is_resident())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// A new item was appended; `evicted` lists indices that lost their view.
    Pushed {
        index: i64,
        path: String,
        evicted: Vec<i64>,
    },
    /// The path is already on top; the top item was scrolled instead.
    DuplicateOfTop,
    /// No route matched. Nothing changed.
    NoRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopOutcome {
    /// Single-item stack collapsed without touching native history.
    CollapsedToRoot,
    /// Native back requested; the stack changes once the host reports it.
    HostBack,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    AlreadyResident,
    Restored,
    NoRoute,
    Empty,
}

#[derive(Debug)]
pub struct SecondaryStack {
    items: Vec<StackItem>,
    max_stack_size: usize,
    /// One past the highest index ever appended. Survives truncation so a
    /// discarded branch never hands its indices to a new push.
    next_index: i64,
}

impl SecondaryStack {
    pub fn new(max_stack_size: usize) -> Self {
        Self {
            items: Vec::new(),
            max_stack_size: max_stack_size.max(1),
            next_index: 0,
        }
    }

    pub fn items(&self) -> &[StackItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_stack_size(&self) -> usize {
        self.max_stack_size
    }

    pub fn top(&self) -> Option<&StackItem> {
        self.items.last()
    }

    pub fn top_index(&self) -> Option<i64> {
        self.top().map(|item| item.index)
    }

    pub fn get(&self, index: i64) -> Option<&StackItem> {
        self.items.iter().find(|item| item.index == index)
    }

    pub fn indices(&self) -> Vec<i64> {
        self.items.iter().map(|item| item.index).collect()
    }

    pub fn paths(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.path.as_str()).collect()
    }

    pub fn resident_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_resident()).count()
    }

    /// Index of the most recent item carrying `path`.
    pub fn find_path(&self, path: &str) -> Option<i64> {
        self.items
            .iter()
            .rev()
            .find(|item| item.path == path)
            .map(|item| item.index)
    }

    /// Append `path` on top of the stack.
    ///
    /// `explicit_index` is supplied when replaying a record that already exists
    /// in the host history; otherwise the index is one past the highest index
    /// this stack has ever held.
    pub fn push(
        &mut self,
        path: &str,
        explicit_index: Option<i64>,
        factory: &dyn ViewFactory,
    ) -> PushOutcome {
        if let Some(top) = self.top() {
            if top.path == path {
                top.scroll_to_top(ScrollBehavior::Instant);
                return PushOutcome::DuplicateOfTop;
            }
        }

        let Some(view) = factory.resolve(path) else {
            return PushOutcome::NoRoute;
        };

        let index = explicit_index.unwrap_or(self.next_index);
        let evicted = self.append(StackItem::resolved(index, path.to_string(), Some(view)));
        PushOutcome::Pushed {
            index,
            path: path.to_string(),
            evicted,
        }
    }

    /// Append an item whose route could not be resolved, keeping its index so
    /// later host records still line up.
    pub fn push_unresolved(&mut self, path: &str, index: i64) -> Vec<i64> {
        self.append(StackItem::resolved(index, path.to_string(), None))
    }

    fn append(&mut self, item: StackItem) -> Vec<i64> {
        self.next_index = self.next_index.max(item.index + 1);
        self.items.push(item);
        self.evict_outside_window()
    }

    /// Drop the view of every item that fell out of the trailing window.
    fn evict_outside_window(&mut self) -> Vec<i64> {
        let window_start = self.items.len().saturating_sub(self.max_stack_size);
        self.items[..window_start]
            .iter_mut()
            .filter_map(|item| item.evict().then_some(item.index))
            .collect()
    }

    /// Keep only items with `index <= index`. Returns how many were removed.
    pub fn truncate_to(&mut self, index: i64) -> usize {
        let keep = self
            .items
            .iter()
            .take_while(|item| item.index <= index)
            .count();
        let removed = self.items.len() - keep;
        self.items.truncate(keep);
        removed
    }

    pub fn clear_items(&mut self) -> usize {
        let removed = self.items.len();
        self.items.clear();
        removed
    }

    /// Resolve the top item again if its view was evicted.
    pub fn restore_top(&mut self, factory: &dyn ViewFactory) -> RestoreOutcome {
        let Some(top) = self.items.last_mut() else {
            return RestoreOutcome::Empty;
        };
        if top.is_resident() {
            return RestoreOutcome::AlreadyResident;
        }
        match factory.resolve(&top.path) {
            Some(view) => {
                top.view_handle = Some(view.handle);
                top.control_ref = view.control;
                RestoreOutcome::Restored
            }
            None => RestoreOutcome::NoRoute,
        }
    }

    /// Leave the top item, returning to the primary surface for single-item
    /// stacks and otherwise handing the move to native history.
    pub fn pop(&mut self, host: &mut dyn SessionHistory, root_path: &str) -> Result<PopOutcome> {
        match self.items.len() {
            0 => Ok(PopOutcome::Empty),
            1 => {
                self.items.clear();
                host.replace(Some(&HistoryRecord::root(root_path)), root_path)?;
                Ok(PopOutcome::CollapsedToRoot)
            }
            _ => {
                host.move_back(1)?;
                Ok(PopOutcome::HostBack)
            }
        }
    }

    /// Ask the host to unwind every entry in one move. Returns the step count.
    pub fn clear(&self, host: &mut dyn SessionHistory) -> Result<Option<usize>> {
        if self.items.is_empty() {
            return Ok(None);
        }
        let steps = self.items.len();
        host.move_back(steps)?;
        Ok(Some(steps))
    }
}
