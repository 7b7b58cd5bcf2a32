//! Layout composition.
//!
//! `compositor` decides which panes are visible for a viewport class and the
//! user's layout preferences, then solves them into terminal rectangles.

mod compositor;

pub use compositor::{
    Arrangement, Composition, CompositionInput, LayoutMode, LayoutPreferences, PaneContent,
    PinnedColumn, SMALL_VIEWPORT_MAX_WIDTH, SolvedComposition, SolvedPane, ViewportClass,
    compose,
};
