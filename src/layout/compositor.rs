use serde::{Deserialize, Serialize};

use crate::geometry::{Rect, Size};
use crate::primary::PrimaryPageName;
use crate::stack::StackItem;

/// Viewports narrower than this many cells count as small.
pub const SMALL_VIEWPORT_MAX_WIDTH: u16 = 80;

const TAB_BAR_ROWS: u16 = 1;
const PRIMARY_SHARE_PERCENT: u16 = 40;
const DRAWER_SHARE_PERCENT: u16 = 60;
const MIN_COLUMN_WIDTH: u16 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportClass {
    Small,
    Large,
}

impl ViewportClass {
    pub fn for_width(width: u16) -> Self {
        if width < SMALL_VIEWPORT_MAX_WIDTH {
            ViewportClass::Small
        } else {
            ViewportClass::Large
        }
    }
}

/// User-selected arrangement for large viewports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    #[default]
    Standard,
    MultiColumn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayoutPreferences {
    pub mode: LayoutMode,
    /// In multi-column mode, show the secondary stack as a drawer over the
    /// columns instead of as a trailing column.
    pub deck: bool,
}

/// A persistent column pinned by the user, independent of the stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinnedColumn {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub props: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaneContent {
    Primary(PrimaryPageName),
    StackItem { index: i64, path: String },
    /// Default surface beside the primary page when nothing is pushed.
    Supplementary,
    Pinned { id: String, kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arrangement {
    Single,
    TwoPane,
    MultiColumn,
}

#[derive(Debug, Clone, Copy)]
pub struct CompositionInput<'a> {
    pub viewport: ViewportClass,
    pub preferences: LayoutPreferences,
    pub pinned: &'a [PinnedColumn],
    pub primary: PrimaryPageName,
    pub stack: &'a [StackItem],
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Composition {
    pub arrangement: Arrangement,
    pub panes: Vec<PaneContent>,
    /// Slide-over drawer; dismissing it pops the stack.
    pub drawer: Option<PaneContent>,
    pub tab_bar: bool,
}

/// A pane placed on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedPane {
    pub content: PaneContent,
    pub rect: Rect,
    pub overlay: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolvedComposition {
    pub panes: Vec<SolvedPane>,
    pub tab_bar: Option<Rect>,
}

fn top_of(stack: &[StackItem]) -> Option<PaneContent> {
    stack.last().map(|item| PaneContent::StackItem {
        index: item.index,
        path: item.path.clone(),
    })
}

/// Decide which panes are visible. Pure: owns no state.
pub fn compose(input: CompositionInput<'_>) -> Composition {
    let primary = PaneContent::Primary(input.primary);
    let top = top_of(input.stack);

    match (input.viewport, input.preferences.mode) {
        (ViewportClass::Small, _) => Composition {
            arrangement: Arrangement::Single,
            panes: vec![top.unwrap_or(primary)],
            drawer: None,
            tab_bar: true,
        },
        (ViewportClass::Large, LayoutMode::Standard) => Composition {
            arrangement: Arrangement::TwoPane,
            panes: vec![primary, top.unwrap_or(PaneContent::Supplementary)],
            drawer: None,
            tab_bar: false,
        },
        (ViewportClass::Large, LayoutMode::MultiColumn) => {
            let mut panes = vec![primary];
            panes.extend(input.pinned.iter().map(|column| PaneContent::Pinned {
                id: column.id.clone(),
                kind: column.kind.clone(),
            }));
            let drawer = if input.preferences.deck {
                top
            } else {
                panes.extend(top);
                None
            };
            Composition {
                arrangement: Arrangement::MultiColumn,
                panes,
                drawer,
                tab_bar: false,
            }
        }
    }
}

impl Composition {
    /// Stable digest used to skip repaints when nothing visible changed.
    pub fn fingerprint(&self) -> blake3::Hash {
        blake3::hash(format!("{self:?}").as_bytes())
    }

    pub fn shows(&self, content: &PaneContent) -> bool {
        self.panes.contains(content) || self.drawer.as_ref() == Some(content)
    }

    pub fn solve(&self, size: Size) -> SolvedComposition {
        let mut area = size.area();
        let mut tab_bar = None;
        if self.tab_bar {
            let (body, bar) = area.split_bottom(TAB_BAR_ROWS);
            area = body;
            tab_bar = Some(bar);
        }

        let rects = match self.arrangement {
            Arrangement::Single => vec![area],
            Arrangement::TwoPane => {
                let primary_width =
                    percent_of(area.width, PRIMARY_SHARE_PERCENT).max(MIN_COLUMN_WIDTH);
                let (left, right) = area.split_right(area.width.saturating_sub(primary_width));
                vec![left, right]
            }
            Arrangement::MultiColumn => split_columns(area, self.panes.len()),
        };

        let mut panes: Vec<SolvedPane> = self
            .panes
            .iter()
            .cloned()
            .zip(rects)
            .map(|(content, rect)| SolvedPane {
                content,
                rect,
                overlay: false,
            })
            .collect();

        if let Some(drawer) = &self.drawer {
            let width = percent_of(area.width, DRAWER_SHARE_PERCENT)
                .max(MIN_COLUMN_WIDTH.min(area.width));
            let (_, rect) = area.split_right(width);
            panes.push(SolvedPane {
                content: drawer.clone(),
                rect,
                overlay: true,
            });
        }

        SolvedComposition { panes, tab_bar }
    }
}

fn percent_of(width: u16, percent: u16) -> u16 {
    (u32::from(width) * u32::from(percent) / 100) as u16
}

/// Equal-width columns; the last one absorbs the remainder. Columns that
/// would be narrower than one cell are dropped.
fn split_columns(area: Rect, count: usize) -> Vec<Rect> {
    let count = u16::try_from(count).unwrap_or(u16::MAX).min(area.width);
    if count == 0 {
        return Vec::new();
    }
    let base = area.width / count;
    (0..count)
        .map(|column| {
            let x = area.x + base * column;
            let width = if column + 1 == count {
                area.right() - x
            } else {
                base
            };
            Rect::new(x, area.y, width, area.height)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::SecondaryStack;
    use crate::view::{ResolvedView, TextView};

    fn factory(path: &str) -> Option<ResolvedView> {
        Some(TextView::resolved(path, ""))
    }

    fn stack(paths: &[&str]) -> SecondaryStack {
        let mut stack = SecondaryStack::new(3);
        for path in paths {
            stack.push(path, None, &factory);
        }
        stack
    }

    fn pinned() -> Vec<PinnedColumn> {
        vec![
            PinnedColumn {
                id: "c1".into(),
                kind: "notifications".into(),
                props: serde_json::Value::Null,
            },
            PinnedColumn {
                id: "c2".into(),
                kind: "relay".into(),
                props: serde_json::json!({"url": "wss://a"}),
            },
        ]
    }

    fn input<'a>(
        viewport: ViewportClass,
        preferences: LayoutPreferences,
        pinned: &'a [PinnedColumn],
        stack: &'a SecondaryStack,
    ) -> CompositionInput<'a> {
        CompositionInput {
            viewport,
            preferences,
            pinned,
            primary: PrimaryPageName::Home,
            stack: stack.items(),
        }
    }

    #[test]
    fn small_viewport_shows_top_or_primary() {
        let empty = stack(&[]);
        let composed = compose(input(ViewportClass::Small, LayoutPreferences::default(), &[], &empty));
        assert_eq!(composed.panes, vec![PaneContent::Primary(PrimaryPageName::Home)]);
        assert!(composed.tab_bar);

        let drilled = stack(&["/a", "/b"]);
        let composed = compose(input(ViewportClass::Small, LayoutPreferences::default(), &[], &drilled));
        assert_eq!(
            composed.panes,
            vec![PaneContent::StackItem {
                index: 1,
                path: "/b".into()
            }]
        );
    }

    #[test]
    fn standard_layout_has_two_fixed_panes() {
        let empty = stack(&[]);
        let composed = compose(input(ViewportClass::Large, LayoutPreferences::default(), &[], &empty));
        assert_eq!(composed.arrangement, Arrangement::TwoPane);
        assert_eq!(composed.panes[1], PaneContent::Supplementary);

        let drilled = stack(&["/a"]);
        let composed = compose(input(ViewportClass::Large, LayoutPreferences::default(), &[], &drilled));
        assert!(matches!(composed.panes[1], PaneContent::StackItem { index: 0, .. }));
        assert!(!composed.tab_bar);
    }

    #[test]
    fn deck_renders_stack_as_drawer() {
        let pins = pinned();
        let drilled = stack(&["/a"]);
        let prefs = LayoutPreferences {
            mode: LayoutMode::MultiColumn,
            deck: true,
        };
        let composed = compose(input(ViewportClass::Large, prefs, &pins, &drilled));
        assert_eq!(composed.panes.len(), 3);
        assert!(composed.drawer.is_some());

        let empty = stack(&[]);
        let composed = compose(input(ViewportClass::Large, prefs, &pins, &empty));
        assert!(composed.drawer.is_none());
        assert_eq!(composed.panes.len(), 3);
    }

    #[test]
    fn multi_column_without_deck_appends_stack_column() {
        let pins = pinned();
        let drilled = stack(&["/a"]);
        let prefs = LayoutPreferences {
            mode: LayoutMode::MultiColumn,
            deck: false,
        };
        let composed = compose(input(ViewportClass::Large, prefs, &pins, &drilled));
        assert_eq!(composed.panes.len(), 4);
        assert!(composed.drawer.is_none());
    }

    #[test]
    fn solve_reserves_tab_bar_on_small() {
        let empty = stack(&[]);
        let composed = compose(input(ViewportClass::Small, LayoutPreferences::default(), &[], &empty));
        let solved = composed.solve(Size::new(40, 20));
        assert_eq!(solved.tab_bar, Some(Rect::new(0, 19, 40, 1)));
        assert_eq!(solved.panes[0].rect, Rect::new(0, 0, 40, 19));
    }

    #[test]
    fn solve_columns_cover_the_width() {
        let pins = pinned();
        let drilled = stack(&["/a"]);
        let prefs = LayoutPreferences {
            mode: LayoutMode::MultiColumn,
            deck: true,
        };
        let composed = compose(input(ViewportClass::Large, prefs, &pins, &drilled));
        let solved = composed.solve(Size::new(100, 30));
        let columns: Vec<_> = solved.panes.iter().filter(|pane| !pane.overlay).collect();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns.last().unwrap().rect.right(), 100);
        let drawer = solved.panes.iter().find(|pane| pane.overlay).unwrap();
        assert_eq!(drawer.rect.right(), 100);
        assert_eq!(drawer.rect.width, 60);
    }

    #[test]
    fn fingerprint_tracks_visible_changes() {
        let a = stack(&["/a"]);
        let b = stack(&["/b"]);
        let prefs = LayoutPreferences::default();
        let first = compose(input(ViewportClass::Large, prefs, &[], &a)).fingerprint();
        let again = compose(input(ViewportClass::Large, prefs, &[], &a)).fingerprint();
        let other = compose(input(ViewportClass::Large, prefs, &[], &b)).fingerprint();
        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn more_columns_than_cells_degrade_to_one_cell_each() {
        let area = Rect::new(0, 0, 4, 10);
        let columns = split_columns(area, 70_000);
        assert_eq!(columns.len(), 4);
        assert!(columns.iter().all(|rect| rect.width == 1));
        assert_eq!(columns.last().map(Rect::right), Some(4));

        assert!(split_columns(Rect::new(0, 0, 0, 10), 3).is_empty());
    }

    #[test]
    fn viewport_class_from_width() {
        assert_eq!(ViewportClass::for_width(60), ViewportClass::Small);
        assert_eq!(ViewportClass::for_width(120), ViewportClass::Large);
    }

    #[test]
    fn pinned_column_uses_type_key() {
        let column: PinnedColumn =
            serde_json::from_str(r#"{"id":"x","type":"search"}"#).expect("pinned column");
        assert_eq!(column.kind, "search");
        assert!(column.props.is_null());
    }
}
