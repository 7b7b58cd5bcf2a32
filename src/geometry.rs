/// Integer size measured in terminal character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

/// Rectangle occupied by a pane within the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }

    pub fn right(&self) -> u16 {
        self.x.saturating_add(self.width)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Split off `rows` rows from the bottom, returning `(top, bottom)`.
    pub fn split_bottom(&self, rows: u16) -> (Rect, Rect) {
        let rows = rows.min(self.height);
        let top = Rect::new(self.x, self.y, self.width, self.height - rows);
        let bottom = Rect::new(self.x, self.y + top.height, self.width, rows);
        (top, bottom)
    }

    /// Carve `width` columns from the right edge, returning `(left, right)`.
    pub fn split_right(&self, width: u16) -> (Rect, Rect) {
        let width = width.min(self.width);
        let left = Rect::new(self.x, self.y, self.width - width, self.height);
        let right = Rect::new(self.x + left.width, self.y, width, self.height);
        (left, right)
    }
}
