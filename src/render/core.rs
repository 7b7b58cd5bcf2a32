use std::io::Write;

use crate::engine::Navigator;
use crate::error::Result;
use crate::geometry::{Rect, Size};
use crate::history::SessionHistory;
use crate::layout::Composition;
use crate::primary::PrimaryPageName;
use crate::view::ViewFactory;
use crate::width::{display_width, truncate_to_width};

/// Renderer runtime parameters.
#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub restore_cursor: Option<(u16, u16)>,
    /// Erase the screen before painting a frame.
    pub clear_screen: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            restore_cursor: None,
            clear_screen: true,
        }
    }
}

/// A pane ready to paint: a title row followed by wrapped body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneFrame {
    pub rect: Rect,
    pub title: String,
    pub body: String,
    /// Drawn over other panes, like the deck drawer.
    pub overlay: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabBarFrame {
    pub rect: Rect,
    pub current: PrimaryPageName,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub panes: Vec<PaneFrame>,
    pub tab_bar: Option<TabBarFrame>,
}

/// Place `composition` on a `size` screen and fill each pane from the
/// navigator's mounted views.
pub fn build_frame<H, F>(navigator: &Navigator<H, F>, composition: &Composition, size: Size) -> Frame
where
    H: SessionHistory,
    F: ViewFactory,
{
    let solved = composition.solve(size);
    let panes = solved
        .panes
        .into_iter()
        .map(|pane| {
            let text = navigator.pane_text(&pane.content);
            PaneFrame {
                rect: pane.rect,
                title: text.title,
                body: text.body,
                overlay: pane.overlay,
            }
        })
        .collect();
    Frame {
        panes,
        tab_bar: solved.tab_bar.map(|rect| TabBarFrame {
            rect,
            current: navigator.current_primary(),
        }),
    }
}

/// ANSI escape code renderer writing directly to a terminal handle.
pub struct AnsiRenderer {
    settings: RendererSettings,
}

impl AnsiRenderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn with_default() -> Self {
        Self::new(RendererSettings::default())
    }

    pub fn settings_mut(&mut self) -> &mut RendererSettings {
        &mut self.settings
    }

    pub fn render(&mut self, writer: &mut impl Write, frame: &Frame) -> Result<()> {
        if self.settings.clear_screen {
            write!(writer, "\x1b[2J")?;
        }

        // Overlays paint last so they cover the columns beneath.
        let (overlays, panes): (Vec<&PaneFrame>, Vec<&PaneFrame>) =
            frame.panes.iter().partition(|pane| pane.overlay);
        for pane in panes.into_iter().chain(overlays) {
            render_pane(writer, pane)?;
        }

        if let Some(tab_bar) = &frame.tab_bar {
            render_tab_bar(writer, tab_bar)?;
        }

        if let Some((row, col)) = self.settings.restore_cursor {
            write!(writer, "\x1b[{};{}H", row + 1, col + 1)?;
        }

        writer.flush()?;
        Ok(())
    }
}

fn render_pane(writer: &mut impl Write, pane: &PaneFrame) -> Result<()> {
    let Rect {
        x,
        y,
        width,
        height,
    } = pane.rect;

    if width == 0 || height == 0 {
        return Ok(());
    }

    let mut title = truncate_to_width(&pane.title, width as usize);
    pad_line(&mut title, width);
    write!(writer, "\x1b[{};{}H\x1b[7m{}\x1b[0m", y + 1, x + 1, title)?;

    let body_rows = height as usize - 1;
    let mut lines = wrap_to_width(&pane.body, width);
    lines.truncate(body_rows);
    while lines.len() < body_rows {
        lines.push(String::new());
    }

    for (offset, line) in lines.iter_mut().enumerate() {
        pad_line(line, width);
        write!(writer, "\x1b[{};{}H", y + offset as u16 + 2, x + 1)?;
        write!(writer, "{}", line)?;
    }

    Ok(())
}

fn render_tab_bar(writer: &mut impl Write, tab_bar: &TabBarFrame) -> Result<()> {
    let Rect { x, y, width, .. } = tab_bar.rect;
    if width == 0 {
        return Ok(());
    }
    let mut line = truncate_to_width(&tab_labels(tab_bar.current), width as usize);
    pad_line(&mut line, width);
    write!(writer, "\x1b[{};{}H{}", y + 1, x + 1, line)?;
    Ok(())
}

/// `1 home  [2 explore]  3 notifications ...` with the current page bracketed.
fn tab_labels(current: PrimaryPageName) -> String {
    PrimaryPageName::ALL
        .into_iter()
        .enumerate()
        .map(|(slot, name)| {
            if name == current {
                format!("[{} {}]", slot + 1, name)
            } else {
                format!(" {} {} ", slot + 1, name)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn wrap_to_width(content: &str, width: u16) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for raw in content.split('\n') {
        if raw.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for ch in raw.chars() {
            if current.is_empty() && ch == ' ' {
                continue;
            }
            current.push(ch);
            let display = display_width(&current) as u16;
            if display > width {
                current.pop();
                if current.is_empty() {
                    // Character wider than the pane, skip it.
                    lines.push(String::new());
                } else {
                    lines.push(current.trim_start().to_string());
                }
                current.clear();
                current.push(ch);
            } else if display == width {
                lines.push(current.trim_start().to_string());
                current.clear();
            }
        }

        if !current.is_empty() {
            lines.push(current.trim_start().to_string());
        }
    }

    lines
}

fn pad_line(line: &mut String, width: u16) {
    let mut display = display_width(line) as u16;
    while display < width {
        line.push(' ');
        display += 1;
    }

    if display > width {
        while (display_width(line) as u16) > width {
            line.pop();
        }
        while (display_width(line) as u16) < width {
            line.push(' ');
        }
    }
}
