use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use thiserror::Error;

use crate::engine::Navigator;
use crate::error::NavError;
use crate::geometry::{Rect, Size};
use crate::history::{NotificationSource, SessionHistory};
use crate::layout::{LayoutMode, LayoutPreferences, PinnedColumn, ViewportClass};
use crate::primary::PrimaryPageName;
use crate::render::{AnsiRenderer, Frame, PaneFrame, build_frame};
use crate::view::ViewFactory;

pub type DriverResult<T> = std::result::Result<T, CliDriverError>;

const DEMO_MODAL_ID: &str = "demo-modal";
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum CliDriverError {
    #[error("navigation error: {0}")]
    Navigation(#[from] NavError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// What a key press asks the driver to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCommand {
    Primary(PrimaryPageName),
    OpenPrompt,
    PromptInput(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,
    HostBack,
    HostForward,
    Pop,
    Clear,
    ToggleModal,
    CycleLayout,
    Quit,
}

/// Translate a key press. While the path prompt is open every printable key
/// is prompt input.
pub fn map_key(key: &KeyEvent, prompt_open: bool) -> Option<DriverCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(DriverCommand::Quit);
    }

    if prompt_open {
        return match key.code {
            KeyCode::Enter => Some(DriverCommand::PromptSubmit),
            KeyCode::Esc => Some(DriverCommand::PromptCancel),
            KeyCode::Backspace => Some(DriverCommand::PromptBackspace),
            KeyCode::Char(ch) => Some(DriverCommand::PromptInput(ch)),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(digit @ '1'..='9') => {
            let slot = digit.to_digit(10)? as usize - 1;
            PrimaryPageName::ALL
                .get(slot)
                .copied()
                .map(DriverCommand::Primary)
        }
        KeyCode::Char(':') => Some(DriverCommand::OpenPrompt),
        KeyCode::Left | KeyCode::Backspace => Some(DriverCommand::HostBack),
        KeyCode::Right => Some(DriverCommand::HostForward),
        KeyCode::Esc => Some(DriverCommand::Pop),
        KeyCode::Char('x') => Some(DriverCommand::Clear),
        KeyCode::Char('m') => Some(DriverCommand::ToggleModal),
        KeyCode::Char('d') => Some(DriverCommand::CycleLayout),
        KeyCode::Char('q') => Some(DriverCommand::Quit),
        _ => None,
    }
}

/// Standard, then multi-column, then multi-column with the deck drawer.
fn next_layout(preferences: LayoutPreferences) -> LayoutPreferences {
    match (preferences.mode, preferences.deck) {
        (LayoutMode::Standard, _) => LayoutPreferences {
            mode: LayoutMode::MultiColumn,
            deck: false,
        },
        (LayoutMode::MultiColumn, false) => LayoutPreferences {
            mode: LayoutMode::MultiColumn,
            deck: true,
        },
        (LayoutMode::MultiColumn, true) => LayoutPreferences::default(),
    }
}

/// Terminal host for a [`Navigator`]. Owns raw mode and the alternate screen,
/// plays the part of the browser chrome (back/forward buttons, address bar)
/// and repaints only when the composed frame changed.
pub struct CliDriver<H, F> {
    navigator: Navigator<H, F>,
    renderer: AnsiRenderer,
    preferences: LayoutPreferences,
    pinned: Vec<PinnedColumn>,
    size: Size,
    prompt: Option<String>,
    modal_open: Arc<AtomicBool>,
    last_fingerprint: Option<blake3::Hash>,
    should_exit: bool,
}

impl<H, F> CliDriver<H, F>
where
    H: SessionHistory + NotificationSource,
    F: ViewFactory,
{
    pub fn new(navigator: Navigator<H, F>) -> Self {
        Self {
            navigator,
            renderer: AnsiRenderer::with_default(),
            preferences: LayoutPreferences::default(),
            pinned: Vec::new(),
            size: Size::new(0, 0),
            prompt: None,
            modal_open: Arc::new(AtomicBool::new(false)),
            last_fingerprint: None,
            should_exit: false,
        }
    }

    pub fn with_pinned(mut self, pinned: Vec<PinnedColumn>) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn with_preferences(mut self, preferences: LayoutPreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn navigator(&self) -> &Navigator<H, F> {
        &self.navigator
    }

    pub fn preferences(&self) -> LayoutPreferences {
        self.preferences
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open.load(Ordering::SeqCst)
    }

    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    pub fn run(mut self) -> DriverResult<()> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner(&mut stdout);
        self.exit(&mut stdout);
        self.navigator.emit_metrics();
        result
    }

    fn run_inner(&mut self, stdout: &mut impl Write) -> DriverResult<()> {
        let (width, height) = terminal::size()?;
        self.resize(Size::new(width, height));
        self.navigator.startup()?;
        self.navigator.pump()?;
        self.render_if_changed(stdout)?;

        while !self.should_exit {
            if !event::poll(POLL_INTERVAL)? {
                continue;
            }
            match event::read()? {
                CrosstermEvent::Key(key) => {
                    if let Some(command) = map_key(&key, self.prompt.is_some()) {
                        self.apply(command)?;
                    }
                }
                CrosstermEvent::Resize(width, height) => self.resize(Size::new(width, height)),
                _ => continue,
            }
            self.render_if_changed(stdout)?;
        }
        Ok(())
    }

    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.navigator
            .set_viewport(ViewportClass::for_width(size.width));
        self.last_fingerprint = None;
    }

    /// Run one command and drain the host notifications it caused.
    pub fn apply(&mut self, command: DriverCommand) -> DriverResult<()> {
        match command {
            DriverCommand::Primary(page) => {
                self.navigator.navigate(page, None)?;
            }
            DriverCommand::OpenPrompt => self.prompt = Some(String::new()),
            DriverCommand::PromptInput(ch) => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.push(ch);
                }
            }
            DriverCommand::PromptBackspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.pop();
                }
            }
            DriverCommand::PromptSubmit => {
                if let Some(path) = self.prompt.take() {
                    let path = path.trim();
                    if !path.is_empty() {
                        self.navigator.push(path)?;
                    }
                }
            }
            DriverCommand::PromptCancel => self.prompt = None,
            DriverCommand::HostBack => self.navigator.host_mut().move_back(1)?,
            DriverCommand::HostForward => self.navigator.host_mut().move_forward(1)?,
            DriverCommand::Pop => {
                self.navigator.pop()?;
            }
            DriverCommand::Clear => {
                self.navigator.clear()?;
            }
            DriverCommand::ToggleModal => self.toggle_modal(),
            DriverCommand::CycleLayout => self.preferences = next_layout(self.preferences),
            DriverCommand::Quit => self.should_exit = true,
        }
        self.navigator.pump()?;
        Ok(())
    }

    fn toggle_modal(&mut self) {
        if self.modal_open.swap(false, Ordering::SeqCst) {
            self.navigator.unregister_modal(DEMO_MODAL_ID);
            return;
        }
        self.modal_open.store(true, Ordering::SeqCst);
        let open = Arc::clone(&self.modal_open);
        self.navigator.register_modal(
            DEMO_MODAL_ID,
            Box::new(move || open.store(false, Ordering::SeqCst)),
        );
    }

    /// Frame for the current state, including prompt and modal overlays.
    pub fn frame(&self) -> Frame {
        let composition = self.navigator.compose(self.preferences, &self.pinned);
        let mut frame = build_frame(&self.navigator, &composition, self.size);
        let full = Rect::new(0, 0, self.size.width, self.size.height);

        if self.is_modal_open() {
            let width = full.width / 2;
            let height = full.height / 3;
            frame.panes.push(PaneFrame {
                rect: Rect::new(full.width / 4, full.height / 3, width, height.max(2)),
                title: "modal".to_string(),
                body: "Back closes this modal without leaving the page.".to_string(),
                overlay: true,
            });
        }

        if let Some(prompt) = &self.prompt {
            frame.panes.push(PaneFrame {
                rect: Rect::new(0, 0, full.width, full.height.min(2)),
                title: format!(":{prompt}"),
                body: "Enter to open, Esc to cancel".to_string(),
                overlay: true,
            });
        }
        frame
    }

    fn fingerprint(&self) -> blake3::Hash {
        let composition = self.navigator.compose(self.preferences, &self.pinned);
        let mut hasher = blake3::Hasher::new();
        hasher.update(composition.fingerprint().as_bytes());
        hasher.update(format!("{:?}|{}", self.prompt, self.is_modal_open()).as_bytes());
        hasher.finalize()
    }

    /// Repaint unless the composed frame is unchanged since the last paint.
    pub fn render_if_changed(&mut self, writer: &mut impl Write) -> DriverResult<bool> {
        let fingerprint = self.fingerprint();
        if self.last_fingerprint == Some(fingerprint) {
            return Ok(false);
        }
        let frame = self.frame();
        self.renderer.render(writer, &frame)?;
        self.last_fingerprint = Some(fingerprint);
        Ok(true)
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode().map_err(|err| CliDriverError::Terminal(err.to_string()))?;
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, Show, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}
