mod core;

pub use self::core::{AnsiRenderer, Frame, PaneFrame, RendererSettings, TabBarFrame, build_frame};
