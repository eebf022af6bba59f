//! The rendering capabilities the engine exposes to higher layers.

use ke_diagnostics::DiagnosticHub;
use ke_types::{RenderSnapshot, WindowResizeEvent};

use crate::error::RenderError;

/// Text anchor of [`RenderApi::add_text`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAnchor {
    #[default]
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl TextAnchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::MiddleLeft => "middle-left",
            Self::MiddleCenter => "middle-center",
            Self::MiddleRight => "middle-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomCenter => "bottom-center",
            Self::BottomRight => "bottom-right",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "top-left" => Some(Self::TopLeft),
            "top-center" => Some(Self::TopCenter),
            "top-right" => Some(Self::TopRight),
            "middle-left" => Some(Self::MiddleLeft),
            "middle-center" => Some(Self::MiddleCenter),
            "middle-right" => Some(Self::MiddleRight),
            "bottom-left" => Some(Self::BottomLeft),
            "bottom-center" => Some(Self::BottomCenter),
            "bottom-right" => Some(Self::BottomRight),
            _ => None,
        }
    }
}

/// Rendering API consumed by game modules and the host overlay.
///
/// Commands with a retention key update in place across frames; commands
/// without one live for a single frame. Conventional z defaults are 0 for
/// rects, 0.5 for grids, 2 for text and -100 for window fills.
#[allow(clippy::too_many_arguments)] // mirrors the draw-call surface 1:1
pub trait RenderApi {
    fn begin_frame(&mut self) -> Result<(), RenderError>;
    fn end_frame(&mut self) -> Result<(), RenderError>;

    fn add_rect(
        &mut self,
        key: Option<&str>,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        color: &str,
        z: f64,
        static_hint: bool,
    ) -> Result<(), RenderError>;

    fn add_grid(
        &mut self,
        key: &str,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        lines: u32,
        color: &str,
        z: f64,
        static_hint: bool,
    ) -> Result<(), RenderError>;

    fn add_text(
        &mut self,
        key: Option<&str>,
        text: &str,
        x: f64,
        y: f64,
        font_size: f64,
        color: &str,
        anchor: TextAnchor,
        z: f64,
        static_hint: bool,
    ) -> Result<(), RenderError>;

    /// Cover the full window regardless of the design-space transform.
    fn fill_window(&mut self, key: &str, color: &str, z: f64) -> Result<(), RenderError>;

    fn set_title(&mut self, title: &str) -> Result<(), RenderError>;

    /// Map pointer coordinates into design-space coordinates.
    fn to_design_space(&self, x: f64, y: f64) -> (f64, f64);

    fn design_space_size(&self) -> (f64, f64);

    /// Schedule one redraw.
    fn invalidate(&mut self);

    /// Run one callback-driven draw (frontends that own the loop call
    /// this per iteration).
    fn run(&mut self, draw_callback: &mut dyn FnMut()) -> Result<(), RenderError>;

    /// Render a pre-built snapshot (the snapshot-driven alternative to
    /// the immediate-mode calls above).
    fn render_snapshot(&mut self, snapshot: RenderSnapshot) -> Result<(), RenderError>;

    /// Called by the host on window resize events.
    fn apply_window_resize(&mut self, event: &WindowResizeEvent) -> Result<(), RenderError>;

    /// Bind (or unbind) the diagnostics hub render events go to.
    fn set_diagnostics_hub(&mut self, hub: Option<DiagnosticHub>) {
        let _ = hub;
    }

    fn close(&mut self);
}
