//! Window and surface contracts.

/// Opaque renderer-attachable surface handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceHandle {
    pub surface_id: String,
    pub backend: String,
    pub provider: Option<String>,
}

/// Normalized resize/DPI event in logical and physical units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WindowResizeEvent {
    pub logical_width: f64,
    pub logical_height: f64,
    pub physical_width: u32,
    pub physical_height: u32,
    pub dpi_scale: f64,
}

/// Normalized focus event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowFocusEvent {
    pub focused: bool,
}

/// Normalized minimize/restore event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowMinimizeEvent {
    pub minimized: bool,
}

/// Normalized close-request event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowCloseEvent {
    pub requested: bool,
}

impl Default for WindowCloseEvent {
    fn default() -> Self {
        Self { requested: true }
    }
}

/// Any normalized window event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WindowEvent {
    Resize(WindowResizeEvent),
    Focus(WindowFocusEvent),
    Minimize(WindowMinimizeEvent),
    Close(WindowCloseEvent),
}
