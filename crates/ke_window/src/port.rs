//! Engine-facing window/event-loop ownership contract.

use ke_types::{RawInputEvent, SurfaceHandle, WindowEvent};

pub trait WindowPort {
    /// Create a surface handle used by the renderer backend.
    fn create_surface(&self) -> SurfaceHandle;

    /// Poll and return normalized window events.
    fn poll_events(&mut self) -> Vec<WindowEvent>;

    /// Poll and return normalized raw input events.
    fn poll_input_events(&mut self) -> Vec<RawInputEvent>;

    fn set_title(&mut self, title: &str);

    /// Configure windowed mode with a logical size.
    fn set_windowed(&mut self, width: u32, height: u32);

    fn set_fullscreen(&mut self);

    fn set_maximized(&mut self);

    /// Run the OS/backend event loop until stopped.
    fn run_loop(&mut self);

    fn stop_loop(&mut self);

    /// Close the window and release backend resources.
    fn close(&mut self);
}
