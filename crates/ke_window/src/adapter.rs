//! Normalization of raw backend events into engine events.

use std::collections::VecDeque;

use ke_config::WindowMode;
use ke_types::{
    KeyEvent, KeyPhase, PointerEvent, PointerPhase, RawInputEvent, SurfaceHandle, WindowCloseEvent,
    WindowEvent, WindowFocusEvent, WindowMinimizeEvent, WindowResizeEvent,
};

use crate::port::WindowPort;

/// Window-layer adapter over an external canvas/event backend.
///
/// Raw events arrive as JSON-shaped objects (the contract of the canvas
/// libraries this engine embeds into): an `event_type` plus fields like
/// `x`, `y`, `button`, `key`, `data`, `dy`, `width`, `height`,
/// `pixel_ratio`. Unknown event kinds are dropped silently; malformed
/// payloads are dropped field-tolerantly.
pub struct WindowAdapter {
    surface_id: String,
    backend: String,
    title: String,
    window_mode: WindowMode,
    logical_width: u32,
    logical_height: u32,
    events: VecDeque<WindowEvent>,
    input_events: VecDeque<RawInputEvent>,
    loop_running: bool,
    closed: bool,
    redraw_requested: bool,
}

impl WindowAdapter {
    pub fn new(backend: impl Into<String>, width: u32, height: u32) -> Self {
        let backend = backend.into();
        Self {
            surface_id: format!("{backend}:{width}x{height}"),
            backend,
            title: String::new(),
            window_mode: WindowMode::Windowed,
            logical_width: width.max(1),
            logical_height: height.max(1),
            events: VecDeque::new(),
            input_events: VecDeque::new(),
            loop_running: false,
            closed: false,
            redraw_requested: false,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn window_mode(&self) -> WindowMode {
        self.window_mode
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_loop_running(&self) -> bool {
        self.loop_running
    }

    pub fn logical_size(&self) -> (u32, u32) {
        (self.logical_width, self.logical_height)
    }

    /// Whether any accepted event requested a redraw since the last take.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::take(&mut self.redraw_requested)
    }

    /// Accept one raw backend event.
    pub fn push_raw_event(&mut self, event: &serde_json::Value) {
        let Some(event_type) = event.get("event_type").and_then(|value| value.as_str()) else {
            return;
        };
        let accepted = match event_type {
            "pointer_down" | "mouse_down" => self.push_pointer(event, PointerPhase::Down),
            "pointer_move" | "mouse_move" => self.push_pointer(event, PointerPhase::Move),
            "pointer_up" | "mouse_up" => self.push_pointer(event, PointerPhase::Up),
            "key_down" => self.push_key(event, KeyPhase::Down),
            "key_up" => self.push_key(event, KeyPhase::Up),
            "char" => self.push_char(event),
            "wheel" => self.push_wheel(event),
            "resize" => self.push_resize(event),
            "focus" => self.push_focus(event),
            "minimize" => self.push_minimize(event),
            "close" => {
                self.events
                    .push_back(WindowEvent::Close(WindowCloseEvent::default()));
                true
            }
            _ => false,
        };
        if accepted {
            self.redraw_requested = true;
        }
    }

    fn push_pointer(&mut self, event: &serde_json::Value, phase: PointerPhase) -> bool {
        let Some(x) = number(event, "x") else {
            return false;
        };
        let Some(y) = number(event, "y") else {
            return false;
        };
        let mut button = event
            .get("button")
            .and_then(|value| value.as_i64())
            .unwrap_or(0) as i32;
        // Backends report 0 for the primary button on down/up.
        if button == 0 && phase != PointerPhase::Move {
            button = 1;
        }
        self.input_events
            .push_back(RawInputEvent::Pointer(PointerEvent::new(phase, x, y, button)));
        true
    }

    fn push_key(&mut self, event: &serde_json::Value, phase: KeyPhase) -> bool {
        let Some(key) = event.get("key").and_then(|value| value.as_str()) else {
            return false;
        };
        self.input_events
            .push_back(RawInputEvent::Key(KeyEvent::new(phase, key)));
        true
    }

    fn push_char(&mut self, event: &serde_json::Value) -> bool {
        let Some(data) = event.get("data").and_then(|value| value.as_str()) else {
            return false;
        };
        self.input_events
            .push_back(RawInputEvent::Key(KeyEvent::char(data)));
        true
    }

    fn push_wheel(&mut self, event: &serde_json::Value) -> bool {
        let (Some(x), Some(y), Some(dy)) =
            (number(event, "x"), number(event, "y"), number(event, "dy"))
        else {
            return false;
        };
        self.input_events
            .push_back(RawInputEvent::Wheel(ke_types::WheelEvent { x, y, dy }));
        true
    }

    fn push_resize(&mut self, event: &serde_json::Value) -> bool {
        let size = event
            .get("size")
            .and_then(|value| value.as_array())
            .and_then(|values| {
                let width = values.first()?.as_f64()?;
                let height = values.get(1)?.as_f64()?;
                Some((width, height))
            });
        let (logical_width, logical_height) = match size {
            Some(size) => size,
            None => {
                let (Some(width), Some(height)) = (number(event, "width"), number(event, "height"))
                else {
                    return false;
                };
                (width, height)
            }
        };
        let dpi_scale = number(event, "pixel_ratio")
            .filter(|ratio| *ratio > 0.0)
            .unwrap_or(1.0);

        self.logical_width = logical_width.max(1.0) as u32;
        self.logical_height = logical_height.max(1.0) as u32;
        self.events.push_back(WindowEvent::Resize(WindowResizeEvent {
            logical_width,
            logical_height,
            physical_width: ((logical_width * dpi_scale) as u32).max(1),
            physical_height: ((logical_height * dpi_scale) as u32).max(1),
            dpi_scale,
        }));
        true
    }

    fn push_focus(&mut self, event: &serde_json::Value) -> bool {
        let Some(focused) = event.get("focused").and_then(|value| value.as_bool()) else {
            return false;
        };
        self.events
            .push_back(WindowEvent::Focus(WindowFocusEvent { focused }));
        true
    }

    fn push_minimize(&mut self, event: &serde_json::Value) -> bool {
        let Some(minimized) = event.get("minimized").and_then(|value| value.as_bool()) else {
            return false;
        };
        self.events
            .push_back(WindowEvent::Minimize(WindowMinimizeEvent { minimized }));
        true
    }
}

impl WindowPort for WindowAdapter {
    fn create_surface(&self) -> SurfaceHandle {
        SurfaceHandle {
            surface_id: self.surface_id.clone(),
            backend: self.backend.clone(),
            provider: Some(self.backend.clone()),
        }
    }

    fn poll_events(&mut self) -> Vec<WindowEvent> {
        self.events.drain(..).collect()
    }

    fn poll_input_events(&mut self) -> Vec<RawInputEvent> {
        self.input_events.drain(..).collect()
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_owned();
    }

    fn set_windowed(&mut self, width: u32, height: u32) {
        self.window_mode = WindowMode::Windowed;
        self.logical_width = width.max(1);
        self.logical_height = height.max(1);
    }

    fn set_fullscreen(&mut self) {
        self.window_mode = WindowMode::Fullscreen;
    }

    fn set_maximized(&mut self) {
        self.window_mode = WindowMode::Maximized;
    }

    fn run_loop(&mut self) {
        self.loop_running = true;
    }

    fn stop_loop(&mut self) {
        self.loop_running = false;
    }

    fn close(&mut self) {
        self.stop_loop();
        self.closed = true;
    }
}

fn number(event: &serde_json::Value, key: &str) -> Option<f64> {
    event.get(key).and_then(|value| value.as_f64())
}
