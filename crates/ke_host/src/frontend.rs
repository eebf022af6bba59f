//! Frontend adapter over the window event loop and the host.

use ke_input::{ActionBindings, InputAssembler, InputQueue};
use ke_types::{InputSnapshot, WindowEvent};
use ke_window::WindowPort;

use crate::host::EngineHost;

/// Pumps window events and input snapshots into the host, one frame at a
/// time.
///
/// Whatever owns the OS loop calls [`HostedWindowFrontend::pump_frame`]
/// per iteration (or [`HostedWindowFrontend::run`] to loop until the host
/// closes).
pub struct HostedWindowFrontend<W: WindowPort> {
    window: W,
    host: EngineHost,
    queue: InputQueue,
    assembler: InputAssembler,
    bindings: ActionBindings,
}

impl<W: WindowPort> HostedWindowFrontend<W> {
    pub fn new(window: W, host: EngineHost) -> Self {
        Self {
            window,
            host,
            queue: InputQueue::new(),
            assembler: InputAssembler::new(),
            bindings: ActionBindings::new(),
        }
    }

    pub fn host(&self) -> &EngineHost {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut EngineHost {
        &mut self.host
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn bindings_mut(&mut self) -> &mut ActionBindings {
        &mut self.bindings
    }

    /// Run frames until the host closes.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.window.run_loop();
        while !self.host.is_closed() {
            self.pump_frame()?;
        }
        Ok(())
    }

    /// One full frontend iteration: window events, input snapshot,
    /// host frame, close-out.
    pub fn pump_frame(&mut self) -> anyhow::Result<()> {
        self.process_window_events()?;
        let snapshot = self.build_input_snapshot();
        let changed = self.host.handle_input_snapshot(&snapshot);
        if changed || self.host.take_redraw_request() {
            if let Some(renderer) = self.host.renderer_mut() {
                renderer.invalidate();
            }
        }
        self.host.frame()?;
        if self.host.is_closed() {
            if let Some(renderer) = self.host.renderer_mut() {
                renderer.close();
            }
            self.window.close();
        }
        Ok(())
    }

    fn process_window_events(&mut self) -> anyhow::Result<()> {
        let events = self.window.poll_events();
        if events.is_empty() {
            return Ok(());
        }
        let hub = self.host.diagnostics_hub();
        let tick = self.host.current_frame_index();
        for event in events {
            match event {
                WindowEvent::Resize(resize) => {
                    if let Some(renderer) = self.host.renderer_mut() {
                        renderer.apply_window_resize(&resize)?;
                    }
                    hub.emit_fast(
                        "window",
                        "window.resize",
                        tick,
                        serde_json::json!({
                            "logical_width": resize.logical_width,
                            "logical_height": resize.logical_height,
                            "physical_width": resize.physical_width,
                            "physical_height": resize.physical_height,
                            "dpi_scale": resize.dpi_scale,
                        }),
                        serde_json::Map::new(),
                    );
                }
                WindowEvent::Focus(focus) => {
                    hub.emit_fast(
                        "window",
                        "window.focus",
                        tick,
                        serde_json::json!({ "focused": focus.focused }),
                        serde_json::Map::new(),
                    );
                }
                WindowEvent::Minimize(minimize) => {
                    hub.emit_fast(
                        "window",
                        "window.minimize",
                        tick,
                        serde_json::json!({ "minimized": minimize.minimized }),
                        serde_json::Map::new(),
                    );
                }
                WindowEvent::Close(close) => {
                    hub.emit_fast(
                        "window",
                        "window.close_requested",
                        tick,
                        serde_json::json!({ "requested": close.requested }),
                        serde_json::Map::new(),
                    );
                    self.host.close();
                }
            }
        }
        Ok(())
    }

    fn build_input_snapshot(&mut self) -> InputSnapshot {
        self.queue.extend(self.window.poll_input_events());
        let pointer_events = self.queue.drain_pointer_events();
        let key_events = self.queue.drain_key_events();
        let wheel_events = self.queue.drain_wheel_events();
        self.assembler.build_snapshot(
            self.host.current_frame_index(),
            &self.bindings,
            pointer_events,
            key_events,
            wheel_events,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use parking_lot::Mutex;

    use ke_window::WindowAdapter;

    use crate::module::{GameModule, HostFrameContext};

    use super::*;

    #[derive(Default)]
    struct CountingModule {
        frames: Arc<Mutex<u64>>,
        pointer_downs: Arc<Mutex<u64>>,
    }

    impl GameModule for CountingModule {
        fn on_pointer_event(&mut self, event: &ke_types::PointerEvent) -> bool {
            if event.phase == ke_types::PointerPhase::Down {
                *self.pointer_downs.lock() += 1;
            }
            true
        }

        fn on_frame(&mut self, _context: &HostFrameContext) -> anyhow::Result<()> {
            *self.frames.lock() += 1;
            Ok(())
        }
    }

    fn frontend_with_module(
        module: CountingModule,
    ) -> HostedWindowFrontend<WindowAdapter> {
        let mut env = HashMap::new();
        env.insert(
            "ENGINE_DIAGNOSTICS_CRASH_BUNDLE_ENABLED".to_owned(),
            "0".to_owned(),
        );
        let config = ke_config::load_with(&env);
        let host = EngineHost::new(Box::new(module), &config, None);
        HostedWindowFrontend::new(WindowAdapter::new("test-canvas", 1200, 720), host)
    }

    #[test]
    fn raw_events_reach_the_module_through_the_snapshot() {
        let module = CountingModule::default();
        let frames = module.frames.clone();
        let pointer_downs = module.pointer_downs.clone();
        let mut frontend = frontend_with_module(module);

        frontend.window_mut().push_raw_event(&serde_json::json!({
            "event_type": "pointer_down", "x": 10.0, "y": 20.0, "button": 1
        }));
        frontend.pump_frame().unwrap();

        assert_eq!(*frames.lock(), 1);
        assert_eq!(*pointer_downs.lock(), 1);
    }

    #[test]
    fn window_close_event_shuts_the_host_down() {
        let module = CountingModule::default();
        let mut frontend = frontend_with_module(module);

        frontend.window_mut().push_raw_event(&serde_json::json!({ "event_type": "close" }));
        frontend.pump_frame().unwrap();

        assert!(frontend.host().is_closed());
        assert!(frontend.window().is_closed());
        let events = frontend
            .host()
            .diagnostics_hub()
            .snapshot(None, Some("window"), None);
        assert!(events
            .iter()
            .any(|event| event.name == "window.close_requested"));
    }

    #[test]
    fn window_events_are_surfaced_as_diagnostics() {
        let module = CountingModule::default();
        let mut frontend = frontend_with_module(module);

        frontend.window_mut().push_raw_event(&serde_json::json!({ "event_type": "focus", "focused": false }));
        frontend.window_mut().push_raw_event(&serde_json::json!({ "event_type": "minimize", "minimized": true }));
        frontend.pump_frame().unwrap();

        let hub = frontend.host().diagnostics_hub();
        assert_eq!(hub.snapshot(None, None, Some("window.focus")).len(), 1);
        assert_eq!(hub.snapshot(None, None, Some("window.minimize")).len(), 1);
    }

}
