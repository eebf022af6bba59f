//! The runtime router wiring raw events to the app port.

use ke_types::{InputSnapshot, KeyEvent, KeyPhase, PointerEvent, PointerPhase, WheelEvent};

use crate::plan::{GridLayout, UiAppPort};
use crate::routing::{
    can_scroll_with_wheel, map_key_name, resolve_pointer_button, route_modal_key_event,
    route_modal_pointer_event, route_non_modal_key_event, ModalInputState,
};
use crate::transform::UiSpaceTransform;

/// Coordinates input routing between the engine runtime and the app port.
///
/// Window-space coordinates are first mapped into design space by the
/// caller-provided mapper (the renderer), then into app space by the UI
/// transform.
pub struct UiRouter {
    ui_transform: UiSpaceTransform,
    modal_state: ModalInputState,
    trace_input: bool,
}

impl UiRouter {
    pub fn new(ui_transform: UiSpaceTransform, trace_input: bool) -> Self {
        Self {
            ui_transform,
            modal_state: ModalInputState::default(),
            trace_input,
        }
    }

    pub fn ui_transform(&self) -> UiSpaceTransform {
        self.ui_transform
    }

    /// Sync framework runtime state from the app UI snapshot.
    pub fn sync_ui_state(&mut self, app: &dyn UiAppPort) {
        self.modal_state.sync(app.modal_widget().is_some());
    }

    /// Route a pointer event to app actions.
    pub fn handle_pointer_event(
        &mut self,
        app: &mut dyn UiAppPort,
        layout: &dyn GridLayout,
        to_design_space: impl Fn(f64, f64) -> (f64, f64),
        event: &PointerEvent,
    ) -> bool {
        let (design_x, design_y) = to_design_space(event.x, event.y);
        let (app_x, app_y) = self.ui_transform.engine_to_app(design_x, design_y);
        if self.trace_input {
            ke_log::info!(
                "pointer_event type={} raw=({:.2},{:.2}) design=({design_x:.2},{design_y:.2}) app=({app_x:.2},{app_y:.2}) button={}",
                event.phase.as_str(),
                event.x,
                event.y,
                event.button,
            );
        }
        match event.phase {
            PointerPhase::Move => return app.on_pointer_move(app_x, app_y),
            PointerPhase::Up => return app.on_pointer_release(app_x, app_y, event.button),
            PointerPhase::Down => {}
        }

        if let Some(modal) = app.modal_widget() {
            let route =
                route_modal_pointer_event(&modal, self.modal_state, app_x, app_y, event.button);
            if let Some(focus_input) = route.focus_input {
                self.modal_state.input_focused = focus_input;
            }
            if let Some(button_id) = route.button_id {
                return app.on_button(&button_id);
            }
            return false;
        }

        let plan = app.interaction_plan();
        if event.button == 1 {
            if let Some(button_id) = resolve_pointer_button(&plan, app_x, app_y) {
                let button_id = button_id.to_owned();
                if self.trace_input {
                    ke_log::info!("pointer_down resolve_button={button_id}");
                }
                return app.on_button(&button_id);
            }
            if let Some(surface_id) = &plan.cell_click_surface {
                if let Some(cell) = layout.screen_to_cell(surface_id, app_x, app_y) {
                    if self.trace_input {
                        ke_log::info!(
                            "pointer_down cell_surface={surface_id} cell=({},{})",
                            cell.row,
                            cell.col
                        );
                    }
                    return app.on_cell_click(surface_id, cell);
                }
            }
        }
        app.on_pointer_down(app_x, app_y, event.button)
    }

    /// Route a key/char event to app actions.
    pub fn handle_key_event(&mut self, app: &mut dyn UiAppPort, event: &KeyEvent) -> bool {
        let is_char = event.phase == KeyPhase::Char;
        if event.phase == KeyPhase::Up {
            return false;
        }

        if app.modal_widget().is_some() {
            let mapped = if is_char {
                None
            } else {
                map_key_name(&event.value)
            };
            let route =
                route_modal_key_event(is_char, &event.value, mapped.as_deref(), self.modal_state);
            if let Some(ch) = route.char {
                return app.on_char(ch);
            }
            if let Some(key) = route.key {
                return app.on_key(&key);
            }
            return false;
        }

        let plan = app.interaction_plan();
        let route = route_non_modal_key_event(is_char, &event.value, &plan);
        if let Some(ch) = route.controller_char {
            return app.on_char(ch);
        }
        let Some(key) = route.controller_key else {
            return false;
        };
        if app.on_key(&key) {
            return true;
        }
        match route.shortcut_button_id {
            Some(button_id) => app.on_button(&button_id),
            None => false,
        }
    }

    /// Route a wheel event to app actions, gated by scroll regions.
    pub fn handle_wheel_event(
        &mut self,
        app: &mut dyn UiAppPort,
        to_design_space: impl Fn(f64, f64) -> (f64, f64),
        event: &WheelEvent,
    ) -> bool {
        let (design_x, design_y) = to_design_space(event.x, event.y);
        let (app_x, app_y) = self.ui_transform.engine_to_app(design_x, design_y);
        let plan = app.interaction_plan();
        if !can_scroll_with_wheel(&plan, app_x, app_y) {
            return false;
        }
        app.on_wheel(app_x, app_y, event.dy)
    }

    /// Route one immutable input snapshot through the per-event handlers.
    ///
    /// Fan-out order: pointer move, pointer downs (sorted by button),
    /// pointer ups (sorted by button), key downs (sorted), chars, wheel.
    pub fn handle_input_snapshot(
        &mut self,
        app: &mut dyn UiAppPort,
        layout: &dyn GridLayout,
        to_design_space: impl Fn(f64, f64) -> (f64, f64),
        snapshot: &InputSnapshot,
    ) -> bool {
        let mut changed = false;
        let mx = snapshot.mouse.x;
        let my = snapshot.mouse.y;

        if snapshot.mouse.delta_x != 0.0 || snapshot.mouse.delta_y != 0.0 {
            let event = PointerEvent::new(PointerPhase::Move, mx, my, 0);
            changed |= self.handle_pointer_event(app, layout, &to_design_space, &event);
        }
        for button in &snapshot.mouse.just_pressed_buttons {
            let event = PointerEvent::new(PointerPhase::Down, mx, my, *button);
            changed |= self.handle_pointer_event(app, layout, &to_design_space, &event);
        }
        for button in &snapshot.mouse.just_released_buttons {
            let event = PointerEvent::new(PointerPhase::Up, mx, my, *button);
            changed |= self.handle_pointer_event(app, layout, &to_design_space, &event);
        }
        for key in &snapshot.keyboard.just_pressed_keys {
            changed |= self.handle_key_event(app, &KeyEvent::down(key.clone()));
        }
        for ch in &snapshot.keyboard.text_input {
            changed |= self.handle_key_event(app, &KeyEvent::char(ch.clone()));
        }
        if snapshot.mouse.wheel_delta != 0.0 {
            let event = WheelEvent {
                x: mx,
                y: my,
                dy: snapshot.mouse.wheel_delta,
            };
            changed |= self.handle_wheel_event(app, &to_design_space, &event);
        }
        changed
    }
}
