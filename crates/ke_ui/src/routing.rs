//! Pure routing helpers: key normalization, modal and non-modal routes.

use crate::plan::{InteractionPlan, ModalWidget};

/// Normalize backend key names to app key identifiers.
///
/// Returns `None` for keys the framework does not route.
pub fn map_key_name(key_name: &str) -> Option<String> {
    let normalized = key_name.trim().to_lowercase();
    match normalized.as_str() {
        "backspace" => Some("backspace".to_owned()),
        "enter" | "return" => Some("enter".to_owned()),
        "escape" | "esc" => Some("escape".to_owned()),
        _ => {
            let mut chars = normalized.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) if ch.is_alphabetic() => Some(normalized),
                _ => None,
            }
        }
    }
}

/// Tracks modal lifecycle and text-input focus state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModalInputState {
    pub is_open: bool,
    pub input_focused: bool,
}

impl ModalInputState {
    /// Sync state with current modal presence. A freshly opened modal
    /// focuses its input field.
    pub fn sync(&mut self, modal_open: bool) {
        if !modal_open {
            self.is_open = false;
            self.input_focused = false;
            return;
        }
        if !self.is_open {
            self.input_focused = true;
        }
        self.is_open = true;
    }
}

/// What a pointer-down hit inside an open modal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalPointerTarget {
    Confirm,
    Cancel,
    Input,
    Panel,
    Overlay,
    Miss,
}

fn resolve_modal_pointer_target(widget: &ModalWidget, x: f64, y: f64) -> ModalPointerTarget {
    if widget.confirm_rect.contains(x, y) {
        ModalPointerTarget::Confirm
    } else if widget.cancel_rect.contains(x, y) {
        ModalPointerTarget::Cancel
    } else if widget.input_rect.contains(x, y) {
        ModalPointerTarget::Input
    } else if widget.panel_rect.contains(x, y) {
        ModalPointerTarget::Panel
    } else if widget.overlay_rect.contains(x, y) {
        ModalPointerTarget::Overlay
    } else {
        ModalPointerTarget::Miss
    }
}

/// Routing result for a pointer event while a modal is open.
///
/// Modal routing always swallows the pointer event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModalPointerRoute {
    pub button_id: Option<String>,
    pub focus_input: Option<bool>,
}

/// Route a pointer-down event when a modal is active.
pub fn route_modal_pointer_event(
    widget: &ModalWidget,
    state: ModalInputState,
    x: f64,
    y: f64,
    button: i32,
) -> ModalPointerRoute {
    if button != 1 {
        return ModalPointerRoute::default();
    }
    match resolve_modal_pointer_target(widget, x, y) {
        ModalPointerTarget::Confirm => ModalPointerRoute {
            button_id: Some(widget.confirm_button_id.clone()),
            focus_input: None,
        },
        ModalPointerTarget::Cancel => ModalPointerRoute {
            button_id: Some(widget.cancel_button_id.clone()),
            focus_input: None,
        },
        ModalPointerTarget::Input => ModalPointerRoute {
            button_id: None,
            focus_input: Some(true),
        },
        ModalPointerTarget::Panel | ModalPointerTarget::Overlay => ModalPointerRoute {
            button_id: None,
            focus_input: Some(false),
        },
        ModalPointerTarget::Miss => ModalPointerRoute {
            button_id: None,
            focus_input: Some(state.input_focused),
        },
    }
}

/// Routing result for a key/char event while a modal is open.
///
/// Modal routing always swallows the key event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModalKeyRoute {
    pub key: Option<String>,
    pub char: Option<char>,
}

/// Route key/char events when a modal is active.
///
/// `mapped_key` is the [`map_key_name`] result for `key_down` events.
pub fn route_modal_key_event(
    is_char: bool,
    value: &str,
    mapped_key: Option<&str>,
    state: ModalInputState,
) -> ModalKeyRoute {
    if is_char {
        if !state.input_focused {
            return ModalKeyRoute::default();
        }
        let mut chars = value.chars();
        return match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => ModalKeyRoute {
                key: None,
                char: Some(ch),
            },
            _ => ModalKeyRoute::default(),
        };
    }

    match mapped_key {
        Some(key @ ("enter" | "escape")) => ModalKeyRoute {
            key: Some(key.to_owned()),
            char: None,
        },
        Some("backspace") if state.input_focused => ModalKeyRoute {
            key: Some("backspace".to_owned()),
            char: None,
        },
        _ => ModalKeyRoute::default(),
    }
}

/// Routing result for a key/char event when no modal is open.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NonModalKeyRoute {
    pub controller_key: Option<String>,
    pub controller_char: Option<char>,
    pub shortcut_button_id: Option<String>,
}

/// Route key/char events when there is no active modal.
pub fn route_non_modal_key_event(
    is_char: bool,
    value: &str,
    plan: &InteractionPlan,
) -> NonModalKeyRoute {
    if is_char {
        let mut chars = value.chars();
        return match (chars.next(), chars.next()) {
            (Some(ch), None) if !ch.is_control() => NonModalKeyRoute {
                controller_char: Some(ch),
                ..Default::default()
            },
            _ => NonModalKeyRoute::default(),
        };
    }

    let Some(mapped) = map_key_name(value) else {
        return NonModalKeyRoute::default();
    };
    NonModalKeyRoute {
        shortcut_button_id: plan.shortcut_buttons.get(&mapped).cloned(),
        controller_key: Some(mapped),
        controller_char: None,
    }
}

/// Resolve the left-click target button id at an app-space point.
///
/// First enabled button whose rectangle contains the point wins.
pub fn resolve_pointer_button(plan: &InteractionPlan, x: f64, y: f64) -> Option<&str> {
    plan.buttons
        .iter()
        .find(|button| button.enabled && button.rect.contains(x, y))
        .map(|button| button.id.as_str())
}

/// Whether wheel scrolling is routed to the app at this point.
pub fn can_scroll_with_wheel(plan: &InteractionPlan, x: f64, y: f64) -> bool {
    plan.wheel_scroll_regions
        .iter()
        .any(|region| region.contains(x, y))
}
