//! Immutable per-frame input snapshots.

use std::collections::BTreeSet;

use crate::input_events::{KeyEvent, PointerEvent, WheelEvent};

/// Frame-stable keyboard state.
///
/// Key identifiers are normalized lower-case. The sets are ordered so that
/// snapshot fan-out dispatches keys deterministically.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyboardSnapshot {
    pub pressed_keys: BTreeSet<String>,
    pub just_pressed_keys: BTreeSet<String>,
    pub just_released_keys: BTreeSet<String>,
    /// Cooked text input, in arrival order.
    pub text_input: Vec<String>,
}

/// Frame-stable mouse/pointer state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MouseSnapshot {
    pub x: f64,
    pub y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub wheel_delta: f64,
    pub pressed_buttons: BTreeSet<i32>,
    pub just_pressed_buttons: BTreeSet<i32>,
    pub just_released_buttons: BTreeSet<i32>,
}

/// Frame-stable controller state.
#[derive(Clone, Debug, PartialEq)]
pub struct ControllerSnapshot {
    pub device_id: String,
    pub connected: bool,
    pub pressed_buttons: BTreeSet<String>,
    pub axes: Vec<f64>,
}

/// Resolved logical action state for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionSnapshot {
    pub active: BTreeSet<String>,
    pub just_started: BTreeSet<String>,
    pub just_ended: BTreeSet<String>,
    /// Named numeric values, including the reserved
    /// `meta.mapping_conflicts` counter.
    pub values: Vec<(String, f64)>,
}

/// Immutable frame input snapshot consumed by simulation.
///
/// The raw event streams are retained for framework-level routing; the
/// derived sub-states are what game logic usually reads.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputSnapshot {
    pub frame_index: u64,
    pub keyboard: KeyboardSnapshot,
    pub mouse: MouseSnapshot,
    pub controllers: Vec<ControllerSnapshot>,
    pub actions: ActionSnapshot,
    pub pointer_events: Vec<PointerEvent>,
    pub key_events: Vec<KeyEvent>,
    pub wheel_events: Vec<WheelEvent>,
}

impl InputSnapshot {
    /// An empty snapshot, for bootstrap and tests.
    pub fn empty(frame_index: u64) -> Self {
        Self {
            frame_index,
            ..Default::default()
        }
    }
}
