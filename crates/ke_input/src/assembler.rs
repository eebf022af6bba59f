//! Folds raw events into one immutable snapshot per frame.

use std::collections::BTreeSet;

use ke_types::{
    ActionSnapshot, InputSnapshot, KeyEvent, KeyPhase, KeyboardSnapshot, MouseSnapshot,
    PointerEvent, PointerPhase, WheelEvent,
};

use crate::bindings::{ActionBindings, BindingSource};

/// Reserved action-value name counting ambiguous bindings.
pub const MAPPING_CONFLICTS_VALUE: &str = "meta.mapping_conflicts";

/// Carries held state across frames and assembles snapshots.
#[derive(Default)]
pub struct InputAssembler {
    pressed_keys: BTreeSet<String>,
    pressed_buttons: BTreeSet<i32>,
    mouse_x: f64,
    mouse_y: f64,
    previous_active_actions: BTreeSet<String>,
}

impl InputAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the snapshot for one frame from the drained raw events.
    pub fn build_snapshot(
        &mut self,
        frame_index: u64,
        bindings: &ActionBindings,
        pointer_events: Vec<PointerEvent>,
        key_events: Vec<KeyEvent>,
        wheel_events: Vec<WheelEvent>,
    ) -> InputSnapshot {
        let mut just_pressed_buttons = BTreeSet::new();
        let mut just_released_buttons = BTreeSet::new();
        let mut delta_x = 0.0;
        let mut delta_y = 0.0;

        let pointer_events: Vec<PointerEvent> = pointer_events
            .into_iter()
            .map(sanitize_pointer_event)
            .collect();

        for event in &pointer_events {
            match event.phase {
                PointerPhase::Move => {
                    delta_x += event.x - self.mouse_x;
                    delta_y += event.y - self.mouse_y;
                }
                PointerPhase::Down => {
                    if self.pressed_buttons.insert(event.button) {
                        just_pressed_buttons.insert(event.button);
                    }
                    just_released_buttons.remove(&event.button);
                }
                PointerPhase::Up => {
                    self.pressed_buttons.remove(&event.button);
                    // Keep the edge sets consistent when a button goes
                    // down and up within the same frame.
                    just_pressed_buttons.remove(&event.button);
                    just_released_buttons.insert(event.button);
                }
            }
            self.mouse_x = event.x;
            self.mouse_y = event.y;
        }

        let mut just_pressed_keys = BTreeSet::new();
        let mut just_released_keys = BTreeSet::new();
        let mut text_input = Vec::new();
        let mut chars_this_frame = Vec::new();

        for event in &key_events {
            match event.phase {
                KeyPhase::Down => {
                    let key = event.value.trim().to_lowercase();
                    if key.is_empty() {
                        continue;
                    }
                    just_released_keys.remove(&key);
                    if self.pressed_keys.insert(key.clone()) {
                        just_pressed_keys.insert(key);
                    }
                }
                KeyPhase::Up => {
                    let key = event.value.trim().to_lowercase();
                    if key.is_empty() {
                        continue;
                    }
                    self.pressed_keys.remove(&key);
                    just_pressed_keys.remove(&key);
                    just_released_keys.insert(key);
                }
                KeyPhase::Char => {
                    let mut chars = event.value.chars();
                    let (Some(ch), None) = (chars.next(), chars.next()) else {
                        continue;
                    };
                    if ch.is_control() {
                        continue;
                    }
                    text_input.push(ch.to_string());
                    chars_this_frame.push(ch);
                }
            }
        }

        let wheel_delta: f64 = wheel_events
            .iter()
            .map(|event| sanitize_coordinate(event.dy))
            .sum();

        let actions = self.resolve_actions(bindings, &chars_this_frame);

        InputSnapshot {
            frame_index,
            keyboard: KeyboardSnapshot {
                pressed_keys: self.pressed_keys.clone(),
                just_pressed_keys,
                just_released_keys,
                text_input,
            },
            mouse: MouseSnapshot {
                x: self.mouse_x,
                y: self.mouse_y,
                delta_x,
                delta_y,
                wheel_delta,
                pressed_buttons: self.pressed_buttons.clone(),
                just_pressed_buttons,
                just_released_buttons,
            },
            controllers: Vec::new(),
            actions,
            pointer_events,
            key_events,
            wheel_events,
        }
    }

    fn resolve_actions(&mut self, bindings: &ActionBindings, chars: &[char]) -> ActionSnapshot {
        let mut active = BTreeSet::new();

        for key in &self.pressed_keys {
            for action in bindings.actions_for(&BindingSource::KeyDown(key.clone())) {
                active.insert(action.clone());
            }
        }
        for button in &self.pressed_buttons {
            for action in bindings.actions_for(&BindingSource::PointerDown(*button)) {
                active.insert(action.clone());
            }
        }
        // Char sources are momentary: active only in the frame of arrival.
        for ch in chars {
            for action in bindings.actions_for(&BindingSource::Char(*ch)) {
                active.insert(action.clone());
            }
        }

        let just_started: BTreeSet<String> = active
            .difference(&self.previous_active_actions)
            .cloned()
            .collect();
        let just_ended: BTreeSet<String> = self
            .previous_active_actions
            .difference(&active)
            .cloned()
            .collect();
        self.previous_active_actions = active.clone();

        ActionSnapshot {
            active,
            just_started,
            just_ended,
            values: vec![(
                MAPPING_CONFLICTS_VALUE.to_owned(),
                bindings.conflict_count() as f64,
            )],
        }
    }
}

fn sanitize_pointer_event(event: PointerEvent) -> PointerEvent {
    PointerEvent {
        phase: event.phase,
        x: sanitize_coordinate(event.x),
        y: sanitize_coordinate(event.y),
        button: event.button,
    }
}

fn sanitize_coordinate(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(phase: PointerPhase, x: f64, y: f64, button: i32) -> PointerEvent {
        PointerEvent::new(phase, x, y, button)
    }

    #[test]
    fn held_state_carries_across_frames() {
        let bindings = ActionBindings::new();
        let mut assembler = InputAssembler::new();

        let first = assembler.build_snapshot(
            0,
            &bindings,
            vec![pointer(PointerPhase::Down, 10.0, 20.0, 1)],
            vec![KeyEvent::down("A")],
            vec![],
        );
        assert!(first.mouse.pressed_buttons.contains(&1));
        assert!(first.mouse.just_pressed_buttons.contains(&1));
        assert!(first.keyboard.just_pressed_keys.contains("a"));

        let second = assembler.build_snapshot(1, &bindings, vec![], vec![], vec![]);
        assert!(second.mouse.pressed_buttons.contains(&1));
        assert!(second.mouse.just_pressed_buttons.is_empty());
        assert!(second.keyboard.pressed_keys.contains("a"));
        assert!(second.keyboard.just_pressed_keys.is_empty());
        assert_eq!(second.mouse.x, 10.0);
    }

    #[test]
    fn edge_sets_satisfy_snapshot_invariants() {
        let bindings = ActionBindings::new();
        let mut assembler = InputAssembler::new();
        assembler.build_snapshot(
            0,
            &bindings,
            vec![pointer(PointerPhase::Down, 0.0, 0.0, 1)],
            vec![KeyEvent::down("w"), KeyEvent::down("s")],
            vec![],
        );
        let snapshot = assembler.build_snapshot(
            1,
            &bindings,
            vec![
                pointer(PointerPhase::Up, 0.0, 0.0, 1),
                pointer(PointerPhase::Down, 0.0, 0.0, 2),
            ],
            vec![KeyEvent::up("w"), KeyEvent::down("d")],
            vec![],
        );

        // just_pressed ⊆ pressed
        assert!(snapshot
            .keyboard
            .just_pressed_keys
            .is_subset(&snapshot.keyboard.pressed_keys));
        assert!(snapshot
            .mouse
            .just_pressed_buttons
            .is_subset(&snapshot.mouse.pressed_buttons));
        // just_released ∩ pressed = ∅
        assert!(snapshot
            .keyboard
            .just_released_keys
            .is_disjoint(&snapshot.keyboard.pressed_keys));
        assert!(snapshot
            .mouse
            .just_released_buttons
            .is_disjoint(&snapshot.mouse.pressed_buttons));
        // pressed_t = (pressed_{t-1} ∪ just_pressed_t) \ just_released_t
        let expected: BTreeSet<String> = ["s", "d"].iter().map(|s| (*s).to_owned()).collect();
        assert_eq!(snapshot.keyboard.pressed_keys, expected);
    }

    #[test]
    fn same_frame_press_and_release_keeps_sets_consistent() {
        let bindings = ActionBindings::new();
        let mut assembler = InputAssembler::new();
        let snapshot = assembler.build_snapshot(
            0,
            &bindings,
            vec![
                pointer(PointerPhase::Down, 0.0, 0.0, 1),
                pointer(PointerPhase::Up, 0.0, 0.0, 1),
            ],
            vec![],
            vec![],
        );
        assert!(snapshot.mouse.pressed_buttons.is_empty());
        assert!(snapshot.mouse.just_pressed_buttons.is_empty());
        assert!(snapshot.mouse.just_released_buttons.contains(&1));
        assert!(snapshot
            .mouse
            .just_pressed_buttons
            .is_subset(&snapshot.mouse.pressed_buttons));
    }

    #[test]
    fn repeated_key_down_does_not_re_enter_just_pressed() {
        let bindings = ActionBindings::new();
        let mut assembler = InputAssembler::new();
        assembler.build_snapshot(0, &bindings, vec![], vec![KeyEvent::down("a")], vec![]);
        let snapshot =
            assembler.build_snapshot(1, &bindings, vec![], vec![KeyEvent::down("a")], vec![]);
        assert!(snapshot.keyboard.just_pressed_keys.is_empty());
        assert!(snapshot.keyboard.pressed_keys.contains("a"));
    }

    #[test]
    fn moves_accumulate_deltas_and_track_last_position() {
        let bindings = ActionBindings::new();
        let mut assembler = InputAssembler::new();
        let snapshot = assembler.build_snapshot(
            0,
            &bindings,
            vec![
                pointer(PointerPhase::Move, 10.0, 0.0, 0),
                pointer(PointerPhase::Move, 15.0, 5.0, 0),
            ],
            vec![],
            vec![],
        );
        assert_eq!(snapshot.mouse.delta_x, 15.0);
        assert_eq!(snapshot.mouse.delta_y, 5.0);
        assert_eq!(snapshot.mouse.x, 15.0);
    }

    #[test]
    fn wheel_deltas_sum_and_text_preserves_order() {
        let bindings = ActionBindings::new();
        let mut assembler = InputAssembler::new();
        let snapshot = assembler.build_snapshot(
            0,
            &bindings,
            vec![],
            vec![
                KeyEvent::char("h"),
                KeyEvent::char("\u{7}"), // non-printable, dropped
                KeyEvent::char("i"),
            ],
            vec![
                WheelEvent { x: 0.0, y: 0.0, dy: -1.0 },
                WheelEvent { x: 0.0, y: 0.0, dy: 2.5 },
            ],
        );
        assert_eq!(snapshot.mouse.wheel_delta, 1.5);
        assert_eq!(snapshot.keyboard.text_input, vec!["h", "i"]);
    }

    #[test]
    fn non_finite_coordinates_clamp_to_zero() {
        let bindings = ActionBindings::new();
        let mut assembler = InputAssembler::new();
        let snapshot = assembler.build_snapshot(
            0,
            &bindings,
            vec![pointer(PointerPhase::Move, f64::NAN, f64::INFINITY, 0)],
            vec![],
            vec![],
        );
        assert_eq!(snapshot.mouse.x, 0.0);
        assert_eq!(snapshot.mouse.y, 0.0);
    }

    #[test]
    fn actions_track_start_and_end_edges() {
        let mut bindings = ActionBindings::new();
        bindings.bind_key_down("space", "fire").unwrap();
        bindings.bind_pointer_down(1, "select").unwrap();
        let mut assembler = InputAssembler::new();

        let first = assembler.build_snapshot(
            0,
            &bindings,
            vec![pointer(PointerPhase::Down, 0.0, 0.0, 1)],
            vec![KeyEvent::down("space")],
            vec![],
        );
        assert!(first.actions.active.contains("fire"));
        assert!(first.actions.active.contains("select"));
        assert!(first.actions.just_started.contains("fire"));

        let second = assembler.build_snapshot(1, &bindings, vec![], vec![], vec![]);
        assert!(second.actions.active.contains("fire"));
        assert!(second.actions.just_started.is_empty());

        let third = assembler.build_snapshot(
            2,
            &bindings,
            vec![pointer(PointerPhase::Up, 0.0, 0.0, 1)],
            vec![KeyEvent::up("space")],
            vec![],
        );
        assert!(third.actions.active.is_empty());
        assert!(third.actions.just_ended.contains("fire"));
        assert!(third.actions.just_ended.contains("select"));
    }

    #[test]
    fn char_actions_are_momentary() {
        let mut bindings = ActionBindings::new();
        bindings.bind_char('r', "restart").unwrap();
        let mut assembler = InputAssembler::new();

        let first =
            assembler.build_snapshot(0, &bindings, vec![], vec![KeyEvent::char("r")], vec![]);
        assert!(first.actions.just_started.contains("restart"));
        let second = assembler.build_snapshot(1, &bindings, vec![], vec![], vec![]);
        assert!(second.actions.just_ended.contains("restart"));
    }

    #[test]
    fn mapping_conflicts_are_reported() {
        let mut bindings = ActionBindings::new();
        bindings.bind_key_down("space", "fire").unwrap();
        bindings.bind_key_down("space", "jump").unwrap();
        let mut assembler = InputAssembler::new();
        let snapshot = assembler.build_snapshot(0, &bindings, vec![], vec![], vec![]);
        let conflicts = snapshot
            .actions
            .values
            .iter()
            .find(|(name, _)| name == MAPPING_CONFLICTS_VALUE)
            .map(|(_, value)| *value);
        assert_eq!(conflicts, Some(1.0));
    }
}
