//! Frame-scoped queues of raw input events.

use std::collections::VecDeque;

use ke_types::{KeyEvent, PointerEvent, RawInputEvent, WheelEvent};

/// Collects raw events between frames for polling by the frame loop.
#[derive(Default)]
pub struct InputQueue {
    pointer_events: VecDeque<PointerEvent>,
    key_events: VecDeque<KeyEvent>,
    wheel_events: VecDeque<WheelEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept one raw event from the window adapter.
    pub fn push(&mut self, event: RawInputEvent) {
        match event {
            RawInputEvent::Pointer(event) => self.pointer_events.push_back(event),
            RawInputEvent::Key(event) => self.key_events.push_back(event),
            RawInputEvent::Wheel(event) => self.wheel_events.push_back(event),
        }
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = RawInputEvent>) {
        for event in events {
            self.push(event);
        }
    }

    pub fn drain_pointer_events(&mut self) -> Vec<PointerEvent> {
        self.pointer_events.drain(..).collect()
    }

    pub fn drain_key_events(&mut self) -> Vec<KeyEvent> {
        self.key_events.drain(..).collect()
    }

    pub fn drain_wheel_events(&mut self) -> Vec<WheelEvent> {
        self.wheel_events.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pointer_events.is_empty() && self.key_events.is_empty() && self.wheel_events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use ke_types::{KeyPhase, PointerPhase};

    use super::*;

    #[test]
    fn drain_preserves_arrival_order_and_clears() {
        let mut queue = InputQueue::new();
        queue.push(RawInputEvent::Pointer(PointerEvent::new(
            PointerPhase::Down,
            1.0,
            2.0,
            1,
        )));
        queue.push(RawInputEvent::Key(KeyEvent::new(KeyPhase::Down, "a")));
        queue.push(RawInputEvent::Pointer(PointerEvent::new(
            PointerPhase::Up,
            1.0,
            2.0,
            1,
        )));

        let pointers = queue.drain_pointer_events();
        assert_eq!(pointers.len(), 2);
        assert_eq!(pointers[0].phase, PointerPhase::Down);
        assert_eq!(pointers[1].phase, PointerPhase::Up);
        assert_eq!(queue.drain_key_events().len(), 1);
        assert!(queue.is_empty());
    }
}
