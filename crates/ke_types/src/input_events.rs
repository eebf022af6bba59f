//! Raw input events, as surfaced by the window adapter.

/// Phase of a pointer event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

impl PointerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "pointer_down",
            Self::Move => "pointer_move",
            Self::Up => "pointer_up",
        }
    }
}

/// Raw pointer event in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
    pub button: i32,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f64, y: f64, button: i32) -> Self {
        Self {
            phase,
            x,
            y,
            button,
        }
    }
}

/// Phase of a key event. `Char` carries cooked text input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyPhase {
    Down,
    Up,
    Char,
}

impl KeyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "key_down",
            Self::Up => "key_up",
            Self::Char => "char",
        }
    }
}

/// Raw key/char event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub phase: KeyPhase,
    pub value: String,
}

impl KeyEvent {
    pub fn new(phase: KeyPhase, value: impl Into<String>) -> Self {
        Self {
            phase,
            value: value.into(),
        }
    }

    pub fn down(value: impl Into<String>) -> Self {
        Self::new(KeyPhase::Down, value)
    }

    pub fn up(value: impl Into<String>) -> Self {
        Self::new(KeyPhase::Up, value)
    }

    pub fn char(value: impl Into<String>) -> Self {
        Self::new(KeyPhase::Char, value)
    }
}

/// Mouse wheel event in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WheelEvent {
    pub x: f64,
    pub y: f64,
    pub dy: f64,
}

/// Any raw input event, as drained from the window adapter per frame.
#[derive(Clone, Debug, PartialEq)]
pub enum RawInputEvent {
    Pointer(PointerEvent),
    Key(KeyEvent),
    Wheel(WheelEvent),
}
