//! The core value types of the kestrel engine.
//!
//! Everything in here is plain data with value semantics: immutable
//! snapshots exchanged between the window adapter, the input assembler,
//! the game module and the renderer. No component state lives here.

pub mod color;
pub mod input_events;
pub mod input_snapshot;
pub mod render_snapshot;
pub mod value;
pub mod window;

pub use color::{color_or_white, parse_hex_color, srgb_to_linear, srgb_to_linear_channel, Rgba};
pub use input_events::{KeyEvent, KeyPhase, PointerEvent, PointerPhase, RawInputEvent, WheelEvent};
pub use input_snapshot::{
    ActionSnapshot, ControllerSnapshot, InputSnapshot, KeyboardSnapshot, MouseSnapshot,
};
pub use render_snapshot::{
    layer_from_z, resolve_pass_descriptor, CommandKind, Mat4, PassDescriptor, RenderCommand,
    RenderPassSnapshot, RenderSnapshot,
};
pub use value::DataValue;
pub use window::{
    SurfaceHandle, WindowCloseEvent, WindowEvent, WindowFocusEvent, WindowMinimizeEvent,
    WindowResizeEvent,
};
