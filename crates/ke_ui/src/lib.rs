//! UI input routing between the engine runtime and the app module.
//!
//! The router converts window-space events into the app's authored
//! coordinate space, consults the app-provided interaction plan, and
//! dispatches to buttons, grid cells, modal fields or fallback handlers.
//! It is deterministic and pure given its inputs and modal state.

mod plan;
mod router;
mod routing;
mod scale;
mod transform;

pub use plan::{CellRef, GridLayout, InteractionPlan, ModalWidget, Rect, UiAppPort, UiButton, UniformGridLayout};
pub use router::UiRouter;
pub use routing::{
    can_scroll_with_wheel, map_key_name, resolve_pointer_button, route_modal_key_event,
    route_modal_pointer_event, route_non_modal_key_event, ModalInputState, ModalKeyRoute,
    ModalPointerRoute, ModalPointerTarget, NonModalKeyRoute,
};
pub use scale::scale_render_snapshot;
pub use transform::{resolve_ui_space_transform, UiSpaceTransform};
