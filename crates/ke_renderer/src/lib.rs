//! The retained GPU renderer of the kestrel engine.
//!
//! Game modules draw through the immediate-mode [`RenderApi`] (or hand
//! over pre-built snapshots); the renderer retains keyed commands across
//! frames, composes them with external passes, sorts deterministically,
//! translates to backend packets and submits through a [`RenderBackend`].
//!
//! The wgpu backend owns the device, queue, pipelines and frame target;
//! a headless backend stands in when no GPU is available.

mod api;
mod backend;
mod compose;
mod error;
mod fonts;
mod headless;
mod packet;
mod renderer;
mod wgpu_backend;

pub use api::{RenderApi, TextAnchor};
pub use backend::{plan_upload, OwnerThread, RenderBackend, ResizeTelemetry, UploadMode, UploadPlan};
pub use compose::{build_pass_batches, PassBatch, SceneBuffers};
pub use error::{BackendInitDetails, RenderError};
pub use fonts::resolve_system_font_path;
pub use headless::HeadlessBackend;
pub use packet::{command_to_packet, DrawPacket};
pub use renderer::FrameRenderer;
pub use wgpu_backend::WgpuBackend;
