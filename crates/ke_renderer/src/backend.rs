//! The backend seam behind the renderer facade.

use ke_types::WindowResizeEvent;

use crate::error::RenderError;
use crate::packet::DrawPacket;

/// Owner-thread identity check shared by renderer and backends.
///
/// All render state is single-threaded by contract; calls from any other
/// thread fail with [`RenderError::InvalidThread`] before touching state.
#[derive(Clone, Copy, Debug)]
pub struct OwnerThread {
    id: std::thread::ThreadId,
}

impl OwnerThread {
    /// Capture the calling thread as the owner.
    pub fn capture() -> Self {
        Self {
            id: std::thread::current().id(),
        }
    }

    pub fn check(&self) -> Result<(), RenderError> {
        if std::thread::current().id() == self.id {
            Ok(())
        } else {
            Err(RenderError::InvalidThread)
        }
    }
}

/// Latest resize/reconfigure telemetry, attached to diagnostics events.
#[derive(Clone, Debug, PartialEq)]
pub struct ResizeTelemetry {
    pub renderer_reused: bool,
    pub device_reused: bool,
    pub adapter_reused: bool,
    pub reconfigure_attempts: u32,
    pub reconfigure_failures: u64,
    pub present_mode: String,
    pub surface_format: String,
    pub width: u32,
    pub height: u32,
    pub dpi_scale: f64,
}

impl ResizeTelemetry {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "renderer_reused": self.renderer_reused,
            "device_reused": self.device_reused,
            "adapter_reused": self.adapter_reused,
            "reconfigure_attempts": self.reconfigure_attempts,
            "reconfigure_failures": self.reconfigure_failures,
            "present_mode": self.present_mode,
            "surface_format": self.surface_format,
            "width": self.width,
            "height": self.height,
            "dpi_scale": self.dpi_scale,
        })
    }
}

/// Staged-upload strategy for one batch of packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadMode {
    None,
    FullRewrite,
    RingBuffer,
}

impl UploadMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::FullRewrite => "full_rewrite",
            Self::RingBuffer => "ring_buffer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadPlan {
    pub mode: UploadMode,
    pub buffer_size: u64,
}

/// Pick the staging strategy for a packet batch.
///
/// Small batches rewrite a single staging buffer; large ones advance a
/// ring buffer. 64 bytes per packet, with floor sizes of 256 and 1024.
pub fn plan_upload(packet_count: usize, threshold: usize) -> UploadPlan {
    if packet_count == 0 {
        return UploadPlan {
            mode: UploadMode::None,
            buffer_size: 0,
        };
    }
    let bytes = packet_count as u64 * 64;
    if packet_count <= threshold {
        UploadPlan {
            mode: UploadMode::FullRewrite,
            buffer_size: bytes.max(256),
        }
    } else {
        UploadPlan {
            mode: UploadMode::RingBuffer,
            buffer_size: bytes.max(1024),
        }
    }
}

/// Private backend contract for the renderer internals.
pub trait RenderBackend: Send {
    fn begin_frame(&mut self) -> Result<(), RenderError>;

    /// Encode and stage one pass worth of packets.
    fn draw_packets(&mut self, pass_name: &str, packets: &[DrawPacket]) -> Result<(), RenderError>;

    /// Submit the encoded frame.
    fn present(&mut self) -> Result<(), RenderError>;

    fn end_frame(&mut self) -> Result<(), RenderError>;

    fn close(&mut self);

    fn set_title(&mut self, title: &str);

    /// Apply a resize; device and adapter are reused, only the frame
    /// target is rebuilt (with bounded retry).
    fn reconfigure(&mut self, event: &WindowResizeEvent) -> Result<(), RenderError>;

    fn resize_telemetry(&self) -> ResizeTelemetry;
}
