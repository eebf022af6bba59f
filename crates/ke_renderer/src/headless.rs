//! Recording backend used without a GPU (tests, `ENGINE_HEADLESS`).

use ke_types::WindowResizeEvent;

use crate::backend::{plan_upload, OwnerThread, RenderBackend, ResizeTelemetry, UploadMode};
use crate::error::RenderError;
use crate::packet::DrawPacket;

/// In-memory backend mirroring the wgpu backend's state machine.
///
/// Records every pass it is asked to draw, enforces the single
/// frame-in-flight rule and the owner-thread guard, and can be told to
/// fail reconfigures to exercise the retry path.
pub struct HeadlessBackend {
    owner: OwnerThread,
    frame_in_flight: bool,
    title: String,
    width: u32,
    height: u32,
    dpi_scale: f64,
    reconfigure_retry_limit: u32,
    reconfigure_attempts_last: u32,
    reconfigure_failures: u64,
    /// Number of upcoming frame-target rebuilds that should fail.
    pub fail_next_reconfigures: u32,
    upload_threshold: usize,
    upload_mode_last: UploadMode,
    /// Every `draw_packets` call of the current session, in order.
    pub drawn: Vec<(String, Vec<DrawPacket>)>,
    pub presented_frames: u64,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32, reconfigure_retry_limit: u32, upload_threshold: usize) -> Self {
        Self {
            owner: OwnerThread::capture(),
            frame_in_flight: false,
            title: String::new(),
            width: width.max(1),
            height: height.max(1),
            dpi_scale: 1.0,
            reconfigure_retry_limit: reconfigure_retry_limit.max(1),
            reconfigure_attempts_last: 0,
            reconfigure_failures: 0,
            fail_next_reconfigures: 0,
            upload_threshold: upload_threshold.max(1),
            upload_mode_last: UploadMode::None,
            drawn: Vec::new(),
            presented_frames: 0,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn upload_mode_last(&self) -> UploadMode {
        self.upload_mode_last
    }
}

impl RenderBackend for HeadlessBackend {
    fn begin_frame(&mut self) -> Result<(), RenderError> {
        self.owner.check()?;
        if self.frame_in_flight {
            return Err(RenderError::FrameInFlight);
        }
        self.frame_in_flight = true;
        Ok(())
    }

    fn draw_packets(&mut self, pass_name: &str, packets: &[DrawPacket]) -> Result<(), RenderError> {
        self.owner.check()?;
        self.upload_mode_last = plan_upload(packets.len(), self.upload_threshold).mode;
        self.drawn.push((pass_name.to_owned(), packets.to_vec()));
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        self.owner.check()?;
        self.presented_frames += 1;
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.owner.check()?;
        self.frame_in_flight = false;
        Ok(())
    }

    fn close(&mut self) {
        self.drawn.clear();
    }

    fn set_title(&mut self, title: &str) {
        self.title = title.to_owned();
    }

    fn reconfigure(&mut self, event: &WindowResizeEvent) -> Result<(), RenderError> {
        self.owner.check()?;
        self.width = event.physical_width.max(1);
        self.height = event.physical_height.max(1);
        self.dpi_scale = event.dpi_scale.max(0.01);
        self.reconfigure_attempts_last = 0;
        for attempt in 1..=self.reconfigure_retry_limit {
            self.reconfigure_attempts_last = attempt;
            if self.fail_next_reconfigures == 0 {
                return Ok(());
            }
            self.fail_next_reconfigures -= 1;
            self.reconfigure_failures += 1;
        }
        Err(RenderError::SurfaceReconfigureFailed {
            attempts: self.reconfigure_attempts_last,
            width: self.width,
            height: self.height,
            format: "bgra8unorm-srgb".to_owned(),
            present_mode: "fifo".to_owned(),
        })
    }

    fn resize_telemetry(&self) -> ResizeTelemetry {
        ResizeTelemetry {
            renderer_reused: true,
            device_reused: true,
            adapter_reused: true,
            reconfigure_attempts: self.reconfigure_attempts_last,
            reconfigure_failures: self.reconfigure_failures,
            present_mode: "fifo".to_owned(),
            surface_format: "bgra8unorm-srgb".to_owned(),
            width: self.width,
            height: self.height,
            dpi_scale: self.dpi_scale,
        }
    }
}
