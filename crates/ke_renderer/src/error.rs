//! Typed renderer failures.

/// Structured details carried by [`RenderError::BackendInit`].
#[derive(Clone, Debug, Default)]
pub struct BackendInitDetails {
    pub selected_backend: String,
    pub adapter_info: serde_json::Map<String, serde_json::Value>,
    pub attempted_surface_format: String,
    pub platform: String,
    pub exception_type: Option<String>,
    pub exception_message: Option<String>,
    /// Font files probed before giving up, when font discovery failed.
    pub font_candidates_checked: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// A second `begin_frame` arrived before `end_frame`.
    #[error("render backend supports only one frame in flight")]
    FrameInFlight,

    /// A renderer or backend call arrived from a non-owner thread.
    #[error("renderer must be driven from its owner thread")]
    InvalidThread,

    /// Adapter/device/font/pipeline initialization failed.
    #[error("render backend initialization failed: {message}")]
    BackendInit {
        message: String,
        details: Box<BackendInitDetails>,
    },

    /// Resize reconfigure exhausted its bounded retry.
    #[error(
        "surface reconfigure failed after {attempts} attempts \
         (size={width}x{height}, format={format}, present_mode={present_mode})"
    )]
    SurfaceReconfigureFailed {
        attempts: u32,
        width: u32,
        height: u32,
        format: String,
        present_mode: String,
    },

    /// Operation on a renderer that was already closed.
    #[error("renderer is closed")]
    Closed,
}

impl RenderError {
    pub fn backend_init(message: impl Into<String>, details: BackendInitDetails) -> Self {
        Self::BackendInit {
            message: message.into(),
            details: Box::new(details),
        }
    }
}
