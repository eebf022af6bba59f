//! The game-module contract and the host-control capability.

use std::sync::Arc;

use parking_lot::Mutex;

use ke_types::{InputSnapshot, KeyEvent, PointerEvent, WheelEvent};

use crate::scheduler::{Scheduler, SchedulerError, TaskId};

/// Per-frame context passed from the host to the game module.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HostFrameContext {
    pub frame_index: u64,
    pub delta_seconds: f64,
    pub elapsed_seconds: f64,
}

#[derive(Default)]
pub(crate) struct HostSharedState {
    pub closed: bool,
    pub redraw_requested: bool,
}

/// Host control surface exposed to game modules.
///
/// A cheap cloneable capability handed to the module at `on_start`; it is
/// the only way children observe the host.
#[derive(Clone)]
pub struct HostControl {
    scheduler: Scheduler,
    pub(crate) shared: Arc<Mutex<HostSharedState>>,
}

impl HostControl {
    pub(crate) fn new(scheduler: Scheduler, shared: Arc<Mutex<HostSharedState>>) -> Self {
        Self { scheduler, shared }
    }

    /// Schedule one redraw.
    pub fn request_redraw(&self) {
        self.shared.lock().redraw_requested = true;
    }

    /// Request host shutdown (honored at the next frame boundary).
    pub fn close(&self) {
        self.shared.lock().closed = true;
    }

    /// Schedule a one-shot callback in host runtime time.
    pub fn call_later(
        &self,
        delay_seconds: f64,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<TaskId, SchedulerError> {
        self.scheduler.call_later(delay_seconds, callback)
    }

    /// Schedule a recurring callback in host runtime time.
    pub fn call_every(
        &self,
        interval_seconds: f64,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<TaskId, SchedulerError> {
        self.scheduler.call_every(interval_seconds, callback)
    }

    /// Cancel a previously scheduled task.
    pub fn cancel_task(&self, task_id: TaskId) {
        self.scheduler.cancel(task_id);
    }
}

/// Lifecycle and event hooks of an engine-hosted game module.
pub trait GameModule {
    /// Initialize the module; keep the [`HostControl`] if needed.
    fn on_start(&mut self, host: HostControl) {
        let _ = host;
    }

    /// Handle a pointer event. Returns whether state changed.
    fn on_pointer_event(&mut self, event: &PointerEvent) -> bool {
        let _ = event;
        false
    }

    /// Handle a key/char event. Returns whether state changed.
    fn on_key_event(&mut self, event: &KeyEvent) -> bool {
        let _ = event;
        false
    }

    /// Handle a wheel event. Returns whether state changed.
    fn on_wheel_event(&mut self, event: &WheelEvent) -> bool {
        let _ = event;
        false
    }

    /// Optional whole-snapshot hook; return `None` to let the host fan
    /// the snapshot out through the per-event handlers instead.
    fn on_input_snapshot(&mut self, snapshot: &InputSnapshot) -> Option<bool> {
        let _ = snapshot;
        None
    }

    /// Simulate/render one frame.
    fn on_frame(&mut self, context: &HostFrameContext) -> anyhow::Result<()>;

    /// Whether the host should stop after this frame.
    fn should_close(&self) -> bool {
        false
    }

    /// Release resources and finalize state.
    fn on_shutdown(&mut self) {}

    /// Optional deterministic state hash for replay checkpoints.
    fn debug_state_hash(&self) -> Option<serde_json::Value> {
        None
    }
}
