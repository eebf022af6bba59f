//! Kestrel: a deterministic single-module game-engine runtime.
//!
//! The host drives a game module through a per-frame loop: window/input
//! intake → immutable input snapshot → module simulation → immutable
//! render snapshot → GPU submission, with structured diagnostics
//! (events, spans, metrics, replay, crash bundles) observing every stage.
//!
//! ```no_run
//! use kestrel::{bootstrap, GameModule, HostFrameContext};
//!
//! struct Game;
//!
//! impl GameModule for Game {
//!     fn on_frame(&mut self, _context: &HostFrameContext) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut frontend = bootstrap(Box::new(Game))?;
//!     frontend.run()
//! }
//! ```

pub use ke_assets::{AssetError, AssetHandle, AssetRegistry};
pub use ke_build_info::BuildInfo;
pub use ke_config::{load as load_config, AspectMode, ProfileMode, RuntimeConfig, WindowMode};
pub use ke_diagnostics::{
    CrashBundleWriter, DiagnosticEvent, DiagnosticHub, Level, MetricsCollector, MetricsSnapshot,
    ProfilingSnapshot, ReplayRecorder, Span, SpanProfiler,
};
pub use ke_error::{format as format_error, source_chain};
pub use ke_host::{
    DebugOverlay, EngineHost, FrameClock, GameModule, HostControl, HostFrameContext,
    HostedWindowFrontend, Scheduler, SchedulerError, TaskId, TimeContext,
};
pub use ke_input::{ActionBindings, InputAssembler, InputQueue};
pub use ke_renderer::{
    FrameRenderer, HeadlessBackend, RenderApi, RenderError, TextAnchor, WgpuBackend,
};
pub use ke_types::{
    InputSnapshot, KeyEvent, PointerEvent, RenderCommand, RenderPassSnapshot, RenderSnapshot,
    SurfaceHandle, WheelEvent, WindowEvent,
};
pub use ke_ui::{InteractionPlan, ModalWidget, UiAppPort, UiRouter, UiSpaceTransform};
pub use ke_window::{WindowAdapter, WindowPort};

/// Wire a default engine stack around a game module.
///
/// Reads configuration from the environment, sets up logging, builds the
/// window adapter and the renderer (wgpu, or headless under
/// `ENGINE_HEADLESS`), and returns the frontend ready to run.
pub fn bootstrap(
    module: Box<dyn GameModule>,
) -> anyhow::Result<HostedWindowFrontend<WindowAdapter>> {
    ke_log::setup_logging();
    let config = ke_config::load();

    let (width, height) = config.render.ui_resolution.unwrap_or((1280, 800));
    let mut window = WindowAdapter::new("kestrel.window", width, height);
    match config.render.window_mode {
        WindowMode::Fullscreen => window.set_fullscreen(),
        // Borderless fills the work area, which the adapter models as
        // maximized.
        WindowMode::Maximized | WindowMode::Borderless => window.set_maximized(),
        WindowMode::Windowed => window.set_windowed(width, height),
    }
    let surface = window.create_surface();

    let renderer: Box<dyn RenderApi> = if config.headless {
        Box::new(FrameRenderer::new(
            Box::new(HeadlessBackend::new(
                width,
                height,
                config.renderer.recovery_failure_streak_threshold,
                config.renderer.upload_threshold_packets,
            )),
            width,
            height,
        ))
    } else {
        let backend = WgpuBackend::new(
            Some(&surface),
            &config.renderer,
            config.render.vsync,
            width,
            height,
        )?;
        Box::new(FrameRenderer::new(Box::new(backend), width, height))
    };

    let host = EngineHost::new(module, &config, Some(renderer));
    Ok(HostedWindowFrontend::new(window, host))
}
