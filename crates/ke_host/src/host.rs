//! The engine host: lifecycle shell for game-module execution.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use ke_build_info::BuildInfo;
use ke_config::RuntimeConfig;
use ke_diagnostics::{
    emit_frame_metrics, subscribe_event_counts, CrashBundleWriter, CrashContext, DiagnosticHub,
    ExceptionInfo, MetricsCollector, MetricsSnapshot, ReplayRecorder, SharedMetricsCollector,
    SpanProfiler, SubscriberToken,
};
use ke_error::ResultExt as _;
use ke_renderer::RenderApi;
use ke_types::{InputSnapshot, KeyEvent, KeyPhase, PointerEvent, PointerPhase, WheelEvent};

use crate::module::{GameModule, HostControl, HostFrameContext, HostSharedState};
use crate::overlay::DebugOverlay;
use crate::profiling::FrameProfiler;
use crate::scheduler::Scheduler;
use crate::time::FrameClock;

const OVERLAY_TOGGLE_KEY: &str = "f3";

/// Runtime shell hosting a single game module.
///
/// Owns the frame clock, the scheduler, the diagnostics lifecycle and
/// (optionally) the renderer, and drives them through the per-frame
/// sequence. `frame()` implicitly starts the host; `close()` is
/// idempotent.
pub struct EngineHost {
    module: Box<dyn GameModule>,
    renderer: Option<Box<dyn RenderApi>>,
    frame_index: u64,
    frame_has_run: bool,
    started: bool,
    shutdown_done: bool,
    shared: Arc<Mutex<HostSharedState>>,
    clock: FrameClock,
    scheduler: Scheduler,
    hub: DiagnosticHub,
    metrics: SharedMetricsCollector,
    metrics_token: SubscriberToken,
    span_profiler: SpanProfiler,
    frame_profiler: FrameProfiler,
    replay: ReplayRecorder,
    crash_writer: CrashBundleWriter,
    build_info: BuildInfo,
    overlay: Option<DebugOverlay>,
    overlay_visible: bool,
}

impl EngineHost {
    pub fn new(
        module: Box<dyn GameModule>,
        config: &RuntimeConfig,
        mut renderer: Option<Box<dyn RenderApi>>,
    ) -> Self {
        let diagnostics = &config.diagnostics;
        let hub = DiagnosticHub::new(diagnostics.buffer_capacity, diagnostics.enabled);

        let profiling_on = diagnostics.profile_mode != ke_config::ProfileMode::Off;
        let metrics = MetricsCollector::new(
            config.debug.metrics_enabled || config.debug.overlay_enabled || profiling_on,
            60,
        )
        .into_shared();
        let metrics_token = subscribe_event_counts(&hub, &metrics);

        if let Some(renderer) = renderer.as_mut() {
            renderer.set_diagnostics_hub(Some(hub.clone()));
        }

        let build_info = ke_build_info::build_info!();
        let span_profiler = SpanProfiler::new(
            diagnostics.profile_mode,
            diagnostics.profile_sampling_n,
            diagnostics.profile_span_capacity,
            Some(hub.clone()),
        );
        let frame_profiler = FrameProfiler::new(profiling_on, diagnostics.profile_sampling_n);
        let replay = ReplayRecorder::new(
            diagnostics.replay_capture,
            config.replay_seed,
            build_info.runtime_metadata(),
            diagnostics.replay_hash_interval,
            Some(hub.clone()),
        );
        let crash_writer = CrashBundleWriter::new(
            diagnostics.crash_bundle_enabled,
            diagnostics.crash_bundle_dir.clone(),
            diagnostics.crash_recent_events_limit,
        );

        Self {
            module,
            renderer,
            frame_index: 0,
            frame_has_run: false,
            started: false,
            shutdown_done: false,
            shared: Arc::new(Mutex::new(HostSharedState::default())),
            clock: FrameClock::new(),
            scheduler: Scheduler::new(),
            hub,
            metrics,
            metrics_token,
            span_profiler,
            frame_profiler,
            replay,
            crash_writer,
            build_info,
            overlay: config.debug.overlay_enabled.then(DebugOverlay::new),
            overlay_visible: false,
        }
    }

    /// The index of the frame currently executing (or, between frames,
    /// of the frame that last completed). Stamped into replay commands
    /// and diagnostics events; the counter advances when the next frame
    /// begins, so at the end of `frame()` this equals the frame index
    /// the metrics snapshot reports.
    pub fn current_frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown_done || self.shared.lock().closed
    }

    /// Whether a module requested a redraw since the last check.
    pub fn take_redraw_request(&self) -> bool {
        std::mem::take(&mut self.shared.lock().redraw_requested)
    }

    pub fn diagnostics_hub(&self) -> DiagnosticHub {
        self.hub.clone()
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.lock().snapshot()
    }

    pub fn profiling_snapshot(&self) -> ke_diagnostics::ProfilingSnapshot {
        self.span_profiler.snapshot()
    }

    pub fn replay_manifest(&self) -> ke_diagnostics::ReplayManifest {
        self.replay.manifest()
    }

    pub fn control(&self) -> HostControl {
        HostControl::new(self.scheduler.clone(), self.shared.clone())
    }

    pub fn renderer_mut(&mut self) -> Option<&mut (dyn RenderApi + '_)> {
        match self.renderer.as_mut() {
            Some(r) => Some(r.as_mut()),
            None => None,
        }
    }

    /// Start the module lifecycle. Idempotent.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        let control = self.control();
        self.module.on_start(control);
    }

    /// Record and dispatch one pointer event.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> bool {
        self.replay.record_command(
            self.frame_index,
            "input.pointer",
            serde_json::json!({
                "event_type": event.phase.as_str(),
                "x": event.x,
                "y": event.y,
                "button": event.button,
            }),
        );
        self.module.on_pointer_event(event)
    }

    /// Record and dispatch one key/char event.
    ///
    /// The overlay toggle key is intercepted and swallowed.
    pub fn handle_key_event(&mut self, event: &KeyEvent) -> bool {
        self.replay.record_command(
            self.frame_index,
            "input.key",
            serde_json::json!({
                "event_type": event.phase.as_str(),
                "value": event.value,
            }),
        );
        if self.overlay.is_some() && is_overlay_toggle(event) {
            self.overlay_visible = !self.overlay_visible;
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.invalidate();
            }
            return true;
        }
        self.module.on_key_event(event)
    }

    /// Record and dispatch one wheel event.
    pub fn handle_wheel_event(&mut self, event: &WheelEvent) -> bool {
        self.replay.record_command(
            self.frame_index,
            "input.wheel",
            serde_json::json!({ "x": event.x, "y": event.y, "dy": event.dy }),
        );
        self.module.on_wheel_event(event)
    }

    /// Dispatch one immutable input snapshot.
    ///
    /// Defers to the module's snapshot hook when provided; otherwise fans
    /// out through the per-event handlers in deterministic order.
    pub fn handle_input_snapshot(&mut self, snapshot: &InputSnapshot) -> bool {
        if let Some(changed) = self.module.on_input_snapshot(snapshot) {
            return changed;
        }
        let mut changed = false;
        let mx = snapshot.mouse.x;
        let my = snapshot.mouse.y;
        if snapshot.mouse.delta_x != 0.0 || snapshot.mouse.delta_y != 0.0 {
            changed |=
                self.handle_pointer_event(&PointerEvent::new(PointerPhase::Move, mx, my, 0));
        }
        for button in &snapshot.mouse.just_pressed_buttons {
            changed |=
                self.handle_pointer_event(&PointerEvent::new(PointerPhase::Down, mx, my, *button));
        }
        for button in &snapshot.mouse.just_released_buttons {
            changed |=
                self.handle_pointer_event(&PointerEvent::new(PointerPhase::Up, mx, my, *button));
        }
        for key in &snapshot.keyboard.just_pressed_keys {
            changed |= self.handle_key_event(&KeyEvent::down(key.clone()));
        }
        for ch in &snapshot.keyboard.text_input {
            changed |= self.handle_key_event(&KeyEvent::char(ch.clone()));
        }
        if snapshot.mouse.wheel_delta != 0.0 {
            changed |= self.handle_wheel_event(&WheelEvent {
                x: mx,
                y: my,
                dy: snapshot.mouse.wheel_delta,
            });
        }
        changed
    }

    /// Execute one frame.
    ///
    /// Module failures (both `Err` returns and panics) produce a crash
    /// bundle before propagating; panics resume unwinding afterwards.
    pub fn frame(&mut self) -> anyhow::Result<()> {
        if !self.started {
            self.start();
        }
        if self.is_closed() {
            return Ok(());
        }

        if self.frame_has_run {
            self.frame_index += 1;
        }
        self.frame_has_run = true;
        let tick = self.frame_index;
        let mut metadata = serde_json::Map::new();
        metadata.insert("frame_index".to_owned(), tick.into());
        let frame_span = self.span_profiler.begin_span(tick, "host", "frame", metadata);

        let mut metadata = serde_json::Map::new();
        metadata.insert("closed".to_owned(), false.into());
        self.hub
            .emit_fast("frame", "frame.start", tick, serde_json::Value::Null, metadata);

        let time_context = self.clock.next(tick);
        self.metrics.lock().begin_frame(tick);

        // Scheduler callbacks are never caught by the scheduler itself; a
        // panicking callback reaches us here and becomes a crash bundle.
        let scheduler = self.scheduler.clone();
        let advanced = std::panic::catch_unwind(AssertUnwindSafe(|| {
            scheduler.advance(time_context.delta_seconds)
        }));
        match advanced {
            Ok(Ok(_executed)) => {}
            Ok(Err(err)) => {
                let err = anyhow::Error::new(err).context("scheduler advance failed");
                self.write_crash_bundle(tick, None, Some(ExceptionInfo::from_error(&err)));
                self.span_profiler.end_span(frame_span);
                return Err(err);
            }
            Err(payload) => {
                self.write_crash_bundle(
                    tick,
                    Some("scheduler_callback_panicked".to_owned()),
                    Some(ExceptionInfo::from_panic(payload.as_ref())),
                );
                self.span_profiler.end_span(frame_span);
                std::panic::resume_unwind(payload);
            }
        }
        let (enqueued, dequeued) = self.scheduler.consume_activity_counts();
        {
            let mut metrics = self.metrics.lock();
            metrics.set_scheduler_activity(enqueued, dequeued);
            metrics.set_scheduler_queue_size(self.scheduler.queued_task_count());
        }

        if self.shared.lock().closed {
            // Closed by a scheduler callback: short-circuit; the frame
            // span stays unclosed and is never recorded.
            self.finalize_close();
            self.metrics
                .lock()
                .end_frame(time_context.delta_seconds * 1000.0);
            return Ok(());
        }

        let module_span =
            self.span_profiler
                .begin_span(tick, "module", "on_frame", serde_json::Map::new());
        let context = HostFrameContext {
            frame_index: tick,
            delta_seconds: time_context.delta_seconds,
            elapsed_seconds: time_context.elapsed_seconds,
        };
        let module = &mut self.module;
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| module.on_frame(&context)));
        match outcome {
            Ok(Ok(())) => self.span_profiler.end_span(module_span),
            Ok(Err(err)) => {
                self.span_profiler.end_span(module_span);
                self.write_crash_bundle(tick, None, Some(ExceptionInfo::from_error(&err)));
                self.span_profiler.end_span(frame_span);
                return Err(err);
            }
            Err(payload) => {
                self.span_profiler.end_span(module_span);
                self.write_crash_bundle(
                    tick,
                    Some("module_on_frame_panicked".to_owned()),
                    Some(ExceptionInfo::from_panic(payload.as_ref())),
                );
                self.span_profiler.end_span(frame_span);
                std::panic::resume_unwind(payload);
            }
        }

        self.metrics
            .lock()
            .end_frame(time_context.delta_seconds * 1000.0);
        let snapshot = self.metrics.lock().snapshot();
        emit_frame_metrics(&self.hub, &snapshot);

        self.draw_overlay_if_visible(&snapshot);

        let mut metadata = serde_json::Map::new();
        metadata.insert(
            "delta_seconds".to_owned(),
            serde_json::json!(time_context.delta_seconds),
        );
        metadata.insert(
            "elapsed_seconds".to_owned(),
            serde_json::json!(time_context.elapsed_seconds),
        );
        self.hub
            .emit_fast("frame", "frame.end", tick, serde_json::Value::Null, metadata);

        if let Some(profile) = self.frame_profiler.make_profile_payload(&snapshot) {
            self.hub.emit_fast(
                "perf",
                "perf.frame_profile",
                tick,
                profile,
                serde_json::Map::new(),
            );
        }

        self.span_profiler.end_span(frame_span);

        let state_hash = self.resolve_state_hash();
        self.replay.mark_frame(tick, state_hash);

        if self.module.should_close() {
            self.close();
        }
        Ok(())
    }

    /// Shut the host down. Idempotent.
    pub fn close(&mut self) {
        self.shared.lock().closed = true;
        self.finalize_close();
    }

    /// Export the profiler state as `diag.profiling.v1` JSON.
    pub fn export_diagnostics_profiling(&self, path: &Path) -> anyhow::Result<PathBuf> {
        self.span_profiler.export_json(path)
    }

    /// Export the replay session as `diag.replay_session.v1` JSON.
    pub fn export_diagnostics_replay(&self, path: &Path) -> anyhow::Result<PathBuf> {
        self.replay.export_json(path)
    }

    /// Manually capture a crash bundle of the current runtime state.
    pub fn export_diagnostics_crash_bundle(&mut self) -> anyhow::Result<Option<PathBuf>> {
        let context = self.crash_context(
            self.frame_index,
            Some("manual_debug_api_export".to_owned()),
            None,
        );
        self.crash_writer.capture(&self.hub, context)
    }

    fn draw_overlay_if_visible(&mut self, snapshot: &MetricsSnapshot) {
        if !self.overlay_visible {
            return;
        }
        let (Some(overlay), Some(renderer)) = (&self.overlay, self.renderer.as_mut()) else {
            return;
        };
        let _ = overlay
            .draw(renderer.as_mut(), snapshot)
            .warn_on_err_once("debug overlay draw failed");
    }

    fn resolve_state_hash(&mut self) -> Option<serde_json::Value> {
        let module = &mut self.module;
        match std::panic::catch_unwind(AssertUnwindSafe(|| module.debug_state_hash())) {
            Ok(hash) => hash,
            Err(_) => {
                ke_log::warn!("replay state-hash provider panicked; checkpoint skipped");
                None
            }
        }
    }

    fn finalize_close(&mut self) {
        if self.shutdown_done {
            return;
        }
        self.shutdown_done = true;
        self.hub.unsubscribe(self.metrics_token);
        self.module.on_shutdown();
    }

    fn crash_context(
        &self,
        tick: u64,
        reason: Option<String>,
        exception: Option<ExceptionInfo>,
    ) -> CrashContext {
        let manifest = self.replay.manifest();
        let profiling = serde_json::json!({
            "frame_profile": self.frame_profiler.latest_payload().unwrap_or_default(),
            "spans": serde_json::to_value(self.span_profiler.snapshot()).unwrap_or_default(),
        });
        let replay = serde_json::json!({
            "manifest": {
                "schema_version": manifest.schema_version,
                "replay_version": manifest.replay_version,
                "seed": manifest.seed,
                "build": manifest.build_info,
                "command_count": manifest.command_count,
                "first_tick": manifest.first_tick,
                "last_tick": manifest.last_tick,
            },
        });
        CrashContext {
            tick,
            reason,
            exception,
            runtime: self.build_info.runtime_metadata(),
            profiling,
            replay,
        }
    }

    fn write_crash_bundle(
        &mut self,
        tick: u64,
        reason: Option<String>,
        exception: Option<ExceptionInfo>,
    ) {
        let context = self.crash_context(tick, reason, exception);
        match self.crash_writer.capture(&self.hub, context) {
            Ok(Some(path)) => ke_log::error!("crash_bundle_written path={}", path.display()),
            Ok(None) => {}
            Err(err) => ke_log::warn!("crash bundle write failed: {err:#}"),
        }
    }
}

fn is_overlay_toggle(event: &KeyEvent) -> bool {
    event.phase == KeyPhase::Down && event.value.trim().to_lowercase() == OVERLAY_TOGGLE_KEY
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    use ke_renderer::{FrameRenderer, HeadlessBackend};

    use super::*;

    #[derive(Default)]
    struct FakeModuleState {
        frames: Vec<HostFrameContext>,
        pointer_events: Vec<PointerEvent>,
        key_events: Vec<KeyEvent>,
        wheel_events: Vec<WheelEvent>,
        shutdowns: usize,
        started: bool,
    }

    #[derive(Default)]
    struct FakeModule {
        state: Arc<Mutex<FakeModuleState>>,
        fail_on_frame: Option<u64>,
        close_after: Option<u64>,
    }

    impl GameModule for FakeModule {
        fn on_start(&mut self, _host: HostControl) {
            self.state.lock().started = true;
        }

        fn on_pointer_event(&mut self, event: &PointerEvent) -> bool {
            self.state.lock().pointer_events.push(*event);
            true
        }

        fn on_key_event(&mut self, event: &KeyEvent) -> bool {
            self.state.lock().key_events.push(event.clone());
            true
        }

        fn on_wheel_event(&mut self, event: &WheelEvent) -> bool {
            self.state.lock().wheel_events.push(*event);
            true
        }

        fn on_frame(&mut self, context: &HostFrameContext) -> anyhow::Result<()> {
            if self.fail_on_frame == Some(context.frame_index) {
                anyhow::bail!("scripted failure at frame {}", context.frame_index);
            }
            self.state.lock().frames.push(*context);
            Ok(())
        }

        fn should_close(&self) -> bool {
            let frames = self.state.lock().frames.len() as u64;
            self.close_after.is_some_and(|limit| frames >= limit)
        }

        fn on_shutdown(&mut self) {
            self.state.lock().shutdowns += 1;
        }

        fn debug_state_hash(&self) -> Option<serde_json::Value> {
            Some(serde_json::json!(self.state.lock().frames.len()))
        }
    }

    fn test_config(crash_dir: Option<&std::path::Path>) -> RuntimeConfig {
        let mut env = HashMap::new();
        env.insert("ENGINE_DEBUG_METRICS".to_owned(), "1".to_owned());
        env.insert("ENGINE_DIAGNOSTICS_REPLAY_CAPTURE".to_owned(), "1".to_owned());
        env.insert(
            "ENGINE_DIAGNOSTICS_REPLAY_HASH_INTERVAL".to_owned(),
            "2".to_owned(),
        );
        if let Some(dir) = crash_dir {
            env.insert(
                "ENGINE_DIAGNOSTICS_CRASH_BUNDLE_DIR".to_owned(),
                dir.display().to_string(),
            );
        } else {
            env.insert(
                "ENGINE_DIAGNOSTICS_CRASH_BUNDLE_ENABLED".to_owned(),
                "0".to_owned(),
            );
        }
        ke_config::load_with(&env)
    }

    fn host_with(module: FakeModule, config: &RuntimeConfig) -> EngineHost {
        EngineHost::new(Box::new(module), config, None)
    }

    #[test]
    fn frame_sequence_feeds_module_and_metrics() {
        let state = Arc::new(Mutex::new(FakeModuleState::default()));
        let module = FakeModule {
            state: state.clone(),
            ..Default::default()
        };
        let config = test_config(None);
        let mut host = host_with(module, &config);

        for _ in 0..3 {
            host.frame().unwrap();
        }

        let state = state.lock();
        assert!(state.started);
        assert_eq!(state.frames.len(), 3);
        assert_eq!(state.frames[0].frame_index, 0);
        assert_eq!(state.frames[0].delta_seconds, 0.0);
        assert_eq!(state.frames[2].frame_index, 2);
        drop(state);

        // At the end of a frame, the metrics snapshot and the host agree
        // on which frame just ran.
        let metrics = host.metrics_snapshot();
        assert_eq!(
            metrics.last_frame.unwrap().frame_index,
            host.current_frame_index()
        );
        assert_eq!(host.current_frame_index(), 2);

        let hub = host.diagnostics_hub();
        assert_eq!(hub.snapshot(None, None, Some("frame.start")).len(), 3);
        assert_eq!(hub.snapshot(None, None, Some("frame.end")).len(), 3);
        assert_eq!(hub.snapshot(None, None, Some("frame.time_ms")).len(), 3);
    }

    #[test]
    fn module_error_writes_crash_bundle_and_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let module = FakeModule {
            fail_on_frame: Some(1),
            ..Default::default()
        };
        let config = test_config(Some(dir.path()));
        let mut host = host_with(module, &config);

        host.frame().unwrap();
        let err = host.frame().unwrap_err();
        assert!(err.to_string().contains("scripted failure"));

        let bundles: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .collect();
        assert_eq!(bundles.len(), 1);
        let payload: serde_json::Value =
            serde_json::from_slice(&std::fs::read(bundles[0].path()).unwrap()).unwrap();
        assert_eq!(payload["schema_version"], "engine.crash_bundle.v1");
        assert_eq!(payload["tick"], 1);
        assert!(!payload["runtime"].as_object().unwrap().is_empty());
        assert!(payload["exception"]["message"]
            .as_str()
            .unwrap()
            .contains("scripted failure"));
    }

    #[test]
    fn scheduler_callback_close_short_circuits_the_frame() {
        let state = Arc::new(Mutex::new(FakeModuleState::default()));
        let module = FakeModule {
            state: state.clone(),
            ..Default::default()
        };
        let config = test_config(None);
        let mut host = host_with(module, &config);
        host.start();

        let control = host.control();
        let control_for_task = control.clone();
        control
            .call_later(0.0, move || control_for_task.close())
            .unwrap();

        host.frame().unwrap();
        assert!(host.is_closed());
        assert!(state.lock().frames.is_empty());
        assert_eq!(state.lock().shutdowns, 1);
    }

    #[test]
    fn replay_records_input_in_tick_order() {
        let dir = tempfile::tempdir().unwrap();
        let module = FakeModule::default();
        let config = test_config(None);
        let mut host = host_with(module, &config);

        host.handle_pointer_event(&PointerEvent::new(PointerPhase::Down, 1.0, 2.0, 1));
        host.frame().unwrap();
        host.handle_key_event(&KeyEvent::down("a"));
        host.frame().unwrap();
        host.handle_wheel_event(&WheelEvent { x: 0.0, y: 0.0, dy: -1.0 });

        let path = host
            .export_diagnostics_replay(&dir.path().join("replay.json"))
            .unwrap();
        let payload: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(payload["schema_version"], "diag.replay_session.v1");
        let commands = payload["commands"].as_array().unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0]["type"], "input.pointer");
        assert_eq!(commands[0]["tick"], 0);
        // Input arriving between frames is stamped with the index of the
        // frame that last completed.
        assert_eq!(commands[1]["type"], "input.key");
        assert_eq!(commands[1]["tick"], 0);
        assert_eq!(commands[2]["type"], "input.wheel");
        assert_eq!(commands[2]["tick"], 1);
    }

    #[test]
    fn state_hash_checkpoints_follow_interval() {
        let module = FakeModule::default();
        let config = test_config(None); // hash interval 2
        let mut host = host_with(module, &config);
        for _ in 0..5 {
            host.frame().unwrap();
        }
        let hub = host.diagnostics_hub();
        let hashes = hub.snapshot(None, None, Some("replay.state_hash"));
        let ticks: Vec<u64> = hashes.iter().map(|event| event.tick).collect();
        assert_eq!(ticks, vec![4, 2, 0]); // most recent first
    }

    #[test]
    fn overlay_toggle_swallows_key_and_redraws() {
        let mut env = HashMap::new();
        env.insert("ENGINE_DEBUG_OVERLAY".to_owned(), "1".to_owned());
        env.insert("ENGINE_DEBUG_METRICS".to_owned(), "1".to_owned());
        env.insert(
            "ENGINE_DIAGNOSTICS_CRASH_BUNDLE_ENABLED".to_owned(),
            "0".to_owned(),
        );
        let config = ke_config::load_with(&env);

        let state = Arc::new(Mutex::new(FakeModuleState::default()));
        let module = FakeModule {
            state: state.clone(),
            ..Default::default()
        };
        let backend = HeadlessBackend::new(1200, 720, 2, 256);
        let renderer = FrameRenderer::new(Box::new(backend), 1200, 720);
        let mut host = EngineHost::new(Box::new(module), &config, Some(Box::new(renderer)));

        assert!(host.handle_key_event(&KeyEvent::down("F3")));
        // The module never saw the toggle key.
        assert!(state.lock().key_events.is_empty());
        host.frame().unwrap();

        // Second toggle hides it again; other keys pass through.
        assert!(host.handle_key_event(&KeyEvent::down("f3")));
        assert!(host.handle_key_event(&KeyEvent::down("a")));
        assert_eq!(state.lock().key_events.len(), 1);
    }

    #[test]
    fn module_should_close_stops_the_host() {
        let state = Arc::new(Mutex::new(FakeModuleState::default()));
        let module = FakeModule {
            state: state.clone(),
            close_after: Some(2),
            ..Default::default()
        };
        let config = test_config(None);
        let mut host = host_with(module, &config);

        host.frame().unwrap();
        assert!(!host.is_closed());
        host.frame().unwrap();
        assert!(host.is_closed());
        assert_eq!(state.lock().shutdowns, 1);

        // Further frames and closes are no-ops.
        host.frame().unwrap();
        host.close();
        assert_eq!(state.lock().shutdowns, 1);
        assert_eq!(state.lock().frames.len(), 2);
    }

    #[test]
    fn snapshot_dispatch_fans_out_in_order() {
        let state = Arc::new(Mutex::new(FakeModuleState::default()));
        let module = FakeModule {
            state: state.clone(),
            ..Default::default()
        };
        let config = test_config(None);
        let mut host = host_with(module, &config);
        host.start();

        let mut snapshot = InputSnapshot::empty(0);
        snapshot.mouse.x = 4.0;
        snapshot.mouse.y = 5.0;
        snapshot.mouse.delta_x = 1.0;
        snapshot.mouse.just_pressed_buttons = [1].into_iter().collect();
        snapshot.keyboard.just_pressed_keys = ["z".to_owned()].into();
        snapshot.mouse.wheel_delta = 2.0;

        assert!(host.handle_input_snapshot(&snapshot));
        let state = state.lock();
        assert_eq!(state.pointer_events.len(), 2);
        assert_eq!(state.pointer_events[0].phase, PointerPhase::Move);
        assert_eq!(state.pointer_events[1].phase, PointerPhase::Down);
        assert_eq!(state.key_events.len(), 1);
        assert_eq!(state.wheel_events.len(), 1);
    }

    #[test]
    fn host_control_close_is_honored_at_frame_boundary() {
        let state = Arc::new(Mutex::new(FakeModuleState::default()));
        let module = FakeModule {
            state: state.clone(),
            ..Default::default()
        };
        let config = test_config(None);
        let mut host = host_with(module, &config);
        host.start();

        let control = host.control();
        let closed_flag = Arc::new(AtomicBool::new(false));
        let flag = closed_flag.clone();
        control
            .call_later(0.0, move || {
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();
        control.close();

        host.frame().unwrap();
        assert!(host.is_closed());
        // The scheduler still ran its due task this frame.
        assert!(closed_flag.load(Ordering::SeqCst));
        // The module frame was short-circuited.
        assert!(state.lock().frames.is_empty());
        assert_eq!(state.lock().shutdowns, 1);
    }
}
