//! The diagnostics fabric of the kestrel engine.
//!
//! Every stage of the frame loop writes into the [`DiagnosticHub`];
//! metrics, profiling, replay capture and crash bundling subscribe to or
//! are fed from it. All artifacts serialize to versioned JSON schemas so
//! external tooling can consume sessions offline.

mod crash;
mod event;
mod hub;
mod metrics;
mod profiler;
mod replay;

pub use crash::{CrashBundleWriter, CrashContext, ExceptionInfo};
pub use event::{DiagnosticEvent, Level};
pub use hub::{DiagnosticHub, SubscriberToken};
pub use metrics::{
    emit_frame_metrics, subscribe_event_counts, FrameMetrics, MetricsCollector, MetricsSnapshot,
    SharedMetricsCollector,
};
pub use profiler::{ProfilingSnapshot, Span, SpanHandle, SpanProfiler};
pub use replay::{ReplayCheckpoint, ReplayCommand, ReplayManifest, ReplayRecorder};

/// Schema identifier of crash bundle exports.
pub const CRASH_BUNDLE_SCHEMA: &str = "engine.crash_bundle.v1";

/// Schema identifier of profiling exports.
pub const PROFILING_SCHEMA: &str = "diag.profiling.v1";

/// Schema identifier of replay session exports.
pub const REPLAY_SESSION_SCHEMA: &str = "diag.replay_session.v1";
