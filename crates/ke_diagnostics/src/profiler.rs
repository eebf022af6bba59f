//! Hierarchical span recording with sampling.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Instant;

use ke_config::ProfileMode;

use crate::hub::DiagnosticHub;
use crate::PROFILING_SCHEMA;

/// One completed timed region.
///
/// Spans are only ever recorded when their owning handle is closed;
/// unclosed spans are never emitted.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Span {
    pub tick: u64,
    pub category: String,
    pub name: String,
    pub start_s: f64,
    pub end_s: f64,
    pub duration_ms: f64,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Owning handle for an open span. Dropping it without
/// [`SpanProfiler::end_span`] discards the measurement.
#[derive(Debug)]
#[must_use = "a span is only recorded when passed back to end_span"]
pub struct SpanHandle(Option<u64>);

impl SpanHandle {
    pub fn inactive() -> Self {
        Self(None)
    }
}

/// Aggregate view of recorded spans.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ProfilingSnapshot {
    pub mode: String,
    pub span_count: u64,
    pub spans: Vec<Span>,
    /// Top spans by duration, as `(category:name, ms)` pairs.
    pub top_spans_ms: Vec<(String, f64)>,
}

struct OpenSpan {
    tick: u64,
    category: String,
    name: String,
    start_s: f64,
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// Span profiler with `off | light | timeline | timeline_sample` modes.
///
/// In `off` mode handles are inert. Completed spans are kept in a bounded
/// ring, subject to 1-in-N sampling; `perf.span` events are emitted only
/// in the timeline modes.
pub struct SpanProfiler {
    mode: ProfileMode,
    sampling_n: u64,
    span_capacity: usize,
    hub: Option<DiagnosticHub>,
    epoch: Instant,
    next_handle: u64,
    open: HashMap<u64, OpenSpan>,
    spans: VecDeque<Span>,
    sample_counter: u64,
    recorded_count: u64,
}

impl SpanProfiler {
    pub fn new(
        mode: ProfileMode,
        sampling_n: u64,
        span_capacity: usize,
        hub: Option<DiagnosticHub>,
    ) -> Self {
        Self {
            mode,
            sampling_n: sampling_n.max(1),
            span_capacity: span_capacity.max(1),
            hub,
            epoch: Instant::now(),
            next_handle: 1,
            open: HashMap::new(),
            spans: VecDeque::new(),
            sample_counter: 0,
            recorded_count: 0,
        }
    }

    pub fn mode(&self) -> ProfileMode {
        self.mode
    }

    pub fn begin_span(
        &mut self,
        tick: u64,
        category: &str,
        name: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> SpanHandle {
        if self.mode == ProfileMode::Off {
            return SpanHandle(None);
        }
        let handle = self.next_handle;
        self.next_handle += 1;
        self.open.insert(
            handle,
            OpenSpan {
                tick,
                category: category.to_owned(),
                name: name.to_owned(),
                start_s: self.now_s(),
                metadata,
            },
        );
        SpanHandle(Some(handle))
    }

    pub fn end_span(&mut self, handle: SpanHandle) {
        let Some(id) = handle.0 else {
            return;
        };
        let Some(open) = self.open.remove(&id) else {
            return;
        };
        self.sample_counter += 1;
        if self.sample_counter % self.sampling_n != 0 {
            return;
        }
        let end_s = self.now_s();
        let span = Span {
            tick: open.tick,
            category: open.category,
            name: open.name,
            start_s: open.start_s,
            end_s,
            duration_ms: 1000.0 * (end_s - open.start_s),
            metadata: open.metadata,
        };
        if self.spans.len() >= self.span_capacity {
            self.spans.pop_front();
        }
        self.recorded_count += 1;
        if self.mode.is_timeline() {
            if let Some(hub) = &self.hub {
                hub.emit_fast(
                    "perf",
                    "perf.span",
                    span.tick,
                    serde_json::json!({
                        "category": span.category,
                        "name": span.name,
                        "duration_ms": span.duration_ms,
                    }),
                    serde_json::Map::new(),
                );
            }
        }
        self.spans.push_back(span);
    }

    pub fn snapshot(&self) -> ProfilingSnapshot {
        let mut top: Vec<(String, f64)> = self
            .spans
            .iter()
            .map(|span| (format!("{}:{}", span.category, span.name), span.duration_ms))
            .collect();
        top.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(5);

        ProfilingSnapshot {
            mode: self.mode.as_str().to_owned(),
            span_count: self.recorded_count,
            spans: self.spans.iter().cloned().collect(),
            top_spans_ms: top,
        }
    }

    /// Write the profiling snapshot as `diag.profiling.v1` JSON.
    pub fn export_json(&self, path: &Path) -> anyhow::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let snapshot = self.snapshot();
        let payload = serde_json::json!({
            "schema_version": PROFILING_SCHEMA,
            "mode": snapshot.mode,
            "span_count": snapshot.span_count,
            "top_spans_ms": snapshot.top_spans_ms,
            "spans": snapshot.spans,
        });
        std::fs::write(path, serde_json::to_vec_pretty(&payload)?)?;
        Ok(path.to_owned())
    }

    fn now_s(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }
}
