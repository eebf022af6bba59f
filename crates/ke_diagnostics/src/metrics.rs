//! Rolling per-frame runtime metrics.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::hub::{DiagnosticHub, SubscriberToken};

/// Metrics captured for a single frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameMetrics {
    pub frame_index: u64,
    pub dt_ms: f64,
    pub fps_rolling: f64,
    pub scheduler_queue_size: usize,
    pub event_publish_count: u64,
    pub scheduler_enqueued_count: u64,
    pub scheduler_dequeued_count: u64,
    pub event_publish_by_topic: HashMap<String, u64>,
    pub system_exception_count: u64,
    pub system_timings_ms: HashMap<String, f64>,
}

/// Read-only snapshot consumable by the debug overlay and loggers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub last_frame: Option<FrameMetrics>,
    pub rolling_dt_ms: f64,
    pub rolling_fps: f64,
    /// The 3 slowest systems of the last frame, by milliseconds.
    pub top_systems_last_frame: Vec<(String, f64)>,
}

/// Small in-memory rolling metrics collector.
///
/// Disabled collectors accept every call and record nothing, so call
/// sites never need to branch.
#[derive(Debug)]
pub struct MetricsCollector {
    enabled: bool,
    window_size: usize,
    dt_window: VecDeque<f64>,
    frame_index: u64,
    scheduler_queue_size: usize,
    event_publish_count: u64,
    event_publish_by_topic: HashMap<String, u64>,
    scheduler_enqueued_count: u64,
    scheduler_dequeued_count: u64,
    system_exception_count: u64,
    system_timings_ms: HashMap<String, f64>,
    last_frame: Option<FrameMetrics>,
}

pub type SharedMetricsCollector = Arc<Mutex<MetricsCollector>>;

impl MetricsCollector {
    pub fn new(enabled: bool, window_size: usize) -> Self {
        Self {
            enabled,
            window_size: window_size.max(1),
            dt_window: VecDeque::new(),
            frame_index: 0,
            scheduler_queue_size: 0,
            event_publish_count: 0,
            event_publish_by_topic: HashMap::new(),
            scheduler_enqueued_count: 0,
            scheduler_dequeued_count: 0,
            system_exception_count: 0,
            system_timings_ms: HashMap::new(),
            last_frame: None,
        }
    }

    pub fn into_shared(self) -> SharedMetricsCollector {
        Arc::new(Mutex::new(self))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn begin_frame(&mut self, frame_index: u64) {
        if !self.enabled {
            return;
        }
        self.frame_index = frame_index;
        self.scheduler_queue_size = 0;
        self.event_publish_count = 0;
        self.event_publish_by_topic.clear();
        self.scheduler_enqueued_count = 0;
        self.scheduler_dequeued_count = 0;
        self.system_exception_count = 0;
        self.system_timings_ms.clear();
    }

    pub fn record_system_time(&mut self, system_id: &str, elapsed_ms: f64) {
        if !self.enabled {
            return;
        }
        self.system_timings_ms.insert(system_id.to_owned(), elapsed_ms);
    }

    pub fn set_scheduler_queue_size(&mut self, queue_size: usize) {
        if !self.enabled {
            return;
        }
        self.scheduler_queue_size = queue_size;
    }

    pub fn increment_event_publish_count(&mut self, count: u64) {
        if !self.enabled {
            return;
        }
        self.event_publish_count += count;
    }

    pub fn increment_event_publish_topic(&mut self, topic: &str, count: u64) {
        if !self.enabled {
            return;
        }
        let normalized = topic.trim();
        if normalized.is_empty() {
            return;
        }
        *self
            .event_publish_by_topic
            .entry(normalized.to_owned())
            .or_insert(0) += count;
    }

    pub fn set_scheduler_activity(&mut self, enqueued_count: u64, dequeued_count: u64) {
        if !self.enabled {
            return;
        }
        self.scheduler_enqueued_count = enqueued_count;
        self.scheduler_dequeued_count = dequeued_count;
    }

    pub fn increment_system_exception_count(&mut self, count: u64) {
        if !self.enabled {
            return;
        }
        self.system_exception_count += count;
    }

    pub fn end_frame(&mut self, dt_ms: f64) {
        if !self.enabled {
            return;
        }
        if self.dt_window.len() >= self.window_size {
            self.dt_window.pop_front();
        }
        self.dt_window.push_back(dt_ms);
        let rolling_fps = self.rolling_fps();
        self.last_frame = Some(FrameMetrics {
            frame_index: self.frame_index,
            dt_ms,
            fps_rolling: rolling_fps,
            scheduler_queue_size: self.scheduler_queue_size,
            event_publish_count: self.event_publish_count,
            scheduler_enqueued_count: self.scheduler_enqueued_count,
            scheduler_dequeued_count: self.scheduler_dequeued_count,
            event_publish_by_topic: self.event_publish_by_topic.clone(),
            system_exception_count: self.system_exception_count,
            system_timings_ms: self.system_timings_ms.clone(),
        });
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut top_systems: Vec<(String, f64)> = self
            .last_frame
            .as_ref()
            .map(|frame| {
                frame
                    .system_timings_ms
                    .iter()
                    .map(|(id, ms)| (id.clone(), *ms))
                    .collect()
            })
            .unwrap_or_default();
        top_systems.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_systems.truncate(3);

        MetricsSnapshot {
            last_frame: self.last_frame.clone(),
            rolling_dt_ms: self.rolling_dt_ms(),
            rolling_fps: self.rolling_fps(),
            top_systems_last_frame: top_systems,
        }
    }

    fn rolling_dt_ms(&self) -> f64 {
        if self.dt_window.is_empty() {
            return 0.0;
        }
        self.dt_window.iter().sum::<f64>() / self.dt_window.len() as f64
    }

    fn rolling_fps(&self) -> f64 {
        let rolling_dt = self.rolling_dt_ms();
        if rolling_dt > 0.0 {
            1000.0 / rolling_dt
        } else {
            0.0
        }
    }
}

/// Feed hub publish counts into a shared collector.
///
/// The event category doubles as the publish topic.
pub fn subscribe_event_counts(
    hub: &DiagnosticHub,
    collector: &SharedMetricsCollector,
) -> SubscriberToken {
    let collector = collector.clone();
    hub.subscribe(move |event| {
        let mut collector = collector.lock();
        collector.increment_event_publish_count(1);
        collector.increment_event_publish_topic(&event.category, 1);
    })
}

/// Emit the per-frame metrics aggregate as `frame.time_ms`.
pub fn emit_frame_metrics(hub: &DiagnosticHub, snapshot: &MetricsSnapshot) {
    let Some(frame) = &snapshot.last_frame else {
        return;
    };
    hub.emit_fast(
        "frame",
        "frame.time_ms",
        frame.frame_index,
        serde_json::json!({
            "dt_ms": frame.dt_ms,
            "rolling_dt_ms": snapshot.rolling_dt_ms,
            "rolling_fps": snapshot.rolling_fps,
            "scheduler_queue_size": frame.scheduler_queue_size,
            "event_publish_count": frame.event_publish_count,
            "system_exception_count": frame.system_exception_count,
        }),
        serde_json::Map::new(),
    );
}
