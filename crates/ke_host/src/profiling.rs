//! Sampled per-frame profile payloads (`perf.frame_profile`).

use ke_diagnostics::MetricsSnapshot;

/// Builds lightweight profile payloads at a fixed sampling rate.
pub struct FrameProfiler {
    enabled: bool,
    sampling_n: u64,
    sample_counter: u64,
    last_payload: Option<serde_json::Value>,
}

impl FrameProfiler {
    pub fn new(enabled: bool, sampling_n: u64) -> Self {
        Self {
            enabled,
            sampling_n: sampling_n.max(1),
            sample_counter: 0,
            last_payload: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn latest_payload(&self) -> Option<serde_json::Value> {
        self.last_payload.clone()
    }

    /// The profile payload for this frame, or `None` off-sample.
    pub fn make_profile_payload(
        &mut self,
        snapshot: &MetricsSnapshot,
    ) -> Option<serde_json::Value> {
        if !self.enabled {
            return None;
        }
        let frame = snapshot.last_frame.as_ref()?;
        self.sample_counter += 1;
        if self.sample_counter % self.sampling_n != 0 {
            return None;
        }

        let (top_system_name, top_system_ms) = frame
            .system_timings_ms
            .iter()
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, ms)| (name.clone(), *ms))
            .unwrap_or_default();
        let (top_topic_name, top_topic_count) = frame
            .event_publish_by_topic
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(name, count)| (name.clone(), *count))
            .unwrap_or_default();

        let mut bottlenecks: Vec<String> = Vec::new();
        if frame.dt_ms >= 25.0 {
            bottlenecks.push("frame_hitch".to_owned());
        }
        if !top_system_name.is_empty() {
            bottlenecks.push(format!("system:{top_system_name}"));
        }
        if !top_topic_name.is_empty() {
            bottlenecks.push(format!("event:{top_topic_name}"));
        }
        if frame.scheduler_queue_size > 0 {
            bottlenecks.push("scheduler_queue".to_owned());
        }

        let payload = serde_json::json!({
            "schema": "frame_profile_v1",
            "frame_index": frame.frame_index,
            "dt_ms": frame.dt_ms,
            "fps_rolling": frame.fps_rolling,
            "scheduler": {
                "queue_size": frame.scheduler_queue_size,
                "enqueued": frame.scheduler_enqueued_count,
                "dequeued": frame.scheduler_dequeued_count,
            },
            "events": {
                "publish_count": frame.event_publish_count,
                "top_topic": { "name": top_topic_name, "count": top_topic_count },
            },
            "systems": {
                "top_system": { "name": top_system_name, "ms": top_system_ms },
                "exception_count": frame.system_exception_count,
            },
            "bottlenecks": bottlenecks,
        });
        self.last_payload = Some(payload.clone());
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use ke_diagnostics::MetricsCollector;

    use super::*;

    fn snapshot_with_frame() -> MetricsSnapshot {
        let mut collector = MetricsCollector::new(true, 60);
        collector.begin_frame(7);
        collector.record_system_time("render", 30.0);
        collector.record_system_time("sim", 2.0);
        collector.increment_event_publish_topic("frame", 3);
        collector.set_scheduler_queue_size(2);
        collector.end_frame(30.0);
        collector.snapshot()
    }

    #[test]
    fn payload_names_bottlenecks() {
        let mut profiler = FrameProfiler::new(true, 1);
        let payload = profiler.make_profile_payload(&snapshot_with_frame()).unwrap();
        assert_eq!(payload["schema"], "frame_profile_v1");
        assert_eq!(payload["frame_index"], 7);
        assert_eq!(payload["systems"]["top_system"]["name"], "render");
        let bottlenecks = payload["bottlenecks"].as_array().unwrap();
        assert!(bottlenecks.contains(&serde_json::json!("frame_hitch")));
        assert!(bottlenecks.contains(&serde_json::json!("system:render")));
        assert!(bottlenecks.contains(&serde_json::json!("scheduler_queue")));
        assert_eq!(profiler.latest_payload(), Some(payload));
    }

    #[test]
    fn sampling_skips_off_sample_frames() {
        let mut profiler = FrameProfiler::new(true, 3);
        let snapshot = snapshot_with_frame();
        assert!(profiler.make_profile_payload(&snapshot).is_none());
        assert!(profiler.make_profile_payload(&snapshot).is_none());
        assert!(profiler.make_profile_payload(&snapshot).is_some());
    }

    #[test]
    fn disabled_profiler_produces_nothing() {
        let mut profiler = FrameProfiler::new(false, 1);
        assert!(profiler.make_profile_payload(&snapshot_with_frame()).is_none());
        assert!(profiler.latest_payload().is_none());
    }
}
