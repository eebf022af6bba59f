//! On-failure capture of runtime state into crash bundle files.

use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::hub::DiagnosticHub;
use crate::CRASH_BUNDLE_SCHEMA;

/// Structured description of the failure that triggered a bundle.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ExceptionInfo {
    pub exception_type: String,
    pub message: String,
    /// Summarized cause chain, outermost first.
    pub stack: Vec<String>,
}

impl ExceptionInfo {
    pub fn from_error(error: &anyhow::Error) -> Self {
        Self {
            exception_type: "anyhow::Error".to_owned(),
            message: error.to_string(),
            stack: ke_error::source_chain(error.as_ref()),
        }
    }

    /// Best-effort description of a caught panic payload.
    pub fn from_panic(payload: &(dyn std::any::Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&'static str>().copied())
            .unwrap_or("panic with non-string payload")
            .to_owned();
        Self {
            exception_type: "panic".to_owned(),
            message,
            stack: Vec::new(),
        }
    }
}

/// Everything the host knows at capture time.
pub struct CrashContext {
    pub tick: u64,
    pub reason: Option<String>,
    pub exception: Option<ExceptionInfo>,
    /// Package-version map; must never be empty.
    pub runtime: serde_json::Map<String, serde_json::Value>,
    pub profiling: serde_json::Value,
    pub replay: serde_json::Value,
}

/// Serializes crash bundles into the configured output directory.
pub struct CrashBundleWriter {
    enabled: bool,
    output_dir: PathBuf,
    recent_events_limit: usize,
}

impl CrashBundleWriter {
    pub fn new(enabled: bool, output_dir: impl Into<PathBuf>, recent_events_limit: usize) -> Self {
        Self {
            enabled,
            output_dir: output_dir.into(),
            recent_events_limit: recent_events_limit.max(1),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Capture the current runtime state into a bundle file.
    ///
    /// Returns `Ok(None)` when the writer is disabled. The output
    /// directory is created if missing.
    pub fn capture(
        &self,
        hub: &DiagnosticHub,
        context: CrashContext,
    ) -> anyhow::Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.output_dir)?;

        let captured_at = OffsetDateTime::now_utc();
        let recent_events = hub.recent_events(self.recent_events_limit);

        let payload = serde_json::json!({
            "schema_version": CRASH_BUNDLE_SCHEMA,
            "captured_at_utc": captured_at
                .format(&time::format_description::well_known::Rfc3339)?,
            "tick": context.tick,
            "reason": context.reason,
            "exception": context.exception,
            "runtime": context.runtime,
            "recent_events": recent_events,
            "profiling": context.profiling,
            "replay": context.replay,
        });

        let file_name = format!(
            "crash_bundle_{}_{}.json",
            captured_at.unix_timestamp_nanos() / 1_000_000,
            context.tick
        );
        let path = self.output_dir.join(file_name);
        std::fs::write(&path, serde_json::to_vec_pretty(&payload)?)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime_map() -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("engine_versions".to_owned(), serde_json::json!({ "kestrel": "0.1.0" }));
        map
    }

    fn context(tick: u64) -> CrashContext {
        CrashContext {
            tick,
            reason: Some("test".to_owned()),
            exception: None,
            runtime: runtime_map(),
            profiling: serde_json::Value::Null,
            replay: serde_json::Value::Null,
        }
    }

    #[test]
    fn bundle_has_schema_and_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let hub = DiagnosticHub::new(16, true);
        hub.emit_fast("frame", "frame.start", 9, serde_json::Value::Null, serde_json::Map::new());
        let writer = CrashBundleWriter::new(true, dir.path(), 8);

        let path = writer.capture(&hub, context(9)).unwrap().unwrap();
        let payload: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        assert_eq!(payload["schema_version"], CRASH_BUNDLE_SCHEMA);
        assert_eq!(payload["tick"], 9);
        assert!(!payload["runtime"].as_object().unwrap().is_empty());
        assert_eq!(payload["recent_events"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn recent_events_are_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let hub = DiagnosticHub::new(64, true);
        for tick in 0..10 {
            hub.emit_fast("frame", "frame.start", tick, serde_json::Value::Null, serde_json::Map::new());
        }
        let writer = CrashBundleWriter::new(true, dir.path(), 3);
        let path = writer.capture(&hub, context(10)).unwrap().unwrap();
        let payload: serde_json::Value =
            serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap();
        let events = payload["recent_events"].as_array().unwrap();
        assert_eq!(events.len(), 3);
        // Chronological order, ending at the newest.
        assert_eq!(events[2]["tick"], 9);
    }

    #[test]
    fn missing_output_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b/crash");
        let hub = DiagnosticHub::new(16, true);
        let writer = CrashBundleWriter::new(true, &nested, 8);
        let path = writer.capture(&hub, context(0)).unwrap().unwrap();
        assert!(path.starts_with(&nested));
        assert!(path.exists());
    }

    #[test]
    fn disabled_writer_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let hub = DiagnosticHub::new(16, true);
        let writer = CrashBundleWriter::new(false, dir.path(), 8);
        assert!(writer.capture(&hub, context(0)).unwrap().is_none());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn exception_info_keeps_cause_chain() {
        let error = anyhow::anyhow!("root").context("middle").context("outer");
        let info = ExceptionInfo::from_error(&error);
        assert_eq!(info.message, "outer");
        assert_eq!(info.stack, vec!["outer", "middle", "root"]);
    }
}
