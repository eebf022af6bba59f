//! The structured event record every subsystem emits.

use time::OffsetDateTime;

/// Severity of a [`DiagnosticEvent`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

/// One structured diagnostics event.
///
/// `category` is the coarse topic (`frame`, `render`, `window`, `perf`,
/// `replay`); `name` is the canonical dotted event name (`frame.start`,
/// `render.stage.present`). Payloads are JSON values so exports stay
/// schema-stable.
#[derive(Clone, Debug, serde::Serialize)]
pub struct DiagnosticEvent {
    /// UTC wall-clock timestamp, serialized as RFC 3339.
    #[serde(with = "time::serde::rfc3339")]
    pub ts_utc: OffsetDateTime,
    pub tick: u64,
    pub category: String,
    pub name: String,
    pub level: Level,
    pub value: serde_json::Value,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl DiagnosticEvent {
    pub fn new(
        category: impl Into<String>,
        name: impl Into<String>,
        tick: u64,
        level: Level,
        value: serde_json::Value,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            ts_utc: OffsetDateTime::now_utc(),
            tick,
            category: category.into(),
            name: name.into(),
            level,
            value,
            metadata,
        }
    }
}
