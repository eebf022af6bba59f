//! Named runtime profiles supplying baseline defaults.

/// `default | dev | perf`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RuntimeProfileName {
    #[default]
    Default,
    /// Development: diagnostics-heavy, uncapped sampling.
    Dev,
    /// Performance measurement: vsync off, sparse sampling.
    Perf,
}

impl RuntimeProfileName {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|value| value.trim().to_lowercase()).as_deref() {
            Some("dev") => Self::Dev,
            Some("perf") => Self::Perf,
            _ => Self::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Dev => "dev",
            Self::Perf => "perf",
        }
    }
}

/// Baseline values a profile contributes before env overrides apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeProfile {
    pub render_vsync: bool,
    pub diagnostics_default_sampling_n: u64,
    pub metrics_enabled: bool,
}

/// Resolve the profile baselines for a profile name.
pub fn resolve_runtime_profile(name: RuntimeProfileName) -> RuntimeProfile {
    match name {
        RuntimeProfileName::Default => RuntimeProfile {
            render_vsync: true,
            diagnostics_default_sampling_n: 1,
            metrics_enabled: false,
        },
        RuntimeProfileName::Dev => RuntimeProfile {
            render_vsync: true,
            diagnostics_default_sampling_n: 1,
            metrics_enabled: true,
        },
        RuntimeProfileName::Perf => RuntimeProfile {
            render_vsync: false,
            diagnostics_default_sampling_n: 8,
            metrics_enabled: true,
        },
    }
}
