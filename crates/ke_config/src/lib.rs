//! Centralized runtime configuration ownership for engine execution.
//!
//! Configuration is resolved from the environment exactly once at startup
//! (the only process-wide state besides the logger) and handed around as
//! an immutable value. Parsing is tolerant: malformed values fall back to
//! their defaults rather than failing startup.

use std::collections::HashMap;

mod env;
mod profile;

use env::EnvSource;

pub use profile::{resolve_runtime_profile, RuntimeProfile, RuntimeProfileName};

/// `windowed | fullscreen | maximized | borderless`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WindowMode {
    #[default]
    Windowed,
    Fullscreen,
    Maximized,
    Borderless,
}

impl WindowMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "fullscreen" => Self::Fullscreen,
            "maximized" => Self::Maximized,
            "borderless" => Self::Borderless,
            _ => Self::Windowed,
        }
    }
}

/// `contain | stretch | preserve | fixed`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AspectMode {
    Contain,
    #[default]
    Stretch,
    Preserve,
    Fixed,
}

impl AspectMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "contain" => Self::Contain,
            "preserve" => Self::Preserve,
            "fixed" => Self::Fixed,
            _ => Self::Stretch,
        }
    }

    /// Whether the design-space aspect ratio is preserved on resize.
    pub fn preserves_aspect(&self) -> bool {
        matches!(self, Self::Contain | Self::Preserve | Self::Fixed)
    }
}

/// `off | light | timeline | timeline_sample`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ProfileMode {
    #[default]
    Off,
    Light,
    Timeline,
    TimelineSample,
}

impl ProfileMode {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "light" => Self::Light,
            "timeline" => Self::Timeline,
            "timeline_sample" => Self::TimelineSample,
            _ => Self::Off,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Light => "light",
            Self::Timeline => "timeline",
            Self::TimelineSample => "timeline_sample",
        }
    }

    /// Timeline modes emit `perf.span` events; `off` records nothing.
    pub fn is_timeline(&self) -> bool {
        matches!(self, Self::Timeline | Self::TimelineSample)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderConfig {
    pub vsync: bool,
    pub aspect_mode: AspectMode,
    pub window_mode: WindowMode,
    pub ui_resolution: Option<(u32, u32)>,
    pub ui_design_width: u32,
    pub ui_design_height: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RendererConfig {
    /// Ordered adapter-backend try list.
    pub backends: Vec<String>,
    /// Present modes the platform is assumed to support.
    pub present_modes: Vec<String>,
    /// Bounded retry for surface reconfigure on resize.
    pub recovery_failure_streak_threshold: u32,
    /// Full-rewrite vs ring-buffer staging cutoff, in packets.
    pub upload_threshold_packets: usize,
    /// Extra font files to probe before the platform lists.
    pub font_paths: Vec<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    pub buffer_capacity: usize,
    pub profile_mode: ProfileMode,
    pub profile_sampling_n: u64,
    pub profile_span_capacity: usize,
    pub replay_capture: bool,
    pub replay_hash_interval: u64,
    pub crash_bundle_enabled: bool,
    pub crash_bundle_dir: String,
    pub crash_recent_events_limit: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DebugConfig {
    pub metrics_enabled: bool,
    pub overlay_enabled: bool,
    pub input_trace_enabled: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeConfig {
    pub profile_name: RuntimeProfileName,
    pub headless: bool,
    pub replay_seed: Option<i64>,
    pub render: RenderConfig,
    pub renderer: RendererConfig,
    pub diagnostics: DiagnosticsConfig,
    pub debug: DebugConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        load_with(&HashMap::new())
    }
}

/// Load configuration from the process environment.
pub fn load() -> RuntimeConfig {
    load_impl(&EnvSource::Process)
}

/// Load configuration from an explicit environment map (for tests).
pub fn load_with(env: &HashMap<String, String>) -> RuntimeConfig {
    load_impl(&EnvSource::Map(env))
}

/// The process-wide configuration, resolved once.
pub fn get() -> &'static RuntimeConfig {
    static CONFIG: once_cell::sync::Lazy<RuntimeConfig> = once_cell::sync::Lazy::new(load);
    &CONFIG
}

fn load_impl(env: &EnvSource<'_>) -> RuntimeConfig {
    let profile_name = RuntimeProfileName::parse(env.raw("ENGINE_RUNTIME_PROFILE").as_deref());
    let profile = resolve_runtime_profile(profile_name);

    let backends = {
        let csv = env.csv("ENGINE_WGPU_BACKENDS");
        if csv.is_empty() {
            vec!["vulkan".to_owned(), "metal".to_owned(), "dx12".to_owned()]
        } else {
            csv.into_iter().map(|item| item.to_lowercase()).collect()
        }
    };
    let present_modes = {
        let csv = env.csv("ENGINE_WGPU_PRESENT_MODES");
        if csv.is_empty() {
            vec![
                "fifo".to_owned(),
                "mailbox".to_owned(),
                "immediate".to_owned(),
            ]
        } else {
            csv.into_iter().map(|item| item.to_lowercase()).collect()
        }
    };

    RuntimeConfig {
        profile_name,
        headless: env.flag("ENGINE_HEADLESS", false),
        replay_seed: env
            .text("ENGINE_REPLAY_SEED", "")
            .trim()
            .parse::<i64>()
            .ok(),
        render: RenderConfig {
            vsync: env.flag("ENGINE_RENDER_VSYNC", profile.render_vsync),
            aspect_mode: AspectMode::parse(&env.text("ENGINE_UI_ASPECT_MODE", "stretch")),
            window_mode: WindowMode::parse(&env.text("ENGINE_WINDOW_MODE", "windowed")),
            ui_resolution: env.resolution("ENGINE_UI_RESOLUTION"),
            ui_design_width: env.int("ENGINE_UI_DESIGN_WIDTH", 1200, Some(1)) as u32,
            ui_design_height: env.int("ENGINE_UI_DESIGN_HEIGHT", 720, Some(1)) as u32,
        },
        renderer: RendererConfig {
            backends,
            present_modes,
            recovery_failure_streak_threshold: env.int(
                "ENGINE_WGPU_RECOVERY_FAILURE_STREAK_THRESHOLD",
                2,
                Some(1),
            ) as u32,
            upload_threshold_packets: env.int("ENGINE_WGPU_UPLOAD_THRESHOLD_PACKETS", 256, Some(1))
                as usize,
            font_paths: env.path_list("ENGINE_WGPU_FONT_PATHS"),
        },
        diagnostics: DiagnosticsConfig {
            enabled: env.flag("ENGINE_DIAGNOSTICS_ENABLED", true),
            buffer_capacity: env.int("ENGINE_DIAGNOSTICS_BUFFER_CAPACITY", 512, Some(16)) as usize,
            profile_mode: ProfileMode::parse(&env.text("ENGINE_DIAGNOSTICS_PROFILE_MODE", "off")),
            profile_sampling_n: env.int(
                "ENGINE_DIAGNOSTICS_PROFILE_SAMPLING_N",
                profile.diagnostics_default_sampling_n as i64,
                Some(1),
            ) as u64,
            profile_span_capacity: env.int("ENGINE_DIAGNOSTICS_PROFILE_SPAN_CAPACITY", 256, Some(16))
                as usize,
            replay_capture: env.flag("ENGINE_DIAGNOSTICS_REPLAY_CAPTURE", false),
            replay_hash_interval: env.int("ENGINE_DIAGNOSTICS_REPLAY_HASH_INTERVAL", 60, Some(1))
                as u64,
            crash_bundle_enabled: env.flag("ENGINE_DIAGNOSTICS_CRASH_BUNDLE_ENABLED", true),
            crash_bundle_dir: env.text("ENGINE_DIAGNOSTICS_CRASH_BUNDLE_DIR", "logs/crash"),
            crash_recent_events_limit: env.int(
                "ENGINE_DIAGNOSTICS_CRASH_RECENT_EVENTS_LIMIT",
                128,
                Some(1),
            ) as usize,
        },
        debug: DebugConfig {
            metrics_enabled: env.flag("ENGINE_DEBUG_METRICS", profile.metrics_enabled),
            overlay_enabled: env.flag("ENGINE_DEBUG_OVERLAY", false),
            input_trace_enabled: env.flag("ENGINE_INPUT_TRACE_ENABLED", false),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    #[test]
    fn defaults_are_sane() {
        let config = load_with(&HashMap::new());
        assert!(!config.headless);
        assert!(config.render.vsync);
        assert_eq!(config.render.aspect_mode, AspectMode::Stretch);
        assert_eq!(config.renderer.backends, ["vulkan", "metal", "dx12"]);
        assert_eq!(config.renderer.recovery_failure_streak_threshold, 2);
        assert_eq!(config.renderer.upload_threshold_packets, 256);
        assert_eq!(config.diagnostics.profile_mode, ProfileMode::Off);
        assert_eq!(config.diagnostics.replay_hash_interval, 60);
    }

    #[test]
    fn overrides_are_applied() {
        let config = load_with(&env(&[
            ("ENGINE_WINDOW_MODE", "Fullscreen"),
            ("ENGINE_UI_ASPECT_MODE", "contain"),
            ("ENGINE_RENDER_VSYNC", "0"),
            ("ENGINE_WGPU_BACKENDS", "metal, vulkan"),
            ("ENGINE_DIAGNOSTICS_PROFILE_MODE", "timeline_sample"),
            ("ENGINE_DIAGNOSTICS_PROFILE_SAMPLING_N", "4"),
            ("ENGINE_REPLAY_SEED", "1234"),
            ("ENGINE_UI_RESOLUTION", "1920x1080"),
        ]));
        assert_eq!(config.render.window_mode, WindowMode::Fullscreen);
        assert!(config.render.aspect_mode.preserves_aspect());
        assert!(!config.render.vsync);
        assert_eq!(config.renderer.backends, ["metal", "vulkan"]);
        assert_eq!(
            config.diagnostics.profile_mode,
            ProfileMode::TimelineSample
        );
        assert_eq!(config.diagnostics.profile_sampling_n, 4);
        assert_eq!(config.replay_seed, Some(1234));
        assert_eq!(config.render.ui_resolution, Some((1920, 1080)));
    }

    #[test]
    fn malformed_values_fall_back() {
        let config = load_with(&env(&[
            ("ENGINE_DIAGNOSTICS_BUFFER_CAPACITY", "not-a-number"),
            ("ENGINE_UI_RESOLUTION", "huge"),
            ("ENGINE_REPLAY_SEED", "abc"),
            ("ENGINE_WGPU_RECOVERY_FAILURE_STREAK_THRESHOLD", "0"),
        ]));
        assert_eq!(config.diagnostics.buffer_capacity, 512);
        assert_eq!(config.render.ui_resolution, None);
        assert_eq!(config.replay_seed, None);
        // Minimum clamp keeps at least one reconfigure attempt.
        assert_eq!(config.renderer.recovery_failure_streak_threshold, 1);
    }

    #[test]
    fn profile_baselines_apply_under_env_overrides() {
        let perf = load_with(&env(&[("ENGINE_RUNTIME_PROFILE", "perf")]));
        assert_eq!(perf.profile_name, RuntimeProfileName::Perf);
        assert!(!perf.render.vsync);
        assert!(perf.debug.metrics_enabled);
        assert_eq!(perf.diagnostics.profile_sampling_n, 8);

        // Explicit env values still win over the profile.
        let overridden = load_with(&env(&[
            ("ENGINE_RUNTIME_PROFILE", "perf"),
            ("ENGINE_RENDER_VSYNC", "1"),
            ("ENGINE_DIAGNOSTICS_PROFILE_SAMPLING_N", "2"),
        ]));
        assert!(overridden.render.vsync);
        assert_eq!(overridden.diagnostics.profile_sampling_n, 2);
    }

    #[test]
    fn resolution_accepts_multiple_separators() {
        for raw in ["1280x800", "1280,800", "1280:800", " 1280 X 800 "] {
            let config = load_with(&env(&[("ENGINE_UI_RESOLUTION", raw)]));
            assert_eq!(config.render.ui_resolution, Some((1280, 800)), "{raw}");
        }
    }
}
