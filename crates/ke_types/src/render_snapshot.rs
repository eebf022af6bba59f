//! Immutable render snapshots: commands, passes, pass resolution.

pub use glam::Mat4;

use crate::value::DataValue;

/// What a [`RenderCommand`] draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    Rect,
    Grid,
    Text,
    FillWindow,
    /// Window-title update captured through a recording render API.
    Title,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Grid => "grid",
            Self::Text => "text",
            Self::FillWindow => "fill_window",
            Self::Title => "title",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable draw command in a pass.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderCommand {
    pub kind: CommandKind,
    /// Derived from z-depth: `layer = round(z * 100)`.
    pub layer: i32,
    pub sort_key: String,
    pub transform: Mat4,
    /// Flat ordered payload; scalars or nested lists.
    pub data: Vec<(String, DataValue)>,
}

impl RenderCommand {
    pub fn new(kind: CommandKind, layer: i32, data: Vec<(String, DataValue)>) -> Self {
        Self {
            kind,
            layer,
            sort_key: String::new(),
            transform: Mat4::IDENTITY,
            data,
        }
    }

    /// The first datum with the given name.
    pub fn datum(&self, name: &str) -> Option<&DataValue> {
        self.data
            .iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    /// The map key under which this command is retained across frames.
    ///
    /// A command is retained iff its data holds a `("key", k)` entry with
    /// a non-empty trimmed string `k`; otherwise it is immediate. Keys are
    /// scoped per kind so equal user keys of different kinds never collide.
    pub fn retention_key(&self) -> Option<String> {
        let key = self.datum("key")?.as_str()?.trim();
        if key.is_empty() {
            return None;
        }
        Some(format!("{}:{key}", self.kind))
    }
}

/// Immutable render pass payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPassSnapshot {
    pub name: String,
    pub commands: Vec<RenderCommand>,
}

impl RenderPassSnapshot {
    pub fn new(name: impl Into<String>, commands: Vec<RenderCommand>) -> Self {
        Self {
            name: name.into(),
            commands,
        }
    }
}

/// Immutable renderer-facing frame snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderSnapshot {
    pub frame_index: u64,
    pub passes: Vec<RenderPassSnapshot>,
}

impl RenderSnapshot {
    pub fn empty(frame_index: u64) -> Self {
        Self {
            frame_index,
            passes: Vec::new(),
        }
    }
}

/// Canonical name and priority of a render pass.
///
/// Passes are executed world < overlay < post.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassDescriptor {
    pub canonical_name: String,
    pub priority: i32,
}

/// Normalize a pass name into its canonical descriptor.
pub fn resolve_pass_descriptor(name: &str) -> PassDescriptor {
    let normalized = name.trim().to_lowercase();
    match normalized.as_str() {
        "world" | "geometry" | "main" => PassDescriptor {
            canonical_name: "world".to_owned(),
            priority: 0,
        },
        "overlay" | "ui" | "hud" => PassDescriptor {
            canonical_name: "overlay".to_owned(),
            priority: 1,
        },
        _ if normalized.starts_with("post") => PassDescriptor {
            canonical_name: normalized,
            priority: 2,
        },
        "" => PassDescriptor {
            canonical_name: "overlay".to_owned(),
            priority: 1,
        },
        _ => PassDescriptor {
            canonical_name: normalized,
            priority: 1,
        },
    }
}

/// Map a z-depth onto a draw layer. Layers < 0 draw earlier within a pass.
pub fn layer_from_z(z: f64) -> i32 {
    (z * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_key_requires_non_empty_trimmed_string() {
        let mut command = RenderCommand::new(
            CommandKind::Rect,
            0,
            vec![("key".to_owned(), DataValue::Str("  r1 ".to_owned()))],
        );
        assert_eq!(command.retention_key().as_deref(), Some("rect:r1"));

        command.data = vec![("key".to_owned(), DataValue::Str("   ".to_owned()))];
        assert_eq!(command.retention_key(), None);

        command.data = vec![("key".to_owned(), DataValue::Null)];
        assert_eq!(command.retention_key(), None);

        command.data = vec![];
        assert_eq!(command.retention_key(), None);
    }

    #[test]
    fn same_key_different_kind_does_not_collide() {
        let rect = RenderCommand::new(
            CommandKind::Rect,
            0,
            vec![("key".to_owned(), DataValue::Str("hud".to_owned()))],
        );
        let text = RenderCommand::new(
            CommandKind::Text,
            0,
            vec![("key".to_owned(), DataValue::Str("hud".to_owned()))],
        );
        assert_ne!(rect.retention_key(), text.retention_key());
    }

    #[test]
    fn pass_resolution() {
        assert_eq!(resolve_pass_descriptor("Main").canonical_name, "world");
        assert_eq!(resolve_pass_descriptor("Main").priority, 0);
        assert_eq!(resolve_pass_descriptor("HUD").canonical_name, "overlay");
        assert_eq!(resolve_pass_descriptor("post_bloom").priority, 2);
        assert_eq!(
            resolve_pass_descriptor("post_bloom").canonical_name,
            "post_bloom"
        );
        assert_eq!(resolve_pass_descriptor("").canonical_name, "overlay");
        assert_eq!(resolve_pass_descriptor("custom").priority, 1);
    }

    #[test]
    fn layer_mapping_rounds() {
        assert_eq!(layer_from_z(0.0), 0);
        assert_eq!(layer_from_z(0.5), 50);
        assert_eq!(layer_from_z(-100.0), -10000);
        assert_eq!(layer_from_z(0.004), 0);
        assert_eq!(layer_from_z(0.005), 1);
    }
}
