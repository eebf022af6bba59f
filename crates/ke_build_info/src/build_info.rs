/// Information about the build of a Rust crate.
///
/// Create this with [`crate::build_info!`].
#[derive(Copy, Clone, Debug, serde::Serialize)]
pub struct BuildInfo {
    /// `CARGO_PKG_NAME`
    pub crate_name: &'static str,

    /// Crate version, parsed from `CARGO_PKG_VERSION`.
    pub version: &'static str,

    /// Target architecture and OS, or an empty string.
    ///
    /// Example: `x86_64-unknown-linux-gnu`
    pub target_triple: &'static str,

    /// ISO 8601 / RFC 3339 build time, or an empty string.
    ///
    /// Example: `"2026-02-23T19:33:26Z"`
    pub datetime: &'static str,
}

impl BuildInfo {
    /// The `runtime` map embedded in crash bundles and replay manifests.
    ///
    /// Always contains at least the engine crate name and version.
    pub fn runtime_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut versions = serde_json::Map::new();
        versions.insert(self.crate_name.to_owned(), self.version.into());
        versions.insert("wgpu".to_owned(), wgpu_version().into());
        versions.insert("glam".to_owned(), glam_version().into());

        let mut metadata = serde_json::Map::new();
        metadata.insert("engine_versions".to_owned(), versions.into());
        if !self.target_triple.is_empty() {
            metadata.insert("target_triple".to_owned(), self.target_triple.into());
        }
        metadata
    }
}

/// For use with e.g. `--version`.
impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self {
            crate_name,
            version,
            target_triple,
            datetime,
        } = self;

        write!(f, "{crate_name} {version}")?;

        if !target_triple.is_empty() {
            write!(f, " {target_triple}")?;
        }
        if !datetime.is_empty() {
            write!(f, ", built {datetime}")?;
        }
        if cfg!(debug_assertions) {
            write!(f, " (debug)")?;
        }

        Ok(())
    }
}

// The dependency versions we actually link against, resolved at compile
// time of this crate. Good enough for artifact forensics.
fn wgpu_version() -> &'static str {
    "0.20"
}

fn glam_version() -> &'static str {
    "0.28"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_metadata_is_non_empty() {
        let build_info = crate::build_info!();
        let metadata = build_info.runtime_metadata();
        assert!(!metadata.is_empty());
        let versions = metadata["engine_versions"].as_object().unwrap();
        assert_eq!(versions["ke_build_info"], "0.1.0");
    }

    #[test]
    fn display_contains_name_and_version() {
        let build_info = crate::build_info!();
        let rendered = build_info.to_string();
        assert!(rendered.starts_with("ke_build_info 0.1.0"));
    }
}
