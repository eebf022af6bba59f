//! Information about the kestrel build.
//!
//! Crash bundles and replay manifests embed this so a session artifact can
//! always be traced back to the binary that produced it.

mod build_info;

pub use build_info::BuildInfo;

/// Create a [`BuildInfo`] for the *calling* crate.
///
/// Expands entirely from `CARGO_*` environment variables, so it works for
/// published crates as well as workspace checkouts.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::BuildInfo {
            crate_name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            target_triple: "",
            datetime: "",
        }
    };
}
