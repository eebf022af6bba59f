//! Error-handling helpers shared across the kestrel crates.
//!
//! Typed failures live with their owning subsystems (`RenderError`,
//! `AssetError`, `SchedulerError`, ...); this crate holds the small
//! cross-cutting pieces: cause-chain extraction for crash bundles and
//! user-facing error display, and log-and-continue result handling for
//! the paths the engine is required to keep alive (asset unloaders,
//! overlay drawing, staging-buffer allocation).

/// The cause chain of an error, outermost message first.
///
/// This is the summary crash bundles embed as the `exception.stack`
/// payload, so each link is rendered on its own.
pub fn source_chain(error: &dyn std::error::Error) -> Vec<String> {
    let mut chain = vec![error.to_string()];
    chain.extend(
        std::iter::successors(error.source(), |cause| cause.source())
            .map(std::string::ToString::to_string),
    );
    chain
}

/// Format an error including its chain of sources.
///
/// Always use this when displaying an error: `Display` on a wrapped
/// error shows only the outermost context and hides the root cause.
pub fn format(error: impl AsRef<dyn std::error::Error>) -> String {
    source_chain(error.as_ref()).join(" -> ")
}

/// Log-and-continue handling for failures that must not take the frame
/// loop down.
pub trait ResultExt<T> {
    /// Log a warning if there is an `Err`, but only log the exact same
    /// message once.
    fn warn_on_err_once(self, msg: impl std::fmt::Display) -> Option<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn warn_on_err_once(self, msg: impl std::fmt::Display) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                ke_log::warn_once!("{msg}: {err}");
                None
            }
        }
    }
}
