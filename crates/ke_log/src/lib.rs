//! Text logging for use in the kestrel crates.
//!
//! * `trace`: spammy things
//! * `debug`: things that might be useful when debugging
//! * `info`: things that we want to show to users
//! * `warn`: problems that we can recover from
//! * `error`: problems that lead to loss of functionality or data
//!
//! The `warn_once` etc macros are for when you want to suppress repeated
//! logging of the exact same message.

pub use log::{debug, error, info, trace, warn};
pub use log::{Level, LevelFilter};

pub use log_once::{debug_once, error_once, info_once, trace_once, warn_once};

mod setup;

pub use setup::{default_log_filter, setup_logging};
