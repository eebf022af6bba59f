//! The window layer of the kestrel engine.
//!
//! The OS/backend event loop itself lives outside the engine; whatever
//! drives it feeds raw, loosely-typed events into a [`WindowAdapter`],
//! which normalizes them and exposes the poll-based [`WindowPort`]
//! contract the host frontend consumes.

mod adapter;
mod port;

pub use adapter::WindowAdapter;
pub use port::WindowPort;
