//! Input intake: raw-event queues, action bindings, snapshot assembly.
//!
//! Raw events drained from the window adapter go into an [`InputQueue`];
//! once per frame the [`InputAssembler`] folds them over the previous
//! frame's held state into one immutable [`ke_types::InputSnapshot`].

mod assembler;
mod bindings;
mod queue;

pub use assembler::{InputAssembler, MAPPING_CONFLICTS_VALUE};
pub use bindings::{ActionBindings, BindingError, BindingSource};
pub use queue::InputQueue;
