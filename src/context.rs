//! The bean container: lookup, creation and lifecycle of beans.

mod builder;
mod candidates;
mod configuration;
#[allow(clippy::module_inception)]
mod context;
mod creation;
mod lifecycle;

pub use builder::*;
pub use configuration::*;
pub use context::*;
pub(crate) use creation::is_disabled_candidate;
