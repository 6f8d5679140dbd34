//! Requirements that decide whether a bean definition is enabled.

mod conditional;
mod context;
mod requires;

pub use conditional::*;
pub use context::*;
pub use requires::*;
