//! Storage of shared bean instances.

mod singleton;

pub use singleton::*;
