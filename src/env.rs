//! Configuration properties and value conversion.

mod conversion;
mod environment;

pub use conversion::*;
pub use environment::*;
