//! Tracking of the injections in progress for one bean request.

mod context;
mod path;

pub use context::*;
pub use path::*;
