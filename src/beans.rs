mod identity;
mod interface;
mod registration;
mod service;

pub use identity::*;
pub use interface::*;
pub use registration::*;
pub use service::*;
