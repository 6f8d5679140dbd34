mod param;
mod property;
mod provider;
mod request;

pub use param::*;
pub use property::*;
pub use provider::*;
pub use request::*;
