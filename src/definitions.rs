mod argument;
mod builder;
mod definition;
mod delegate;
mod executable;
mod factory;
mod injection;
mod reference;
mod registry;

pub use argument::*;
pub use builder::*;
pub use definition::*;
pub use delegate::*;
pub use executable::*;
pub use factory::*;
pub use injection::*;
pub use reference::*;
pub use registry::*;
