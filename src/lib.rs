//! Runtime bean resolution and singleton lifecycle container.
//!
//! A [`BeanContext`] holds bean definitions and creates beans from them on
//! request. Definitions describe how a bean is constructed, which types it
//! can be requested as, and which requirements decide whether it is enabled.
//! Every bean is shared through a [`Svc<T>`], which is an `Arc<T>`, so beans
//! and the context itself can be used from any thread.
//!
//! # Definitions and references
//!
//! A [`BeanDefinition`] is built from a factory function whose arguments are
//! [`Request`]s. A [`BeanDefinitionReference`] is a lightweight handle that
//! carries enough type information to index the definition and check its
//! presence without building it. Definitions registered directly are wrapped
//! in an already loaded reference.
//!
//! # Interfaces
//!
//! A bean can be requested as its own type or as any trait declared with
//! [`interface!`] which the definition exposes. When several definitions
//! expose the requested type, the choice is narrowed by a [`Qualifier`], then
//! by which candidate is primary.
//!
//! # Bean scopes
//!
//! - Singleton: a bean is created the first time it is requested and that
//!   instance is reused for each future request. This is the default.
//! - Prototype: a bean is created each time it is requested.
//! - Context: like singleton, but the bean is created when the context
//!   starts.
//!
//! Concurrent requests for a singleton that does not exist yet build it once.
//! A singleton whose construction fails is not kept, so the next request
//! tries again.
//!
//! # Requirements
//!
//! A definition can require properties, active environments, present types,
//! other beans or custom conditions through [`Requires`]. A definition whose
//! requirements fail is disabled, and requests for it report why.
//!
//! # Iterable definitions
//!
//! A definition can expand into one bean per key under a configuration prefix
//! ([`each_property`](BeanDefinitionBuilder::each_property)) or into one bean
//! per bean of another type ([`each_bean`](BeanDefinitionBuilder::each_bean)).
//!
//! # Example
//!
//! ```
//! use bean_context::{
//!     interface, BeanContext, BeanDefinition, Environment, Properties, Qualifier,
//!     Requires, Service, Svc,
//! };
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct PoolSettings {
//!     size: u32,
//! }
//!
//! trait DataSource: Service {
//!     fn size(&self) -> u32;
//! }
//! interface!(DataSource);
//!
//! struct Pool {
//!     settings: PoolSettings,
//! }
//!
//! impl DataSource for Pool {
//!     fn size(&self) -> u32 {
//!         self.settings.size
//!     }
//! }
//!
//! let mut builder = BeanContext::builder();
//! builder.environment(
//!     Environment::from_toml_str(
//!         r#"
//!         [datasources.main]
//!         size = 10
//!
//!         [datasources.reports]
//!         size = 2
//!         "#,
//!     )
//!     .unwrap(),
//! );
//! builder.register_definition(
//!     BeanDefinition::of(|settings: Properties<PoolSettings>| Pool {
//!         settings: Properties::into_inner(settings),
//!     })
//!     .exposes::<dyn DataSource>()
//!     .each_property_with_primary("datasources", "main")
//!     .requires(Requires::new().property("datasources"))
//!     .build(),
//! );
//!
//! let context = builder.start().unwrap();
//! let main: Svc<dyn DataSource> = context.get_bean().unwrap();
//! assert_eq!(10, main.size());
//!
//! let reports: Svc<dyn DataSource> = context
//!     .get_bean_qualified(&Qualifier::by_name("reports"))
//!     .unwrap();
//! assert_eq!(2, reports.size());
//! assert_eq!(2, context.get_beans_of_type::<dyn DataSource>().unwrap().len());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::needless_pass_by_value
)]

mod beans;
mod conditions;
mod context;
mod definitions;
mod env;
mod error;
mod events;
mod iter;
mod module;
mod qualifier;
mod requests;
mod resolution;
mod scope;

pub use beans::*;
pub use conditions::*;
pub use context::*;
pub use definitions::*;
pub use env::*;
pub use error::*;
pub use events::*;
pub use iter::*;
pub use module::*;
pub use qualifier::*;
pub use requests::*;
pub use resolution::*;
pub use scope::*;

#[cfg(test)]
mod tests;
