use crate::{Environment, EnvironmentError};
use serde::Deserialize;

/// Settings of a context, read from the properties under
/// [`ContextConfiguration::PREFIX`].
///
/// ```
/// use bean_context::{ContextConfiguration, Environment};
///
/// let environment = Environment::from_toml_str(
///     "[bean-context]\neager-init-singletons = true",
/// )
/// .unwrap();
/// let configuration = ContextConfiguration::from_environment(&environment).unwrap();
/// assert!(configuration.eager_init_singletons);
/// assert!(!configuration.eager_init_configuration);
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ContextConfiguration {
    /// Create every singleton when the context starts.
    pub eager_init_singletons: bool,
    /// Create singletons that bind configuration properties when the
    /// context starts.
    pub eager_init_configuration: bool,
}

impl ContextConfiguration {
    /// The prefix the settings are read from.
    pub const PREFIX: &'static str = "bean-context";

    /// Reads the settings from `environment`. Missing settings keep their
    /// defaults.
    pub fn from_environment(environment: &Environment) -> Result<Self, EnvironmentError> {
        environment.bind(Self::PREFIX)
    }
}
