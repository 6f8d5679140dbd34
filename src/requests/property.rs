use crate::{
    Argument, BeanContext, BeanResolutionContext, BeanType, Dependency,
    DependencyKind, InjectError, InjectResult, Request,
};
use serde::de::DeserializeOwned;
use std::ops::Deref;

/// Requests one environment property. The property key is the argument name.
///
/// ## Example
///
/// ```
/// use bean_context::{BeanContext, BeanDefinition, Environment, Property, Svc};
///
/// struct Server {
///     port: u16,
/// }
///
/// let mut builder = BeanContext::builder();
/// builder.environment(Environment::from_toml_str("[server]\nport = 8080").unwrap());
/// builder.register_definition(
///     BeanDefinition::of(|port: Property<u16>| Server { port: *port })
///         .argument_names(&["server.port"])
///         .build(),
/// );
///
/// let context = builder.build();
/// let server: Svc<Server> = context.get_bean().unwrap();
/// assert_eq!(8080, server.port);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Property<T>(T);

impl<T> Property<T> {
    /// Converts a property into its inner value.
    pub fn into_inner(property: Self) -> T {
        property.0
    }
}

impl<T> Deref for Property<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> Request for Property<T> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<T>(), DependencyKind::Property)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        let key = property_key(resolution, argument);
        match context.environment().get_as::<T>(&key)? {
            Some(value) => Ok(Property(value)),
            None => Err(InjectError::MissingProperty { name: key }),
        }
    }
}

impl<T: DeserializeOwned + Send + 'static> Request for Option<Property<T>> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<T>(), DependencyKind::Property)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        let key = property_key(resolution, argument);
        Ok(context.environment().get_as::<T>(&key)?.map(Property))
    }
}

/// Requests the configuration sub-tree of the bean being built, bound to `T`.
///
/// The sub-tree is found at the bean's configuration prefix. Variants created
/// for each key under a prefix bind their own entry.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Properties<T>(T);

impl<T> Properties<T> {
    /// Converts the bound properties into their inner value.
    pub fn into_inner(properties: Self) -> T {
        properties.0
    }
}

impl<T> Deref for Properties<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: DeserializeOwned + Send + 'static> Request for Properties<T> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<T>(), DependencyKind::Properties)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        _argument: &Argument,
    ) -> InjectResult<Self> {
        let path = resolution
            .current_candidate()
            .and_then(|candidate| candidate.configuration_path())
            .ok_or_else(|| InjectError::MissingProperty {
                name: format!(
                    "<configuration prefix of {}>",
                    resolution.current_bean_type().name()
                ),
            })?;

        Ok(Properties(context.environment().bind::<T>(&path)?))
    }
}

/// Keys starting with `.` are relative to the bean's configuration path.
fn property_key(
    resolution: &BeanResolutionContext,
    argument: &Argument,
) -> String {
    let name = argument.name();
    match name.strip_prefix('.') {
        Some(relative) => {
            match resolution
                .current_candidate()
                .and_then(|candidate| candidate.configuration_path())
            {
                Some(path) => format!("{path}.{relative}"),
                None => relative.to_owned(),
            }
        }
        None => name.to_owned(),
    }
}
