use crate::{
    Argument, BeanContext, BeanResolutionContext, BeanType, Dependency,
    DependencyKind, InjectError, InjectResult, Request,
};
use std::{
    any::Any,
    collections::HashMap,
    fmt::{Debug, Formatter},
    ops::Deref,
    sync::Arc,
};

/// A value supplied by the caller of a bean build.
#[derive(Clone)]
pub struct ArgumentValue {
    value: Arc<dyn Any + Send + Sync>,
    description: String,
}

impl ArgumentValue {
    /// Wraps a value.
    #[must_use]
    pub fn new<T: Any + Send + Sync + Debug>(value: T) -> Self {
        ArgumentValue {
            description: format!("{value:?}"),
            value: Arc::new(value),
        }
    }

    /// Wraps a value which has no debug representation.
    #[must_use]
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        ArgumentValue {
            description: format!("<{}>", std::any::type_name::<T>()),
            value: Arc::new(value),
        }
    }

    /// The wrapped value.
    #[must_use]
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    /// Tries to view the value as a `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    /// How the value is shown in error messages.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Debug for ArgumentValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

/// Caller-supplied values for the parameters of a bean, keyed by argument name.
#[derive(Clone, Default, Debug)]
pub struct ArgumentValues {
    values: HashMap<String, ArgumentValue>,
}

impl ArgumentValues {
    /// Creates an empty set of values.
    #[must_use]
    pub fn new() -> Self {
        ArgumentValues::default()
    }

    /// Adds a value for the argument named `name`.
    #[must_use]
    pub fn with<T: Any + Send + Sync + Debug>(
        mut self,
        name: impl Into<String>,
        value: T,
    ) -> Self {
        self.insert(name, ArgumentValue::new(value));
        self
    }

    /// Sets the value for the argument named `name`, returning the previous
    /// value if there was one.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: ArgumentValue,
    ) -> Option<ArgumentValue> {
        self.values.insert(name.into(), value)
    }

    /// Gets the value for the argument named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgumentValue> {
        self.values.get(name)
    }

    /// Whether no values are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A constructor argument supplied by whoever builds the bean instead of
/// being resolved from the bean graph.
///
/// Values are matched to arguments by name. A value of another type is
/// converted through the context's
/// [`ConversionService`](crate::ConversionService).
///
/// ## Example
///
/// ```
/// use bean_context::{ArgumentValues, BeanContext, BeanDefinition, BeanScope, Param};
///
/// struct Connection {
///     port: u16,
/// }
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(
///     BeanDefinition::of(|port: Param<u16>| Connection { port: *port })
///         .argument_names(&["port"])
///         .scope(BeanScope::Prototype)
///         .build(),
/// );
///
/// let context = builder.build();
/// let connection = context
///     .create_bean_with::<Connection>(ArgumentValues::new().with("port", "8080".to_owned()))
///     .unwrap();
/// assert_eq!(8080, connection.port);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Param<T>(T);

impl<T> Param<T> {
    /// Converts a parameter into its inner value.
    pub fn into_inner(param: Self) -> T {
        param.0
    }
}

impl<T> Deref for Param<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Clone + Send + Sync + 'static> Request for Param<T> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<T>(), DependencyKind::Parameter)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        match lookup::<T>(context, resolution, argument)? {
            Some(value) => Ok(Param(value)),
            None => Err(missing(resolution, argument, BeanType::of::<T>())),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Request for Option<Param<T>> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<T>(), DependencyKind::OptionalParameter)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        Ok(lookup::<T>(context, resolution, argument)?.map(Param))
    }
}

fn lookup<T: Clone + Send + Sync + 'static>(
    context: &BeanContext,
    resolution: &mut BeanResolutionContext,
    argument: &Argument,
) -> InjectResult<Option<T>> {
    if let Some(value) = resolution.argument_value(argument.name()).cloned() {
        if let Some(value) = value.downcast_ref::<T>() {
            return Ok(Some(value.clone()));
        }

        return context
            .conversion_service()
            .convert::<T>(value.as_any())
            .map(Some)
            .ok_or_else(|| InjectError::ConversionFailed {
                bean_type: resolution.current_bean_type(),
                argument: argument.name().to_owned(),
                value: value.description().to_owned(),
                target: BeanType::of::<T>(),
            });
    }

    let Some(candidate) = resolution.current_candidate().cloned() else {
        return Ok(None);
    };
    let (Some(each_bean), Some(source)) =
        (candidate.definition().each_bean(), candidate.each_bean_source())
    else {
        return Ok(None);
    };
    if each_bean.parameter_type() != BeanType::of::<T>() {
        return Ok(None);
    }

    let value = match each_bean.resolve(context, resolution, &source.qualifier)
    {
        Ok(value) => value,
        Err(error) if error.is_not_found_for(each_bean.dependent()) => return Ok(None),
        Err(error) => return Err(error),
    };
    value.downcast::<T>().map(|value| Some(*value)).map_err(|_| {
        InjectError::InvalidBeanType {
            requested: BeanType::of::<T>(),
            actual: each_bean.dependent(),
        }
    })
}

fn missing(
    resolution: &BeanResolutionContext,
    argument: &Argument,
    requested: BeanType,
) -> InjectError {
    let bean_type = resolution.current_bean_type();
    let each_bean = resolution
        .current_candidate()
        .and_then(|candidate| candidate.definition().each_bean());

    match each_bean {
        Some(each_bean) if each_bean.parameter_type() == requested => {
            InjectError::BeanDisabled {
                bean_type,
                reasons: vec![format!(
                    "no bean of type {} exists for argument [{}]",
                    each_bean.dependent().name(),
                    argument.name()
                )],
            }
        }
        _ => InjectError::MissingArgument {
            bean_type,
            argument: argument.name().to_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_values_describe_values() {
        let values = ArgumentValues::new().with("port", 8080_u16);

        let value = values.get("port").unwrap();
        assert_eq!("8080", value.description());
        assert_eq!(Some(&8080_u16), value.downcast_ref::<u16>());
        assert!(values.get("host").is_none());
    }

    #[test]
    fn opaque_values_are_described_by_type() {
        struct Secret;

        let value = ArgumentValue::opaque(Secret);
        assert!(value.description().contains("Secret"));
    }
}
