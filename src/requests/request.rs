use crate::{
    Argument, BeanContext, BeanResolutionContext, BeanType, Dependency,
    DependencyKind, InjectError, InjectResult, Interface, ResolutionInfo, Svc,
};

/// A value that can be injected into a constructor, field or method.
///
/// Every argument of a [`BeanFactory`](crate::BeanFactory) is a request. The
/// request describes what it depends on so that the resolution path and error
/// messages can name it, then obtains its value from the context.
///
/// ```
/// use bean_context::{BeanContext, BeanDefinition, Svc};
///
/// struct Config;
/// struct Client(Svc<Config>, Option<Svc<String>>);
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(BeanDefinition::of(|| Config).build());
/// builder.register_definition(
///     BeanDefinition::of(|config: Svc<Config>, name: Option<Svc<String>>| {
///         Client(config, name)
///     })
///     .build(),
/// );
///
/// let context = builder.build();
/// let client: Svc<Client> = context.get_bean().unwrap();
/// assert!(client.1.is_none());
/// ```
pub trait Request: Sized + Send + 'static {
    /// Describes the requested value.
    fn dependency() -> Dependency;

    /// Obtains the value for `argument` from the context.
    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self>;
}

/// Requests the context resolving the bean.
impl Request for BeanContext {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<BeanContext>(), DependencyKind::Context)
    }

    fn request(
        context: &BeanContext,
        _resolution: &mut BeanResolutionContext,
        _argument: &Argument,
    ) -> InjectResult<Self> {
        Ok(context.clone())
    }
}

/// Requests a snapshot of the current resolution.
impl Request for ResolutionInfo {
    fn dependency() -> Dependency {
        Dependency::new(
            BeanType::of::<ResolutionInfo>(),
            DependencyKind::Resolution,
        )
    }

    fn request(
        _context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        _argument: &Argument,
    ) -> InjectResult<Self> {
        Ok(resolution.info())
    }
}

/// Requests exactly one bean. This request fails if no bean matches, or if
/// several do and none of them is primary.
impl<I: ?Sized + Interface> Request for Svc<I> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<I>(), DependencyKind::Bean)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        // Variants created for each bean of `I` receive their own source.
        let qualifier = match argument.qualifier() {
            Some(qualifier) => Some(qualifier.clone()),
            None => resolution.each_bean_qualifier(BeanType::of::<I>()),
        };
        context
            .resolve_bean::<I>(resolution, qualifier.as_ref())
            .map_err(|error| missing_dependency::<I>(resolution, error))
    }
}

/// Requests at most one bean. If no bean matches then this is `None`. This
/// still fails if several beans match and none of them is primary.
impl<I: ?Sized + Interface> Request for Option<Svc<I>> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<I>(), DependencyKind::OptionalBean)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        context.resolve_optional_bean::<I>(resolution, argument.qualifier())
    }
}

/// Requests every matching bean, ordered by definition order. If no bean
/// matches then this is empty.
impl<I: ?Sized + Interface> Request for Vec<Svc<I>> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<I>(), DependencyKind::Beans)
    }

    fn request(
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        context.resolve_beans::<I>(resolution, argument.qualifier())
    }
}

/// The name of the bean being built. Iterable variants are named by their
/// configuration key or by the bean they were created for.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BeanName(pub String);

impl std::ops::Deref for BeanName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Request for BeanName {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<BeanName>(), DependencyKind::Name)
    }

    fn request(
        _context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        _argument: &Argument,
    ) -> InjectResult<Self> {
        let candidate = resolution.current_candidate().ok_or_else(|| {
            InjectError::Internal(
                "a bean name was requested outside of a bean build".to_owned(),
            )
        })?;
        Ok(BeanName(crate::candidate_name(candidate.bean_type(), candidate)))
    }
}

fn missing_dependency<I: ?Sized + Interface>(
    resolution: &BeanResolutionContext,
    error: InjectError,
) -> InjectError {
    match error {
        InjectError::NoSuchBean { bean_type, .. }
            if bean_type == BeanType::of::<I>() =>
        {
            InjectError::MissingDependency {
                bean_type: resolution.current_bean_type(),
                dependency: bean_type,
                reasons: Vec::new(),
                path: resolution.path().render(),
            }
        }
        InjectError::BeanDisabled { bean_type, reasons }
            if bean_type == BeanType::of::<I>() =>
        {
            InjectError::MissingDependency {
                bean_type: resolution.current_bean_type(),
                dependency: bean_type,
                reasons,
                path: resolution.path().render(),
            }
        }
        error => error,
    }
}
