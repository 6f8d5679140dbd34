use crate::{
    Argument, Arguments, BeanContext, BeanDefinition, BeanDefinitionIdentity,
    BeanFactory, BeanResolutionContext, BeanScope, BeanType, BoxError, Constructor,
    DynSvc, EachBean, EnabledCache, ExecutableMethod, Exposure, Hook,
    InjectResult, InjectionKind, InjectionPoint, Interface, InterfaceFor,
    Iterable, MethodFunction, Qualifier, Request, RequestTuple, Requires,
    Service, Svc,
};
use std::{
    any::Any,
    borrow::Cow,
    marker::PhantomData,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

static RUNTIME_DEFINITIONS: AtomicU64 = AtomicU64::new(0);

impl BeanDefinition {
    /// Starts a definition whose beans are created by `factory`.
    ///
    /// ```
    /// use bean_context::{BeanContext, BeanDefinition, BeanScope, Svc};
    ///
    /// struct Counter;
    ///
    /// let mut builder = BeanContext::builder();
    /// builder.register_definition(
    ///     BeanDefinition::of(|| Counter)
    ///         .scope(BeanScope::Prototype)
    ///         .build(),
    /// );
    ///
    /// let context = builder.build();
    /// let first: Svc<Counter> = context.get_bean().unwrap();
    /// let second: Svc<Counter> = context.get_bean().unwrap();
    /// assert!(!Svc::ptr_eq(&first, &second));
    /// ```
    #[must_use]
    pub fn of<D, F>(factory: F) -> BeanDefinitionBuilder<F::Output>
    where
        F: BeanFactory<D>,
        F::Output: Service,
    {
        let arguments = factory.arguments();
        let create = Arc::new(move |arguments: &mut Arguments| -> Result<DynSvc, BoxError> {
            let bean = factory.create(arguments)?;
            Ok(Svc::new(bean) as DynSvc)
        });
        BeanDefinitionBuilder::new(Constructor { arguments, create }, false)
    }

    /// Starts a definition for an existing instance.
    #[must_use]
    pub fn singleton<T: Service>(bean: T) -> BeanDefinitionBuilder<T> {
        let bean = Svc::new(bean);
        let create = Arc::new(move |_: &mut Arguments| -> Result<DynSvc, BoxError> {
            Ok(Svc::clone(&bean) as DynSvc)
        });
        BeanDefinitionBuilder::new(
            Constructor {
                arguments: Vec::new(),
                create,
            },
            true,
        )
    }
}

/// Builds a [`BeanDefinition`] for beans of type `T`.
pub struct BeanDefinitionBuilder<T: Service> {
    definition_name: Option<Cow<'static, str>>,
    exposed: Vec<Exposure>,
    scope: BeanScope,
    name: Option<Cow<'static, str>>,
    stereotypes: Vec<Cow<'static, str>>,
    primary: bool,
    order: i32,
    constructor: Constructor,
    injection_points: Vec<InjectionPoint>,
    executable_methods: Vec<ExecutableMethod>,
    post_construct: Vec<Hook>,
    pre_destroy: Vec<Hook>,
    requirements: Vec<Requires>,
    iterable: Option<Iterable>,
    configuration_prefix: Option<String>,
    proxy: bool,
    replaces: Vec<BeanType>,
    provided: bool,
    marker: PhantomData<fn() -> T>,
}

impl<T: Service> BeanDefinitionBuilder<T> {
    fn new(constructor: Constructor, provided: bool) -> Self {
        BeanDefinitionBuilder {
            definition_name: None,
            exposed: vec![Exposure::of::<T, T>()],
            scope: BeanScope::default(),
            name: None,
            stereotypes: Vec::new(),
            primary: false,
            order: 0,
            constructor,
            injection_points: Vec::new(),
            executable_methods: Vec::new(),
            post_construct: Vec::new(),
            pre_destroy: Vec::new(),
            requirements: Vec::new(),
            iterable: None,
            configuration_prefix: None,
            proxy: false,
            replaces: Vec::new(),
            provided,
            marker: PhantomData,
        }
    }

    /// Gives the definition a stable name. Definitions sharing a name share
    /// their singleton.
    #[must_use]
    pub fn definition_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.definition_name = Some(name.into());
        self
    }

    /// Makes the beans available as the interface `I`.
    #[must_use]
    pub fn exposes<I: ?Sized + InterfaceFor<T>>(mut self) -> Self {
        let exposure = Exposure::of::<T, I>();
        if !self
            .exposed
            .iter()
            .any(|exposed| exposed.bean_type() == exposure.bean_type())
        {
            self.exposed.push(exposure);
        }
        self
    }

    /// Names the beans.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Marks the definition as primary.
    #[must_use]
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Sets the position of the beans in ordered collections.
    #[must_use]
    pub fn order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Sets the scope of the beans.
    #[must_use]
    pub fn scope(mut self, scope: BeanScope) -> Self {
        self.scope = scope;
        self
    }

    /// Adds a stereotype that [`Qualifier::Stereotype`] can match.
    #[must_use]
    pub fn stereotype(mut self, stereotype: impl Into<Cow<'static, str>>) -> Self {
        self.stereotypes.push(stereotype.into());
        self
    }

    /// Adds a requirement group. All groups must pass for the definition to
    /// be enabled.
    #[must_use]
    pub fn requires(mut self, requires: Requires) -> Self {
        self.requirements.push(requires);
        self
    }

    /// Names the constructor arguments in order. Parameters and properties are
    /// looked up by these names.
    #[must_use]
    pub fn argument_names(mut self, names: &[&'static str]) -> Self {
        for (argument, name) in self.constructor.arguments.iter_mut().zip(names) {
            *argument = argument.clone().named(*name);
        }
        self
    }

    /// Qualifies the bean lookups of the constructor argument at `index`.
    #[must_use]
    pub fn qualify(mut self, index: usize, qualifier: Qualifier) -> Self {
        if let Some(argument) = self.constructor.arguments.get_mut(index) {
            *argument = argument.clone().qualified(qualifier);
        }
        self
    }

    /// Adds a field filled with the value of the request `R` after
    /// construction.
    #[must_use]
    pub fn inject_field<R, F>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        inject: F,
    ) -> Self
    where
        R: Request,
        F: Fn(&T, R) + Send + Sync + 'static,
    {
        let name = name.into();
        let arguments = vec![Argument::of::<R>(0).named(name.clone())];
        self.injection_points.push(InjectionPoint::direct::<T, _>(
            InjectionKind::Field,
            name,
            arguments,
            move |bean, arguments| {
                inject(bean, arguments.next::<R>()?);
                Ok(())
            },
        ));
        self
    }

    /// Adds a method called with resolved requests after construction.
    #[must_use]
    pub fn inject_method<D, M>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        method: M,
    ) -> Self
    where
        D: RequestTuple,
        M: MethodFunction<T, D>,
    {
        self.injection_points.push(InjectionPoint::direct::<T, _>(
            InjectionKind::Method,
            name.into(),
            D::arguments(),
            move |bean, arguments| method.call(bean, arguments).map(|_| ()),
        ));
        self
    }

    /// Adds a method injection that calls the executable method at `index`
    /// with resolved requests.
    #[must_use]
    pub fn inject_dispatched<D: RequestTuple>(
        mut self,
        name: impl Into<Cow<'static, str>>,
        index: usize,
    ) -> Self {
        self.injection_points.push(InjectionPoint::dispatched(
            name.into(),
            D::arguments(),
            index,
        ));
        self
    }

    /// Adds an executable method. Its index is the number of executable
    /// methods added before it.
    #[must_use]
    pub fn executable<D, M>(mut self, name: impl Into<Cow<'static, str>>, method: M) -> Self
    where
        M: MethodFunction<T, D>,
    {
        self.executable_methods
            .push(ExecutableMethod::new::<T, D, M>(name, method));
        self
    }

    /// Adds a hook that runs after all injection points.
    #[must_use]
    pub fn post_construct<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.post_construct.push(erase_hook(hook));
        self
    }

    /// Adds a hook that runs when the bean is destroyed.
    #[must_use]
    pub fn pre_destroy<F>(mut self, hook: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.pre_destroy.push(erase_hook(hook));
        self
    }

    /// Creates one bean for each key under `prefix` in the environment. Each
    /// bean is named by its key and binds its own sub-tree.
    #[must_use]
    pub fn each_property(mut self, prefix: impl Into<String>) -> Self {
        self.iterable = Some(Iterable::EachProperty {
            prefix: prefix.into(),
            primary: None,
        });
        self
    }

    /// Like [`each_property`](Self::each_property), with the bean for the key
    /// `primary` marked as primary.
    #[must_use]
    pub fn each_property_with_primary(
        mut self,
        prefix: impl Into<String>,
        primary: impl Into<String>,
    ) -> Self {
        self.iterable = Some(Iterable::EachProperty {
            prefix: prefix.into(),
            primary: Some(primary.into()),
        });
        self
    }

    /// Creates one bean for each bean of type `D`. The constructor receives
    /// the iterated bean through a `Svc<D>` or `Param<Svc<D>>` argument.
    #[must_use]
    pub fn each_bean<D: ?Sized + Interface>(mut self) -> Self {
        self.iterable = Some(Iterable::EachBean(EachBean::new(
            BeanType::of::<D>(),
            BeanType::of::<Svc<D>>(),
            resolve_each_bean::<D>,
        )));
        self
    }

    /// Binds the configuration under `prefix` through
    /// [`Properties`](crate::Properties) arguments.
    #[must_use]
    pub fn configuration_properties(mut self, prefix: impl Into<String>) -> Self {
        self.configuration_prefix = Some(prefix.into());
        self
    }

    /// Marks the definition as a proxy of the other definitions with the same
    /// bean type.
    #[must_use]
    pub fn proxy(mut self) -> Self {
        self.proxy = true;
        self
    }

    /// Removes candidates of type `U` while this definition is enabled.
    #[must_use]
    pub fn replaces<U: ?Sized + Any>(mut self) -> Self {
        self.replaces.push(BeanType::of::<U>());
        self
    }

    /// Finishes the definition.
    #[must_use]
    pub fn build(self) -> BeanDefinition {
        let bean_type = BeanType::of::<T>();
        let identity = match self.definition_name {
            Some(name) => BeanDefinitionIdentity::definition(name),
            None => {
                let id = RUNTIME_DEFINITIONS.fetch_add(1, Ordering::Relaxed);
                BeanDefinitionIdentity::runtime(
                    bean_type,
                    &format!("{}-{id}", bean_type.simple_name()),
                )
            }
        };

        BeanDefinition {
            identity,
            bean_type,
            exposed: self.exposed,
            scope: self.scope,
            name: self.name,
            stereotypes: self.stereotypes,
            primary: self.primary,
            order: self.order,
            constructor: self.constructor,
            injection_points: self.injection_points,
            executable_methods: self.executable_methods,
            post_construct: self.post_construct,
            pre_destroy: self.pre_destroy,
            requirements: self.requirements,
            iterable: self.iterable,
            configuration_prefix: self.configuration_prefix,
            proxy: self.proxy,
            replaces: self.replaces,
            provided: self.provided,
            enabled: EnabledCache::default(),
        }
    }
}

fn erase_hook<T, F>(hook: F) -> Hook
where
    T: Service,
    F: Fn(&T) + Send + Sync + 'static,
{
    Arc::new(move |bean: &dyn Service| {
        if let Some(bean) = bean.downcast_ref::<T>() {
            hook(bean);
        }
    })
}

fn resolve_each_bean<D: ?Sized + Interface>(
    context: &BeanContext,
    resolution: &mut BeanResolutionContext,
    qualifier: &Qualifier,
) -> InjectResult<Box<dyn Any + Send>> {
    let bean = context.resolve_bean::<D>(resolution, Some(qualifier))?;
    Ok(Box::new(bean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    trait Shape: Service {}
    crate::interface!(Shape);

    struct Square {
        side: OnceLock<Svc<u32>>,
    }
    impl Shape for Square {}

    #[test]
    fn builder_records_metadata() {
        let definition = BeanDefinition::of(|| Square {
            side: OnceLock::new(),
        })
        .exposes::<dyn Shape>()
        .exposes::<dyn Shape>()
        .named("square")
        .primary()
        .order(-1)
        .stereotype("Geometry")
        .inject_field("side", |square: &Square, side: Svc<u32>| {
            let _ = square.side.set(side);
        })
        .build();

        assert_eq!(BeanType::of::<Square>(), definition.bean_type());
        assert_eq!(2, definition.exposed_types().count());
        assert!(definition.exposes(BeanType::of::<dyn Shape>()));
        assert_eq!(Some("square"), definition.name());
        assert!(definition.is_primary());
        assert_eq!(-1, definition.order());
        assert_eq!(1, definition.injection_points().len());
        assert_eq!(
            InjectionKind::Field,
            definition.injection_points()[0].kind()
        );
        assert_eq!("side", definition.injection_points()[0].arguments()[0].name());
    }

    #[test]
    fn definitions_without_names_get_distinct_identities() {
        let first = BeanDefinition::of(|| 1_u8).build();
        let second = BeanDefinition::of(|| 1_u8).build();
        let named = BeanDefinition::of(|| 1_u8)
            .definition_name("app::ByteDefinition")
            .build();

        assert_ne!(first.identity(), second.identity());
        assert_eq!(
            &BeanDefinitionIdentity::definition("app::ByteDefinition"),
            named.identity()
        );
    }

    #[test]
    fn argument_names_and_qualifiers_apply_in_order() {
        let definition = BeanDefinition::of(|a: Svc<u8>, b: Svc<u16>| (a, b))
            .argument_names(&["first", "second"])
            .qualify(1, Qualifier::by_name("wide"))
            .build();

        let arguments = definition.constructor_arguments();
        assert_eq!("first", arguments[0].name());
        assert_eq!("second", arguments[1].name());
        assert!(arguments[0].qualifier().is_none());
        assert_eq!(Some(&Qualifier::by_name("wide")), arguments[1].qualifier());
    }
}
