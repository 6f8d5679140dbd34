use crate::{
    ArgumentValues, BeanContextBuilder, BeanDefinition, BeanDefinitionReference,
    BeanDefinitionRegistry, BeanRegistration, BeanResolutionContext, BeanStream,
    BeanType, ClassPath, ContextConfiguration, ContextEvent, ConversionService,
    DynSvc, Environment, EventPublisher, ExecutionHandle, InjectResult, Interface,
    Qualifier, Service, SingletonScope, Svc,
};
use derive_more::Display;
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use tracing::debug;

/// Uniquely identifies a context within the process.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Display)]
#[display(fmt = "context-{}", _0)]
pub struct ContextId(u64);

impl ContextId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ContextId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) struct ContextInner {
    pub(crate) id: ContextId,
    pub(crate) registry: BeanDefinitionRegistry,
    pub(crate) singletons: SingletonScope,
    pub(crate) environment: Environment,
    pub(crate) conversions: ConversionService,
    pub(crate) class_path: Box<dyn ClassPath>,
    pub(crate) events: Box<dyn EventPublisher>,
    pub(crate) configuration: ContextConfiguration,
    pub(crate) running: AtomicBool,
    pub(crate) lifecycle: Mutex<()>,
}

/// A container of bean definitions and the beans created from them.
///
/// The context resolves beans by type and qualifier, evaluates the
/// requirements of their definitions, and owns the singletons it creates.
/// Cloning a context is cheap and every clone refers to the same container,
/// so a context can be shared between threads and requested by the beans it
/// builds.
///
/// ```
/// use bean_context::{interface, BeanContext, BeanDefinition, Service, Svc};
///
/// trait Engine: Service {
///     fn cylinders(&self) -> u32;
/// }
/// interface!(Engine);
///
/// struct V8;
/// impl Engine for V8 {
///     fn cylinders(&self) -> u32 {
///         8
///     }
/// }
///
/// struct Vehicle {
///     engine: Svc<dyn Engine>,
/// }
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(BeanDefinition::of(|| V8).exposes::<dyn Engine>().build());
/// builder.register_definition(
///     BeanDefinition::of(|engine: Svc<dyn Engine>| Vehicle { engine }).build(),
/// );
///
/// let context = builder.build();
/// let vehicle: Svc<Vehicle> = context.get_bean().unwrap();
/// assert_eq!(8, vehicle.engine.cylinders());
///
/// let again: Svc<Vehicle> = context.get_bean().unwrap();
/// assert!(Svc::ptr_eq(&vehicle, &again));
/// ```
#[derive(Clone)]
pub struct BeanContext {
    inner: Arc<ContextInner>,
}

impl BeanContext {
    /// Gets a new builder for a context.
    #[must_use]
    pub fn builder() -> BeanContextBuilder {
        BeanContextBuilder::default()
    }

    pub(crate) fn from_inner(inner: ContextInner) -> Self {
        BeanContext {
            inner: Arc::new(inner),
        }
    }

    /// The identifier of this context.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// The properties of this context.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    /// The conversions applied to supplied argument values.
    #[must_use]
    pub fn conversion_service(&self) -> &ConversionService {
        &self.inner.conversions
    }

    /// The types considered present when checking definitions.
    #[must_use]
    pub fn class_path(&self) -> &dyn ClassPath {
        self.inner.class_path.as_ref()
    }

    /// The settings of this context.
    #[must_use]
    pub fn configuration(&self) -> &ContextConfiguration {
        &self.inner.configuration
    }

    /// Whether [`start`](BeanContext::start) was called and
    /// [`stop`](BeanContext::stop) was not called since.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub(crate) fn registry(&self) -> &BeanDefinitionRegistry {
        &self.inner.registry
    }

    pub(crate) fn singletons(&self) -> &SingletonScope {
        &self.inner.singletons
    }

    pub(crate) fn lifecycle(&self) -> &Mutex<()> {
        &self.inner.lifecycle
    }

    pub(crate) fn set_running(&self, running: bool) -> bool {
        self.inner.running.swap(running, Ordering::AcqRel)
    }

    pub(crate) fn publish(&self, event: &ContextEvent) {
        self.inner.events.publish(event);
    }

    /// Gets the one bean of type `I`. If several candidates exist, the primary
    /// one is chosen.
    pub fn get_bean<I: ?Sized + Interface>(&self) -> InjectResult<Svc<I>> {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<I>());
        self.resolve_bean(&mut resolution, None)
    }

    /// Gets the one bean of type `I` matching `qualifier`.
    pub fn get_bean_qualified<I: ?Sized + Interface>(
        &self,
        qualifier: &Qualifier,
    ) -> InjectResult<Svc<I>> {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<I>());
        self.resolve_bean(&mut resolution, Some(qualifier))
    }

    /// Gets the one bean of type `I` if there is one. Errors other than the
    /// bean not existing are still returned.
    pub fn find_bean<I: ?Sized + Interface>(&self) -> InjectResult<Option<Svc<I>>> {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<I>());
        self.resolve_optional_bean(&mut resolution, None)
    }

    /// Gets the one bean of type `I` matching `qualifier` if there is one.
    pub fn find_bean_qualified<I: ?Sized + Interface>(
        &self,
        qualifier: &Qualifier,
    ) -> InjectResult<Option<Svc<I>>> {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<I>());
        self.resolve_optional_bean(&mut resolution, Some(qualifier))
    }

    /// Gets every bean of type `I`, ordered by definition order.
    pub fn get_beans_of_type<I: ?Sized + Interface>(&self) -> InjectResult<Vec<Svc<I>>> {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<I>());
        self.resolve_beans(&mut resolution, None)
    }

    /// Gets every bean of type `I` matching `qualifier`.
    pub fn get_beans_of_type_qualified<I: ?Sized + Interface>(
        &self,
        qualifier: &Qualifier,
    ) -> InjectResult<Vec<Svc<I>>> {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<I>());
        self.resolve_beans(&mut resolution, Some(qualifier))
    }

    /// Lazily creates the beans of type `I` as the stream is consumed.
    pub fn stream_of_type<I: ?Sized + Interface>(&self) -> InjectResult<BeanStream<I>> {
        self.stream_of_type_qualified(None)
    }

    /// Lazily creates the beans of type `I` matching `qualifier`.
    pub fn stream_of_type_qualified<I: ?Sized + Interface>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<BeanStream<I>> {
        let candidates = self.ordered_candidates(BeanType::of::<I>(), qualifier)?;
        Ok(BeanStream::new(self.clone(), candidates))
    }

    /// Whether an enabled bean of type `I` exists. No bean is created.
    pub fn contains_bean<I: ?Sized + Interface>(&self) -> InjectResult<bool> {
        self.contains_bean_qualified::<I>(None)
    }

    /// Whether an enabled bean of type `I` matching `qualifier` exists.
    pub fn contains_bean_qualified<I: ?Sized + Interface>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<bool> {
        let found = self.find_candidates(BeanType::of::<I>(), qualifier)?;
        Ok(!found.candidates.is_empty())
    }

    /// Creates a new bean of type `I` regardless of its scope. The bean is
    /// not registered with the context.
    pub fn create_bean<I: ?Sized + Interface>(&self) -> InjectResult<Svc<I>> {
        self.create_bean_with(ArgumentValues::new())
    }

    /// Creates a new bean of type `I`, supplying `arguments` for its
    /// parameters.
    pub fn create_bean_with<I: ?Sized + Interface>(
        &self,
        arguments: ArgumentValues,
    ) -> InjectResult<Svc<I>> {
        let bean_type = BeanType::of::<I>();
        let candidate = self.select_candidate(bean_type, None)?;
        let mut resolution = BeanResolutionContext::new(bean_type);
        let (bean, _) = self.build(&mut resolution, &candidate, arguments)?;
        Self::cast(&candidate, bean)
    }

    /// Injects the fields and methods of an existing bean, then runs its
    /// post-construct hooks. A bean without a definition is returned as is.
    pub fn inject<T: Service>(&self, bean: Svc<T>) -> InjectResult<Svc<T>> {
        let bean_type = BeanType::of::<T>();
        let found = self.find_candidates(bean_type, None)?;
        let Some(candidate) = found.candidates.into_iter().next() else {
            debug!(bean_type = bean_type.name(), "no definition to inject");
            return Ok(bean);
        };

        let mut resolution = BeanResolutionContext::new(bean_type);
        self.inject_existing(&mut resolution, &candidate, bean.clone() as DynSvc)?;
        Ok(bean)
    }

    /// Gets the definition the one bean of type `I` is created from.
    pub fn get_bean_definition<I: ?Sized + Interface>(
        &self,
    ) -> InjectResult<Arc<BeanDefinition>> {
        let candidate = self.select_candidate(BeanType::of::<I>(), None)?;
        Ok(Arc::clone(candidate.definition()))
    }

    /// Gets the definition of the one bean of type `I` if there is one.
    pub fn find_bean_definition<I: ?Sized + Interface>(
        &self,
    ) -> InjectResult<Option<Arc<BeanDefinition>>> {
        match self.get_bean_definition::<I>() {
            Ok(definition) => Ok(Some(definition)),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Gets every enabled definition exposing `I`, in definition order.
    /// Iterable definitions appear once however many beans they expand to.
    pub fn get_bean_definitions<I: ?Sized + Interface>(
        &self,
    ) -> InjectResult<Vec<Arc<BeanDefinition>>> {
        let candidates = self.ordered_candidates(BeanType::of::<I>(), None)?;
        let mut definitions: Vec<Arc<BeanDefinition>> = Vec::new();
        for candidate in candidates {
            let definition = candidate.definition();
            if !definitions.iter().any(|known| Arc::ptr_eq(known, definition)) {
                definitions.push(Arc::clone(definition));
            }
        }
        Ok(definitions)
    }

    /// Gets the registration of the one bean of type `I` if it was created.
    pub fn find_bean_registration<I: ?Sized + Interface>(
        &self,
    ) -> InjectResult<Option<BeanRegistration>> {
        match self.select_candidate(BeanType::of::<I>(), None) {
            Ok(candidate) => Ok(self.singletons().find_by_identity(candidate.identity())),
            Err(error) if error.is_not_found() => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Finds the executable method `name` of the one bean of type `I`. The
    /// bean is created if needed.
    pub fn find_execution_handle<I: ?Sized + Interface>(
        &self,
        name: &str,
        argument_types: &[BeanType],
    ) -> InjectResult<Option<ExecutionHandle>> {
        let bean_type = BeanType::of::<I>();
        let candidate = self.select_candidate(bean_type, None)?;
        let Some(method) = candidate.definition().find_method(name, argument_types).cloned()
        else {
            return Ok(None);
        };

        let mut resolution = BeanResolutionContext::new(bean_type);
        let bean = self.bean_for_candidate(&mut resolution, &candidate, None, ArgumentValues::new())?;
        Ok(Some(ExecutionHandle::new(bean, method)))
    }

    /// Adds a definition to the context.
    pub fn register_bean_definition(&self, definition: BeanDefinition) {
        self.register_reference(BeanDefinitionReference::from_definition(definition));
    }

    /// Adds a reference to the context. Remembered lookups are forgotten so
    /// that the new definition takes part in later requests.
    pub fn register_reference(&self, reference: BeanDefinitionReference) {
        self.registry().register(reference);
        self.singletons().clear_lookups();
    }

    /// Adds an existing instance as a singleton.
    pub fn register_singleton<T: Service>(&self, bean: T) {
        self.register_bean_definition(BeanDefinition::singleton(bean).build());
    }
}

impl std::fmt::Debug for BeanContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanContext")
            .field("id", &self.inner.id)
            .field("definitions", &self.inner.registry.len())
            .field("singletons", &self.inner.singletons)
            .field("running", &self.is_running())
            .finish()
    }
}
