use crate::{
    Argument, Arguments, BeanContext, BeanDefinitionIdentity,
    BeanResolutionContext, BeanType, BoxError, DynSvc, EnabledCache,
    ExecutableMethod, Exposure, InjectError, InjectResult, InjectionPoint,
    Qualifier, Requires, Service,
};
use std::{any::Any, borrow::Cow, fmt::Debug, sync::Arc};

/// How long a bean lives.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum BeanScope {
    /// One instance per context, created on first request.
    #[default]
    Singleton,
    /// A new instance for every request.
    Prototype,
    /// One instance per context, created when the context starts.
    Context,
}

impl BeanScope {
    /// Whether instances of this scope are kept by the singleton scope.
    #[must_use]
    pub fn is_shared(self) -> bool {
        matches!(self, BeanScope::Singleton | BeanScope::Context)
    }
}

pub(crate) type EachBeanResolver = fn(
    &BeanContext,
    &mut BeanResolutionContext,
    &Qualifier,
) -> InjectResult<Box<dyn Any + Send>>;

/// A definition that produces one bean for every bean of another type.
#[derive(Clone, Copy)]
pub struct EachBean {
    dependent: BeanType,
    parameter: BeanType,
    resolver: EachBeanResolver,
}

impl EachBean {
    pub(crate) fn new(
        dependent: BeanType,
        parameter: BeanType,
        resolver: EachBeanResolver,
    ) -> Self {
        EachBean {
            dependent,
            parameter,
            resolver,
        }
    }

    /// The type whose beans are iterated.
    #[must_use]
    pub fn dependent(&self) -> BeanType {
        self.dependent
    }

    /// The type of the argument that receives the iterated bean.
    #[must_use]
    pub fn parameter_type(&self) -> BeanType {
        self.parameter
    }

    pub(crate) fn resolve(
        &self,
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
        qualifier: &Qualifier,
    ) -> InjectResult<Box<dyn Any + Send>> {
        (self.resolver)(context, resolution, qualifier)
    }
}

impl Debug for EachBean {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("EachBean").field(&self.dependent).finish()
    }
}

/// How a definition expands into several beans.
#[derive(Clone, Debug)]
pub enum Iterable {
    /// One bean for each key under a configuration prefix.
    EachProperty {
        /// The configuration prefix whose child keys are iterated.
        prefix: String,
        /// The key whose bean is primary.
        primary: Option<String>,
    },
    /// One bean for each bean of another type.
    EachBean(EachBean),
}

pub(crate) type Hook = Arc<dyn Fn(&dyn Service) + Send + Sync>;

type Create = Arc<dyn Fn(&mut Arguments) -> Result<DynSvc, BoxError> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct Constructor {
    pub(crate) arguments: Vec<Argument>,
    pub(crate) create: Create,
}

/// Static description of how a bean is constructed and wired.
///
/// Definitions are immutable once built. Iterable variants of a definition are
/// described by [`BeanDefinitionDelegate`](crate::BeanDefinitionDelegate)s
/// rather than by changing the definition.
pub struct BeanDefinition {
    pub(crate) identity: BeanDefinitionIdentity,
    pub(crate) bean_type: BeanType,
    pub(crate) exposed: Vec<Exposure>,
    pub(crate) scope: BeanScope,
    pub(crate) name: Option<Cow<'static, str>>,
    pub(crate) stereotypes: Vec<Cow<'static, str>>,
    pub(crate) primary: bool,
    pub(crate) order: i32,
    pub(crate) constructor: Constructor,
    pub(crate) injection_points: Vec<InjectionPoint>,
    pub(crate) executable_methods: Vec<ExecutableMethod>,
    pub(crate) post_construct: Vec<Hook>,
    pub(crate) pre_destroy: Vec<Hook>,
    pub(crate) requirements: Vec<Requires>,
    pub(crate) iterable: Option<Iterable>,
    pub(crate) configuration_prefix: Option<String>,
    pub(crate) proxy: bool,
    pub(crate) replaces: Vec<BeanType>,
    pub(crate) provided: bool,
    pub(crate) enabled: EnabledCache,
}

impl BeanDefinition {
    /// The identity of this definition in the singleton scope.
    #[must_use]
    pub fn identity(&self) -> &BeanDefinitionIdentity {
        &self.identity
    }

    /// The concrete type this definition produces.
    #[must_use]
    pub fn bean_type(&self) -> BeanType {
        self.bean_type
    }

    /// The types this definition can be requested as, including its own.
    pub fn exposed_types(&self) -> impl Iterator<Item = BeanType> + '_ {
        self.exposed.iter().map(Exposure::bean_type)
    }

    /// Whether this definition can be requested as `bean_type`.
    #[must_use]
    pub fn exposes(&self, bean_type: BeanType) -> bool {
        self.exposure(bean_type).is_some()
    }

    pub(crate) fn exposure(&self, bean_type: BeanType) -> Option<&Exposure> {
        self.exposed
            .iter()
            .find(|exposure| exposure.bean_type() == bean_type)
    }

    /// The scope of the beans produced by this definition.
    #[must_use]
    pub fn scope(&self) -> BeanScope {
        self.scope
    }

    /// The explicit name of this definition.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Stereotypes declared on this definition.
    #[must_use]
    pub fn stereotypes(&self) -> &[Cow<'static, str>] {
        &self.stereotypes
    }

    /// Whether this definition wins ties between candidates.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.primary
    }

    /// The position of this definition's beans in ordered collections. Lower
    /// values come first.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// The arguments of the constructor.
    #[must_use]
    pub fn constructor_arguments(&self) -> &[Argument] {
        &self.constructor.arguments
    }

    /// Fields and methods injected after construction, in declaration order.
    #[must_use]
    pub fn injection_points(&self) -> &[InjectionPoint] {
        &self.injection_points
    }

    /// Methods that can be invoked through an
    /// [`ExecutionHandle`](crate::ExecutionHandle).
    #[must_use]
    pub fn executable_methods(&self) -> &[ExecutableMethod] {
        &self.executable_methods
    }

    /// The executable method at `index`.
    #[must_use]
    pub fn executable_method(&self, index: usize) -> Option<&ExecutableMethod> {
        self.executable_methods.get(index)
    }

    /// Finds an executable method by name and argument types.
    #[must_use]
    pub fn find_method(
        &self,
        name: &str,
        argument_types: &[BeanType],
    ) -> Option<&ExecutableMethod> {
        self.executable_methods
            .iter()
            .find(|method| method.matches(name, argument_types))
    }

    /// Invokes the executable method at `index` on `target`.
    pub fn dispatch(
        &self,
        index: usize,
        target: &dyn Service,
        arguments: Vec<Box<dyn Any + Send>>,
    ) -> InjectResult<Box<dyn Any + Send>> {
        let method =
            self.executable_method(index)
                .ok_or_else(|| InjectError::Execution {
                    bean_type: self.bean_type,
                    method: format!("#{index}"),
                    message: "no executable method exists at this index"
                        .to_owned(),
                })?;
        method.invoke(target, arguments)
    }

    /// The requirement groups that must all pass for this definition to be
    /// enabled.
    #[must_use]
    pub fn requirements(&self) -> &[Requires] {
        &self.requirements
    }

    /// How this definition expands into several beans, if it does.
    #[must_use]
    pub fn iterable(&self) -> Option<&Iterable> {
        self.iterable.as_ref()
    }

    /// Whether this definition expands into several beans.
    #[must_use]
    pub fn is_iterable(&self) -> bool {
        self.iterable.is_some()
    }

    /// The bean type iterated by this definition, if it has one bean per
    /// bean of another type.
    #[must_use]
    pub fn each_bean(&self) -> Option<&EachBean> {
        match &self.iterable {
            Some(Iterable::EachBean(each_bean)) => Some(each_bean),
            _ => None,
        }
    }

    /// The prefix under which this definition's configuration lives.
    #[must_use]
    pub fn configuration_prefix(&self) -> Option<&str> {
        self.configuration_prefix.as_deref()
    }

    /// Whether this definition binds configuration properties.
    #[must_use]
    pub fn is_configuration_properties(&self) -> bool {
        self.configuration_prefix.is_some()
    }

    /// Whether this definition is a proxy of another definition with the same
    /// bean type.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.proxy
    }

    /// Types whose candidates are removed when this definition is enabled.
    #[must_use]
    pub fn replaces(&self) -> &[BeanType] {
        &self.replaces
    }

    /// Whether the bean is supplied as a ready instance.
    #[must_use]
    pub fn is_provided(&self) -> bool {
        self.provided
    }

    pub(crate) fn has_pre_destroy(&self) -> bool {
        !self.pre_destroy.is_empty()
    }

    pub(crate) fn pre_destroy_hooks(&self) -> &[Hook] {
        &self.pre_destroy
    }

    pub(crate) fn post_construct_hooks(&self) -> &[Hook] {
        &self.post_construct
    }

    pub(crate) fn construct(
        &self,
        values: Vec<Box<dyn Any + Send>>,
    ) -> InjectResult<DynSvc> {
        let mut arguments = Arguments::new(self.bean_type, values);
        (self.constructor.create)(&mut arguments)
            .map_err(|error| InjectError::instantiation(self.bean_type, error))
    }

    pub(crate) fn with_identity(mut self, identity: BeanDefinitionIdentity) -> Self {
        self.identity = identity;
        self
    }
}

impl Debug for BeanDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("identity", &self.identity)
            .field("bean_type", &self.bean_type)
            .field("exposed", &self.exposed)
            .field("scope", &self.scope)
            .field("name", &self.name)
            .field("primary", &self.primary)
            .field("iterable", &self.iterable)
            .field("proxy", &self.proxy)
            .finish_non_exhaustive()
    }
}
