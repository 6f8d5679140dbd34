use crate::{
    Argument, BeanContext, BeanResolutionContext, BeanStream, BeanType,
    Dependency, DependencyKind, InjectResult, Interface, Qualifier, Request,
    Svc,
};
use std::marker::PhantomData;

/// A lazy handle to beans of type `I`.
///
/// Nothing is resolved until the provider is asked for a bean, and each call
/// starts its own resolution. Injecting a provider is the way to let two
/// beans depend on each other through their constructors.
///
/// ```
/// use bean_context::{BeanContext, BeanDefinition, BeanProvider, Svc};
///
/// struct Parent(BeanProvider<Child>);
/// struct Child(Svc<Parent>);
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(BeanDefinition::of(Parent).build());
/// builder.register_definition(BeanDefinition::of(Child).build());
///
/// let context = builder.build();
/// let parent: Svc<Parent> = context.get_bean().unwrap();
/// let child = parent.0.get().unwrap();
/// assert!(Svc::ptr_eq(&parent, &child.0));
/// ```
pub struct BeanProvider<I: ?Sized + Interface> {
    context: BeanContext,
    qualifier: Option<Qualifier>,
    marker: PhantomData<fn() -> Svc<I>>,
}

impl<I: ?Sized + Interface> BeanProvider<I> {
    pub(crate) fn new(context: BeanContext, qualifier: Option<Qualifier>) -> Self {
        BeanProvider {
            context,
            qualifier,
            marker: PhantomData,
        }
    }

    /// Resolves exactly one bean.
    pub fn get(&self) -> InjectResult<Svc<I>> {
        match &self.qualifier {
            Some(qualifier) => self.context.get_bean_qualified(qualifier),
            None => self.context.get_bean(),
        }
    }

    /// Resolves at most one bean.
    pub fn find(&self) -> InjectResult<Option<Svc<I>>> {
        match &self.qualifier {
            Some(qualifier) => self.context.find_bean_qualified(qualifier),
            None => self.context.find_bean(),
        }
    }

    /// Lazily resolves every matching bean.
    pub fn stream(&self) -> InjectResult<BeanStream<I>> {
        self.context.stream_of_type_qualified(self.qualifier.as_ref())
    }

    /// Whether at least one bean matches.
    pub fn is_present(&self) -> InjectResult<bool> {
        self.context
            .contains_bean_qualified::<I>(self.qualifier.as_ref())
    }
}

impl<I: ?Sized + Interface> Clone for BeanProvider<I> {
    fn clone(&self) -> Self {
        BeanProvider::new(self.context.clone(), self.qualifier.clone())
    }
}

impl<I: ?Sized + Interface> Request for BeanProvider<I> {
    fn dependency() -> Dependency {
        Dependency::new(BeanType::of::<I>(), DependencyKind::Provider)
    }

    fn request(
        context: &BeanContext,
        _resolution: &mut BeanResolutionContext,
        argument: &Argument,
    ) -> InjectResult<Self> {
        Ok(BeanProvider::new(
            context.clone(),
            argument.qualifier().cloned(),
        ))
    }
}
