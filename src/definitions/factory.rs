use crate::{Argument, Arguments, BoxError, Request};
use std::{any::Any, error::Error, marker::PhantomData};

/// A factory for creating instances of a bean. All functions of arity 12 or
/// less are automatically bean factories if the arguments to that function
/// are valid requests.
///
/// ## Type parameters
/// * `D` - Tuple of this bean's dependencies.
///
/// ## Example
///
/// ```
/// use bean_context::{BeanFactory, BeanType, Svc};
///
/// struct Foo;
/// struct Bar(Svc<Foo>);
///
/// fn factory(foo: Svc<Foo>) -> Bar {
///     Bar(foo)
/// }
///
/// let arguments = factory.arguments();
/// assert_eq!(1, arguments.len());
/// assert_eq!(BeanType::of::<Foo>(), arguments[0].dependency().bean_type());
/// ```
pub trait BeanFactory<D>: Send + Sync + 'static {
    /// The value produced by this factory.
    type Output: Any;

    /// Describes the arguments of this factory, in order.
    fn arguments(&self) -> Vec<Argument>;

    /// Invokes this factory with resolved argument values.
    fn create(&self, arguments: &mut Arguments) -> Result<Self::Output, BoxError>;
}

macro_rules! impl_bean_factory {
    () => {
        impl_bean_factory!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_bean_factory!(@impl ($first $(, $rest)*));
        impl_bean_factory!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl<F, R $(, $type_name)*> BeanFactory<($($type_name,)*)> for F
        where
            F: Fn($($type_name),*) -> R + Send + Sync + 'static,
            R: Any,
            $($type_name: Request,)*
        {
            type Output = R;

            #[allow(unused_mut)]
            fn arguments(&self) -> Vec<Argument> {
                let mut arguments = Vec::new();
                $(arguments.push(Argument::of::<$type_name>(arguments.len()));)*
                arguments
            }

            #[allow(unused_variables)]
            fn create(
                &self,
                arguments: &mut Arguments
            ) -> Result<Self::Output, BoxError> {
                Ok(self($(arguments.next::<$type_name>()?),*))
            }
        }
    };
}

impl_bean_factory!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

/// A bean factory that may fail with a custom error type. The error is
/// reported as [`InjectError::Instantiation`](crate::InjectError::Instantiation)
/// with the error as its source.
pub struct FallibleBeanFactory<D, R, E, F>
where
    F: BeanFactory<D, Output = Result<R, E>>,
{
    inner: F,
    marker: PhantomData<fn(D) -> Result<R, E>>,
}

impl<D, R, E, F> BeanFactory<D> for FallibleBeanFactory<D, R, E, F>
where
    D: 'static,
    R: Any,
    E: Error + Send + Sync + 'static,
    F: BeanFactory<D, Output = Result<R, E>>,
{
    type Output = R;

    fn arguments(&self) -> Vec<Argument> {
        self.inner.arguments()
    }

    fn create(&self, arguments: &mut Arguments) -> Result<R, BoxError> {
        self.inner
            .create(arguments)?
            .map_err(|error| Box::new(error) as BoxError)
    }
}

/// Defines a conversion into a fallible bean factory. This trait is
/// automatically implemented for all bean factories that return a
/// [`Result<T, E>`] with a type that implements [`Error`].
pub trait IntoFallible<D, R, E, F>
where
    F: BeanFactory<D, Output = Result<R, E>>,
{
    /// # Example
    ///
    /// ```
    /// use bean_context::{BeanContext, BeanDefinition, InjectError, IntoFallible, Svc};
    /// use std::{
    ///     error::Error,
    ///     fmt::{Display, Formatter},
    /// };
    ///
    /// #[derive(Debug)]
    /// struct FooError;
    ///
    /// impl Error for FooError {}
    /// impl Display for FooError {
    ///     fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    ///         write!(f, "An error occurred while creating a Foo")
    ///     }
    /// }
    ///
    /// struct Foo;
    /// fn make_foo() -> Result<Foo, FooError> {
    ///     Err(FooError)
    /// }
    ///
    /// let mut builder = BeanContext::builder();
    /// builder.register_definition(BeanDefinition::of(make_foo.fallible()).build());
    ///
    /// let context = builder.build();
    /// match context.get_bean::<Foo>() {
    ///     Err(InjectError::Instantiation { .. }) => {}
    ///     Err(error) => Err(error).unwrap(),
    ///     Ok(_) => unreachable!("instantiation should have failed"),
    /// }
    /// ```
    #[must_use]
    fn fallible(self) -> FallibleBeanFactory<D, R, E, F>;
}

impl<D, R, E, F> IntoFallible<D, R, E, F> for F
where
    F: BeanFactory<D, Output = Result<R, E>>,
{
    fn fallible(self) -> FallibleBeanFactory<D, R, E, F> {
        FallibleBeanFactory {
            inner: self,
            marker: PhantomData,
        }
    }
}
