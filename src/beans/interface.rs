use crate::{BeanType, DynSvc, Service, Svc};
use std::any::Any;

/// Indicates that a type can be requested from a
/// [`BeanContext`](crate::BeanContext). Each sized bean type is an interface
/// for itself. Trait objects (`dyn Trait`) must be declared explicitly with the
/// [`interface!`] macro before they can be requested.
pub trait Interface: Service {}

impl<T: Service> Interface for T {}

/// Marker trait that indicates that a type is an interface for another type.
/// Each sized type is an interface for itself, and each `dyn Trait` is an
/// interface for the types that implement it. This trait should usually be
/// implemented by the [`interface!`] macro.
pub trait InterfaceFor<S: Service>: Interface {
    #[doc(hidden)]
    fn from_svc(service: Svc<S>) -> Svc<Self>;
}

impl<T: Service> InterfaceFor<T> for T {
    fn from_svc(service: Svc<T>) -> Svc<Self> {
        service
    }
}

/// Marks a trait as being an interface for all of its implementations. A
/// request for `dyn Trait` can then resolve to any bean definition that
/// exposes that interface.
///
/// ## Example
///
/// ```
/// use bean_context::{interface, BeanContext, BeanDefinition, Service, Svc};
///
/// trait Engine: Service {
///     fn cylinders(&self) -> u32;
/// }
/// interface!(Engine);
///
/// #[derive(Default)]
/// struct V8Engine;
/// impl Engine for V8Engine {
///     fn cylinders(&self) -> u32 {
///         8
///     }
/// }
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(
///     BeanDefinition::of(V8Engine::default)
///         .exposes::<dyn Engine>()
///         .build(),
/// );
///
/// let context = builder.build();
/// let engine: Svc<dyn Engine> = context.get_bean().unwrap();
/// assert_eq!(8, engine.cylinders());
/// ```
#[macro_export]
macro_rules! interface {
    ($($interface:ident),+ $(,)?) => {
        $(
            impl $crate::Interface for dyn $interface {}

            impl<T: $interface> $crate::InterfaceFor<T> for dyn $interface {
                fn from_svc(service: $crate::Svc<T>) -> $crate::Svc<Self> {
                    service
                }
            }
        )+
    };
}

pub(crate) type AnySvc = Box<dyn Any + Send + Sync>;

/// A type that a bean definition can be requested as. The cast produces a
/// boxed [`Svc<I>`] from the bean's concrete instance.
#[derive(Clone, Copy)]
pub struct Exposure {
    bean_type: BeanType,
    cast: fn(DynSvc) -> Option<AnySvc>,
}

impl Exposure {
    /// Exposes the concrete type `T` as the interface `I`.
    #[must_use]
    pub fn of<T, I>() -> Self
    where
        T: Service,
        I: ?Sized + InterfaceFor<T>,
    {
        Exposure {
            bean_type: BeanType::of::<I>(),
            cast: cast_exposed::<T, I>,
        }
    }

    /// The type this exposure makes the bean available as.
    #[must_use]
    pub fn bean_type(&self) -> BeanType {
        self.bean_type
    }

    pub(crate) fn cast(&self, bean: DynSvc) -> Option<AnySvc> {
        (self.cast)(bean)
    }
}

impl std::fmt::Debug for Exposure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Exposure").field(&self.bean_type).finish()
    }
}

fn cast_exposed<T, I>(bean: DynSvc) -> Option<AnySvc>
where
    T: Service,
    I: ?Sized + InterfaceFor<T>,
{
    let bean: Svc<T> = bean.downcast_arc().ok()?;
    Some(Box::new(I::from_svc(bean)))
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Service {
        fn greet(&self) -> String;
    }
    crate::interface!(Greeter);

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_owned()
        }
    }

    #[test]
    fn exposure_casts_to_interface() {
        let exposure = Exposure::of::<English, dyn Greeter>();
        assert_eq!(BeanType::of::<dyn Greeter>(), exposure.bean_type());

        let cast = exposure.cast(Svc::new(English)).unwrap();
        let greeter = cast.downcast::<Svc<dyn Greeter>>().unwrap();
        assert_eq!("hello", greeter.greet());
    }

    #[test]
    fn exposure_rejects_wrong_instance() {
        let exposure = Exposure::of::<English, English>();
        assert!(exposure.cast(Svc::new(12_i32)).is_none());
    }
}
