use crate::InjectError;
use downcast_rs::{impl_downcast, DowncastSync};
use std::{
    any::{Any, TypeId},
    fmt::{Display, Formatter},
};

/// A reference-counted pointer holding a bean. Beans are shared between every
/// thread that requests them, so this is always an [`Arc<T>`](std::sync::Arc).
pub type Svc<T> = std::sync::Arc<T>;

/// A service pointer holding an instance of `dyn Service`.
pub type DynSvc = Svc<dyn Service>;

/// A boxed error that can cross thread boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A result from attempting to resolve, construct or inject a bean.
pub type InjectResult<T> = Result<T, InjectError>;

/// Implemented automatically on types that are capable of being a bean.
pub trait Service: DowncastSync {}
impl<T: ?Sized + DowncastSync> Service for T {}

impl_downcast!(sync Service);

/// Type information about a bean or an interface.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub struct BeanType {
    id: TypeId,
    name: &'static str,
}

impl BeanType {
    /// Creates a [`BeanType`] for the given type.
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + Any>() -> Self {
        BeanType {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Gets the [`TypeId`] for this type.
    #[inline]
    #[must_use]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Gets the full type name of this type.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Gets the name of this type without its module path or generic
    /// parameters. `dyn my_app::Engine` becomes `Engine`.
    #[must_use]
    pub fn simple_name(&self) -> &'static str {
        simple_name(self.name)
    }
}

impl Display for BeanType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

fn simple_name(name: &'static str) -> &'static str {
    let name = name.strip_prefix("dyn ").unwrap_or(name);
    let name = match name.find('<') {
        Some(generics) => &name[..generics],
        None => name,
    };
    match name.rfind("::") {
        Some(separator) => &name[separator + 2..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Engine: Service {}

    struct V8Engine;

    #[test]
    fn simple_name_strips_paths() {
        assert_eq!("V8Engine", BeanType::of::<V8Engine>().simple_name());
        assert_eq!("Engine", BeanType::of::<dyn Engine>().simple_name());
        assert_eq!("Vec", BeanType::of::<Vec<Svc<V8Engine>>>().simple_name());
    }

    #[test]
    fn dyn_svc_downcasts_to_concrete_type() {
        let bean: DynSvc = Svc::new(V8Engine);
        assert!(bean.downcast_arc::<V8Engine>().is_ok());
    }
}
