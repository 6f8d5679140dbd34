use crate::{
    BeanContext, BeanResolutionContext, BeanType, InjectError, InjectResult,
    Qualifier, Request,
};
use std::{
    any::Any,
    borrow::Cow,
    fmt::{Debug, Formatter},
};

/// What kind of value an argument asks for.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum DependencyKind {
    /// Exactly one bean.
    Bean,
    /// At most one bean.
    OptionalBean,
    /// Every matching bean.
    Beans,
    /// A lazy lookup handle.
    Provider,
    /// The context itself.
    Context,
    /// A value supplied by the caller of the build.
    Parameter,
    /// A value the caller may supply.
    OptionalParameter,
    /// A single environment property.
    Property,
    /// A bound configuration sub-tree.
    Properties,
    /// The name of the bean being built.
    Name,
    /// The state of the current resolution.
    Resolution,
}

/// The type an argument asks for and how it is obtained.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Dependency {
    bean_type: BeanType,
    kind: DependencyKind,
}

impl Dependency {
    /// Creates a dependency on `bean_type`.
    #[must_use]
    pub fn new(bean_type: BeanType, kind: DependencyKind) -> Self {
        Dependency { bean_type, kind }
    }

    /// The requested type. For bean dependencies this is the interface, not
    /// the pointer around it.
    #[must_use]
    pub fn bean_type(&self) -> BeanType {
        self.bean_type
    }

    /// How the value is obtained.
    #[must_use]
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Whether resolving this dependency walks the bean graph.
    #[must_use]
    pub fn is_graph_dependency(&self) -> bool {
        matches!(
            self.kind,
            DependencyKind::Bean
                | DependencyKind::OptionalBean
                | DependencyKind::Beans
        )
    }
}

type Resolver = fn(
    &BeanContext,
    &mut BeanResolutionContext,
    &Argument,
) -> InjectResult<Box<dyn Any + Send>>;

/// One argument of a constructor or an injection method.
#[derive(Clone)]
pub struct Argument {
    index: usize,
    name: Cow<'static, str>,
    type_name: &'static str,
    dependency: Dependency,
    qualifier: Option<Qualifier>,
    resolver: Resolver,
}

impl Argument {
    /// Describes the argument at `index` requesting `R`.
    #[must_use]
    pub fn of<R: Request>(index: usize) -> Self {
        Argument {
            index,
            name: Cow::Owned(format!("arg{index}")),
            type_name: std::any::type_name::<R>(),
            dependency: R::dependency(),
            qualifier: None,
            resolver: resolve_erased::<R>,
        }
    }

    /// Renames the argument.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Qualifies the beans this argument resolves to.
    #[must_use]
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifier = Some(qualifier);
        self
    }

    /// The position of the argument.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The name of the argument. Properties use it as their key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full name of the requested Rust type.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// What the argument depends on.
    #[must_use]
    pub fn dependency(&self) -> Dependency {
        self.dependency
    }

    /// The qualifier applied to bean lookups for this argument.
    #[must_use]
    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    pub(crate) fn resolve(
        &self,
        context: &BeanContext,
        resolution: &mut BeanResolutionContext,
    ) -> InjectResult<Box<dyn Any + Send>> {
        (self.resolver)(context, resolution, self)
    }
}

impl PartialEq for Argument {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.type_name == other.type_name
    }
}

impl Eq for Argument {}

impl Debug for Argument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Argument")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("dependency", &self.dependency)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}

fn resolve_erased<R: Request>(
    context: &BeanContext,
    resolution: &mut BeanResolutionContext,
    argument: &Argument,
) -> InjectResult<Box<dyn Any + Send>> {
    let value = R::request(context, resolution, argument)?;
    Ok(Box::new(value))
}

/// Values for the arguments of one invocation, consumed in order.
pub struct Arguments {
    owner: BeanType,
    values: std::vec::IntoIter<Box<dyn Any + Send>>,
    position: usize,
}

impl Arguments {
    /// Wraps resolved values for an invocation on `owner`.
    #[must_use]
    pub fn new(owner: BeanType, values: Vec<Box<dyn Any + Send>>) -> Self {
        Arguments {
            owner,
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Takes the next value, which must be of type `T`.
    pub fn next<T: Any>(&mut self) -> InjectResult<T> {
        let position = self.position;
        self.position += 1;

        let value = self.values.next().ok_or_else(|| InjectError::Execution {
            bean_type: self.owner,
            method: format!("argument {position}"),
            message: "too few arguments were supplied".to_owned(),
        })?;
        value.downcast::<T>().map(|value| *value).map_err(|_| {
            InjectError::Execution {
                bean_type: self.owner,
                method: format!("argument {position}"),
                message: format!(
                    "expected a value of type {}",
                    std::any::type_name::<T>()
                ),
            }
        })
    }
}

/// A tuple of requests. Used to describe the arguments of injection methods.
pub trait RequestTuple: 'static {
    /// Describes each element of the tuple.
    fn arguments() -> Vec<Argument>;
}

macro_rules! impl_request_tuple {
    () => {
        impl_request_tuple!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_request_tuple!(@impl ($first $(, $rest)*));
        impl_request_tuple!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl<$($type_name),*> RequestTuple for ($($type_name,)*)
        where
            $($type_name: Request,)*
        {
            #[allow(unused_mut)]
            fn arguments() -> Vec<Argument> {
                let mut arguments = Vec::new();
                $(arguments.push(Argument::of::<$type_name>(arguments.len()));)*
                arguments
            }
        }
    };
}

impl_request_tuple!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Svc;

    #[test]
    fn arguments_are_taken_in_order() {
        let mut arguments = Arguments::new(
            BeanType::of::<()>(),
            vec![
                Box::new(1_i32) as Box<dyn Any + Send>,
                Box::new("two"),
            ],
        );

        assert_eq!(1, arguments.next::<i32>().unwrap());
        assert_eq!("two", arguments.next::<&str>().unwrap());
        match arguments.next::<i32>() {
            Err(InjectError::Execution { .. }) => {}
            result => panic!("unexpected result: {:?}", result.map(|_| ())),
        }
    }

    #[test]
    fn arguments_reject_wrong_types() {
        let mut arguments =
            Arguments::new(BeanType::of::<()>(), vec![Box::new(1_u8) as _]);

        match arguments.next::<String>() {
            Err(InjectError::Execution { message, .. }) => {
                assert!(message.contains("String"));
            }
            result => panic!("unexpected result: {:?}", result.map(|_| ())),
        }
    }

    #[test]
    fn tuple_arguments_are_indexed() {
        let arguments = <(Svc<String>, Option<Svc<u8>>)>::arguments();

        assert_eq!(2, arguments.len());
        assert_eq!("arg1", arguments[1].name());
        assert_eq!(BeanType::of::<u8>(), arguments[1].dependency().bean_type());
        assert_eq!(
            DependencyKind::OptionalBean,
            arguments[1].dependency().kind()
        );
    }
}
