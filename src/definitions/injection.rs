use crate::{Argument, Arguments, BeanType, InjectResult, Service};
use std::{any::Any, borrow::Cow, fmt::Debug, sync::Arc};

/// Whether an injection point is a field or a method.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum InjectionKind {
    /// A single value stored into the bean.
    Field,
    /// A method called with resolved arguments.
    Method,
}

type DirectInvoker =
    Arc<dyn Fn(&dyn Service, &mut Arguments) -> InjectResult<()> + Send + Sync>;

/// How the resolved values reach the bean.
#[derive(Clone)]
pub enum Invocation {
    /// A callable captured when the definition was built.
    Direct(DirectInvoker),
    /// An index into the definition's executable methods.
    Dispatch(usize),
}

/// A field or method of a bean that receives dependencies after the bean is
/// constructed. Beans are shared as soon as they are constructed, so fields are
/// usually cells which the injection point fills.
#[derive(Clone)]
pub struct InjectionPoint {
    kind: InjectionKind,
    name: Cow<'static, str>,
    arguments: Vec<Argument>,
    invocation: Invocation,
}

impl InjectionPoint {
    pub(crate) fn direct<T, F>(
        kind: InjectionKind,
        name: Cow<'static, str>,
        arguments: Vec<Argument>,
        inject: F,
    ) -> Self
    where
        T: Service,
        F: Fn(&T, &mut Arguments) -> InjectResult<()> + Send + Sync + 'static,
    {
        let declaring_type = BeanType::of::<T>();
        let member = name.clone();
        let invoker: DirectInvoker =
            Arc::new(move |bean: &dyn Service, arguments: &mut Arguments| {
                let bean = bean.downcast_ref::<T>().ok_or_else(|| {
                    crate::InjectError::Execution {
                        bean_type: declaring_type,
                        method: member.to_string(),
                        message: "the bean is not an instance of the declaring type"
                            .to_owned(),
                    }
                })?;
                inject(bean, arguments)
            });

        InjectionPoint {
            kind,
            name,
            arguments,
            invocation: Invocation::Direct(invoker),
        }
    }

    pub(crate) fn dispatched(
        name: Cow<'static, str>,
        arguments: Vec<Argument>,
        index: usize,
    ) -> Self {
        InjectionPoint {
            kind: InjectionKind::Method,
            name,
            arguments,
            invocation: Invocation::Dispatch(index),
        }
    }

    /// Whether this is a field or a method.
    #[must_use]
    pub fn kind(&self) -> InjectionKind {
        self.kind
    }

    /// The name of the field or method.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The arguments resolved for this injection point.
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// How the values reach the bean.
    #[must_use]
    pub fn invocation(&self) -> &Invocation {
        &self.invocation
    }

    pub(crate) fn invoke_direct(
        invoker: &DirectInvoker,
        bean: &dyn Service,
        owner: BeanType,
        values: Vec<Box<dyn Any + Send>>,
    ) -> InjectResult<()> {
        let mut arguments = Arguments::new(owner, values);
        invoker(bean, &mut arguments)
    }
}

impl Debug for InjectionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let invocation = match self.invocation {
            Invocation::Direct(_) => "direct".to_owned(),
            Invocation::Dispatch(index) => format!("dispatch({index})"),
        };
        f.debug_struct("InjectionPoint")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("invocation", &invocation)
            .finish()
    }
}
