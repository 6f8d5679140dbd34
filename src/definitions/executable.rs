use crate::{Arguments, BeanType, DynSvc, InjectError, InjectResult, Service};
use std::{any::Any, borrow::Cow, fmt::Debug, sync::Arc};

/// A method of a bean with plain typed arguments. All functions taking the
/// bean by reference followed by up to 12 arguments are method functions.
pub trait MethodFunction<T, D>: Send + Sync + 'static {
    /// The value returned by the method.
    type Output: Any + Send;

    /// The types of the arguments after the bean, in order.
    fn argument_types() -> Vec<BeanType>;

    /// Calls the method on `target`.
    fn call(&self, target: &T, arguments: &mut Arguments) -> InjectResult<Self::Output>;
}

macro_rules! impl_method_function {
    () => {
        impl_method_function!(@impl ());
    };
    ($first:ident $(, $rest:ident)*) => {
        impl_method_function!(@impl ($first $(, $rest)*));
        impl_method_function!($($rest),*);
    };
    (@impl ($($type_name:ident),*)) => {
        impl<F, T, R $(, $type_name)*> MethodFunction<T, ($($type_name,)*)> for F
        where
            F: Fn(&T, $($type_name),*) -> R + Send + Sync + 'static,
            R: Any + Send,
            $($type_name: Any,)*
        {
            type Output = R;

            fn argument_types() -> Vec<BeanType> {
                vec![$(BeanType::of::<$type_name>()),*]
            }

            #[allow(unused_variables)]
            fn call(
                &self,
                target: &T,
                arguments: &mut Arguments,
            ) -> InjectResult<Self::Output> {
                Ok(self(target, $(arguments.next::<$type_name>()?),*))
            }
        }
    };
}

impl_method_function!(T0, T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);

type Invoker = Arc<
    dyn Fn(&dyn Service, Vec<Box<dyn Any + Send>>) -> InjectResult<Box<dyn Any + Send>>
        + Send
        + Sync,
>;

/// A method of a bean that can be invoked by index or by name without knowing
/// the bean's concrete type.
#[derive(Clone)]
pub struct ExecutableMethod {
    declaring_type: BeanType,
    name: Cow<'static, str>,
    argument_types: Vec<BeanType>,
    return_type: BeanType,
    invoker: Invoker,
}

impl ExecutableMethod {
    /// Describes `method` of the bean type `T`.
    #[must_use]
    pub fn new<T, D, M>(name: impl Into<Cow<'static, str>>, method: M) -> Self
    where
        T: Service,
        M: MethodFunction<T, D>,
    {
        let declaring_type = BeanType::of::<T>();
        let name = name.into();
        let method_name = name.clone();
        ExecutableMethod {
            declaring_type,
            argument_types: M::argument_types(),
            return_type: BeanType::of::<M::Output>(),
            invoker: Arc::new(
                move |target: &dyn Service,
                      values: Vec<Box<dyn Any + Send>>|
                      -> InjectResult<Box<dyn Any + Send>> {
                let target = target.downcast_ref::<T>().ok_or_else(|| {
                    InjectError::Execution {
                        bean_type: declaring_type,
                        method: method_name.to_string(),
                        message: "the target is not an instance of the declaring type"
                            .to_owned(),
                    }
                })?;
                let mut arguments = Arguments::new(declaring_type, values);
                let output = method.call(target, &mut arguments)?;
                Ok(Box::new(output))
            },
            ),
            name,
        }
    }

    /// The type that declares this method.
    #[must_use]
    pub fn declaring_type(&self) -> BeanType {
        self.declaring_type
    }

    /// The name of this method.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The types of the arguments of this method.
    #[must_use]
    pub fn argument_types(&self) -> &[BeanType] {
        &self.argument_types
    }

    /// The type returned by this method.
    #[must_use]
    pub fn return_type(&self) -> BeanType {
        self.return_type
    }

    /// Whether this method has the given name and argument types.
    #[must_use]
    pub fn matches(&self, name: &str, argument_types: &[BeanType]) -> bool {
        self.name == name && self.argument_types == argument_types
    }

    /// Invokes this method on `target`.
    pub fn invoke(
        &self,
        target: &dyn Service,
        arguments: Vec<Box<dyn Any + Send>>,
    ) -> InjectResult<Box<dyn Any + Send>> {
        (self.invoker)(target, arguments)
    }
}

impl Debug for ExecutableMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutableMethod")
            .field("declaring_type", &self.declaring_type)
            .field("name", &self.name)
            .field("argument_types", &self.argument_types)
            .field("return_type", &self.return_type)
            .finish()
    }
}

/// A bean bound to one of its executable methods.
///
/// ```
/// use bean_context::{BeanContext, BeanDefinition, BeanType};
/// use std::any::Any;
///
/// struct Greeter;
///
/// impl Greeter {
///     fn greet(&self, name: String) -> String {
///         format!("hello {name}")
///     }
/// }
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(
///     BeanDefinition::of(|| Greeter)
///         .executable("greet", Greeter::greet)
///         .build(),
/// );
///
/// let context = builder.build();
/// let handle = context
///     .find_execution_handle::<Greeter>("greet", &[BeanType::of::<String>()])
///     .unwrap()
///     .unwrap();
/// let greeting: String = handle
///     .invoke_as(vec![Box::new("bob".to_owned()) as Box<dyn Any + Send>])
///     .unwrap();
/// assert_eq!("hello bob", greeting);
/// ```
#[derive(Clone)]
pub struct ExecutionHandle {
    bean: DynSvc,
    method: ExecutableMethod,
}

impl ExecutionHandle {
    pub(crate) fn new(bean: DynSvc, method: ExecutableMethod) -> Self {
        ExecutionHandle { bean, method }
    }

    /// The method this handle invokes.
    #[must_use]
    pub fn method(&self) -> &ExecutableMethod {
        &self.method
    }

    /// The bean this handle invokes the method on.
    #[must_use]
    pub fn bean(&self) -> &DynSvc {
        &self.bean
    }

    /// Invokes the method, returning its type-erased result.
    pub fn invoke(
        &self,
        arguments: Vec<Box<dyn Any + Send>>,
    ) -> InjectResult<Box<dyn Any + Send>> {
        self.method.invoke(self.bean.as_ref(), arguments)
    }

    /// Invokes the method and downcasts its result to `R`.
    pub fn invoke_as<R: Any>(
        &self,
        arguments: Vec<Box<dyn Any + Send>>,
    ) -> InjectResult<R> {
        let output = self.invoke(arguments)?;
        output.downcast::<R>().map(|output| *output).map_err(|_| {
            InjectError::Execution {
                bean_type: self.method.declaring_type,
                method: self.method.name.to_string(),
                message: format!(
                    "the method does not return {}",
                    std::any::type_name::<R>()
                ),
            }
        })
    }
}

impl Debug for ExecutionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExecutionHandle").field(&self.method).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Svc;

    struct Counter {
        start: i64,
    }

    impl Counter {
        fn add(&self, amount: i64) -> i64 {
            self.start + amount
        }
    }

    #[test]
    fn executable_methods_dispatch_through_erased_targets() {
        let method = ExecutableMethod::new::<Counter, _, _>("add", Counter::add);
        assert!(method.matches("add", &[BeanType::of::<i64>()]));
        assert_eq!(BeanType::of::<i64>(), method.return_type());

        let bean: DynSvc = Svc::new(Counter { start: 40 });
        let result = method.invoke(bean.as_ref(), vec![Box::new(2_i64) as Box<dyn Any + Send>]).unwrap();
        assert_eq!(42, *result.downcast::<i64>().unwrap());
    }

    #[test]
    fn executable_methods_reject_foreign_targets() {
        let method = ExecutableMethod::new::<Counter, _, _>("add", Counter::add);
        let bean: DynSvc = Svc::new("not a counter");

        match method.invoke(bean.as_ref(), vec![Box::new(2_i64) as Box<dyn Any + Send>]) {
            Err(InjectError::Execution { method, .. }) => assert_eq!("add", method),
            result => panic!("unexpected result: {:?}", result.map(|_| ())),
        }
    }
}
