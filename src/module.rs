use crate::{BeanDefinition, BeanDefinitionReference};
use serde_json::Value;

/// A collection of definitions, references and properties that can be added
/// all at once to a [`BeanContextBuilder`](crate::BeanContextBuilder).
/// Modules group related beans so a context can be configured in pieces.
///
/// For creating a module easily via a domain specific language, see
/// [`define_module!`].
#[derive(Default)]
pub struct Module {
    pub(crate) definitions: Vec<BeanDefinition>,
    pub(crate) references: Vec<BeanDefinitionReference>,
    pub(crate) properties: Vec<(String, Value)>,
}

impl Module {
    /// Adds a definition.
    pub fn register_definition(&mut self, definition: BeanDefinition) {
        self.definitions.push(definition);
    }

    /// Adds a reference whose definition is loaded on first use.
    pub fn register_reference(&mut self, reference: BeanDefinitionReference) {
        self.references.push(reference);
    }

    /// Sets a property. Properties of a module are applied on top of the
    /// environment of the context.
    pub fn property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.push((name.into(), value.into()));
    }
}

/// Defines a new module using a domain specific language.
///
/// # Example
///
/// ```
/// use bean_context::{define_module, interface, BeanContext, BeanDefinition, Service, Svc};
///
/// trait Store: Service {}
/// interface!(Store);
///
/// struct Memory;
/// impl Store for Memory {}
///
/// struct Disk;
/// impl Store for Disk {}
///
/// struct Cache(Vec<Svc<dyn Store>>);
///
/// let module = define_module! {
///     definitions = [
///         BeanDefinition::of(|stores: Vec<Svc<dyn Store>>| Cache(stores)).build(),
///         BeanDefinition::of(|| Memory).exposes::<dyn Store>().build(),
///         BeanDefinition::of(|| Disk).exposes::<dyn Store>().build(),
///     ],
///     properties = {
///         "cache.size" = 64,
///     },
/// };
///
/// let mut builder = BeanContext::builder();
/// builder.add_module(module);
///
/// let context = builder.build();
/// let cache: Svc<Cache> = context.get_bean().unwrap();
/// assert_eq!(2, cache.0.len());
/// assert_eq!(Some(64), context.environment().get_as::<u32>("cache.size").unwrap());
/// ```
#[macro_export]
macro_rules! define_module {
    {
        $($key:tt = $value:tt),*
        $(,)?
    } => {
        {
            #[allow(unused_mut)]
            let mut module = <$crate::Module as ::std::default::Default>::default();
            $($crate::define_module!(@add module, $key = $value);)*
            module
        }
    };
    (
        @add $module:expr,
        definitions = [
            $($definition:expr),*
            $(,)?
        ]
    ) => {
        $($module.register_definition($definition);)*
    };
    (
        @add $module:expr,
        references = [
            $($reference:expr),*
            $(,)?
        ]
    ) => {
        $($module.register_reference($reference);)*
    };
    (
        @add $module:expr,
        properties = {
            $($name:literal = $value:expr),*
            $(,)?
        }
    ) => {
        $($module.property($name, $value);)*
    };
}
