use crate::{
    BeanContext, BeanDefinition, BeanDefinitionReference, BeanDefinitionRegistry,
    ClassPath, ContextConfiguration, ContextId, ContextInner, ConversionService,
    Environment, EventPublisher, InjectResult, LoggingEventPublisher, Module,
    SingletonScope, StaticClassPath,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::{any::Any, sync::atomic::AtomicBool};
use tracing::warn;

/// A builder for a [`BeanContext`].
#[derive(Default)]
pub struct BeanContextBuilder {
    references: Vec<BeanDefinitionReference>,
    environment: Option<Environment>,
    properties: Vec<(String, Value)>,
    class_path: Option<Box<dyn ClassPath>>,
    event_publisher: Option<Box<dyn EventPublisher>>,
    conversions: ConversionService,
    configuration: Option<ContextConfiguration>,
}

impl BeanContextBuilder {
    /// Registers a definition. Definitions can be requested as every type
    /// they expose.
    pub fn register_definition(&mut self, definition: BeanDefinition) {
        self.references
            .push(BeanDefinitionReference::from_definition(definition));
    }

    /// Registers a reference whose definition is loaded on first use.
    pub fn register_reference(&mut self, reference: BeanDefinitionReference) {
        self.references.push(reference);
    }

    /// Adds every definition, reference and property of a module.
    pub fn add_module(&mut self, module: Module) {
        for definition in module.definitions {
            self.register_definition(definition);
        }
        self.references.extend(module.references);
        self.properties.extend(module.properties);
    }

    /// Sets the environment. Properties set on the builder are applied on top
    /// of it.
    pub fn environment(&mut self, environment: Environment) {
        self.environment = Some(environment);
    }

    /// Sets a single property.
    pub fn property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.push((name.into(), value.into()));
    }

    /// Sets the types considered present. By default every type is.
    pub fn class_path(&mut self, class_path: impl ClassPath + 'static) {
        self.class_path = Some(Box::new(class_path));
    }

    /// Sets the receiver of context events. By default events are logged.
    pub fn event_publisher(&mut self, publisher: impl EventPublisher + 'static) {
        self.event_publisher = Some(Box::new(publisher));
    }

    /// Registers a conversion applied to supplied argument values.
    pub fn converter<S, T, F>(&mut self, converter: F)
    where
        S: Any,
        T: Any + Send,
        F: Fn(&S) -> Option<T> + Send + Sync + 'static,
    {
        self.conversions.add_converter(converter);
    }

    /// Sets the settings of the context instead of reading them from the
    /// environment.
    pub fn configuration(&mut self, configuration: ContextConfiguration) {
        self.configuration = Some(configuration);
    }

    /// Builds the context without starting it.
    #[must_use]
    pub fn build(self) -> BeanContext {
        let environment = self.environment.unwrap_or_default();
        for (name, value) in self.properties {
            environment.set_property(&name, value);
        }

        let configuration = self.configuration.unwrap_or_else(|| {
            ContextConfiguration::from_environment(&environment).unwrap_or_else(|error| {
                warn!(%error, "ignoring invalid context configuration");
                ContextConfiguration::default()
            })
        });

        let registry = BeanDefinitionRegistry::new();
        for reference in self.references {
            registry.register(reference);
        }

        BeanContext::from_inner(ContextInner {
            id: ContextId::next(),
            registry,
            singletons: SingletonScope::new(),
            environment,
            conversions: self.conversions,
            class_path: self
                .class_path
                .unwrap_or_else(|| Box::new(StaticClassPath::new())),
            events: self
                .event_publisher
                .unwrap_or_else(|| Box::new(LoggingEventPublisher)),
            configuration,
            running: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        })
    }

    /// Builds the context and starts it.
    pub fn start(self) -> InjectResult<BeanContext> {
        let context = self.build();
        context.start()?;
        Ok(context)
    }
}
