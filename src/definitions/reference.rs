use crate::{
    BeanDefinition, BeanDefinitionIdentity, BeanType, EnabledCache,
    InjectError, InjectResult, Requires, Service,
};
use std::{
    any::Any,
    borrow::Cow,
    collections::HashSet,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock},
};
use tracing::trace;

/// Answers whether a type is available to the running program.
///
/// Definitions may be compiled against types that are only present in some
/// builds. The class path decides which of them are loadable.
pub trait ClassPath: Send + Sync {
    /// Whether the type named `type_name` is present.
    fn is_present(&self, type_name: &str) -> bool;
}

/// A [`ClassPath`] where every type is present unless it has been listed as
/// absent.
#[derive(Clone, Default, Debug)]
pub struct StaticClassPath {
    absent: HashSet<String>,
}

impl StaticClassPath {
    /// Creates a class path where every type is present.
    #[must_use]
    pub fn new() -> Self {
        StaticClassPath::default()
    }

    /// Marks a type as absent.
    #[must_use]
    pub fn without(mut self, type_name: impl Into<String>) -> Self {
        self.absent.insert(type_name.into());
        self
    }
}

impl ClassPath for StaticClassPath {
    fn is_present(&self, type_name: &str) -> bool {
        !self.absent.contains(type_name)
    }
}

/// A lightweight handle to a [`BeanDefinition`] which is loaded on first use.
///
/// The handle carries enough type information to index it and to check its
/// presence and pre-start requirements without loading the definition.
/// References compare by their definition type name.
pub struct BeanDefinitionReference {
    definition_type_name: Cow<'static, str>,
    bean_type: BeanType,
    exposed: Vec<BeanType>,
    requirements: Vec<Requires>,
    replaces: Vec<BeanType>,
    loader: Option<fn() -> BeanDefinition>,
    present: OnceLock<bool>,
    definition: OnceLock<Arc<BeanDefinition>>,
    pub(crate) enabled: EnabledCache,
    pub(crate) loaded_enabled: EnabledCache,
}

impl BeanDefinitionReference {
    /// Creates a reference to the definition produced by `loader`, declaring
    /// beans of type `T`.
    #[must_use]
    pub fn new<T: Service>(
        definition_type_name: &'static str,
        loader: fn() -> BeanDefinition,
    ) -> Self {
        BeanDefinitionReference {
            definition_type_name: Cow::Borrowed(definition_type_name),
            bean_type: BeanType::of::<T>(),
            exposed: vec![BeanType::of::<T>()],
            requirements: Vec::new(),
            replaces: Vec::new(),
            loader: Some(loader),
            present: OnceLock::new(),
            definition: OnceLock::new(),
            enabled: EnabledCache::default(),
            loaded_enabled: EnabledCache::default(),
        }
    }

    /// Wraps a definition which is already loaded. Both condition phases of
    /// the definition are evaluated when the reference is checked.
    #[must_use]
    pub fn from_definition(definition: BeanDefinition) -> Self {
        let definition = Arc::new(definition);
        BeanDefinitionReference {
            definition_type_name: Cow::Owned(definition.identity().to_string()),
            bean_type: definition.bean_type(),
            exposed: definition.exposed_types().collect(),
            requirements: Vec::new(),
            replaces: definition.replaces().to_vec(),
            loader: None,
            present: OnceLock::new(),
            definition: OnceLock::from(definition),
            enabled: EnabledCache::default(),
            loaded_enabled: EnabledCache::default(),
        }
    }

    /// Declares that the loaded definition can be requested as `I`.
    #[must_use]
    pub fn exposes<I: ?Sized + Any>(mut self) -> Self {
        let bean_type = BeanType::of::<I>();
        if !self.exposed.contains(&bean_type) {
            self.exposed.push(bean_type);
        }
        self
    }

    /// Adds a requirement group. Its pre-start requirements are checked before
    /// the definition is loaded and the rest once it is.
    #[must_use]
    pub fn requires(mut self, requires: Requires) -> Self {
        self.requirements.push(requires);
        self
    }

    /// Declares that the loaded definition replaces beans of type `U`.
    #[must_use]
    pub fn replaces<U: ?Sized + Any>(mut self) -> Self {
        self.replaces.push(BeanType::of::<U>());
        self
    }

    /// The types whose beans the referenced definition replaces.
    #[must_use]
    pub fn replaced_types(&self) -> &[BeanType] {
        &self.replaces
    }

    /// The name of the type that produces the definition.
    #[must_use]
    pub fn definition_type_name(&self) -> &str {
        &self.definition_type_name
    }

    /// The concrete type of the referenced beans.
    #[must_use]
    pub fn bean_type(&self) -> BeanType {
        self.bean_type
    }

    /// The types the referenced definition can be requested as.
    #[must_use]
    pub fn exposed_types(&self) -> &[BeanType] {
        &self.exposed
    }

    /// Whether the referenced definition can be requested as `bean_type`.
    #[must_use]
    pub fn exposes_type(&self, bean_type: BeanType) -> bool {
        self.exposed.contains(&bean_type)
    }

    /// Requirements declared on the reference itself.
    #[must_use]
    pub fn requirements(&self) -> &[Requires] {
        &self.requirements
    }

    /// Whether the definition was supplied already loaded.
    #[must_use]
    pub fn is_hybrid(&self) -> bool {
        self.loader.is_none()
    }

    /// Whether the bean type and the definition type are both present. The
    /// answer is computed once and reused.
    pub fn is_present(&self, class_path: &dyn ClassPath) -> bool {
        *self.present.get_or_init(|| {
            let present = class_path.is_present(self.bean_type.name())
                && (self.is_hybrid()
                    || class_path.is_present(&self.definition_type_name));
            trace!(
                definition = %self.definition_type_name,
                present,
                "checked bean definition presence"
            );
            present
        })
    }

    /// Loads the referenced definition. The definition is loaded once and
    /// shared afterwards.
    pub fn load(&self) -> InjectResult<Arc<BeanDefinition>> {
        let definition = match self.loader {
            Some(loader) => self.definition.get_or_init(|| {
                trace!(definition = %self.definition_type_name, "loading bean definition");
                let identity = BeanDefinitionIdentity::definition(
                    self.definition_type_name.clone(),
                );
                Arc::new(loader().with_identity(identity))
            }),
            None => self.definition.get().ok_or_else(|| {
                InjectError::Internal(format!(
                    "reference {} has neither a loader nor a definition",
                    self.definition_type_name
                ))
            })?,
        };

        if definition.bean_type() != self.bean_type {
            return Err(InjectError::InvalidBeanType {
                requested: self.bean_type,
                actual: definition.bean_type(),
            });
        }
        Ok(Arc::clone(definition))
    }

    /// Whether the definition has already been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.definition.get().is_some()
    }
}

impl PartialEq for BeanDefinitionReference {
    fn eq(&self, other: &Self) -> bool {
        self.definition_type_name == other.definition_type_name
    }
}

impl Eq for BeanDefinitionReference {}

impl Hash for BeanDefinitionReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.definition_type_name.hash(state);
    }
}

impl std::fmt::Debug for BeanDefinitionReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDefinitionReference")
            .field("definition_type_name", &self.definition_type_name)
            .field("bean_type", &self.bean_type)
            .field("exposed", &self.exposed)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Widget;

    fn widget_definition() -> BeanDefinition {
        BeanDefinition::of(|| Widget).build()
    }

    #[derive(Default)]
    struct CountingClassPath {
        lookups: AtomicUsize,
    }

    impl ClassPath for CountingClassPath {
        fn is_present(&self, _type_name: &str) -> bool {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            false
        }
    }

    #[test]
    fn presence_is_checked_once() {
        let reference = BeanDefinitionReference::new::<Widget>(
            "app::WidgetDefinition",
            widget_definition,
        );
        let class_path = CountingClassPath::default();

        assert!(!reference.is_present(&class_path));
        assert!(!reference.is_present(&class_path));
        assert_eq!(1, class_path.lookups.load(Ordering::SeqCst));
    }

    #[test]
    fn load_is_cached_and_stamps_identity() {
        let reference = BeanDefinitionReference::new::<Widget>(
            "app::WidgetDefinition",
            widget_definition,
        );
        assert!(!reference.is_loaded());

        let first = reference.load().unwrap();
        let second = reference.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            &BeanDefinitionIdentity::definition("app::WidgetDefinition"),
            first.identity()
        );
    }

    #[test]
    fn load_rejects_definitions_of_another_type() {
        let reference = BeanDefinitionReference::new::<String>(
            "app::WidgetDefinition",
            widget_definition,
        );

        match reference.load() {
            Err(InjectError::InvalidBeanType { requested, actual }) => {
                assert_eq!(BeanType::of::<String>(), requested);
                assert_eq!(BeanType::of::<Widget>(), actual);
            }
            result => panic!("unexpected result: {:?}", result.map(|_| ())),
        }
    }

    #[test]
    fn references_compare_by_definition_type_name() {
        let first = BeanDefinitionReference::new::<Widget>(
            "app::WidgetDefinition",
            widget_definition,
        );
        let second = BeanDefinitionReference::new::<String>(
            "app::WidgetDefinition",
            || BeanDefinition::of(String::new).build(),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn static_class_path_reports_absent_types() {
        let class_path = StaticClassPath::new().without("app::Missing");
        assert!(class_path.is_present("app::Widget"));
        assert!(!class_path.is_present("app::Missing"));
    }
}
