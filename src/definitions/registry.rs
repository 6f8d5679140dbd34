use crate::{BeanDefinitionReference, BeanType};
use parking_lot::RwLock;
use std::{any::TypeId, collections::HashMap, sync::Arc};
use tracing::debug;

/// The references known to a context, in registration order, indexed by the
/// types they expose.
#[derive(Default)]
pub struct BeanDefinitionRegistry {
    state: RwLock<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    references: Vec<Arc<BeanDefinitionReference>>,
    by_type: HashMap<TypeId, Vec<usize>>,
    by_replaced: HashMap<TypeId, Vec<usize>>,
}

impl RegistryState {
    fn lookup(
        &self,
        index: &HashMap<TypeId, Vec<usize>>,
        bean_type: BeanType,
    ) -> Vec<Arc<BeanDefinitionReference>> {
        index
            .get(&bean_type.id())
            .map(|indices| {
                indices
                    .iter()
                    .map(|&index| Arc::clone(&self.references[index]))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl BeanDefinitionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        BeanDefinitionRegistry::default()
    }

    /// Adds a reference. A reference with the same definition type name as
    /// one already registered is ignored and the existing one is returned.
    pub fn register(
        &self,
        reference: BeanDefinitionReference,
    ) -> Arc<BeanDefinitionReference> {
        let mut state = self.state.write();
        if let Some(existing) =
            state.references.iter().find(|existing| ***existing == reference)
        {
            return Arc::clone(existing);
        }

        debug!(
            definition = reference.definition_type_name(),
            bean_type = reference.bean_type().name(),
            "registering bean definition"
        );
        let index = state.references.len();
        let reference = Arc::new(reference);
        for bean_type in reference.exposed_types() {
            state.by_type.entry(bean_type.id()).or_default().push(index);
        }
        for bean_type in reference.replaced_types() {
            state.by_replaced.entry(bean_type.id()).or_default().push(index);
        }
        state.references.push(Arc::clone(&reference));
        reference
    }

    /// The references exposing `bean_type`, in registration order.
    #[must_use]
    pub fn references_of(
        &self,
        bean_type: BeanType,
    ) -> Vec<Arc<BeanDefinitionReference>> {
        let state = self.state.read();
        state.lookup(&state.by_type, bean_type)
    }

    /// The references declaring that they replace `bean_type`.
    #[must_use]
    pub fn replacements_of(
        &self,
        bean_type: BeanType,
    ) -> Vec<Arc<BeanDefinitionReference>> {
        let state = self.state.read();
        state.lookup(&state.by_replaced, bean_type)
    }

    /// Every reference, in registration order.
    #[must_use]
    pub fn references(&self) -> Vec<Arc<BeanDefinitionReference>> {
        self.state.read().references.clone()
    }

    /// The number of registered references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().references.len()
    }

    /// Whether no references are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{interface, BeanDefinition, Service};

    trait Animal: Service {}
    interface!(Animal);

    struct Dog;
    impl Animal for Dog {}

    struct Cat;
    impl Animal for Cat {}

    #[test]
    fn references_are_indexed_by_exposed_type() {
        let registry = BeanDefinitionRegistry::new();
        registry.register(BeanDefinitionReference::from_definition(
            BeanDefinition::of(|| Dog).exposes::<dyn Animal>().build(),
        ));
        registry.register(BeanDefinitionReference::from_definition(
            BeanDefinition::of(|| Cat).exposes::<dyn Animal>().build(),
        ));

        let animals = registry.references_of(BeanType::of::<dyn Animal>());
        assert_eq!(2, animals.len());
        assert_eq!(BeanType::of::<Dog>(), animals[0].bean_type());
        assert_eq!(BeanType::of::<Cat>(), animals[1].bean_type());
        assert_eq!(1, registry.references_of(BeanType::of::<Cat>()).len());
        assert!(registry.references_of(BeanType::of::<String>()).is_empty());
    }

    #[test]
    fn replacements_are_indexed_by_replaced_type() {
        let registry = BeanDefinitionRegistry::new();
        registry.register(BeanDefinitionReference::from_definition(
            BeanDefinition::of(|| Cat).replaces::<Dog>().build(),
        ));

        let replacements = registry.replacements_of(BeanType::of::<Dog>());
        assert_eq!(1, replacements.len());
        assert_eq!(BeanType::of::<Cat>(), replacements[0].bean_type());
        assert!(registry.replacements_of(BeanType::of::<Cat>()).is_empty());
    }

    #[test]
    fn duplicate_definition_names_are_ignored() {
        fn load() -> BeanDefinition {
            BeanDefinition::of(|| Dog).build()
        }

        let registry = BeanDefinitionRegistry::new();
        let first =
            registry.register(BeanDefinitionReference::new::<Dog>("app::DogDefinition", load));
        let second =
            registry.register(BeanDefinitionReference::new::<Dog>("app::DogDefinition", load));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, registry.len());
    }
}
