use crate::{
    BeanDefinition, BeanDefinitionIdentity, BeanScope, BeanType, Exposure,
    Qualifier,
};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};

/// The bean an iterable variant was created for.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct EachBeanSource {
    /// The iterated type.
    pub dependent: BeanType,
    /// The qualifier selecting the iterated bean.
    pub qualifier: Qualifier,
}

/// The attributes an iterable variant carries on top of its definition.
#[derive(Clone, PartialEq, Eq, Default, Debug)]
pub struct DelegateAttributes {
    /// The name of the variant.
    pub named: Option<String>,
    /// Overrides whether the variant is primary.
    pub primary: Option<bool>,
    /// The qualifier selecting the variant.
    pub qualifier: Option<Qualifier>,
    /// Where the variant's configuration lives.
    pub configuration_path: Option<String>,
    /// The bean the variant was created for.
    pub each_bean: Option<EachBeanSource>,
}

/// One iterable variant of a [`BeanDefinition`].
pub struct BeanDefinitionDelegate {
    definition: Arc<BeanDefinition>,
    attributes: DelegateAttributes,
    identity: BeanDefinitionIdentity,
}

impl BeanDefinitionDelegate {
    /// Creates a variant of `definition`.
    #[must_use]
    pub fn new(definition: Arc<BeanDefinition>, attributes: DelegateAttributes) -> Self {
        let qualifier = attributes.qualifier.clone().unwrap_or(Qualifier::Any);
        let identity = definition.identity().delegate(qualifier);
        BeanDefinitionDelegate {
            definition,
            attributes,
            identity,
        }
    }

    /// The wrapped definition.
    #[must_use]
    pub fn definition(&self) -> &Arc<BeanDefinition> {
        &self.definition
    }

    /// The attributes of this variant.
    #[must_use]
    pub fn attributes(&self) -> &DelegateAttributes {
        &self.attributes
    }
}

/// A definition, or a variant of one, that can satisfy a bean request.
#[derive(Clone)]
pub enum BeanCandidate {
    /// A plain definition.
    Definition(Arc<BeanDefinition>),
    /// An iterable variant of a definition.
    Delegate(Arc<BeanDefinitionDelegate>),
}

impl BeanCandidate {
    /// The definition behind this candidate.
    #[must_use]
    pub fn definition(&self) -> &Arc<BeanDefinition> {
        match self {
            BeanCandidate::Definition(definition) => definition,
            BeanCandidate::Delegate(delegate) => &delegate.definition,
        }
    }

    /// The identity of this candidate in the singleton scope.
    #[must_use]
    pub fn identity(&self) -> &BeanDefinitionIdentity {
        match self {
            BeanCandidate::Definition(definition) => definition.identity(),
            BeanCandidate::Delegate(delegate) => &delegate.identity,
        }
    }

    /// The attributes of the variant, if this is one.
    #[must_use]
    pub fn attributes(&self) -> Option<&DelegateAttributes> {
        match self {
            BeanCandidate::Definition(_) => None,
            BeanCandidate::Delegate(delegate) => Some(&delegate.attributes),
        }
    }

    /// The explicit name of this candidate.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.attributes()
            .and_then(|attributes| attributes.named.as_deref())
            .or_else(|| self.definition().name())
    }

    /// Whether this candidate wins ties.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.attributes()
            .and_then(|attributes| attributes.primary)
            .unwrap_or_else(|| self.definition().is_primary())
    }

    /// The qualifier carried by the variant, if this is one.
    #[must_use]
    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.attributes()
            .and_then(|attributes| attributes.qualifier.as_ref())
    }

    /// The iterated bean, if this variant was created for one.
    #[must_use]
    pub fn each_bean_source(&self) -> Option<&EachBeanSource> {
        self.attributes()
            .and_then(|attributes| attributes.each_bean.as_ref())
    }

    /// Where the configuration of this candidate lives.
    #[must_use]
    pub fn configuration_path(&self) -> Option<String> {
        self.attributes()
            .and_then(|attributes| attributes.configuration_path.clone())
            .or_else(|| self.definition().configuration_prefix().map(str::to_owned))
    }

    /// The concrete type of the bean.
    #[must_use]
    pub fn bean_type(&self) -> BeanType {
        self.definition().bean_type()
    }

    /// The scope of the bean.
    #[must_use]
    pub fn scope(&self) -> BeanScope {
        self.definition().scope()
    }

    /// The position of the bean in ordered collections.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.definition().order()
    }

    /// Whether the definition is a proxy.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.definition().is_proxy()
    }

    /// Whether this is an iterable variant.
    #[must_use]
    pub fn is_delegate(&self) -> bool {
        matches!(self, BeanCandidate::Delegate(_))
    }

    /// Whether two candidates are variants of the same iterable definition.
    #[must_use]
    pub fn same_family(&self, other: &BeanCandidate) -> bool {
        self.is_delegate()
            && other.is_delegate()
            && self.identity().root() == other.identity().root()
    }

    pub(crate) fn exposure(&self, bean_type: BeanType) -> Option<&Exposure> {
        self.definition().exposure(bean_type)
    }
}

impl Debug for BeanCandidate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BeanCandidate")
            .field(&self.identity().to_string())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pool;

    #[test]
    fn delegate_attributes_override_definition() {
        let definition = Arc::new(
            BeanDefinition::of(|| Pool)
                .named("default")
                .definition_name("app::PoolDefinition")
                .build(),
        );
        let plain = BeanCandidate::Definition(Arc::clone(&definition));
        let delegate = BeanCandidate::Delegate(Arc::new(BeanDefinitionDelegate::new(
            Arc::clone(&definition),
            DelegateAttributes {
                named: Some("reporting".to_owned()),
                primary: Some(true),
                qualifier: Some(Qualifier::by_name("reporting")),
                configuration_path: Some("pools.reporting".to_owned()),
                each_bean: None,
            },
        )));

        assert_eq!(Some("default"), plain.name());
        assert!(!plain.is_primary());
        assert_eq!(Some("reporting"), delegate.name());
        assert!(delegate.is_primary());
        assert_eq!(Some("pools.reporting".to_owned()), delegate.configuration_path());
        assert_eq!(definition.identity(), delegate.identity().root());
        assert_ne!(plain.identity(), delegate.identity());
    }

    #[test]
    fn variants_of_one_definition_share_a_family() {
        let definition = Arc::new(BeanDefinition::of(|| Pool).build());
        let variant = |name: &str| {
            BeanCandidate::Delegate(Arc::new(BeanDefinitionDelegate::new(
                Arc::clone(&definition),
                DelegateAttributes {
                    qualifier: Some(Qualifier::by_name(name.to_owned())),
                    ..DelegateAttributes::default()
                },
            )))
        };

        let first = variant("a");
        let second = variant("b");
        assert!(first.same_family(&second));
        assert!(!first.same_family(&BeanCandidate::Definition(definition.clone())));
    }
}
