use crate::{BeanType, Qualifier};
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
    sync::Arc,
};

/// The identity of a bean definition inside a singleton scope.
///
/// Delegates and runtime definitions are allocated fresh on each candidate
/// resolution pass, so their identity is derived from what they describe
/// rather than from where they live in memory. Two equal identities always
/// share the same singleton slot.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum BeanDefinitionIdentity {
    /// A definition loaded through a [`BeanDefinitionReference`], identified
    /// by its definition type name.
    ///
    /// [`BeanDefinitionReference`]: crate::BeanDefinitionReference
    Definition(Cow<'static, str>),

    /// A definition supplied programmatically to a running context.
    Runtime {
        /// The type the definition produces.
        bean_type: BeanType,
        /// The name generated for the definition when it was registered.
        name: Arc<str>,
    },

    /// An iterable variant of another definition.
    Delegate {
        /// The identity of the wrapped definition.
        definition: Box<BeanDefinitionIdentity>,
        /// The qualifier which selects this variant.
        qualifier: Qualifier,
    },
}

impl BeanDefinitionIdentity {
    /// Identity of a definition with a stable definition type name.
    #[must_use]
    pub fn definition(name: impl Into<Cow<'static, str>>) -> Self {
        BeanDefinitionIdentity::Definition(name.into())
    }

    pub(crate) fn runtime(bean_type: BeanType, name: &str) -> Self {
        BeanDefinitionIdentity::Runtime {
            bean_type,
            name: Arc::from(name),
        }
    }

    pub(crate) fn delegate(&self, qualifier: Qualifier) -> Self {
        BeanDefinitionIdentity::Delegate {
            definition: Box::new(self.clone()),
            qualifier,
        }
    }

    /// Gets the identity of the static definition behind this identity.
    #[must_use]
    pub fn root(&self) -> &BeanDefinitionIdentity {
        match self {
            BeanDefinitionIdentity::Delegate { definition, .. } => {
                definition.root()
            }
            identity => identity,
        }
    }
}

impl Display for BeanDefinitionIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BeanDefinitionIdentity::Definition(name) => f.write_str(name),
            BeanDefinitionIdentity::Runtime { bean_type, name } => {
                write!(f, "{}#{}", bean_type.simple_name(), name)
            }
            BeanDefinitionIdentity::Delegate {
                definition,
                qualifier,
            } => write!(f, "{definition}[{qualifier}]"),
        }
    }
}

/// The name under which a bean registration is known.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct BeanIdentifier(Arc<str>);

impl BeanIdentifier {
    /// Creates an identifier from a name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        BeanIdentifier(Arc::from(name))
    }

    /// Gets the name of this identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for BeanIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Foo;

    #[test]
    fn runtime_identities_coalesce_by_type_and_name() {
        let first = BeanDefinitionIdentity::runtime(BeanType::of::<Foo>(), "a");
        let second =
            BeanDefinitionIdentity::runtime(BeanType::of::<Foo>(), "a");
        let other = BeanDefinitionIdentity::runtime(BeanType::of::<Foo>(), "b");

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn delegate_identity_compares_wrapped_definition_and_qualifier() {
        let definition = BeanDefinitionIdentity::definition("app::FooDefinition");
        let foo = definition.delegate(Qualifier::by_name("foo"));

        assert_eq!(foo, definition.delegate(Qualifier::by_name("foo")));
        assert_ne!(foo, definition.delegate(Qualifier::by_name("bar")));
        assert_eq!(&definition, foo.root());
    }
}
