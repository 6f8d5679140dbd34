use crate::{BeanCandidate, BeanDefinitionIdentity, BeanType};
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
};

/// Narrows the candidates of a bean request.
///
/// Qualifiers are values: they compare and hash by content so that they can be
/// part of the keys of the singleton scope.
///
/// ```
/// use bean_context::{BeanContext, BeanDefinition, Qualifier, Svc};
///
/// struct Database(&'static str);
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(
///     BeanDefinition::of(|| Database("primary")).named("main").build(),
/// );
/// builder.register_definition(
///     BeanDefinition::of(|| Database("replica")).named("replica").build(),
/// );
///
/// let context = builder.build();
/// let replica: Svc<Database> = context
///     .get_bean_qualified(&Qualifier::by_name("replica"))
///     .unwrap();
/// assert_eq!("replica", replica.0);
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
#[non_exhaustive]
pub enum Qualifier {
    /// Matches candidates with the given name. Candidates without an explicit
    /// name are matched against their derived name.
    Named(Cow<'static, str>),
    /// Matches candidates declaring the given stereotype.
    Stereotype(Cow<'static, str>),
    /// Matches candidates whose concrete type is the given type.
    Type(BeanType),
    /// Keeps only primary candidates.
    Primary,
    /// Matches every candidate.
    Any,
    /// Matches the targets of proxies rather than the proxies themselves.
    ProxyTarget,
    /// Matches exactly one candidate by identity.
    Exact(Box<BeanDefinitionIdentity>),
    /// Matches candidates that satisfy every inner qualifier.
    All(Vec<Qualifier>),
}

impl Qualifier {
    /// Qualifies by name.
    #[must_use]
    pub fn by_name(name: impl Into<Cow<'static, str>>) -> Self {
        Qualifier::Named(name.into())
    }

    /// Qualifies by stereotype.
    #[must_use]
    pub fn by_stereotype(stereotype: impl Into<Cow<'static, str>>) -> Self {
        Qualifier::Stereotype(stereotype.into())
    }

    /// Qualifies by the concrete type of the bean.
    #[must_use]
    pub fn by_type<T: ?Sized + 'static>() -> Self {
        Qualifier::Type(BeanType::of::<T>())
    }

    /// Combines several qualifiers. Nested combinations are flattened.
    #[must_use]
    pub fn all(qualifiers: impl IntoIterator<Item = Qualifier>) -> Self {
        let mut flattened = Vec::new();
        for qualifier in qualifiers {
            match qualifier {
                Qualifier::All(inner) => flattened.extend(inner),
                qualifier => flattened.push(qualifier),
            }
        }
        Qualifier::All(flattened)
    }

    /// Whether one candidate satisfies this qualifier when requested as
    /// `requested`.
    #[must_use]
    pub fn matches(&self, requested: BeanType, candidate: &BeanCandidate) -> bool {
        if candidate.qualifier() == Some(self) {
            return true;
        }

        match self {
            Qualifier::Named(name) => {
                candidate_name(requested, candidate) == name.as_ref()
            }
            Qualifier::Stereotype(stereotype) => candidate
                .definition()
                .stereotypes()
                .iter()
                .any(|declared| declared == stereotype),
            Qualifier::Type(bean_type) => candidate.bean_type() == *bean_type,
            Qualifier::Primary => candidate.is_primary(),
            Qualifier::Any => true,
            Qualifier::ProxyTarget => !candidate.is_proxy(),
            Qualifier::Exact(identity) => candidate.identity() == identity.as_ref(),
            Qualifier::All(qualifiers) => qualifiers
                .iter()
                .all(|qualifier| qualifier.matches(requested, candidate)),
        }
    }

    /// Filters the candidates that satisfy this qualifier, keeping their order.
    #[must_use]
    pub fn reduce(
        &self,
        requested: BeanType,
        candidates: Vec<BeanCandidate>,
    ) -> Vec<BeanCandidate> {
        candidates
            .into_iter()
            .filter(|candidate| self.matches(requested, candidate))
            .collect()
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Qualifier::Named(name) => write!(f, "@Named({name})"),
            Qualifier::Stereotype(stereotype) => write!(f, "@{stereotype}"),
            Qualifier::Type(bean_type) => {
                write!(f, "@Type({})", bean_type.simple_name())
            }
            Qualifier::Primary => f.write_str("@Primary"),
            Qualifier::Any => f.write_str("@Any"),
            Qualifier::ProxyTarget => f.write_str("@ProxyTarget"),
            Qualifier::Exact(identity) => write!(f, "@Exact({identity})"),
            Qualifier::All(qualifiers) => {
                for (index, qualifier) in qualifiers.iter().enumerate() {
                    if index > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{qualifier}")?;
                }
                Ok(())
            }
        }
    }
}

/// The name a candidate answers to when requested as `requested`.
///
/// An explicit name wins. Otherwise the concrete type's simple name is used
/// with the requested type's simple name removed from its end and the first
/// letter lower-cased, so `V8Engine` requested as `dyn Engine` is `v8`.
#[must_use]
pub fn candidate_name(requested: BeanType, candidate: &BeanCandidate) -> String {
    match candidate.name() {
        Some(name) => name.to_owned(),
        None => derive_name(
            candidate.bean_type().simple_name(),
            requested.simple_name(),
        ),
    }
}

fn derive_name(concrete: &str, requested: &str) -> String {
    let stripped = match concrete.strip_suffix(requested) {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => concrete,
    };

    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_names_drop_interface_suffix() {
        assert_eq!("v8", derive_name("V8Engine", "Engine"));
        assert_eq!("engine", derive_name("Engine", "Engine"));
        assert_eq!("sqlDataSource", derive_name("SqlDataSource", "Pool"));
    }

    #[test]
    fn all_flattens_nested_qualifiers() {
        let qualifier = Qualifier::all([
            Qualifier::by_name("a"),
            Qualifier::all([Qualifier::Primary, Qualifier::by_stereotype("Fast")]),
        ]);

        assert_eq!(
            Qualifier::All(vec![
                Qualifier::by_name("a"),
                Qualifier::Primary,
                Qualifier::by_stereotype("Fast"),
            ]),
            qualifier
        );
        assert_eq!("@Named(a) @Primary @Fast", qualifier.to_string());
    }
}
