#![allow(clippy::used_underscore_binding)]

use crate::{BeanType, BoxError, Qualifier};
use derive_more::Display;
use std::error::Error;

/// An error that occurred while resolving, constructing or injecting a bean.
#[derive(Debug, Display)]
#[non_exhaustive]
pub enum InjectError {
    /// No enabled bean definition matches the requested type and qualifier.
    #[display(
        fmt = "no bean of type {} exists{}",
        "bean_type.name()",
        "fmt_qualifier(qualifier.as_ref())"
    )]
    NoSuchBean {
        /// The requested type.
        bean_type: BeanType,
        /// The qualifier used for the request, if any.
        qualifier: Option<Qualifier>,
    },

    /// A dependency of the bean being built has no candidate.
    #[display(
        fmt = "failed to inject {} into {}: no enabled bean of that type exists{}\n\n{}",
        "dependency.name()",
        "bean_type.name()",
        "fmt_reasons(reasons)",
        path
    )]
    MissingDependency {
        /// The bean that declared the dependency.
        bean_type: BeanType,
        /// The dependency that could not be found.
        dependency: BeanType,
        /// Why the candidates of the dependency are disabled, if any exist.
        reasons: Vec<String>,
        /// The rendered resolution path.
        path: String,
    },

    /// More than one candidate remained after qualification and none of them
    /// is primary.
    #[display(
        fmt = "multiple beans of type {} exist and none is primary: {}",
        "bean_type.name()",
        "candidates.join(\", \")"
    )]
    NonUniqueBean {
        /// The requested type.
        bean_type: BeanType,
        /// The names of the remaining candidates.
        candidates: Vec<String>,
    },

    /// A bean depends on itself through the resolution path.
    #[display(
        fmt = "circular dependency detected while resolving {}\n\n{}",
        "bean_type.name()",
        path
    )]
    CircularDependency {
        /// The bean whose segment was pushed twice.
        bean_type: BeanType,
        /// The rendered resolution path.
        path: String,
    },

    /// Every candidate for the request is present but disabled.
    #[display(
        fmt = "bean of type {} is disabled: {}",
        "bean_type.name()",
        "reasons.join(\"; \")"
    )]
    BeanDisabled {
        /// The requested type.
        bean_type: BeanType,
        /// Why the candidates are disabled.
        reasons: Vec<String>,
    },

    /// The factory, a hook or a member lookup failed while creating a bean.
    #[display(fmt = "failed to instantiate {}: {}", "bean_type.name()", message)]
    Instantiation {
        /// The bean being built.
        bean_type: BeanType,
        /// A description of the failure.
        message: String,
        /// The underlying cause.
        source: Option<BoxError>,
    },

    /// A supplied argument value could not be converted to the declared type.
    #[display(
        fmt = "cannot convert value {} of argument [{}] of {} to {}",
        value,
        argument,
        "bean_type.name()",
        "target.name()"
    )]
    ConversionFailed {
        /// The bean being built.
        bean_type: BeanType,
        /// The argument name.
        argument: String,
        /// The offending value.
        value: String,
        /// The declared argument type.
        target: BeanType,
    },

    /// A required parameter value was not supplied.
    #[display(
        fmt = "no value was supplied for argument [{}] of {}",
        argument,
        "bean_type.name()"
    )]
    MissingArgument {
        /// The bean being built.
        bean_type: BeanType,
        /// The argument name.
        argument: String,
    },

    /// A bean instance is not of the type it was requested as.
    #[display(
        fmt = "bean {} cannot be used as {}",
        "actual.name()",
        "requested.name()"
    )]
    InvalidBeanType {
        /// The requested type.
        requested: BeanType,
        /// The type the definition produces.
        actual: BeanType,
    },

    /// A custom condition failed instead of returning a result.
    #[display(fmt = "condition on {} failed: {}", component, source)]
    Condition {
        /// The component whose requirements were evaluated.
        component: String,
        /// The error returned by the condition.
        source: BoxError,
    },

    /// A required property is not set.
    #[display(fmt = "no value is set for property [{}]", name)]
    MissingProperty {
        /// The property key.
        name: String,
    },

    /// A property exists but could not be bound to the requested type.
    #[display(fmt = "failed to bind property [{}]: {}", name, source)]
    PropertyBinding {
        /// The property key or prefix.
        name: String,
        /// The deserialization error.
        source: BoxError,
    },

    /// An executable method was called with the wrong arguments or does not
    /// exist.
    #[display(fmt = "cannot invoke {}::{}: {}", "bean_type.name()", method, message)]
    Execution {
        /// The bean that declares the method.
        bean_type: BeanType,
        /// The method name or index.
        method: String,
        /// A description of the failure.
        message: String,
    },

    /// An unexpected error has occurred. This is usually caused by a bug in
    /// the library itself.
    #[display(fmt = "an unexpected error occurred (please report this): {}", _0)]
    Internal(String),
}

impl Error for InjectError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            InjectError::Instantiation { source, .. } => source
                .as_deref()
                .map(|source| source as &(dyn Error + 'static)),
            InjectError::Condition { source, .. }
            | InjectError::PropertyBinding { source, .. } => {
                Some(source.as_ref())
            }
            _ => None,
        }
    }
}

impl InjectError {
    /// Whether this error means a bean could not be found, as opposed to found
    /// but failing to build.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            InjectError::NoSuchBean { .. } | InjectError::BeanDisabled { .. }
        )
    }

    /// Whether this error means no enabled bean of `bean_type` exists. Errors
    /// raised for the dependencies of such a bean do not count.
    #[must_use]
    pub fn is_not_found_for(&self, bean_type: BeanType) -> bool {
        match self {
            InjectError::NoSuchBean { bean_type: missing, .. }
            | InjectError::BeanDisabled { bean_type: missing, .. } => *missing == bean_type,
            _ => false,
        }
    }

    pub(crate) fn instantiation(
        bean_type: BeanType,
        source: BoxError,
    ) -> Self {
        InjectError::Instantiation {
            bean_type,
            message: source.to_string(),
            source: Some(source),
        }
    }
}

fn fmt_reasons(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(" ({})", reasons.join("; "))
    }
}

fn fmt_qualifier(qualifier: Option<&Qualifier>) -> String {
    match qualifier {
        Some(qualifier) => format!(" for qualifier {qualifier}"),
        None => String::new(),
    }
}
