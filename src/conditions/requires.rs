use crate::{
    BeanType, BoxError, Condition, ConditionContext, ConditionPhase,
    FnCondition,
};
use std::{
    any::Any,
    fmt::{Debug, Formatter},
    sync::Arc,
};

#[derive(Clone, Debug)]
struct PropertyRequirement {
    name: String,
    value: Option<String>,
    not_equals: Option<String>,
    default_value: Option<String>,
}

impl PropertyRequirement {
    fn has_placeholders(&self) -> bool {
        [
            Some(&self.name),
            self.value.as_ref(),
            self.not_equals.as_ref(),
            self.default_value.as_ref(),
        ]
        .into_iter()
        .flatten()
        .any(|text| text.contains("${"))
    }

    fn check(&self, context: &mut ConditionContext<'_>) -> Result<bool, BoxError> {
        let environment = context.environment();
        let name = environment.resolve_placeholders(&self.name)?;
        let actual = match environment.property_string(&name)? {
            Some(actual) => Some(actual),
            None => self
                .default_value
                .as_deref()
                .map(|default| environment.resolve_placeholders(default))
                .transpose()?,
        };

        if let Some(expected) = &self.value {
            let expected = environment.resolve_placeholders(expected)?;
            if actual.as_deref() != Some(expected.as_str()) {
                context.fail(format!(
                    "Required property [{name}] with value [{expected}] not present"
                ));
                return Ok(false);
            }
        }

        if let Some(unexpected) = &self.not_equals {
            let unexpected = environment.resolve_placeholders(unexpected)?;
            if actual.as_deref() == Some(unexpected.as_str()) {
                context.fail(format!(
                    "Property [{name}] with value [{unexpected}] present"
                ));
                return Ok(false);
            }
        } else if self.value.is_none() && actual.is_none() {
            context.fail(format!("Required property [{name}] not present"));
            return Ok(false);
        }

        Ok(true)
    }
}

/// One group of requirements a component declares. Every requirement in the
/// group must pass.
///
/// Property, environment and class requirements are checked before a
/// definition is loaded. Bean requirements, custom conditions, and property
/// requirements that contain `${...}` placeholders wait until it is.
///
/// ```
/// use bean_context::{BeanContext, BeanDefinition, InjectError, Requires, Svc};
///
/// struct Cache;
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(
///     BeanDefinition::of(|| Cache)
///         .requires(Requires::new().property("cache.enabled").value("true"))
///         .build(),
/// );
///
/// let context = builder.build();
/// match context.get_bean::<Cache>() {
///     Err(InjectError::BeanDisabled { reasons, .. }) => {
///         assert!(reasons[0].contains("cache.enabled"));
///     }
///     result => panic!("unexpected result: {:?}", result.map(|_| ())),
/// }
/// ```
#[derive(Clone, Default)]
pub struct Requires {
    properties: Vec<PropertyRequirement>,
    missing_properties: Vec<String>,
    envs: Vec<String>,
    not_envs: Vec<String>,
    classes: Vec<String>,
    missing_classes: Vec<String>,
    beans: Vec<BeanType>,
    missing_beans: Vec<BeanType>,
    conditions: Vec<Arc<dyn Condition>>,
}

impl Requires {
    /// Creates an empty group, which always passes.
    #[must_use]
    pub fn new() -> Self {
        Requires::default()
    }

    /// Requires the property `name` to be set. Refine the requirement with
    /// [`value`](Self::value), [`not_equals`](Self::not_equals) and
    /// [`default_value`](Self::default_value).
    #[must_use]
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(PropertyRequirement {
            name: name.into(),
            value: None,
            not_equals: None,
            default_value: None,
        });
        self
    }

    /// Requires the last property to have `value`.
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        if let Some(property) = self.properties.last_mut() {
            property.value = Some(value.into());
        }
        self
    }

    /// Requires the last property not to have `value`. An unset property
    /// passes.
    #[must_use]
    pub fn not_equals(mut self, value: impl Into<String>) -> Self {
        if let Some(property) = self.properties.last_mut() {
            property.not_equals = Some(value.into());
        }
        self
    }

    /// The value the last property is assumed to have when it is unset.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        if let Some(property) = self.properties.last_mut() {
            property.default_value = Some(value.into());
        }
        self
    }

    /// Requires the property `name` to be unset.
    #[must_use]
    pub fn missing_property(mut self, name: impl Into<String>) -> Self {
        self.missing_properties.push(name.into());
        self
    }

    /// Requires `name` to be one of the active environment names.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.envs.push(name.into());
        self
    }

    /// Requires `name` not to be an active environment name.
    #[must_use]
    pub fn not_env(mut self, name: impl Into<String>) -> Self {
        self.not_envs.push(name.into());
        self
    }

    /// Requires the named type to be present on the class path.
    #[must_use]
    pub fn classes(mut self, type_name: impl Into<String>) -> Self {
        self.classes.push(type_name.into());
        self
    }

    /// Requires the named type to be absent from the class path.
    #[must_use]
    pub fn missing_classes(mut self, type_name: impl Into<String>) -> Self {
        self.missing_classes.push(type_name.into());
        self
    }

    /// Requires an enabled bean of type `T` other than the component itself.
    #[must_use]
    pub fn beans<T: ?Sized + Any>(mut self) -> Self {
        self.beans.push(BeanType::of::<T>());
        self
    }

    /// Requires that no bean of type `T` other than the component itself is
    /// enabled.
    #[must_use]
    pub fn missing_beans<T: ?Sized + Any>(mut self) -> Self {
        self.missing_beans.push(BeanType::of::<T>());
        self
    }

    /// Requires a custom condition to match.
    #[must_use]
    pub fn condition(mut self, condition: Arc<dyn Condition>) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Requires a closure to return `true`.
    #[must_use]
    pub fn condition_fn<F>(self, condition: F) -> Self
    where
        F: Fn(&ConditionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.condition(Arc::new(FnCondition { condition }))
    }

    /// Whether this group declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
            && self.missing_properties.is_empty()
            && self.envs.is_empty()
            && self.not_envs.is_empty()
            && self.classes.is_empty()
            && self.missing_classes.is_empty()
            && self.beans.is_empty()
            && self.missing_beans.is_empty()
            && self.conditions.is_empty()
    }

    /// Checks the requirements of `phase`. The first failing requirement
    /// records its reason on `context` and stops the check.
    pub fn matches(
        &self,
        context: &mut ConditionContext<'_>,
        phase: ConditionPhase,
    ) -> Result<bool, BoxError> {
        if phase.includes_pre_start() && !self.matches_pre_start(context)? {
            return Ok(false);
        }
        if phase.includes_post_start() && !self.matches_post_start(context)? {
            return Ok(false);
        }
        Ok(true)
    }

    fn matches_pre_start(
        &self,
        context: &mut ConditionContext<'_>,
    ) -> Result<bool, BoxError> {
        for property in self.properties.iter().filter(|p| !p.has_placeholders()) {
            if !property.check(context)? {
                return Ok(false);
            }
        }

        let environment = context.environment();
        for name in &self.missing_properties {
            if environment.contains_property(name) {
                context.fail(format!("Property [{name}] present"));
                return Ok(false);
            }
        }

        for name in &self.envs {
            if !environment.is_active(name) {
                context.fail(format!(
                    "Environment [{name}] is not active, active environments are {:?}",
                    environment.active_names()
                ));
                return Ok(false);
            }
        }
        for name in &self.not_envs {
            if environment.is_active(name) {
                context.fail(format!("Disallowed environment [{name}] is active"));
                return Ok(false);
            }
        }

        let class_path = context.bean_context().class_path();
        for type_name in &self.classes {
            if !class_path.is_present(type_name) {
                context.fail(format!("Class [{type_name}] is not present"));
                return Ok(false);
            }
        }
        for type_name in &self.missing_classes {
            if class_path.is_present(type_name) {
                context.fail(format!("Class [{type_name}] is present"));
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn matches_post_start(
        &self,
        context: &mut ConditionContext<'_>,
    ) -> Result<bool, BoxError> {
        for property in self.properties.iter().filter(|p| p.has_placeholders()) {
            if !property.check(context)? {
                return Ok(false);
            }
        }

        let bean_context = context.bean_context();
        let component_type = context.component_type();
        for &bean_type in &self.beans {
            if !bean_context.has_enabled_candidate(bean_type, component_type)? {
                context.fail(format!("No bean of type [{}] present", bean_type.name()));
                return Ok(false);
            }
        }
        for &bean_type in &self.missing_beans {
            if bean_context.has_enabled_candidate(bean_type, component_type)? {
                context.fail(format!(
                    "Existing bean [{}] is present",
                    bean_type.name()
                ));
                return Ok(false);
            }
        }

        for condition in &self.conditions {
            if !condition.matches(context)? {
                context.fail(format!(
                    "Custom condition [{}] did not match",
                    condition.describe()
                ));
                return Ok(false);
            }
        }

        Ok(true)
    }
}

impl Debug for Requires {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Requires")
            .field("properties", &self.properties)
            .field("missing_properties", &self.missing_properties)
            .field("envs", &self.envs)
            .field("not_envs", &self.not_envs)
            .field("classes", &self.classes)
            .field("missing_classes", &self.missing_classes)
            .field("beans", &self.beans)
            .field("missing_beans", &self.missing_beans)
            .field("conditions", &self.conditions.len())
            .finish()
    }
}
