use crate::{BeanContext, BeanType, BoxError, Environment};

/// Which requirements are evaluated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ConditionPhase {
    /// Requirements decidable without loading any definition: property,
    /// environment and class checks.
    PreStart,
    /// Requirements that inspect other beans, custom conditions, and property
    /// checks whose values contain placeholders.
    PostStart,
    /// Both phases.
    All,
}

impl ConditionPhase {
    pub(crate) fn includes_pre_start(self) -> bool {
        matches!(self, ConditionPhase::PreStart | ConditionPhase::All)
    }

    pub(crate) fn includes_post_start(self) -> bool {
        matches!(self, ConditionPhase::PostStart | ConditionPhase::All)
    }
}

/// What a condition can see while it is evaluated.
pub struct ConditionContext<'a> {
    context: &'a BeanContext,
    component: &'a str,
    component_type: BeanType,
    reasons: Vec<String>,
}

impl<'a> ConditionContext<'a> {
    pub(crate) fn new(
        context: &'a BeanContext,
        component: &'a str,
        component_type: BeanType,
    ) -> Self {
        ConditionContext {
            context,
            component,
            component_type,
            reasons: Vec::new(),
        }
    }

    /// The context the component belongs to.
    #[must_use]
    pub fn bean_context(&self) -> &'a BeanContext {
        self.context
    }

    /// The environment of the context.
    #[must_use]
    pub fn environment(&self) -> &'a Environment {
        self.context.environment()
    }

    /// A description of the component being checked.
    #[must_use]
    pub fn component(&self) -> &str {
        self.component
    }

    /// The bean type of the component being checked.
    #[must_use]
    pub fn component_type(&self) -> BeanType {
        self.component_type
    }

    /// Records why the component is disabled.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.reasons.push(reason.into());
    }

    /// The reasons recorded so far.
    #[must_use]
    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub(crate) fn into_reasons(self) -> Vec<String> {
        self.reasons
    }
}

/// A custom requirement.
///
/// ```
/// use bean_context::{BoxError, Condition, ConditionContext};
///
/// struct HasWorkers;
///
/// impl Condition for HasWorkers {
///     fn matches(&self, context: &ConditionContext<'_>) -> Result<bool, BoxError> {
///         let workers: Option<u32> = context.environment().get_as("workers")?;
///         Ok(workers.unwrap_or(0) > 0)
///     }
/// }
/// ```
pub trait Condition: Send + Sync {
    /// Whether the component may be used. An error aborts the lookup that
    /// triggered the evaluation.
    fn matches(&self, context: &ConditionContext<'_>) -> Result<bool, BoxError>;

    /// A description of this condition used in failure reasons.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_owned()
    }
}

pub(crate) struct FnCondition<F> {
    pub(crate) condition: F,
}

impl<F> Condition for FnCondition<F>
where
    F: Fn(&ConditionContext<'_>) -> bool + Send + Sync,
{
    fn matches(&self, context: &ConditionContext<'_>) -> Result<bool, BoxError> {
        Ok((self.condition)(context))
    }

    fn describe(&self) -> String {
        "custom condition".to_owned()
    }
}
