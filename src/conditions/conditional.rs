use crate::{
    BeanContext, BeanDefinition, BeanDefinitionReference, BeanType,
    ConditionContext, ConditionPhase, ContextId, InjectError, InjectResult,
    Requires,
};
use dashmap::DashSet;
use std::cell::RefCell;
use tracing::debug;

thread_local! {
    /// Components whose requirements are being evaluated on this thread.
    static EVALUATING: RefCell<Vec<(ContextId, String)>> = RefCell::new(Vec::new());
}

struct EvaluationGuard;

impl EvaluationGuard {
    /// Marks `component` as being evaluated, or returns `None` if it already
    /// is further up the stack.
    fn enter(context: ContextId, component: &str) -> Option<Self> {
        EVALUATING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack
                .iter()
                .any(|(id, name)| *id == context && name == component)
            {
                return None;
            }
            stack.push((context, component.to_owned()));
            Some(EvaluationGuard)
        })
    }
}

impl Drop for EvaluationGuard {
    fn drop(&mut self) {
        EVALUATING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Remembers the contexts in which a component was found to be enabled.
///
/// Only enabled outcomes are kept. A disabled component is checked again on
/// the next lookup so its reasons are available and a later configuration
/// change can enable it.
#[derive(Default, Debug)]
pub struct EnabledCache {
    enabled: DashSet<ContextId>,
}

impl EnabledCache {
    /// Whether the component was enabled in `context`.
    #[must_use]
    pub fn is_enabled_in(&self, context: ContextId) -> bool {
        self.enabled.contains(&context)
    }

    pub(crate) fn mark_enabled(&self, context: ContextId) {
        self.enabled.insert(context);
    }
}

/// A component that is only usable when its requirements pass.
pub trait Conditional {
    /// Whether the component is enabled in `context`. Failure reasons are
    /// appended to `reasons`.
    fn check(
        &self,
        context: &BeanContext,
        reasons: &mut Vec<String>,
    ) -> InjectResult<bool>;
}

/// Checks the presence of the referenced types, then the pre-start
/// requirements of the reference. A reference wrapping an already loaded
/// definition checks every requirement of that definition instead.
impl Conditional for BeanDefinitionReference {
    fn check(
        &self,
        context: &BeanContext,
        reasons: &mut Vec<String>,
    ) -> InjectResult<bool> {
        if !self.is_present(context.class_path()) {
            reasons.push(format!(
                "Bean definition [{}] is not present",
                self.definition_type_name()
            ));
            return Ok(false);
        }

        if self.is_hybrid() {
            let definition = self.load()?;
            if !evaluate(
                self.requirements(),
                ConditionPhase::All,
                &self.enabled,
                context,
                self.definition_type_name(),
                self.bean_type(),
                reasons,
            )? {
                return Ok(false);
            }
            return definition.check_phase(context, ConditionPhase::All, reasons);
        }

        evaluate(
            self.requirements(),
            ConditionPhase::PreStart,
            &self.enabled,
            context,
            self.definition_type_name(),
            self.bean_type(),
            reasons,
        )
    }
}

impl BeanDefinitionReference {
    /// Checks what could not be checked before `definition` was loaded: the
    /// post-start requirements of the reference, then every requirement of
    /// the definition. Hybrid references were fully checked already.
    pub(crate) fn check_loaded(
        &self,
        definition: &BeanDefinition,
        context: &BeanContext,
        reasons: &mut Vec<String>,
    ) -> InjectResult<bool> {
        if self.is_hybrid() {
            return Ok(true);
        }
        if !evaluate(
            self.requirements(),
            ConditionPhase::PostStart,
            &self.loaded_enabled,
            context,
            self.definition_type_name(),
            self.bean_type(),
            reasons,
        )? {
            return Ok(false);
        }
        definition.check_phase(context, ConditionPhase::All, reasons)
    }
}

/// Checks every requirement of the definition.
impl Conditional for BeanDefinition {
    fn check(
        &self,
        context: &BeanContext,
        reasons: &mut Vec<String>,
    ) -> InjectResult<bool> {
        self.check_phase(context, ConditionPhase::All, reasons)
    }
}

impl BeanDefinition {
    pub(crate) fn check_phase(
        &self,
        context: &BeanContext,
        phase: ConditionPhase,
        reasons: &mut Vec<String>,
    ) -> InjectResult<bool> {
        let component = self.identity().to_string();
        evaluate(
            self.requirements(),
            phase,
            &self.enabled,
            context,
            &component,
            self.bean_type(),
            reasons,
        )
    }
}

fn evaluate(
    requirements: &[Requires],
    phase: ConditionPhase,
    cache: &EnabledCache,
    context: &BeanContext,
    component: &str,
    component_type: BeanType,
    reasons: &mut Vec<String>,
) -> InjectResult<bool> {
    if requirements.is_empty() || cache.is_enabled_in(context.id()) {
        return Ok(true);
    }
    let Some(_guard) = EvaluationGuard::enter(context.id(), component) else {
        reasons.push(format!(
            "Requirements of [{component}] depend on [{component}] itself"
        ));
        return Ok(false);
    };

    let mut condition_context =
        ConditionContext::new(context, component, component_type);
    for requires in requirements {
        match requires.matches(&mut condition_context, phase) {
            Ok(true) => {}
            Ok(false) => {
                let failures = condition_context.into_reasons();
                debug!(component, reasons = ?failures, "bean requirements not met");
                reasons.extend(failures);
                return Ok(false);
            }
            Err(source) => {
                return Err(InjectError::Condition {
                    component: component.to_owned(),
                    source,
                });
            }
        }
    }

    cache.mark_enabled(context.id());
    Ok(true)
}
