use crate::{
    candidate_name, BeanCandidate, BeanContext, BeanDefinition,
    BeanDefinitionDelegate, BeanType, Conditional,
    DelegateAttributes, EachBean, EachBeanSource, InjectError, InjectResult,
    Iterable, Qualifier,
};
use std::sync::Arc;
use tracing::{trace, warn};

/// The candidates of one lookup, along with why others were left out.
pub(crate) struct Candidates {
    pub(crate) bean_type: BeanType,
    pub(crate) candidates: Vec<BeanCandidate>,
    pub(crate) reasons: Vec<String>,
}

impl Candidates {
    /// The error returned when no candidate is left.
    pub(crate) fn not_found(self, qualifier: Option<&Qualifier>) -> InjectError {
        if self.reasons.is_empty() {
            InjectError::NoSuchBean {
                bean_type: self.bean_type,
                qualifier: qualifier.cloned(),
            }
        } else {
            InjectError::BeanDisabled {
                bean_type: self.bean_type,
                reasons: self.reasons,
            }
        }
    }
}

impl BeanContext {
    /// Finds the enabled candidates for `bean_type`, expanded into iterable
    /// variants and reduced by `qualifier`, in definition order.
    pub(crate) fn find_candidates(
        &self,
        bean_type: BeanType,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<Candidates> {
        self.find_candidates_excluding(bean_type, qualifier, None)
    }

    /// Whether a bean of `bean_type` other than one of type `excluded` is
    /// enabled.
    pub(crate) fn has_enabled_candidate(
        &self,
        bean_type: BeanType,
        excluded: BeanType,
    ) -> InjectResult<bool> {
        let candidates =
            self.find_candidates_excluding(bean_type, None, Some(excluded))?;
        Ok(!candidates.candidates.is_empty())
    }

    fn find_candidates_excluding(
        &self,
        bean_type: BeanType,
        qualifier: Option<&Qualifier>,
        excluded: Option<BeanType>,
    ) -> InjectResult<Candidates> {
        let mut reasons = Vec::new();
        let definitions = self.enabled_definitions(bean_type, excluded, &mut reasons)?;
        let definitions = self.remove_replaced(definitions, excluded, &mut reasons)?;
        let definitions = hide_proxy_targets(definitions, qualifier);

        let mut candidates = Vec::new();
        for definition in definitions {
            self.expand(definition, &mut candidates, &mut reasons)?;
        }
        if let Some(qualifier) = qualifier {
            candidates = qualifier.reduce(bean_type, candidates);
        }

        trace!(
            bean_type = bean_type.name(),
            candidates = candidates.len(),
            "found bean candidates"
        );
        Ok(Candidates {
            bean_type,
            candidates,
            reasons,
        })
    }

    /// Picks the one candidate a single-bean lookup resolves to.
    pub(crate) fn select_candidate(
        &self,
        bean_type: BeanType,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<BeanCandidate> {
        let found = self.find_candidates(bean_type, qualifier)?;
        match found.candidates.len() {
            0 => Err(found.not_found(qualifier)),
            1 => Ok(found.candidates.into_iter().next().ok_or_else(|| {
                InjectError::Internal("a candidate disappeared".to_owned())
            })?),
            _ => choose(bean_type, qualifier, found.candidates),
        }
    }

    /// Candidates of `bean_type` sorted by order for collection lookups.
    pub(crate) fn ordered_candidates(
        &self,
        bean_type: BeanType,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<Vec<BeanCandidate>> {
        let mut candidates = self.find_candidates(bean_type, qualifier)?.candidates;
        candidates.sort_by_key(BeanCandidate::order);
        Ok(candidates)
    }

    fn enabled_definitions(
        &self,
        bean_type: BeanType,
        excluded: Option<BeanType>,
        reasons: &mut Vec<String>,
    ) -> InjectResult<Vec<Arc<BeanDefinition>>> {
        let mut definitions = Vec::new();
        for reference in self.registry().references_of(bean_type) {
            if Some(reference.bean_type()) == excluded {
                continue;
            }
            if !reference.check(self, reasons)? {
                continue;
            }

            let definition = reference.load()?;
            if !reference.check_loaded(&definition, self, reasons)? {
                continue;
            }

            if !definition.exposes(bean_type) {
                warn!(
                    definition = %definition.identity(),
                    bean_type = bean_type.name(),
                    "definition is indexed under a type it does not expose"
                );
                continue;
            }
            definitions.push(definition);
        }
        Ok(definitions)
    }

    fn remove_replaced(
        &self,
        definitions: Vec<Arc<BeanDefinition>>,
        excluded: Option<BeanType>,
        reasons: &mut Vec<String>,
    ) -> InjectResult<Vec<Arc<BeanDefinition>>> {
        let mut kept = Vec::with_capacity(definitions.len());
        for definition in definitions {
            match self.replacement_of(&definition, excluded)? {
                Some(replacement) => reasons.push(format!(
                    "Bean [{}] is replaced by [{}]",
                    definition.identity(),
                    replacement
                )),
                None => kept.push(definition),
            }
        }
        Ok(kept)
    }

    /// The identity of an enabled definition that replaces `definition`.
    fn replacement_of(
        &self,
        definition: &BeanDefinition,
        excluded: Option<BeanType>,
    ) -> InjectResult<Option<String>> {
        for replaced in definition.exposed_types() {
            for reference in self.registry().replacements_of(replaced) {
                if Some(reference.bean_type()) == excluded
                    || reference.bean_type() == definition.bean_type()
                {
                    continue;
                }
                let mut ignored = Vec::new();
                if !reference.check(self, &mut ignored)? {
                    continue;
                }
                let replacement = reference.load()?;
                if replacement.identity() == definition.identity() {
                    continue;
                }
                if reference.check_loaded(&replacement, self, &mut ignored)? {
                    return Ok(Some(replacement.identity().to_string()));
                }
            }
        }
        Ok(None)
    }

    fn expand(
        &self,
        definition: Arc<BeanDefinition>,
        candidates: &mut Vec<BeanCandidate>,
        reasons: &mut Vec<String>,
    ) -> InjectResult<()> {
        match definition.iterable() {
            None => candidates.push(BeanCandidate::Definition(definition)),
            Some(Iterable::EachProperty { prefix, primary }) => {
                let keys = self.environment().child_keys(prefix);
                if keys.is_empty() {
                    reasons.push(format!(
                        "No configuration exists under [{prefix}] for [{}]",
                        definition.identity()
                    ));
                }
                for key in keys {
                    let attributes = DelegateAttributes {
                        primary: primary.as_ref().map(|primary| *primary == key),
                        qualifier: Some(Qualifier::by_name(key.clone())),
                        configuration_path: Some(format!("{prefix}.{key}")),
                        named: Some(key),
                        each_bean: None,
                    };
                    candidates.push(BeanCandidate::Delegate(Arc::new(
                        BeanDefinitionDelegate::new(Arc::clone(&definition), attributes),
                    )));
                }
            }
            Some(Iterable::EachBean(each_bean)) => {
                let each_bean = *each_bean;
                self.expand_each_bean(definition, each_bean, candidates, reasons)?;
            }
        }
        Ok(())
    }

    fn expand_each_bean(
        &self,
        definition: Arc<BeanDefinition>,
        each_bean: EachBean,
        candidates: &mut Vec<BeanCandidate>,
        reasons: &mut Vec<String>,
    ) -> InjectResult<()> {
        let dependent = each_bean.dependent();
        let sources = self.find_candidates(dependent, None)?;
        if sources.candidates.is_empty() {
            reasons.push(format!(
                "No bean of type [{}] exists for [{}]",
                dependent.name(),
                definition.identity()
            ));
        }

        for source in sources.candidates {
            let attributes = DelegateAttributes {
                named: Some(candidate_name(dependent, &source)),
                primary: Some(source.is_primary()),
                qualifier: Some(Qualifier::Exact(Box::new(source.identity().clone()))),
                configuration_path: source
                    .configuration_path()
                    .or_else(|| definition.configuration_prefix().map(str::to_owned)),
                each_bean: Some(EachBeanSource {
                    dependent,
                    qualifier: Qualifier::Exact(Box::new(source.identity().clone())),
                }),
            };
            candidates.push(BeanCandidate::Delegate(Arc::new(
                BeanDefinitionDelegate::new(Arc::clone(&definition), attributes),
            )));
        }
        Ok(())
    }
}

/// Plain lookups see a proxy instead of the beans it wraps. Lookups for the
/// wrapped beans themselves use [`Qualifier::ProxyTarget`].
fn hide_proxy_targets(
    definitions: Vec<Arc<BeanDefinition>>,
    qualifier: Option<&Qualifier>,
) -> Vec<Arc<BeanDefinition>> {
    if qualifier.map_or(false, targets_proxies) {
        return definitions;
    }

    let proxied: Vec<BeanType> = definitions
        .iter()
        .filter(|definition| definition.is_proxy())
        .map(|definition| definition.bean_type())
        .collect();
    definitions
        .into_iter()
        .filter(|definition| {
            definition.is_proxy() || !proxied.contains(&definition.bean_type())
        })
        .collect()
}

fn targets_proxies(qualifier: &Qualifier) -> bool {
    match qualifier {
        Qualifier::ProxyTarget => true,
        Qualifier::All(qualifiers) => qualifiers.iter().any(targets_proxies),
        _ => false,
    }
}

/// Breaks a tie between several candidates. The first primary candidate
/// wins. Variants of one iterable definition resolve to the first variant
/// when no qualifier narrows them.
fn choose(
    bean_type: BeanType,
    qualifier: Option<&Qualifier>,
    candidates: Vec<BeanCandidate>,
) -> InjectResult<BeanCandidate> {
    if let Some(primary) = candidates.iter().find(|candidate| candidate.is_primary()) {
        return Ok(primary.clone());
    }

    let first = &candidates[0];
    if qualifier.is_none() && candidates[1..].iter().all(|other| first.same_family(other)) {
        return Ok(first.clone());
    }

    Err(InjectError::NonUniqueBean {
        bean_type,
        candidates: candidates
            .iter()
            .map(|candidate| candidate_name(bean_type, candidate))
            .collect(),
    })
}
