use crate::{
    candidate_name, Argument, ArgumentKey, ArgumentValues, BeanCandidate,
    BeanContext, BeanDefinition, BeanIdentifier, BeanRegistration,
    BeanResolutionContext, BeanType, ContextEvent, DynSvc, InjectError,
    InjectResult, InjectionKind, InjectionPoint, Interface, Invocation,
    Qualifier, Segment, SegmentKind, Service, Svc,
};
use std::any::Any;
use tracing::{debug, trace};

impl BeanContext {
    pub(crate) fn resolve_bean<I: ?Sized + Interface>(
        &self,
        resolution: &mut BeanResolutionContext,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<Svc<I>> {
        let bean_type = BeanType::of::<I>();
        // Made before selecting, so a clear in between retires the key.
        let key = self.singletons().argument_key(bean_type, qualifier.cloned());

        // Beans under construction must be found through the resolution.
        if !resolution.has_in_flight() {
            if let Some(registration) = self.singletons().find_by_argument(&key) {
                trace!(bean_type = bean_type.name(), "found remembered lookup");
                return Self::cast(registration.candidate(), registration.bean().clone());
            }
        }

        let candidate = self.select_candidate(bean_type, qualifier)?;
        let bean =
            self.bean_for_candidate(resolution, &candidate, Some(key), ArgumentValues::new())?;
        Self::cast(&candidate, bean)
    }

    pub(crate) fn resolve_optional_bean<I: ?Sized + Interface>(
        &self,
        resolution: &mut BeanResolutionContext,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<Option<Svc<I>>> {
        match self.resolve_bean::<I>(resolution, qualifier) {
            Ok(bean) => Ok(Some(bean)),
            Err(error) if error.is_not_found_for(BeanType::of::<I>()) => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub(crate) fn resolve_beans<I: ?Sized + Interface>(
        &self,
        resolution: &mut BeanResolutionContext,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<Vec<Svc<I>>> {
        let bean_type = BeanType::of::<I>();
        let candidates = self.ordered_candidates(bean_type, qualifier)?;
        let mut beans = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            match self.bean_for_candidate(resolution, &candidate, None, ArgumentValues::new()) {
                Ok(bean) => beans.push(Self::cast(&candidate, bean)?),
                Err(error) if is_disabled_candidate(&error, bean_type, &candidate) => {
                    debug!(
                        candidate = %candidate.identity(),
                        %error,
                        "skipping disabled bean"
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(beans)
    }

    /// Gets the bean of one candidate in a resolution of its own.
    pub(crate) fn bean_of_candidate<I: ?Sized + Interface>(
        &self,
        candidate: &BeanCandidate,
    ) -> InjectResult<Svc<I>> {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<I>());
        let bean =
            self.bean_for_candidate(&mut resolution, candidate, None, ArgumentValues::new())?;
        Self::cast(candidate, bean)
    }

    /// Gets the bean of `candidate`, creating it if its scope has no
    /// instance. `key` is remembered as resolving to a shared bean.
    pub(crate) fn bean_for_candidate(
        &self,
        resolution: &mut BeanResolutionContext,
        candidate: &BeanCandidate,
        key: Option<ArgumentKey>,
        arguments: ArgumentValues,
    ) -> InjectResult<DynSvc> {
        if let Some(bean) = resolution.in_flight(candidate.identity()) {
            trace!(candidate = %candidate.identity(), "found bean under construction");
            return Ok(bean);
        }

        if candidate.scope().is_shared() {
            let registration = self.singletons().get_or_create(
                candidate.identity(),
                key.clone(),
                || self.create_registration(resolution, candidate, arguments),
            )?;
            if let Some(key) = key {
                self.singletons().index(key, registration.clone());
            }
            return Ok(registration.bean().clone());
        }

        let (bean, dependents) = self.build(resolution, candidate, arguments)?;
        if candidate.definition().has_pre_destroy() || !dependents.is_empty() {
            let registration = BeanRegistration::new(
                identifier(candidate),
                candidate.clone(),
                bean.clone(),
                dependents,
            );
            resolution.add_dependent(registration);
        }
        Ok(bean)
    }

    fn create_registration(
        &self,
        resolution: &mut BeanResolutionContext,
        candidate: &BeanCandidate,
        arguments: ArgumentValues,
    ) -> InjectResult<BeanRegistration> {
        let (bean, dependents) = self.build(resolution, candidate, arguments)?;
        let registration =
            BeanRegistration::new(identifier(candidate), candidate.clone(), bean, dependents);
        self.publish(&ContextEvent::BeanCreated {
            bean_type: candidate.bean_type(),
            identifier: registration.identifier().clone(),
        });
        Ok(registration)
    }

    /// Builds a new bean: constructs it, injects its members and runs its
    /// post-construct hooks. Returns the bean along with the registrations
    /// that are closed together with it.
    pub(crate) fn build(
        &self,
        resolution: &mut BeanResolutionContext,
        candidate: &BeanCandidate,
        arguments: ArgumentValues,
    ) -> InjectResult<(DynSvc, Vec<BeanRegistration>)> {
        let definition = candidate.definition();
        debug!(
            candidate = %candidate.identity(),
            bean_type = definition.bean_type().name(),
            depth = resolution.depth(),
            "creating bean"
        );

        let (result, dependents) =
            resolution.with_frame(candidate.clone(), arguments, |resolution| {
                let values = self.resolve_arguments(
                    resolution,
                    definition,
                    SegmentKind::Constructor,
                    "new",
                    definition.constructor_arguments(),
                )?;
                let bean = definition.construct(values)?;
                self.complete(resolution, candidate, bean.clone())?;
                Ok(bean)
            });
        result.map(|bean| (bean, dependents))
    }

    pub(crate) fn inject_existing(
        &self,
        resolution: &mut BeanResolutionContext,
        candidate: &BeanCandidate,
        bean: DynSvc,
    ) -> InjectResult<()> {
        let (result, dependents) =
            resolution.with_frame(candidate.clone(), ArgumentValues::new(), |resolution| {
                self.complete(resolution, candidate, bean)
            });
        if !dependents.is_empty() {
            debug!(
                candidate = %candidate.identity(),
                dependents = dependents.len(),
                "injected bean holds dependents that are not tracked"
            );
        }
        result
    }

    /// Injects the members of a constructed bean and runs its post-construct
    /// hooks. The bean is visible to its own dependencies meanwhile.
    fn complete(
        &self,
        resolution: &mut BeanResolutionContext,
        candidate: &BeanCandidate,
        bean: DynSvc,
    ) -> InjectResult<()> {
        let definition = candidate.definition();
        resolution.mark_in_flight(candidate.identity().clone(), bean.clone());
        let result = self.inject_members(resolution, definition, bean.as_ref()).map(|()| {
            for hook in definition.post_construct_hooks() {
                hook(bean.as_ref());
            }
        });
        resolution.clear_in_flight(candidate.identity());
        result
    }

    fn inject_members(
        &self,
        resolution: &mut BeanResolutionContext,
        definition: &BeanDefinition,
        bean: &dyn Service,
    ) -> InjectResult<()> {
        for point in definition.injection_points() {
            let kind = match point.kind() {
                InjectionKind::Field => SegmentKind::Field,
                InjectionKind::Method => SegmentKind::Method,
            };
            let values = self.resolve_arguments(
                resolution,
                definition,
                kind,
                point.name(),
                point.arguments(),
            )?;
            trace!(member = point.name(), "injecting member");
            match point.invocation() {
                Invocation::Direct(invoker) => {
                    InjectionPoint::invoke_direct(invoker, bean, definition.bean_type(), values)?;
                }
                Invocation::Dispatch(index) => {
                    definition.dispatch(*index, bean, values)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_arguments(
        &self,
        resolution: &mut BeanResolutionContext,
        definition: &BeanDefinition,
        kind: SegmentKind,
        member: &str,
        arguments: &[Argument],
    ) -> InjectResult<Vec<Box<dyn Any + Send>>> {
        let mut values = Vec::with_capacity(arguments.len());
        for argument in arguments {
            let segment = Segment::new(kind, definition.bean_type(), member.to_owned(), argument)
                .for_proxy(definition.is_proxy());
            let value =
                resolution.with_segment(segment, |resolution| argument.resolve(self, resolution))?;
            values.push(value);
        }
        Ok(values)
    }

    pub(crate) fn cast<I: ?Sized + Interface>(
        candidate: &BeanCandidate,
        bean: DynSvc,
    ) -> InjectResult<Svc<I>> {
        let requested = BeanType::of::<I>();
        let invalid = || InjectError::InvalidBeanType {
            requested,
            actual: candidate.bean_type(),
        };
        let exposure = candidate.exposure(requested).ok_or_else(invalid)?;
        let bean = exposure.cast(bean).ok_or_else(invalid)?;
        bean.downcast::<Svc<I>>()
            .map(|bean| *bean)
            .map_err(|_| invalid())
    }
}

fn identifier(candidate: &BeanCandidate) -> BeanIdentifier {
    BeanIdentifier::new(&candidate_name(candidate.bean_type(), candidate))
}

/// Whether building `candidate` for a lookup of `bean_type` failed because the
/// candidate itself turned out to be disabled or missing. Failures of its
/// dependencies do not count.
pub(crate) fn is_disabled_candidate(
    error: &InjectError,
    bean_type: BeanType,
    candidate: &BeanCandidate,
) -> bool {
    error.is_not_found_for(bean_type) || error.is_not_found_for(candidate.bean_type())
}
