use crate::{
    ArgumentValues, BeanCandidate, BeanContext, BeanRegistration,
    BeanResolutionContext, BeanScope, BeanType, ContextEvent, InjectError,
    InjectResult, Interface, Qualifier, Svc,
};
use tracing::{debug, info};

impl BeanContext {
    /// Starts the context. Beans with the [`BeanScope::Context`] scope are
    /// created, along with other singletons if the configuration asks for
    /// eager initialization. Starting a running context has no effect.
    ///
    /// If an eager bean fails to build, the error is returned and the context
    /// is left stopped.
    pub fn start(&self) -> InjectResult<()> {
        let _guard = self.lifecycle().lock();
        if self.is_running() {
            return Ok(());
        }

        info!(
            context = %self.id(),
            definitions = self.registry().len(),
            "starting bean context"
        );
        for candidate in self.eager_candidates()? {
            let mut resolution = BeanResolutionContext::new(candidate.bean_type());
            match self.bean_for_candidate(&mut resolution, &candidate, None, ArgumentValues::new())
            {
                Ok(_) => {}
                Err(InjectError::BeanDisabled { reasons, .. }) => {
                    debug!(candidate = %candidate.identity(), ?reasons, "eager bean is disabled");
                }
                Err(error) => return Err(error),
            }
        }

        self.set_running(true);
        self.publish(&ContextEvent::Startup { context: self.id() });
        Ok(())
    }

    /// Stops the context. Every live singleton is destroyed, most recently
    /// created first. Stopping a context that is not running has no effect.
    pub fn stop(&self) {
        let _guard = self.lifecycle().lock();
        if !self.set_running(false) {
            return;
        }

        info!(context = %self.id(), "stopping bean context");
        for registration in self.singletons().registrations().into_iter().rev() {
            self.destroy_registration(&registration);
        }
        self.singletons().clear_lookups();
        self.publish(&ContextEvent::Shutdown { context: self.id() });
    }

    /// Destroys the one singleton of type `I`, returning it if it was live.
    /// The next request creates a new bean.
    pub fn destroy_bean<I: ?Sized + Interface>(&self) -> InjectResult<Option<Svc<I>>> {
        self.destroy_bean_inner(None)
    }

    /// Destroys the one singleton of type `I` matching `qualifier`.
    pub fn destroy_bean_qualified<I: ?Sized + Interface>(
        &self,
        qualifier: &Qualifier,
    ) -> InjectResult<Option<Svc<I>>> {
        self.destroy_bean_inner(Some(qualifier))
    }

    fn destroy_bean_inner<I: ?Sized + Interface>(
        &self,
        qualifier: Option<&Qualifier>,
    ) -> InjectResult<Option<Svc<I>>> {
        let candidate = match self.select_candidate(BeanType::of::<I>(), qualifier) {
            Ok(candidate) => candidate,
            Err(error) if error.is_not_found() => return Ok(None),
            Err(error) => return Err(error),
        };
        let Some(registration) = self.singletons().find_by_identity(candidate.identity())
        else {
            return Ok(None);
        };

        self.destroy_registration(&registration);
        Self::cast(&candidate, registration.bean().clone()).map(Some)
    }

    /// Removes `registration` from the context and closes it. Returns whether
    /// it was still registered.
    pub fn destroy_registration(&self, registration: &BeanRegistration) -> bool {
        let identity = registration.candidate().identity();
        let registered = self
            .singletons()
            .find_by_identity(identity)
            .map_or(false, |existing| existing.ptr_eq(registration));
        if registered {
            self.singletons().remove(identity);
        }

        registration.close();
        self.publish(&ContextEvent::BeanDestroyed {
            bean_type: registration.bean_type(),
            identifier: registration.identifier().clone(),
        });
        registered
    }

    fn eager_candidates(&self) -> InjectResult<Vec<BeanCandidate>> {
        let configuration = self.configuration();
        let mut seen: Vec<BeanType> = Vec::new();
        let mut eager: Vec<BeanCandidate> = Vec::new();

        for reference in self.registry().references() {
            let bean_type = reference.bean_type();
            if seen.contains(&bean_type) {
                continue;
            }
            seen.push(bean_type);

            for candidate in self.find_candidates(bean_type, None)?.candidates {
                let definition = candidate.definition();
                let is_eager = match definition.scope() {
                    BeanScope::Context => true,
                    BeanScope::Singleton => {
                        configuration.eager_init_singletons
                            || (configuration.eager_init_configuration
                                && definition.is_configuration_properties())
                    }
                    BeanScope::Prototype => false,
                };
                if is_eager
                    && !eager
                        .iter()
                        .any(|known| known.identity() == candidate.identity())
                {
                    eager.push(candidate);
                }
            }
        }

        eager.sort_by_key(BeanCandidate::order);
        Ok(eager)
    }
}
