use crate::{BeanCandidate, BeanIdentifier, BeanType, DynSvc};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::debug;

/// A capability for things that release resources when they are destroyed.
pub trait Disposable {
    /// Releases the resources held by this value. Calling this more than once
    /// has no further effect.
    fn dispose(&self);
}

/// A constructed bean together with the candidate that produced it.
///
/// Registrations are shared between the indices of the singleton scope, so
/// cloning one is cheap and every clone refers to the same bean.
#[derive(Clone)]
pub struct BeanRegistration {
    inner: Arc<RegistrationInner>,
}

struct RegistrationInner {
    identifier: BeanIdentifier,
    candidate: BeanCandidate,
    bean: DynSvc,
    dependents: Vec<BeanRegistration>,
    closed: AtomicBool,
}

impl BeanRegistration {
    pub(crate) fn new(
        identifier: BeanIdentifier,
        candidate: BeanCandidate,
        bean: DynSvc,
        dependents: Vec<BeanRegistration>,
    ) -> Self {
        BeanRegistration {
            inner: Arc::new(RegistrationInner {
                identifier,
                candidate,
                bean,
                dependents,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The name of this registration.
    #[must_use]
    pub fn identifier(&self) -> &BeanIdentifier {
        &self.inner.identifier
    }

    /// The candidate which built the bean.
    #[must_use]
    pub fn candidate(&self) -> &BeanCandidate {
        &self.inner.candidate
    }

    /// The concrete type of the bean.
    #[must_use]
    pub fn bean_type(&self) -> BeanType {
        self.inner.candidate.bean_type()
    }

    /// The bean instance.
    #[must_use]
    pub fn bean(&self) -> &DynSvc {
        &self.inner.bean
    }

    /// Registrations destroyed together with this one.
    #[must_use]
    pub fn dependents(&self) -> &[BeanRegistration] {
        &self.inner.dependents
    }

    /// Whether this registration has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Whether two registrations refer to the same bean.
    #[must_use]
    pub fn ptr_eq(&self, other: &BeanRegistration) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Runs the pre-destroy hooks of the bean, then closes its dependents.
    /// Only the first call has any effect.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(
            bean = %self.inner.identifier,
            bean_type = self.bean_type().name(),
            "closing bean registration"
        );
        for hook in self.inner.candidate.definition().pre_destroy_hooks() {
            hook(self.inner.bean.as_ref());
        }
        for dependent in &self.inner.dependents {
            dependent.close();
        }
    }
}

impl Disposable for BeanRegistration {
    fn dispose(&self) {
        self.close();
    }
}

impl std::fmt::Debug for BeanRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanRegistration")
            .field("identifier", &self.inner.identifier)
            .field("bean_type", &self.bean_type())
            .field("closed", &self.is_closed())
            .finish()
    }
}
