use crate::{BeanDefinitionIdentity, BeanRegistration, BeanType, InjectResult, Qualifier};
use dashmap::DashMap;
use parking_lot::{Mutex, ReentrantMutex};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use tracing::{debug, trace};

/// The key of the lookup index: a requested type and qualifier, stamped with
/// the generation of the index it was made for.
///
/// Keys made before [`SingletonScope::clear_lookups`] never match again, so a
/// lookup that chose its candidate before new definitions were registered
/// cannot hide them.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArgumentKey {
    bean_type: BeanType,
    qualifier: Option<Qualifier>,
    generation: u64,
}

impl ArgumentKey {
    /// The requested type.
    #[must_use]
    pub fn bean_type(&self) -> BeanType {
        self.bean_type
    }

    /// The qualifier of the request, if any.
    #[must_use]
    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }
}

type CreationLock = Arc<ReentrantMutex<()>>;

/// The live singletons of a context.
///
/// Registrations are indexed by definition identity and by the requests
/// that resolved to them. A bean is created at most once per identity: the
/// first requester builds it while holding a lock for that identity, and
/// concurrent requesters wait on the same lock and then find the finished
/// registration. The lock is reentrant so that a thread that requests a bean
/// it is already building reaches cycle detection instead of deadlocking.
#[derive(Default)]
pub struct SingletonScope {
    by_identity: DashMap<BeanDefinitionIdentity, BeanRegistration>,
    by_argument: DashMap<ArgumentKey, BeanRegistration>,
    creation_locks: DashMap<BeanDefinitionIdentity, CreationLock>,
    created: Mutex<Vec<BeanRegistration>>,
    generation: AtomicU64,
}

impl SingletonScope {
    /// Creates an empty scope.
    #[must_use]
    pub fn new() -> Self {
        SingletonScope::default()
    }

    /// Creates a lookup key for requests of `bean_type` with `qualifier`
    /// against the current lookup index.
    #[must_use]
    pub fn argument_key(&self, bean_type: BeanType, qualifier: Option<Qualifier>) -> ArgumentKey {
        ArgumentKey {
            bean_type,
            qualifier,
            generation: self.generation.load(Ordering::Acquire),
        }
    }

    /// Finds the registration of the definition with `identity`.
    #[must_use]
    pub fn find_by_identity(
        &self,
        identity: &BeanDefinitionIdentity,
    ) -> Option<BeanRegistration> {
        self.by_identity
            .get(identity)
            .map(|registration| registration.clone())
    }

    /// Finds the registration a request for `key` resolved to before.
    #[must_use]
    pub fn find_by_argument(&self, key: &ArgumentKey) -> Option<BeanRegistration> {
        self.by_argument
            .get(key)
            .map(|registration| registration.clone())
    }

    /// Returns the registration of `identity`, calling `create` to build it
    /// if there is none.
    ///
    /// A failed `create` leaves nothing behind, so the next request builds
    /// the bean again.
    pub fn get_or_create<F>(
        &self,
        identity: &BeanDefinitionIdentity,
        key: Option<ArgumentKey>,
        create: F,
    ) -> InjectResult<BeanRegistration>
    where
        F: FnOnce() -> InjectResult<BeanRegistration>,
    {
        if let Some(registration) = self.find_by_identity(identity) {
            return Ok(registration);
        }

        let lock = self
            .creation_locks
            .entry(identity.clone())
            .or_insert_with(CreationLock::default)
            .clone();
        let result = {
            let _guard = lock.lock();
            match self.find_by_identity(identity) {
                Some(registration) => Ok(registration),
                None => create().map(|registration| {
                    self.register(identity.clone(), key, registration.clone());
                    registration
                }),
            }
        };

        drop(lock);
        // Only the map's clone is left once no requester is waiting.
        self.creation_locks
            .remove_if(identity, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    /// Stores a finished registration.
    pub fn register(
        &self,
        identity: BeanDefinitionIdentity,
        key: Option<ArgumentKey>,
        registration: BeanRegistration,
    ) {
        debug!(
            bean = %registration.identifier(),
            definition = %identity,
            "registered singleton"
        );
        if let Some(key) = key {
            self.index(key, registration.clone());
        }
        self.created.lock().push(registration.clone());
        if let Some(replaced) = self.by_identity.insert(identity, registration) {
            self.created
                .lock()
                .retain(|existing| !existing.ptr_eq(&replaced));
            self.forget_lookups(&replaced);
        }
    }

    /// Remembers that requests for `key` resolve to `registration`. Keys
    /// made before the last [`clear_lookups`](SingletonScope::clear_lookups)
    /// are ignored.
    pub fn index(&self, key: ArgumentKey, registration: BeanRegistration) {
        if key.generation != self.generation.load(Ordering::Acquire) {
            trace!(?key, "ignored stale singleton lookup");
            return;
        }
        trace!(?key, "indexed singleton lookup");
        self.by_argument.insert(key, registration);
    }

    /// Removes the registration of `identity`. The registration is not
    /// closed.
    pub fn remove(&self, identity: &BeanDefinitionIdentity) -> Option<BeanRegistration> {
        let (_, registration) = self.by_identity.remove(identity)?;
        self.forget_lookups(&registration);
        self.created
            .lock()
            .retain(|existing| !existing.ptr_eq(&registration));
        Some(registration)
    }

    /// Forgets every remembered lookup. Registrations are kept. Keys made
    /// before this call no longer match.
    pub fn clear_lookups(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.by_argument.clear();
    }

    /// The live registrations in creation order.
    #[must_use]
    pub fn registrations(&self) -> Vec<BeanRegistration> {
        self.created.lock().clone()
    }

    /// The number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    /// Whether there are no live registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }

    fn forget_lookups(&self, registration: &BeanRegistration) {
        self.by_argument
            .retain(|_, existing| !existing.ptr_eq(registration));
    }
}

impl std::fmt::Debug for SingletonScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingletonScope")
            .field("registrations", &self.by_identity.len())
            .field("lookups", &self.by_argument.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BeanCandidate, BeanDefinition, BeanIdentifier, DynSvc, InjectError, Svc};
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Barrier,
        },
        thread,
        time::Duration,
    };

    struct Pool;

    fn registration() -> BeanRegistration {
        let definition = Arc::new(BeanDefinition::of(|| Pool).build());
        BeanRegistration::new(
            BeanIdentifier::new("pool"),
            BeanCandidate::Definition(definition),
            Svc::new(Pool) as DynSvc,
            Vec::new(),
        )
    }

    fn identity() -> BeanDefinitionIdentity {
        BeanDefinitionIdentity::definition("app::PoolDefinition")
    }

    #[test]
    fn concurrent_requests_create_once() {
        let scope = Arc::new(SingletonScope::new());
        let created = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let scope = Arc::clone(&scope);
                let created = Arc::clone(&created);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    scope
                        .get_or_create(&identity(), None, || {
                            created.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(registration())
                        })
                        .unwrap()
                })
            })
            .collect();

        let registrations: Vec<_> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(1, created.load(Ordering::SeqCst));
        assert!(registrations.iter().all(|r| r.ptr_eq(&registrations[0])));
        assert!(scope.creation_locks.is_empty());
    }

    #[test]
    fn failed_creations_are_retried() {
        let scope = SingletonScope::new();
        let result = scope.get_or_create(&identity(), None, || {
            Err(InjectError::Internal("boom".to_owned()))
        });
        assert!(result.is_err());
        assert!(scope.find_by_identity(&identity()).is_none());

        let registration = scope
            .get_or_create(&identity(), None, || Ok(registration()))
            .unwrap();
        assert!(registration.ptr_eq(&scope.find_by_identity(&identity()).unwrap()));
    }

    #[test]
    fn removal_clears_both_indices() {
        let scope = SingletonScope::new();
        let key = scope.argument_key(BeanType::of::<Pool>(), None);
        scope
            .get_or_create(&identity(), Some(key.clone()), || Ok(registration()))
            .unwrap();
        assert!(scope.find_by_argument(&key).is_some());
        assert_eq!(1, scope.registrations().len());

        assert!(scope.remove(&identity()).is_some());
        assert!(scope.find_by_argument(&key).is_none());
        assert!(scope.registrations().is_empty());
        assert!(scope.is_empty());
    }

    #[test]
    fn keys_made_before_a_clear_are_not_indexed() {
        let scope = SingletonScope::new();
        let stale = scope.argument_key(BeanType::of::<Pool>(), None);
        let registration = scope
            .get_or_create(&identity(), None, || Ok(registration()))
            .unwrap();

        // A lookup that chose its candidate before the clear indexes late.
        scope.clear_lookups();
        scope.index(stale.clone(), registration.clone());

        let current = scope.argument_key(BeanType::of::<Pool>(), None);
        assert_ne!(stale, current);
        assert!(scope.find_by_argument(&stale).is_none());
        assert!(scope.find_by_argument(&current).is_none());

        scope.index(current.clone(), registration);
        assert!(scope.find_by_argument(&current).is_some());
    }
}
