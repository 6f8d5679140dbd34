use crate::{
    is_disabled_candidate, BeanCandidate, BeanContext, BeanType, InjectResult, Interface, Svc,
};
use std::{iter::FusedIterator, marker::PhantomData};
use tracing::debug;

/// The beans of one type, created as the stream is consumed.
///
/// The candidates are fixed when the stream is created. Each bean is
/// resolved on its own, so a failure of one bean does not end the stream.
/// Candidates that turn out to be disabled by the time they are built are
/// skipped. A candidate whose dependencies are disabled is an error.
///
/// ```
/// use bean_context::{interface, BeanContext, BeanDefinition, Service, Svc};
///
/// trait Plugin: Service {
///     fn name(&self) -> &'static str;
/// }
/// interface!(Plugin);
///
/// struct Audit;
/// impl Plugin for Audit {
///     fn name(&self) -> &'static str {
///         "audit"
///     }
/// }
///
/// struct Metrics;
/// impl Plugin for Metrics {
///     fn name(&self) -> &'static str {
///         "metrics"
///     }
/// }
///
/// let mut builder = BeanContext::builder();
/// builder.register_definition(
///     BeanDefinition::of(|| Metrics).exposes::<dyn Plugin>().order(2).build(),
/// );
/// builder.register_definition(
///     BeanDefinition::of(|| Audit).exposes::<dyn Plugin>().order(1).build(),
/// );
///
/// let context = builder.build();
/// let names: Vec<_> = context
///     .stream_of_type::<dyn Plugin>()
///     .unwrap()
///     .map(|plugin| plugin.unwrap().name())
///     .collect();
/// assert_eq!(vec!["audit", "metrics"], names);
/// ```
pub struct BeanStream<I: ?Sized + Interface> {
    context: BeanContext,
    candidates: std::vec::IntoIter<BeanCandidate>,
    marker: PhantomData<fn() -> Svc<I>>,
}

impl<I: ?Sized + Interface> BeanStream<I> {
    pub(crate) fn new(context: BeanContext, candidates: Vec<BeanCandidate>) -> Self {
        BeanStream {
            context,
            candidates: candidates.into_iter(),
            marker: PhantomData,
        }
    }

    /// The number of candidates not yet resolved.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.candidates.len()
    }
}

impl<I: ?Sized + Interface> Iterator for BeanStream<I> {
    type Item = InjectResult<Svc<I>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let candidate = self.candidates.next()?;
            match self.context.bean_of_candidate::<I>(&candidate) {
                Err(error) if is_disabled_candidate(&error, BeanType::of::<I>(), &candidate) => {
                    debug!(candidate = %candidate.identity(), %error, "skipping disabled bean");
                }
                result => return Some(result),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.candidates.len()))
    }
}

impl<I: ?Sized + Interface> FusedIterator for BeanStream<I> {}

impl<I: ?Sized + Interface> std::fmt::Debug for BeanStream<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanStream")
            .field("bean_type", &std::any::type_name::<I>())
            .field("remaining", &self.candidates.len())
            .finish()
    }
}
