use crate::{
    ArgumentValue, ArgumentValues, BeanCandidate, BeanDefinitionIdentity,
    BeanRegistration, BeanType, DynSvc, InjectResult, Path, Qualifier, Segment,
};
use std::collections::HashMap;

struct Frame {
    candidate: BeanCandidate,
    arguments: ArgumentValues,
    dependents: Vec<BeanRegistration>,
}

/// The state of one top-level bean request.
///
/// Every nested lookup made while building the requested bean goes through
/// the same resolution context, so cycles across beans show up on its
/// [`Path`]. A resolution context is never shared between threads.
pub struct BeanResolutionContext {
    root: BeanType,
    path: Path,
    frames: Vec<Frame>,
    in_flight: HashMap<BeanDefinitionIdentity, DynSvc>,
}

impl BeanResolutionContext {
    pub(crate) fn new(root: BeanType) -> Self {
        BeanResolutionContext {
            root,
            path: Path::new(),
            frames: Vec::new(),
            in_flight: HashMap::new(),
        }
    }

    /// The type the resolution was started for.
    #[must_use]
    pub fn root_type(&self) -> BeanType {
        self.root
    }

    /// The injections in progress.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The candidate of the bean being built.
    #[must_use]
    pub fn current_candidate(&self) -> Option<&BeanCandidate> {
        self.frames.last().map(|frame| &frame.candidate)
    }

    /// The type of the bean being built, or the root type before any build
    /// has started.
    #[must_use]
    pub fn current_bean_type(&self) -> BeanType {
        self.current_candidate()
            .map_or(self.root, BeanCandidate::bean_type)
    }

    /// The value the caller supplied for the argument `name` of the bean
    /// being built.
    #[must_use]
    pub fn argument_value(&self, name: &str) -> Option<&ArgumentValue> {
        self.frames.last()?.arguments.get(name)
    }

    /// How many beans are being built.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// A snapshot of this resolution.
    #[must_use]
    pub fn info(&self) -> ResolutionInfo {
        ResolutionInfo {
            root: self.root,
            current: self.current_candidate().map(BeanCandidate::bean_type),
            depth: self.frames.len(),
            path: self.path.render(),
        }
    }

    /// The qualifier selecting the iterated bean when the bean being built
    /// is a variant created for each bean of `bean_type`.
    pub(crate) fn each_bean_qualifier(&self, bean_type: BeanType) -> Option<Qualifier> {
        self.current_candidate()?
            .each_bean_source()
            .filter(|source| source.dependent == bean_type)
            .map(|source| source.qualifier.clone())
    }

    /// Runs `resolve` with `segment` on the path. The segment is popped
    /// whether or not `resolve` succeeds.
    pub(crate) fn with_segment<R>(
        &mut self,
        segment: Segment,
        resolve: impl FnOnce(&mut Self) -> InjectResult<R>,
    ) -> InjectResult<R> {
        self.path.push(segment)?;
        let result = resolve(self);
        self.path.pop();
        result
    }

    /// Runs `build` as the build of `candidate`. Returns the result along
    /// with the registrations that became dependents of the built bean.
    pub(crate) fn with_frame<R>(
        &mut self,
        candidate: BeanCandidate,
        arguments: ArgumentValues,
        build: impl FnOnce(&mut Self) -> InjectResult<R>,
    ) -> (InjectResult<R>, Vec<BeanRegistration>) {
        self.frames.push(Frame {
            candidate,
            arguments,
            dependents: Vec::new(),
        });
        let result = build(self);
        let dependents = self
            .frames
            .pop()
            .map(|frame| frame.dependents)
            .unwrap_or_default();
        (result, dependents)
    }

    /// Attaches `registration` to the bean being built so it is closed along
    /// with it.
    pub(crate) fn add_dependent(&mut self, registration: BeanRegistration) {
        if let Some(frame) = self.frames.last_mut() {
            frame.dependents.push(registration);
        }
    }

    pub(crate) fn in_flight(&self, identity: &BeanDefinitionIdentity) -> Option<DynSvc> {
        self.in_flight.get(identity).cloned()
    }

    pub(crate) fn has_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    pub(crate) fn mark_in_flight(&mut self, identity: BeanDefinitionIdentity, bean: DynSvc) {
        self.in_flight.insert(identity, bean);
    }

    pub(crate) fn clear_in_flight(&mut self, identity: &BeanDefinitionIdentity) {
        self.in_flight.remove(identity);
    }
}

/// A snapshot of a resolution, injectable into any bean.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ResolutionInfo {
    root: BeanType,
    current: Option<BeanType>,
    depth: usize,
    path: String,
}

impl ResolutionInfo {
    /// The type the resolution was started for.
    #[must_use]
    pub fn root_type(&self) -> BeanType {
        self.root
    }

    /// The type of the bean being built.
    #[must_use]
    pub fn current_type(&self) -> Option<BeanType> {
        self.current
    }

    /// How many beans were being built.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The rendered path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Argument, BeanDefinition, InjectError, SegmentKind, Svc};
    use std::sync::Arc;

    struct Engine;

    fn segment() -> Segment {
        Segment::new(
            SegmentKind::Constructor,
            BeanType::of::<Engine>(),
            "new",
            &Argument::of::<Svc<Engine>>(0),
        )
    }

    #[test]
    fn segments_are_popped_after_failures() {
        let mut resolution = BeanResolutionContext::new(BeanType::of::<Engine>());
        let result: InjectResult<()> = resolution.with_segment(segment(), |resolution| {
            assert_eq!(1, resolution.path().len());
            Err(InjectError::Internal("boom".to_owned()))
        });

        assert!(result.is_err());
        assert!(resolution.path().is_empty());
    }

    #[test]
    fn frames_expose_the_current_candidate() {
        let definition = Arc::new(BeanDefinition::of(|| Engine).build());
        let mut resolution = BeanResolutionContext::new(BeanType::of::<u8>());
        assert_eq!(BeanType::of::<u8>(), resolution.current_bean_type());

        let values = ArgumentValues::new().with("cylinders", 8_u8);
        let (result, dependents) = resolution.with_frame(
            BeanCandidate::Definition(definition),
            values,
            |resolution| {
                assert_eq!(BeanType::of::<Engine>(), resolution.current_bean_type());
                assert!(resolution.argument_value("cylinders").is_some());
                Ok(resolution.info())
            },
        );

        let info = result.unwrap();
        assert_eq!(1, info.depth());
        assert_eq!(Some(BeanType::of::<Engine>()), info.current_type());
        assert!(dependents.is_empty());
        assert_eq!(0, resolution.depth());
    }
}
