use crate::{Argument, BeanType, InjectError, InjectResult};
use std::{
    borrow::Cow,
    fmt::{Display, Formatter},
};

/// Which member of a bean an injection goes through.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SegmentKind {
    /// A constructor argument.
    Constructor,
    /// A field.
    Field,
    /// A method argument.
    Method,
}

/// One injection in progress: an argument of a member of a bean.
#[derive(Clone, Debug)]
pub struct Segment {
    kind: SegmentKind,
    declaring: BeanType,
    proxy: bool,
    member: Cow<'static, str>,
    argument: Cow<'static, str>,
    argument_type: &'static str,
}

impl Segment {
    /// Describes the injection of `argument` into a member of `declaring`.
    #[must_use]
    pub fn new(
        kind: SegmentKind,
        declaring: BeanType,
        member: impl Into<Cow<'static, str>>,
        argument: &Argument,
    ) -> Self {
        Segment {
            kind,
            declaring,
            proxy: false,
            member: member.into(),
            argument: Cow::Owned(argument.name().to_owned()),
            argument_type: argument.type_name(),
        }
    }

    /// Marks the declaring bean as a proxy.
    #[must_use]
    pub fn for_proxy(mut self, proxy: bool) -> Self {
        self.proxy = proxy;
        self
    }

    /// The kind of member.
    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    /// The bean the member belongs to.
    #[must_use]
    pub fn declaring_type(&self) -> BeanType {
        self.declaring
    }

    /// Whether the declaring bean is a proxy.
    #[must_use]
    pub fn is_proxy(&self) -> bool {
        self.proxy
    }

    /// The name of the member.
    #[must_use]
    pub fn member(&self) -> &str {
        &self.member
    }

    /// The name of the argument.
    #[must_use]
    pub fn argument(&self) -> &str {
        &self.argument
    }
}

/// Segments are the same injection when they describe the same argument of
/// the same member, whether or not the declaring bean is a proxy.
impl PartialEq for Segment {
    fn eq(&self, other: &Self) -> bool {
        self.declaring == other.declaring
            && self.kind == other.kind
            && self.member == other.member
            && self.argument == other.argument
            && self.argument_type == other.argument_type
    }
}

impl Eq for Segment {}

impl Display for Segment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let declaring = self.declaring.simple_name();
        let argument_type = BeanTypeName(self.argument_type);
        match self.kind {
            SegmentKind::Constructor => {
                write!(f, "new {declaring}([{argument_type} {}])", self.argument)
            }
            SegmentKind::Field => {
                write!(f, "{declaring}.{} : {argument_type}", self.member)
            }
            SegmentKind::Method => write!(
                f,
                "{declaring}.{}([{argument_type} {}])",
                self.member, self.argument
            ),
        }
    }
}

/// Shortens every path inside a type name, keeping generic parameters.
struct BeanTypeName(&'static str);

impl Display for BeanTypeName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut word = String::new();
        for c in self.0.chars() {
            if c.is_alphanumeric() || c == '_' || c == ':' {
                word.push(c);
            } else {
                f.write_str(last_path_part(&word))?;
                word.clear();
                write!(f, "{c}")?;
            }
        }
        f.write_str(last_path_part(&word))
    }
}

fn last_path_part(word: &str) -> &str {
    word.rsplit("::").next().unwrap_or(word)
}

/// The stack of injections in progress for one resolution.
#[derive(Clone, Default, Debug)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Path::default()
    }

    /// Pushes a segment.
    ///
    /// Pushing a segment that is already on the path is a circular
    /// dependency, unless the top segment belongs to the same bean type and
    /// exactly one of the two declaring beans is a proxy.
    pub fn push(&mut self, segment: Segment) -> InjectResult<()> {
        if let Some(existing) = self.segments.iter().position(|s| *s == segment) {
            let exempt = self.segments.last().map_or(false, |top| {
                top.declaring == segment.declaring && top.proxy != segment.proxy
            });
            if !exempt {
                return Err(InjectError::CircularDependency {
                    bean_type: segment.declaring,
                    path: self.render_circular(existing, &segment),
                });
            }
        }

        self.segments.push(segment);
        Ok(())
    }

    /// Removes the top segment.
    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }

    /// The top segment.
    #[must_use]
    pub fn peek(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// The segments from the outermost injection inwards.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The number of injections in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether no injection is in progress.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Renders the path as `A --> B --> C`.
    #[must_use]
    pub fn render(&self) -> String {
        self.segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" --> ")
    }

    /// Renders the path followed by `repeated`, with a box that points from
    /// the repeated segment back at its first occurrence:
    ///
    /// ```text
    /// new A([B b]) --> new B([A a]) --> new A([B b])
    /// ^                                 |
    /// |                                 |
    /// +---------------------------------+
    /// ```
    fn render_circular(&self, first: usize, repeated: &Segment) -> String {
        let rendered: Vec<String> = self
            .segments
            .iter()
            .chain(std::iter::once(repeated))
            .map(ToString::to_string)
            .collect();
        let column = |index: usize| {
            rendered[..index]
                .iter()
                .map(|segment| segment.chars().count() + 5)
                .sum::<usize>()
        };
        let start = column(first);
        let end = column(rendered.len() - 1);
        let width = end.saturating_sub(start + 1);

        let indent = " ".repeat(start);
        format!(
            "{chain}\n{indent}^{gap}|\n{indent}|{gap}|\n{indent}+{line}+",
            chain = rendered.join(" --> "),
            gap = " ".repeat(width),
            line = "-".repeat(width),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Svc, Request};

    struct A;
    struct B;

    fn constructor<D: 'static, R: Request>(name: &'static str) -> Segment {
        Segment::new(
            SegmentKind::Constructor,
            BeanType::of::<D>(),
            "new",
            &Argument::of::<R>(0).named(name),
        )
    }

    #[test]
    fn repeated_segments_are_circular() {
        let mut path = Path::new();
        path.push(constructor::<A, Svc<B>>("b")).unwrap();
        path.push(constructor::<B, Svc<A>>("a")).unwrap();

        match path.push(constructor::<A, Svc<B>>("b")) {
            Err(InjectError::CircularDependency { bean_type, path }) => {
                assert_eq!(BeanType::of::<A>(), bean_type);
                let first = path.lines().next().unwrap();
                assert_eq!(
                    "new A([Arc<B> b]) --> new B([Arc<A> a]) --> new A([Arc<B> b])",
                    first
                );
                assert!(path.contains('^'));
                assert!(path.ends_with('+'));
            }
            result => panic!("unexpected result: {result:?}"),
        }
    }

    #[test]
    fn proxies_may_inject_their_target() {
        let mut path = Path::new();
        path.push(constructor::<A, Svc<A>>("target").for_proxy(true))
            .unwrap();
        path.push(constructor::<A, Svc<A>>("target")).unwrap();
        assert_eq!(2, path.len());

        // Only one proxy hop is exempt.
        assert!(path.push(constructor::<A, Svc<A>>("target")).is_err());
    }

    #[test]
    fn render_joins_segments() {
        let mut path = Path::new();
        assert_eq!("", path.render());

        path.push(constructor::<A, Svc<B>>("b")).unwrap();
        path.push(Segment::new(
            SegmentKind::Field,
            BeanType::of::<B>(),
            "a",
            &Argument::of::<Option<Svc<A>>>(0).named("a"),
        ))
        .unwrap();
        assert_eq!("new A([Arc<B> b]) --> B.a : Option<Arc<A>>", path.render());

        assert!(path.pop().is_some());
        assert_eq!(1, path.len());
    }
}
