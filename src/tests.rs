use crate::{
    interface, ArgumentValues, BeanContext, BeanDefinition, BeanDefinitionReference,
    BeanName, BeanProvider,
    BeanScope, BeanType, ContextConfiguration, ContextEvent, Environment, InjectError,
    IntoFallible, Param, Qualifier, Requires, Service, Svc,
};
use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier,
    },
    thread,
    time::Duration,
};

#[derive(Default)]
struct Svc1(pub i32);

struct Svc2 {
    pub dep1: Svc<Svc1>,
}

impl Svc2 {
    pub fn new(dep1: Svc<Svc1>) -> Self {
        Svc2 { dep1 }
    }
}

trait Engine: Service {
    fn cylinders(&self) -> u32;
}
interface!(Engine);

struct V6Engine;
impl Engine for V6Engine {
    fn cylinders(&self) -> u32 {
        6
    }
}

struct V8Engine;
impl Engine for V8Engine {
    fn cylinders(&self) -> u32 {
        8
    }
}

fn engines(primary_v8: bool) -> BeanContext {
    let mut builder = BeanContext::builder();
    builder.register_definition(BeanDefinition::of(|| V6Engine).exposes::<dyn Engine>().build());
    let v8 = BeanDefinition::of(|| V8Engine).exposes::<dyn Engine>();
    builder.register_definition(if primary_v8 { v8.primary() } else { v8 }.build());
    builder.build()
}

#[test]
fn can_make_svc2() {
    let mut builder = BeanContext::builder();
    builder.register_definition(BeanDefinition::of(Svc1::default).build());
    builder.register_definition(BeanDefinition::of(Svc2::new).build());

    let context = builder.build();
    let svc2: Svc<Svc2> = context.get_bean().unwrap();
    let svc1: Svc<Svc1> = context.get_bean().unwrap();
    assert!(Svc::ptr_eq(&svc1, &svc2.dep1));
}

#[test]
fn cant_make_svc1_without_definition() {
    let context = BeanContext::builder().build();
    match context.get_bean::<Svc1>() {
        Err(InjectError::NoSuchBean {
            bean_type,
            qualifier: None,
        }) if bean_type == BeanType::of::<Svc1>() => {}
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
    assert!(context.find_bean::<Svc1>().unwrap().is_none());
}

#[test]
fn missing_dependency_names_the_dependent() {
    let mut builder = BeanContext::builder();
    builder.register_definition(BeanDefinition::of(Svc2::new).build());

    let context = builder.build();
    match context.get_bean::<Svc2>() {
        Err(InjectError::MissingDependency {
            bean_type,
            dependency,
            ..
        }) => {
            assert_eq!(BeanType::of::<Svc2>(), bean_type);
            assert_eq!(BeanType::of::<Svc1>(), dependency);
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
}

#[test]
fn singleton_is_created_once_across_threads() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);

    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Svc1(7)
        })
        .build(),
    );
    let context = builder.build();

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let context = context.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                context.get_bean::<Svc1>().unwrap()
            })
        })
        .collect();
    let beans: Vec<Svc<Svc1>> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(1, created.load(Ordering::SeqCst));
    assert!(beans.iter().all(|bean| Svc::ptr_eq(bean, &beans[0])));
}

#[test]
fn prototypes_are_created_per_request() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(Svc1::default)
            .scope(BeanScope::Prototype)
            .build(),
    );
    builder.register_definition(BeanDefinition::of(Svc2::new).build());

    let context = builder.build();
    let first: Svc<Svc1> = context.get_bean().unwrap();
    let second: Svc<Svc1> = context.get_bean().unwrap();
    assert!(!Svc::ptr_eq(&first, &second));

    let svc2: Svc<Svc2> = context.get_bean().unwrap();
    assert!(!Svc::ptr_eq(&first, &svc2.dep1));
}

struct CycleA(#[allow(dead_code)] Svc<CycleB>);
struct CycleB(#[allow(dead_code)] Svc<CycleA>);

#[test]
fn constructor_cycles_are_detected() {
    let mut builder = BeanContext::builder();
    builder.register_definition(BeanDefinition::of(CycleA).build());
    builder.register_definition(BeanDefinition::of(CycleB).build());

    let context = builder.build();
    match context.get_bean::<CycleA>() {
        Err(InjectError::CircularDependency { bean_type, path }) => {
            assert_eq!(BeanType::of::<CycleA>(), bean_type);
            assert!(path.contains(" --> "));
            assert!(path.contains('^'));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }

    // Nothing half-built is left behind.
    assert!(context.find_bean_registration::<CycleA>().unwrap().is_none());
    assert!(context.find_bean_registration::<CycleB>().unwrap().is_none());
}

#[derive(Default)]
struct Left {
    right: Mutex<Option<Svc<Right>>>,
}

#[derive(Default)]
struct Right {
    left: Mutex<Option<Svc<Left>>>,
}

#[test]
fn field_cycles_resolve_to_beans_under_construction() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(Left::default)
            .inject_field("right", |left: &Left, right: Svc<Right>| {
                *left.right.lock() = Some(right);
            })
            .build(),
    );
    builder.register_definition(
        BeanDefinition::of(Right::default)
            .inject_field("left", |right: &Right, left: Svc<Left>| {
                *right.left.lock() = Some(left);
            })
            .build(),
    );

    let context = builder.build();
    let left: Svc<Left> = context.get_bean().unwrap();
    let right = left.right.lock().clone().unwrap();
    let back = right.left.lock().clone().unwrap();
    assert!(Svc::ptr_eq(&left, &back));

    let requested: Svc<Right> = context.get_bean().unwrap();
    assert!(Svc::ptr_eq(&right, &requested));
}

#[test]
fn primary_candidate_wins() {
    let context = engines(true);
    let engine: Svc<dyn Engine> = context.get_bean().unwrap();
    assert_eq!(8, engine.cylinders());
}

#[test]
fn first_registered_primary_wins() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(|| V6Engine).exposes::<dyn Engine>().primary().build(),
    );
    builder.register_definition(
        BeanDefinition::of(|| V8Engine).exposes::<dyn Engine>().primary().build(),
    );

    let context = builder.build();
    let engine: Svc<dyn Engine> = context.get_bean().unwrap();
    assert_eq!(6, engine.cylinders());
}

#[test]
fn ambiguous_candidates_are_reported() {
    let context = engines(false);
    match context.get_bean::<dyn Engine>() {
        Err(InjectError::NonUniqueBean {
            bean_type,
            candidates,
        }) => {
            assert_eq!(BeanType::of::<dyn Engine>(), bean_type);
            assert_eq!(vec!["v6".to_owned(), "v8".to_owned()], candidates);
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }

    assert_eq!(2, context.get_beans_of_type::<dyn Engine>().unwrap().len());
}

#[test]
fn names_qualify_lookups() {
    let context = engines(false);
    let engine: Svc<dyn Engine> = context
        .get_bean_qualified(&Qualifier::by_name("v6"))
        .unwrap();
    assert_eq!(6, engine.cylinders());

    let missing = context.find_bean_qualified::<dyn Engine>(&Qualifier::by_name("v12"));
    assert!(missing.unwrap().is_none());
}

#[test]
fn concrete_types_skip_other_implementations() {
    let context = engines(false);
    let v8: Svc<V8Engine> = context.get_bean().unwrap();
    let as_engine: Svc<dyn Engine> = context
        .get_bean_qualified(&Qualifier::by_name("v8"))
        .unwrap();
    assert_eq!(v8.cylinders(), as_engine.cylinders());
}

struct Greeter {
    message: String,
}

#[test]
fn proxies_hide_their_targets() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(|| Greeter {
            message: "hello".to_owned(),
        })
        .build(),
    );
    builder.register_definition(
        BeanDefinition::of(|target: Svc<Greeter>| Greeter {
            message: format!("[{}]", target.message),
        })
        .qualify(0, Qualifier::ProxyTarget)
        .proxy()
        .build(),
    );

    let context = builder.build();
    let greeter: Svc<Greeter> = context.get_bean().unwrap();
    assert_eq!("[hello]", greeter.message);

    let target: Svc<Greeter> = context.get_bean_qualified(&Qualifier::ProxyTarget).unwrap();
    assert_eq!("hello", target.message);
}

#[test]
fn beans_injecting_their_own_type_need_a_proxy() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(|inner: Svc<Greeter>| Greeter {
            message: format!("[{}]", inner.message),
        })
        .build(),
    );

    let context = builder.build();
    match context.get_bean::<Greeter>() {
        Err(InjectError::CircularDependency { bean_type, path }) => {
            assert_eq!(BeanType::of::<Greeter>(), bean_type);
            assert!(path.contains('^'));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
    assert!(context.find_bean_registration::<Greeter>().unwrap().is_none());
}

#[derive(Debug)]
struct DataSource {
    name: String,
}

fn data_sources(toml: &str) -> BeanContext {
    let mut builder = BeanContext::builder();
    builder.environment(Environment::from_toml_str(toml).unwrap());
    builder.register_definition(
        BeanDefinition::of(|name: BeanName| DataSource { name: name.0 })
            .each_property("datasources")
            .build(),
    );
    builder.build()
}

#[test]
fn each_property_creates_one_bean_per_key() {
    let context = data_sources(
        r#"
        [datasources.foo]
        url = "jdbc:foo"

        [datasources.bar]
        url = "jdbc:bar"
        "#,
    );

    let mut names: Vec<String> = context
        .get_beans_of_type::<DataSource>()
        .unwrap()
        .iter()
        .map(|source| source.name.clone())
        .collect();
    names.sort();
    assert_eq!(vec!["bar".to_owned(), "foo".to_owned()], names);

    let foo: Svc<DataSource> = context
        .get_bean_qualified(&Qualifier::by_name("foo"))
        .unwrap();
    assert_eq!("foo", foo.name);
    let again: Svc<DataSource> = context
        .get_bean_qualified(&Qualifier::by_name("foo"))
        .unwrap();
    assert!(Svc::ptr_eq(&foo, &again));
}

#[test]
fn each_property_without_configuration_is_disabled() {
    let context = data_sources("[other]\nkey = 1");
    match context.get_bean::<DataSource>() {
        Err(InjectError::BeanDisabled { reasons, .. }) => {
            assert!(reasons[0].starts_with("No configuration exists under [datasources]"));
        }
        result => panic!("unexpected result: {:?}", result),
    }
    assert!(context.get_beans_of_type::<DataSource>().unwrap().is_empty());
}

struct Repository {
    source: Svc<DataSource>,
    name: String,
}

#[test]
fn each_bean_follows_its_sources() {
    let mut builder = BeanContext::builder();
    builder.environment(
        Environment::from_toml_str("[datasources.foo]\nx = 1\n[datasources.bar]\nx = 2")
            .unwrap(),
    );
    builder.register_definition(
        BeanDefinition::of(|name: BeanName| DataSource { name: name.0 })
            .each_property_with_primary("datasources", "foo")
            .build(),
    );
    builder.register_definition(
        BeanDefinition::of(|source: Svc<DataSource>, name: BeanName| Repository {
            source,
            name: name.0,
        })
        .each_bean::<DataSource>()
        .build(),
    );

    let context = builder.build();
    let bar: Svc<Repository> = context
        .get_bean_qualified(&Qualifier::by_name("bar"))
        .unwrap();
    assert_eq!("bar", bar.name);
    assert_eq!("bar", bar.source.name);

    let source: Svc<DataSource> = context
        .get_bean_qualified(&Qualifier::by_name("bar"))
        .unwrap();
    assert!(Svc::ptr_eq(&source, &bar.source));

    // The variant of the primary source is primary too.
    let primary: Svc<Repository> = context.get_bean().unwrap();
    assert_eq!("foo", primary.source.name);
    assert_eq!(2, context.get_beans_of_type::<Repository>().unwrap().len());
}

#[test]
fn each_bean_without_sources_is_disabled() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(|source: Svc<DataSource>| Repository {
            name: source.name.clone(),
            source,
        })
        .each_bean::<DataSource>()
        .build(),
    );

    let context = builder.build();
    match context.get_bean::<Repository>() {
        Err(InjectError::BeanDisabled { reasons, .. }) => {
            assert!(reasons[0].starts_with("No bean of type"));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
}

#[test]
fn disabled_beans_report_their_reasons() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(Svc1::default)
            .requires(Requires::new().property("feature.enabled").value("true"))
            .build(),
    );

    let context = builder.build();
    match context.get_bean::<Svc1>() {
        Err(InjectError::BeanDisabled { bean_type, reasons }) => {
            assert_eq!(BeanType::of::<Svc1>(), bean_type);
            assert!(reasons[0].contains("[feature.enabled]"));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
    assert!(!context.contains_bean::<Svc1>().unwrap());
    assert!(context.find_bean::<Svc1>().unwrap().is_none());
}

#[test]
fn disabled_dependencies_fail_the_dependent() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(Svc1::default)
            .requires(Requires::new().property("feature.enabled"))
            .build(),
    );
    builder.register_definition(BeanDefinition::of(Svc2::new).build());

    let context = builder.build();
    match context.get_bean::<Svc2>() {
        Err(InjectError::MissingDependency {
            bean_type,
            dependency,
            reasons,
            ..
        }) => {
            assert_eq!(BeanType::of::<Svc2>(), bean_type);
            assert_eq!(BeanType::of::<Svc1>(), dependency);
            assert!(reasons[0].contains("[feature.enabled]"));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }

    // The dependent itself is enabled, so it is not reported as absent.
    assert!(context.contains_bean::<Svc2>().unwrap());
    assert!(context.find_bean::<Svc2>().is_err());
    assert!(context.get_beans_of_type::<Svc2>().is_err());
    let mut stream = context.stream_of_type::<Svc2>().unwrap();
    assert!(stream.next().unwrap().is_err());
    assert!(stream.next().is_none());
}

struct Gated;

fn gated(requires: Requires) -> BeanContext {
    let mut builder = BeanContext::builder();
    builder.register_reference(
        BeanDefinitionReference::new::<Gated>("app::GatedDefinition", || {
            BeanDefinition::of(|| Gated).build()
        })
        .requires(requires),
    );
    builder.build()
}

#[test]
fn reference_conditions_are_checked_once_loaded() {
    let context = gated(Requires::new().condition_fn(|_| false));
    match context.get_bean::<Gated>() {
        Err(InjectError::BeanDisabled { bean_type, reasons }) => {
            assert_eq!(BeanType::of::<Gated>(), bean_type);
            assert!(reasons[0].starts_with("Custom condition"));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
    assert!(!context.contains_bean::<Gated>().unwrap());

    let context = gated(Requires::new().condition_fn(|_| true));
    assert!(context.get_bean::<Gated>().is_ok());
}

#[test]
fn reference_bean_requirements_follow_the_registry() {
    let context = gated(Requires::new().beans::<Svc1>());
    match context.get_bean::<Gated>() {
        Err(InjectError::BeanDisabled { reasons, .. }) => {
            assert!(reasons[0].contains("No bean of type"));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }

    context.register_bean_definition(BeanDefinition::of(Svc1::default).build());
    assert!(context.get_bean::<Gated>().is_ok());
}

#[test]
fn requirements_read_the_environment() {
    let mut builder = BeanContext::builder();
    builder.property("feature.enabled", "true");
    builder.register_definition(
        BeanDefinition::of(Svc1::default)
            .requires(Requires::new().property("feature.enabled").value("true"))
            .build(),
    );

    let context = builder.build();
    assert!(context.contains_bean::<Svc1>().unwrap());
}

trait Cache: Service {
    fn kind(&self) -> &'static str;
}
interface!(Cache);

struct DefaultCache;
impl Cache for DefaultCache {
    fn kind(&self) -> &'static str {
        "default"
    }
}

struct RedisCache;
impl Cache for RedisCache {
    fn kind(&self) -> &'static str {
        "redis"
    }
}

fn default_cache() -> BeanDefinition {
    BeanDefinition::of(|| DefaultCache)
        .exposes::<dyn Cache>()
        .requires(Requires::new().missing_beans::<dyn Cache>())
        .build()
}

#[test]
fn fallback_beans_apply_without_others() {
    let mut builder = BeanContext::builder();
    builder.register_definition(default_cache());

    let context = builder.build();
    let cache: Svc<dyn Cache> = context.get_bean().unwrap();
    assert_eq!("default", cache.kind());
}

#[test]
fn fallback_beans_step_aside() {
    let mut builder = BeanContext::builder();
    builder.register_definition(default_cache());
    builder.register_definition(BeanDefinition::of(|| RedisCache).exposes::<dyn Cache>().build());

    let context = builder.build();
    let cache: Svc<dyn Cache> = context.get_bean().unwrap();
    assert_eq!("redis", cache.kind());
}

#[test]
fn replacements_remove_replaced_beans() {
    let mut builder = BeanContext::builder();
    builder.register_definition(BeanDefinition::of(|| DefaultCache).exposes::<dyn Cache>().build());
    builder.register_definition(
        BeanDefinition::of(|| RedisCache)
            .exposes::<dyn Cache>()
            .replaces::<DefaultCache>()
            .build(),
    );

    let context = builder.build();
    let cache: Svc<dyn Cache> = context.get_bean().unwrap();
    assert_eq!("redis", cache.kind());

    match context.get_bean::<DefaultCache>() {
        Err(InjectError::BeanDisabled { reasons, .. }) => {
            assert!(reasons[0].contains("is replaced by"));
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
}

#[test]
fn failed_construction_is_retried() {
    #[derive(Debug)]
    struct NotYet;
    impl std::fmt::Display for NotYet {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "not yet")
        }
    }
    impl std::error::Error for NotYet {}

    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let factory = move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(NotYet)
        } else {
            Ok(Svc1(1))
        }
    };

    let mut builder = BeanContext::builder();
    builder.register_definition(BeanDefinition::of(factory.fallible()).build());

    let context = builder.build();
    match context.get_bean::<Svc1>() {
        Err(InjectError::Instantiation { bean_type, .. }) => {
            assert_eq!(BeanType::of::<Svc1>(), bean_type);
        }
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }

    let bean: Svc<Svc1> = context.get_bean().unwrap();
    assert_eq!(1, bean.0);
    assert_eq!(2, attempts.load(Ordering::SeqCst));
}

#[test]
fn hooks_run_around_the_bean_lifetime() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let constructed = Arc::clone(&calls);
    let destroyed = Arc::clone(&calls);

    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(Svc1::default)
            .post_construct(move |_: &Svc1| constructed.lock().push("post construct"))
            .pre_destroy(move |_: &Svc1| destroyed.lock().push("pre destroy"))
            .build(),
    );

    let context = builder.build();
    let first: Svc<Svc1> = context.get_bean().unwrap();
    assert_eq!(vec!["post construct"], *calls.lock());

    let removed = context.destroy_bean::<Svc1>().unwrap().unwrap();
    assert!(Svc::ptr_eq(&first, &removed));
    assert_eq!(vec!["post construct", "pre destroy"], *calls.lock());

    let second: Svc<Svc1> = context.get_bean().unwrap();
    assert!(!Svc::ptr_eq(&first, &second));
    assert!(context.destroy_bean::<Svc2>().unwrap().is_none());
}

#[test]
fn start_creates_context_beans() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);

    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Svc1(3)
        })
        .scope(BeanScope::Context)
        .build(),
    );
    builder.register_definition(BeanDefinition::of(Svc2::new).build());

    let context = builder.start().unwrap();
    assert!(context.is_running());
    assert_eq!(1, created.load(Ordering::SeqCst));
    assert!(context.find_bean_registration::<Svc1>().unwrap().is_some());
    assert!(context.find_bean_registration::<Svc2>().unwrap().is_none());

    context.start().unwrap();
    let _svc2: Svc<Svc2> = context.get_bean().unwrap();
    assert_eq!(1, created.load(Ordering::SeqCst));
}

#[test]
fn eager_singletons_follow_the_configuration() {
    let mut builder = BeanContext::builder();
    builder.configuration(ContextConfiguration {
        eager_init_singletons: true,
        ..ContextConfiguration::default()
    });
    builder.register_definition(BeanDefinition::of(Svc1::default).build());

    let context = builder.start().unwrap();
    assert!(context.find_bean_registration::<Svc1>().unwrap().is_some());
}

#[test]
fn stop_destroys_in_reverse_and_publishes_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&events);
    let order = Arc::new(Mutex::new(Vec::new()));
    let svc1_order = Arc::clone(&order);
    let svc2_order = Arc::clone(&order);

    let mut builder = BeanContext::builder();
    builder.event_publisher(move |event: &ContextEvent| recorded.lock().push(event.clone()));
    builder.register_definition(
        BeanDefinition::of(Svc1::default)
            .pre_destroy(move |_: &Svc1| svc1_order.lock().push("svc1"))
            .build(),
    );
    builder.register_definition(
        BeanDefinition::of(Svc2::new)
            .pre_destroy(move |_: &Svc2| svc2_order.lock().push("svc2"))
            .build(),
    );

    let context = builder.start().unwrap();
    let _svc2: Svc<Svc2> = context.get_bean().unwrap();
    context.stop();
    context.stop();

    assert!(!context.is_running());
    assert_eq!(vec!["svc2", "svc1"], *order.lock());

    let events = events.lock();
    assert_eq!(ContextEvent::Startup { context: context.id() }, events[0]);
    assert_eq!(
        Some(&ContextEvent::Shutdown { context: context.id() }),
        events.last()
    );
    let created = events
        .iter()
        .filter(|event| matches!(event, ContextEvent::BeanCreated { .. }))
        .count();
    let destroyed = events
        .iter()
        .filter(|event| matches!(event, ContextEvent::BeanDestroyed { .. }))
        .count();
    assert_eq!(2, created);
    assert_eq!(2, destroyed);
}

struct Greeting {
    text: String,
}

#[test]
fn supplied_arguments_reach_the_factory() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(|name: Param<String>| Greeting {
            text: format!("hello {}", *name),
        })
        .argument_names(&["name"])
        .build(),
    );

    let context = builder.build();
    let greeting: Svc<Greeting> = context
        .create_bean_with(ArgumentValues::new().with("name", "world".to_owned()))
        .unwrap();
    assert_eq!("hello world", greeting.text);

    match context.create_bean::<Greeting>() {
        Err(InjectError::MissingArgument { argument, .. }) => assert_eq!("name", argument),
        result => panic!("unexpected result: {:?}", result.map(|_| ())),
    }
}

struct Lazy {
    engines: BeanProvider<dyn Engine>,
}

#[test]
fn providers_resolve_on_demand() {
    let mut builder = BeanContext::builder();
    builder.register_definition(
        BeanDefinition::of(|engines: BeanProvider<dyn Engine>| Lazy { engines }).build(),
    );

    let context = builder.build();
    let lazy: Svc<Lazy> = context.get_bean().unwrap();
    assert!(!lazy.engines.is_present().unwrap());
    assert!(lazy.engines.find().unwrap().is_none());

    context.register_bean_definition(
        BeanDefinition::of(|| V8Engine).exposes::<dyn Engine>().build(),
    );
    assert_eq!(8, lazy.engines.get().unwrap().cylinders());
}

#[test]
fn existing_beans_are_injected() {
    let mut builder = BeanContext::builder();
    builder.register_definition(BeanDefinition::of(Svc1::default).build());
    builder.register_definition(
        BeanDefinition::of(Left::default)
            .inject_field("right", |left: &Left, right: Option<Svc<Right>>| {
                *left.right.lock() = right;
            })
            .build(),
    );

    let context = builder.build();
    let left = context.inject(Svc::new(Left::default())).unwrap();
    assert!(left.right.lock().is_none());

    // Beans without a definition are returned as they are.
    let plain = context.inject(Svc::new(Svc2::new(Svc::new(Svc1(5))))).unwrap();
    assert_eq!(5, plain.dep1.0);
}
