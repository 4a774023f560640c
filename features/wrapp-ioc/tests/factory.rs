mod common;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use common::*;
use wrapp_ioc::{
    BindContext, BuildError, Context, ContextFactory, DependencyGraphError, Injected, Instance,
    RegistryBuilder, ResolveError, TypeBuilder, TypeInfo, TypeRegistry,
};

trait AppContext {}
trait OtherContext {}

fn app_context(builder: RegistryBuilder) -> RegistryBuilder {
    builder.add_type(
        TypeBuilder::<dyn AppContext>::interface()
            .property_with_implementation::<dyn Logger, ConsoleLogger>("logger")
            .property::<Service>("service")
            .property::<Auditor>("auditor")
            .property::<MemoryStore>("store"),
    )
}

struct App(Context);
impl BindContext for App {
    type Schema = dyn AppContext;

    fn bind(context: Context) -> Self {
        App(context)
    }
}
impl App {
    fn logger(&self) -> Result<Arc<dyn Logger>, ResolveError> {
        self.0.require("logger")
    }

    fn service(&self) -> Result<Arc<Service>, ResolveError> {
        self.0.require("service")
    }
}

#[derive(Debug)]
struct Other;
impl BindContext for Other {
    type Schema = dyn OtherContext;

    fn bind(_: Context) -> Self {
        Other
    }
}

#[test]
fn bound_context_forwards_to_the_factory() {
    init_tracing();
    let registry = registry(&ConstructionLog::default(), app_context);
    let factory = ContextFactory::builder::<dyn AppContext>(registry)
        .build()
        .unwrap();

    let app = factory.create::<App>().unwrap();
    let service = app.service().unwrap();
    assert!(std::ptr::addr_eq(
        Arc::as_ptr(&service.logger),
        Arc::as_ptr(&app.logger().unwrap())
    ));
    assert!(app.0.factory().is_cached("service"));
}

#[test]
fn context_for_another_schema_is_rejected() {
    init_tracing();
    let registry = registry(&ConstructionLog::default(), app_context);
    let factory = ContextFactory::builder::<dyn AppContext>(registry)
        .build()
        .unwrap();

    let err = factory.create::<Other>().unwrap_err();
    assert!(
        matches!(&err, ResolveError::ContextMismatch { expected, actual }
            if *expected == TypeInfo::of::<dyn OtherContext>() && *actual == TypeInfo::of::<dyn AppContext>()),
        "{err:?}"
    );
}

#[test]
fn bound_instances_are_used_instead_of_constructing() {
    init_tracing();
    let log = ConstructionLog::default();
    let registry = registry(&log, app_context);
    let logger = registry.instance(ConsoleLogger);

    let factory = ContextFactory::builder::<dyn AppContext>(registry)
        .add_instance("logger", logger.clone())
        .build()
        .unwrap();

    assert!(factory.get("logger").unwrap().ptr_eq(&logger));
    let service = factory.require::<Service>("service").unwrap();
    assert_eq!(service.logger.name(), "console");
    assert!(!log.entries().contains(&"ConsoleLogger"));
}

#[test]
fn bound_instances_get_their_properties_injected() {
    init_tracing();
    let log = ConstructionLog::default();
    let registry = registry(&log, app_context);
    let store = registry.instance(MemoryStore {
        logger: Injected::new(),
    });

    let factory = ContextFactory::builder::<dyn AppContext>(registry)
        .add_instance("store", store)
        .validate(true)
        .build()
        .unwrap();

    let store = factory.require::<MemoryStore>("store").unwrap();
    assert!(store.logger.is_injected());
    assert_eq!(store.logger.name(), "console");
    assert_eq!(log.entries(), vec!["ConsoleLogger"]);

    let graph = factory.graph().unwrap();
    let dependencies = &graph.entry("store").unwrap().dependencies;
    assert_eq!(dependencies.len(), 1);
    assert!(dependencies[0].property == "logger" && dependencies[0].injected);
}

#[test]
fn plain_instances_can_be_viewed_as_their_interfaces() {
    init_tracing();
    let log = ConstructionLog::default();
    let factory = ContextFactory::builder::<dyn AppContext>(registry(&log, app_context))
        .add_instance("logger", Instance::new(ConsoleLogger))
        .build()
        .unwrap();

    let logger = factory.require::<dyn Logger>("logger").unwrap();
    let service = factory.require::<Service>("service").unwrap();
    assert!(std::ptr::addr_eq(
        Arc::as_ptr(&service.logger),
        Arc::as_ptr(&logger)
    ));
    assert!(!log.entries().contains(&"ConsoleLogger"));
}

#[test]
fn instances_for_unknown_or_repeated_properties_are_rejected() {
    init_tracing();
    let err = ContextFactory::builder::<dyn AppContext>(registry(
        &ConstructionLog::default(),
        app_context,
    ))
    .add_instance("missing", Instance::new(ConsoleLogger))
    .build()
    .unwrap_err();
    assert!(
        matches!(&err, BuildError::UnknownProperty { property, .. } if property == "missing"),
        "{err:?}"
    );

    let registry = registry(&ConstructionLog::default(), app_context);
    let (first, second) = (registry.instance(ConsoleLogger), registry.instance(ConsoleLogger));
    let err = ContextFactory::builder::<dyn AppContext>(registry)
        .add_instance("logger", first)
        .add_instance("logger", second)
        .build()
        .unwrap_err();
    assert!(
        matches!(&err, BuildError::DuplicateInstance(property) if property == "logger"),
        "{err:?}"
    );
}

struct Ping(#[allow(dead_code)] Arc<Pong>);
struct Pong(#[allow(dead_code)] Arc<Ping>);

fn with_cycle(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .add_type(TypeBuilder::<Ping>::concrete().constructor(|pong: Arc<Pong>| Ping(pong)))
        .add_type(TypeBuilder::<Pong>::concrete().constructor(|ping: Arc<Ping>| Pong(ping)))
        .add_type(
            TypeBuilder::<dyn AppContext>::interface()
                .property::<Ping>("ping")
                .property::<Pong>("pong"),
        )
}

#[test]
fn validation_rejects_constructor_cycles() {
    init_tracing();
    let registry = registry(&ConstructionLog::default(), with_cycle);

    let err = ContextFactory::builder::<dyn AppContext>(registry)
        .validate(true)
        .build()
        .unwrap_err();
    let BuildError::DependencyGraphError(graph_errors) = &err else {
        panic!("Expected a dependency graph error, got {err:?}");
    };
    assert_eq!(graph_errors.errors.len(), 1);
    assert!(matches!(
        &graph_errors.errors[0],
        DependencyGraphError::CircularDependency { chain, .. } if chain == &["ping", "pong", "ping"]
    ));
}

#[test]
fn validation_accepts_injected_cycles() {
    init_tracing();
    let log = ConstructionLog::default();
    let registry = registry(&log, app_context);

    let factory = ContextFactory::builder::<dyn AppContext>(registry)
        .validate(true)
        .build()
        .unwrap();

    // Validation constructs nothing
    assert!(factory.cached_properties().is_empty());
    assert!(log.entries().is_empty());
}

#[test]
fn preload_constructs_every_property() {
    init_tracing();
    let log = ConstructionLog::default();
    let registry = registry(&log, app_context);

    let factory = ContextFactory::builder::<dyn AppContext>(registry)
        .preload(true)
        .build()
        .unwrap();

    assert_eq!(
        factory.cached_properties(),
        vec!["auditor", "logger", "service", "store"]
    );
    assert_eq!(log.entries().len(), 4);
}

#[test]
fn preload_reports_resolution_failures() {
    init_tracing();
    let registry = registry(&ConstructionLog::default(), with_cycle);

    let err = ContextFactory::builder::<dyn AppContext>(registry)
        .preload(true)
        .build()
        .unwrap_err();
    assert!(
        matches!(&err, BuildError::ResolveError(ResolveError::CyclicDependency { .. })),
        "{err:?}"
    );
}

#[test]
fn properties_can_be_inspected_without_constructing() {
    init_tracing();
    let log = ConstructionLog::default();
    let factory = ContextFactory::builder::<dyn AppContext>(registry(&log, app_context))
        .build()
        .unwrap();

    assert_eq!(
        factory.property_names(),
        vec!["logger", "service", "auditor", "store"]
    );
    assert_eq!(
        factory.type_for_property("logger"),
        Some(TypeInfo::of::<dyn Logger>())
    );
    assert_eq!(factory.type_for_property("missing"), None);
    assert_eq!(
        factory.implementation_type_for_property("logger").unwrap(),
        Some(TypeInfo::of::<ConsoleLogger>())
    );

    let graph = factory.graph().unwrap();
    let service = graph.entry("service").unwrap();
    assert_eq!(service.dependencies.len(), 2);
    assert!(service.dependencies[1].injected);

    assert!(log.entries().is_empty());
}

struct Slow;

fn slow_registry(constructed: Arc<AtomicUsize>) -> TypeRegistry {
    TypeRegistry::builder()
        .add_type(TypeBuilder::<Slow>::concrete().constructor(move || {
            constructed.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Slow
        }))
        .add_type(TypeBuilder::<dyn AppContext>::interface().property::<Slow>("slow"))
        .build()
        .unwrap()
}

#[test]
fn concurrent_requests_construct_once() {
    init_tracing();
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = ContextFactory::builder::<dyn AppContext>(slow_registry(constructed.clone()))
        .build()
        .unwrap();

    let instances: Vec<Instance> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let factory = factory.clone();
                scope.spawn(move || factory.get("slow").unwrap())
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    assert_eq!(constructed.load(Ordering::SeqCst), 1);
    assert!(instances.iter().all(|instance| instance.ptr_eq(&instances[0])));
}

#[test]
fn debug_lists_constructed_properties() {
    init_tracing();
    let constructed = Arc::new(AtomicUsize::new(0));
    let factory = ContextFactory::builder::<dyn AppContext>(slow_registry(constructed))
        .build()
        .unwrap();
    factory.get("slow").unwrap();

    let debug = format!("{factory:?}");
    assert!(debug.contains("slow"), "{debug}");
}
