use std::{error::Error, sync::Arc};

use tracing_subscriber::EnvFilter;
use wrapp_ioc::{BindContext, Context, ContextFactory, Injected, ResolveError, TypeBuilder, TypeRegistry};

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("wrapp_ioc=debug".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let registry = TypeRegistry::builder()
        .add_type(TypeBuilder::<dyn Logger>::interface())
        .add_type(
            TypeBuilder::<ConsoleLogger>::concrete()
                .implements::<dyn Logger>(|logger| logger as Arc<dyn Logger>)
                .constructor(|| ConsoleLogger),
        )
        .add_type(
            TypeBuilder::<Service>::concrete()
                .constructor(|logger: Arc<dyn Logger>| Service {
                    logger,
                    auditor: Injected::new(),
                })
                .inject::<Auditor>("auditor", |service: &Service| &service.auditor),
        )
        .add_type(
            TypeBuilder::<Auditor>::concrete()
                .constructor(|service: Arc<Service>| Auditor { service }),
        )
        .add_type(
            TypeBuilder::<dyn BaseContext>::interface().property::<dyn Logger>("logger"),
        )
        .add_type(
            TypeBuilder::<dyn AppContext>::interface()
                .extends::<dyn BaseContext>()
                .property_with_implementation::<dyn Logger, ConsoleLogger>("logger")
                .property::<Service>("service")
                .property::<Auditor>("auditor"),
        )
        .build()?;

    let factory = ContextFactory::builder::<dyn AppContext>(registry)
        .validate(true)
        .build()?;
    let app = factory.create::<App>()?;

    let service = app.service()?;
    service.run();
    println!("{:?}", factory);
    Ok(())
}

trait Logger: Send + Sync {
    fn log(&self, message: &str);
}
struct ConsoleLogger;
impl Logger for ConsoleLogger {
    fn log(&self, message: &str) {
        println!("{message}");
    }
}

struct Service {
    logger: Arc<dyn Logger>,
    auditor: Injected<Auditor>,
}
impl Service {
    fn run(&self) {
        self.logger.log("Service running");
        self.auditor.audit();
    }
}

struct Auditor {
    service: Arc<Service>,
}
impl Auditor {
    fn audit(&self) {
        self.service.logger.log("Audit complete");
    }
}

trait BaseContext {}
trait AppContext {}

struct App(Context);
impl BindContext for App {
    type Schema = dyn AppContext;

    fn bind(context: Context) -> Self {
        App(context)
    }
}
impl App {
    fn service(&self) -> Result<Arc<Service>, ResolveError> {
        self.0.require("service")
    }
}
