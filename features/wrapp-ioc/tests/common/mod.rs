#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;
use wrapp_ioc::{Injected, RegistryBuilder, TypeBuilder, TypeRegistry};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Names of constructed types, in construction order
#[derive(Clone, Default)]
pub struct ConstructionLog(Arc<Mutex<Vec<&'static str>>>);
impl ConstructionLog {
    pub fn record(&self, name: &'static str) {
        self.0.lock().push(name);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().clone()
    }
}

pub trait Logger: Send + Sync {
    fn name(&self) -> &'static str;
}
pub struct ConsoleLogger;
impl Logger for ConsoleLogger {
    fn name(&self) -> &'static str {
        "console"
    }
}

pub trait Storage: Send + Sync {
    fn kind(&self) -> &'static str;
}
pub struct Disk;
impl Storage for Disk {
    fn kind(&self) -> &'static str {
        "disk"
    }
}
pub struct Memory;
impl Storage for Memory {
    fn kind(&self) -> &'static str {
        "memory"
    }
}

pub struct Service {
    pub logger: Arc<dyn Logger>,
    pub auditor: Injected<Auditor>,
}
pub struct Auditor {
    pub service: Arc<Service>,
    pub store: Arc<MemoryStore>,
    /// If the service already had its auditor while this was constructed
    pub saw_injected_service: bool,
}
pub struct MemoryStore {
    pub logger: Injected<dyn Logger>,
}

/// Registry knowing every shared type, extended by `contexts`
pub fn registry(
    log: &ConstructionLog,
    contexts: impl FnOnce(RegistryBuilder) -> RegistryBuilder,
) -> TypeRegistry {
    let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());

    let builder = TypeRegistry::builder()
        .add_type(TypeBuilder::<dyn Logger>::interface())
        .add_type(TypeBuilder::<dyn Storage>::interface())
        .add_type(
            TypeBuilder::<ConsoleLogger>::concrete()
                .implements::<dyn Logger>(|logger| logger as Arc<dyn Logger>)
                .constructor(move || {
                    l1.record("ConsoleLogger");
                    ConsoleLogger
                }),
        )
        .add_type(
            TypeBuilder::<Disk>::concrete()
                .implements::<dyn Storage>(|disk| disk as Arc<dyn Storage>)
                .constructor(|| Disk),
        )
        .add_type(
            TypeBuilder::<Memory>::concrete()
                .implements::<dyn Storage>(|memory| memory as Arc<dyn Storage>)
                .constructor(|| Memory),
        )
        .add_type(
            TypeBuilder::<Service>::concrete()
                .constructor(move |logger: Arc<dyn Logger>| {
                    l2.record("Service");
                    Service {
                        logger,
                        auditor: Injected::new(),
                    }
                })
                .inject::<Auditor>("auditor", |service: &Service| &service.auditor),
        )
        .add_type(TypeBuilder::<Auditor>::concrete().constructor(
            move |service: Arc<Service>, store: Arc<MemoryStore>| {
                l3.record("Auditor");
                Auditor {
                    saw_injected_service: service.auditor.is_injected(),
                    service,
                    store,
                }
            },
        ))
        .add_type(
            TypeBuilder::<MemoryStore>::concrete()
                .constructor(move || {
                    l4.record("MemoryStore");
                    MemoryStore {
                        logger: Injected::new(),
                    }
                })
                .inject::<dyn Logger>("logger", |store: &MemoryStore| &store.logger),
        );

    contexts(builder).build().unwrap()
}
