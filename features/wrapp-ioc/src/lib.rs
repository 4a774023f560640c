//! Resolution engine for context based dependency injection.
//!
//! A *context* is an interface type whose properties name the objects an
//! application needs. Contexts extend other contexts, and any member of the
//! hierarchy may say which concrete type implements a property. The
//! [ContextFactory] resolves those declarations, constructs every object at
//! most once, hands constructor arguments in by type, and assigns
//! [Injected] properties after construction so objects may refer to each other.
//!
//! Types are described through [TypeMetadata], usually a [TypeRegistry].

pub mod builder;
pub mod context;
pub mod dependency_graph;
pub mod errors;
pub mod factory;
pub mod injected;
pub mod metadata;
pub mod resolver;
pub mod selector;
pub mod types;

pub use builder::{ContextFactoryBuilder, FactoryOptions};
pub use context::{BindContext, Context};
pub use dependency_graph::{DependencyGraph, DependencyGraphError, DependencyGraphErrors};
pub use errors::{BuildError, InstantiationError, RegistryError, ResolveError};
pub use factory::ContextFactory;
pub use injected::Injected;
pub use metadata::{
    ConstructorDescriptor, PropertyDeclaration, RegistryBuilder, TypeBuilder, TypeKind, TypeMetadata,
    TypeRegistry,
};
pub use types::{Injectable, Instance, TypeInfo};
