use std::sync::Arc;

use thiserror::Error;

use crate::{
    dependency_graph::DependencyGraphErrors,
    types::{DynError, TypeInfo},
};

/// Errors while resolving a property of a context
///
/// All of them abort the request in flight, none are retried.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// A property depends on itself through its constructor arguments
    #[error("Cyclic dependency in context '{context}' through {chain:?}")]
    CyclicDependency {
        context: TypeInfo,
        chain: Vec<String>,
    },
    /// Two members of the hierarchy imply unrelated implementations
    #[error("Conflicting implementations for '{property}' in context '{context}': '{first}' declared by '{first_member}' and '{second}' declared by '{second_member}'")]
    ConflictingImplementationDeclarations {
        context: TypeInfo,
        property: String,
        first: TypeInfo,
        first_member: TypeInfo,
        second: TypeInfo,
        second_member: TypeInfo,
    },
    /// The implementation does not satisfy an interface declared for the property
    #[error("Implementation '{implementation}' of '{property}' in context '{context}' does not implement '{interface}' declared by '{member}'")]
    ImplementationInterfaceMismatch {
        context: TypeInfo,
        property: String,
        implementation: TypeInfo,
        interface: TypeInfo,
        member: TypeInfo,
    },
    /// Nothing in the hierarchy names a concrete type for the property
    #[error("No implementation found for '{property}' in context '{context}'")]
    NoImplementationFound { context: TypeInfo, property: String },
    /// A constructor parameter or injected property matches no declared property
    #[error("Could not resolve dependency '{parameter}' of '{property}' in context '{context}'")]
    PropertyDependencyResolutionFailure {
        context: TypeInfo,
        property: String,
        parameter: TypeInfo,
    },
    /// The host could not construct the implementation
    #[error(transparent)]
    InstantiationFailure(#[from] InstantiationError),

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },
    /// The bound context implementation was written for another context type
    #[error("Context implementation expects '{expected}' but the factory serves '{actual}'")]
    ContextMismatch { expected: TypeInfo, actual: TypeInfo },
}

/// Errors while constructing or injecting a single object
#[derive(Error, Debug, Clone)]
pub enum InstantiationError {
    #[error("The type '{0}' is not registered")]
    NotRegistered(TypeInfo),
    #[error("The type '{0}' is an interface and can not be constructed")]
    NotConstructible(TypeInfo),
    #[error("The type '{0}' declares no constructor")]
    NoConstructor(TypeInfo),
    #[error("No constructor of '{ty}' accepts the arguments {arguments:?}")]
    NoMatchingConstructor {
        ty: TypeInfo,
        arguments: Vec<TypeInfo>,
    },
    #[error("Constructor of '{ty}' failed - error: {error:?}")]
    ConstructorFailed { ty: TypeInfo, error: Arc<DynError> },
    #[error("Injecting '{property}' into '{ty}' failed - error: {error:?}")]
    InjectionFailed {
        ty: TypeInfo,
        property: String,
        error: Arc<DynError>,
    },
}

/// Errors handing resolved arguments to a typed constructor
#[derive(Error, Debug, Clone)]
pub enum ArgumentError {
    #[error("Missing argument of type '{0}'")]
    Missing(TypeInfo),
    #[error("Expected argument of type '{expected}' but got '{actual}'")]
    Mismatch {
        expected: TypeInfo,
        actual: &'static str,
    },
}

/// An injected property was assigned twice
#[derive(Error, Debug, Clone)]
#[error("Property of type '{0}' has already been injected")]
pub struct AlreadyInjected(pub &'static str);

/// Errors while registering types
#[derive(Error, Debug, Clone)]
pub enum RegistryError {
    #[error("A Type has been registered twice: '{0}'")]
    Duplicate(TypeInfo),
}

/// Errors while building a [crate::ContextFactory]
#[derive(Error, Debug, Clone)]
pub enum BuildError {
    /// Validation found issues with the dependency graph
    #[error(transparent)]
    DependencyGraphError(#[from] DependencyGraphErrors),
    /// Preloading a property failed
    #[error(transparent)]
    ResolveError(#[from] ResolveError),
    /// An instance was bound to a property no member of the context declares
    #[error("Context '{context}' declares no property '{property}'")]
    UnknownProperty { context: TypeInfo, property: String },
    /// A property was bound twice
    #[error("Property '{0}' has already been bound")]
    DuplicateInstance(String),
}
