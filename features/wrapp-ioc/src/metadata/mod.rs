//! Declarative description of the types the engine works with.
//!
//! The engine never inspects Rust types directly. Everything it knows about a
//! context, its interfaces, their properties and the constructors of concrete
//! types comes through [TypeMetadata]. [TypeRegistry] is the implementation
//! built from explicit registrations.

use std::{fmt::Debug, sync::Arc};

use crate::{
    errors::InstantiationError,
    types::{AnyArc, CastTable, DynError, Instance, TypeInfo},
};

pub mod constructor;
pub mod registry;

pub use constructor::IntoConstructor;
pub use registry::{RegistryBuilder, TypeBuilder, TypeRegistry};

/// Whether a type can be constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    /// Only describes a contract - contexts and trait objects
    Interface,
    /// Can be constructed through its constructors
    Concrete,
}

pub(crate) type PropertySetter =
    Arc<dyn Fn(&Instance, Instance) -> Result<(), DynError> + Send + Sync>;

pub(crate) type ConstructFn = Arc<dyn Fn(&[Instance]) -> Result<AnyArc, DynError> + Send + Sync>;

/// A named, typed dependency slot declared by a type
#[derive(Clone)]
pub struct PropertyDeclaration {
    pub name: String,
    pub declared_type: TypeInfo,
    /// The type declaring the property
    pub owner: TypeInfo,
    /// Concrete type to construct instead of the declared type
    pub implementation: Option<TypeInfo>,
    /// Present if the property is an injection point
    pub(crate) setter: Option<PropertySetter>,
}
impl Debug for PropertyDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyDeclaration")
            .field("name", &self.name)
            .field("declared_type", &self.declared_type.type_name)
            .field("owner", &self.owner.type_name)
            .field("implementation", &self.implementation.map(|i| i.type_name))
            .field("inject", &self.setter.is_some())
            .finish()
    }
}
impl PropertyDeclaration {
    pub fn new(name: impl Into<String>, declared_type: TypeInfo, owner: TypeInfo) -> Self {
        PropertyDeclaration {
            name: name.into(),
            declared_type,
            owner,
            implementation: None,
            setter: None,
        }
    }

    pub fn is_injection_point(&self) -> bool {
        self.setter.is_some()
    }

    /// Assigns `value` to this property on `target`
    pub fn inject(&self, target: &Instance, value: Instance) -> Result<(), InstantiationError> {
        let Some(setter) = &self.setter else {
            return Ok(());
        };

        setter(target, value).map_err(|error| InstantiationError::InjectionFailed {
            ty: target.info,
            property: self.name.clone(),
            error: Arc::new(error),
        })
    }
}

/// One way of constructing a concrete type
#[derive(Clone)]
pub struct ConstructorDescriptor {
    pub parameters: Vec<TypeInfo>,
    /// Marked as the constructor to use for injection
    pub inject: bool,
    pub(crate) build: ConstructFn,
}
impl Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parameters: Vec<_> = self.parameters.iter().map(|p| p.type_name).collect();
        f.debug_struct("ConstructorDescriptor")
            .field("parameters", &parameters)
            .field("inject", &self.inject)
            .finish()
    }
}

/// Everything the engine needs to know about types
///
/// Sequences are returned in a fixed order - the engine relies on it for
/// deterministic resolution.
pub trait TypeMetadata: Send + Sync {
    /// Returns `None` if the type is unknown
    fn kind_of(&self, ty: TypeInfo) -> Option<TypeKind>;

    /// All interfaces `ty` implements or extends, transitively, in declaration order
    fn interfaces_of(&self, ty: TypeInfo) -> &[TypeInfo];

    /// Properties declared directly by `ty`, in declaration order
    fn properties_of(&self, ty: TypeInfo) -> &[PropertyDeclaration];

    /// Constructors of `ty`, in declaration order
    fn constructors_of(&self, ty: TypeInfo) -> &[ConstructorDescriptor];

    /// Constructs `ty` with a constructor accepting `args`
    fn instantiate(&self, ty: TypeInfo, args: Vec<Instance>) -> Result<Instance, InstantiationError>;

    /// Views of `ty` for values created outside [TypeMetadata::instantiate]
    fn casts_of(&self, _ty: TypeInfo) -> Option<Arc<CastTable>> {
        None
    }

    fn implementation_override_of(&self, property: &PropertyDeclaration) -> Option<TypeInfo> {
        property.implementation
    }

    fn property_has_inject_marker(&self, property: &PropertyDeclaration) -> bool {
        property.is_injection_point()
    }

    fn constructor_has_inject_marker(&self, constructor: &ConstructorDescriptor) -> bool {
        constructor.inject
    }

    /// Unknown types count as concrete
    fn is_interface(&self, ty: TypeInfo) -> bool {
        self.kind_of(ty) == Some(TypeKind::Interface)
    }

    /// True if a value of `source` can be used where `target` is expected
    fn is_assignable(&self, target: TypeInfo, source: TypeInfo) -> bool {
        target == source || self.interfaces_of(source).contains(&target)
    }
}
