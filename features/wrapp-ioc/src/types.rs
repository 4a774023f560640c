use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
};

/// All errors must be Send + Sync so they can cross thread boundaries
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Type erased, shared object
pub type AnyArc = Arc<dyn Any + Send + Sync + 'static>;

/// The engine may be shared between threads
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// Converts a type erased object into a boxed `Arc<Target>`
type Caster = Arc<dyn Fn(AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Every type an instance can be viewed as, keyed by the target type
#[derive(Clone, Default)]
pub struct CastTable {
    casts: HashMap<TypeId, Caster>,
}
impl CastTable {
    /// Table which only knows the concrete type itself
    pub fn identity<T: Injectable>() -> Self {
        let mut table = Self::default();
        table.insert::<T, T>(|this| this);
        table
    }

    /// Registers a view of `T` as `Target`
    pub fn insert<T: Injectable, Target: ?Sized + Send + Sync + 'static>(
        &mut self,
        cast: impl Fn(Arc<T>) -> Arc<Target> + Send + Sync + 'static,
    ) {
        let caster: Caster = Arc::new(move |any: AnyArc| {
            any.downcast::<T>()
                .ok()
                .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
        });
        self.casts.insert(TypeId::of::<Target>(), caster);
    }

    fn cast<Target: ?Sized + 'static>(&self, instance: &AnyArc) -> Option<Arc<Target>> {
        let caster = self.casts.get(&TypeId::of::<Target>())?;
        let boxed = caster(instance.clone())?;
        boxed.downcast::<Arc<Target>>().ok().map(|arc| *arc)
    }
}

/// A constructed object together with the views it supports
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: AnyArc,
    casts: Arc<CastTable>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.info.type_name)
            .finish_non_exhaustive()
    }
}

impl Instance {
    /// Wraps an existing value, only castable to its own type
    ///
    /// Use [crate::TypeRegistry::instance] for a value castable to its
    /// registered interfaces. Values bound through
    /// [crate::ContextFactoryBuilder::add_instance] gain those views either way.
    pub fn new<ExistingInstance: Injectable>(instance: ExistingInstance) -> Self {
        Instance {
            info: TypeInfo::of::<ExistingInstance>(),
            instance: Arc::new(instance),
            casts: Arc::new(CastTable::identity::<ExistingInstance>()),
        }
    }

    pub(crate) fn from_parts(info: TypeInfo, instance: AnyArc, casts: Arc<CastTable>) -> Self {
        Instance {
            info,
            instance,
            casts,
        }
    }

    /// Same object, castable through `casts`
    pub(crate) fn with_casts(self, casts: Arc<CastTable>) -> Self {
        Instance { casts, ..self }
    }

    /// Returns the concrete object
    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }

    /// Views the object as `T`, which may be the concrete type or any
    /// interface registered for it
    ///
    /// Returns the name of the concrete type on failure
    pub fn cast<T: ?Sized + 'static>(&self) -> Result<Arc<T>, &'static str> {
        self.casts
            .cast::<T>(&self.instance)
            .ok_or(self.info.type_name)
    }

    /// True if both refer to the very same object
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.instance), Arc::as_ptr(&other.instance))
    }
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}
