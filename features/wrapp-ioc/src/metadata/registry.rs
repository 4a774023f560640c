use std::{
    any::TypeId,
    collections::HashMap,
    fmt::Debug,
    marker::PhantomData,
    sync::Arc,
};

use crate::{
    errors::{ArgumentError, InstantiationError, RegistryError},
    injected::Injected,
    metadata::{
        constructor::{self, IntoConstructor},
        ConstructorDescriptor, PropertyDeclaration, PropertySetter, TypeKind, TypeMetadata,
    },
    types::{CastTable, DynError, Injectable, Instance, TypeInfo},
};

/// Registered description of a single type
pub struct TypeDescriptor {
    pub info: TypeInfo,
    pub kind: TypeKind,
    /// Directly implemented or extended interfaces
    pub interfaces: Vec<TypeInfo>,
    pub properties: Vec<PropertyDeclaration>,
    pub constructors: Vec<ConstructorDescriptor>,
    /// Transitive closure of `interfaces`, filled on build
    all_interfaces: Vec<TypeInfo>,
    casts: Arc<CastTable>,
}
impl Debug for TypeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type", &self.info.type_name)
            .field("kind", &self.kind)
            .field("interfaces", &self.all_interfaces)
            .field("properties", &self.properties)
            .field("constructors", &self.constructors)
            .finish()
    }
}

/// Describes one type before it is added to a [RegistryBuilder]
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use wrapp_ioc::{TypeBuilder, TypeRegistry};
///
/// trait Clock: Send + Sync {}
/// struct SystemClock;
/// impl Clock for SystemClock {}
///
/// trait AppContext {}
///
/// let registry = TypeRegistry::builder()
///     .add_type(TypeBuilder::<dyn Clock>::interface())
///     .add_type(
///         TypeBuilder::<SystemClock>::concrete()
///             .implements::<dyn Clock>(|clock| clock as Arc<dyn Clock>)
///             .constructor(|| SystemClock),
///     )
///     .add_type(
///         TypeBuilder::<dyn AppContext>::interface()
///             .property_with_implementation::<dyn Clock, SystemClock>("clock"),
///     )
///     .build()
///     .unwrap();
/// # let _ = registry;
/// ```
pub struct TypeBuilder<T: ?Sized + 'static> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized + 'static> TypeBuilder<T> {
    fn with_kind(kind: TypeKind, casts: CastTable) -> Self {
        TypeBuilder {
            descriptor: TypeDescriptor {
                info: TypeInfo::of::<T>(),
                kind,
                interfaces: Vec::new(),
                properties: Vec::new(),
                constructors: Vec::new(),
                all_interfaces: Vec::new(),
                casts: Arc::new(casts),
            },
            _marker: PhantomData,
        }
    }

    /// Describes a contract: a context, or a trait object type
    pub fn interface() -> Self {
        Self::with_kind(TypeKind::Interface, CastTable::default())
    }

    /// Declares that `T` extends the interface `I`
    pub fn extends<I: ?Sized + 'static>(mut self) -> Self {
        self.descriptor.interfaces.push(TypeInfo::of::<I>());
        self
    }

    /// Declares a property of type `P`
    pub fn property<P: ?Sized + 'static>(mut self, name: impl Into<String>) -> Self {
        let property = PropertyDeclaration::new(name, TypeInfo::of::<P>(), self.descriptor.info);
        self.descriptor.properties.push(property);
        self
    }

    /// Declares a property of type `P`, implemented by constructing `Impl`
    pub fn property_with_implementation<P: ?Sized + 'static, Impl: ?Sized + 'static>(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        let mut property =
            PropertyDeclaration::new(name, TypeInfo::of::<P>(), self.descriptor.info);
        property.implementation = Some(TypeInfo::of::<Impl>());
        self.descriptor.properties.push(property);
        self
    }

    /// Declares an injection point of type `P`, assigned after construction
    ///
    /// `slot` returns the [Injected] field the value is written to.
    pub fn inject<P: ?Sized + Send + Sync + 'static>(
        mut self,
        name: impl Into<String>,
        slot: impl Fn(&T) -> &Injected<P> + Send + Sync + 'static,
    ) -> Self {
        let setter: PropertySetter = Arc::new(
            move |target: &Instance, value: Instance| -> Result<(), DynError> {
                let owner = target
                    .cast::<T>()
                    .map_err(|actual| ArgumentError::Mismatch {
                        expected: TypeInfo::of::<T>(),
                        actual,
                    })?;
                let value = value.cast::<P>().map_err(|actual| ArgumentError::Mismatch {
                    expected: TypeInfo::of::<P>(),
                    actual,
                })?;

                slot(&*owner).set(value)?;
                Ok(())
            },
        );

        let mut property = PropertyDeclaration::new(name, TypeInfo::of::<P>(), self.descriptor.info);
        property.setter = Some(setter);
        self.descriptor.properties.push(property);
        self
    }
}

impl<T: Injectable> TypeBuilder<T> {
    /// Describes a type which can be constructed
    pub fn concrete() -> Self {
        Self::with_kind(TypeKind::Concrete, CastTable::identity::<T>())
    }

    /// Declares that `T` can be used as `I`
    pub fn implements<I: ?Sized + Send + Sync + 'static>(
        mut self,
        cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    ) -> Self {
        self.descriptor.interfaces.push(TypeInfo::of::<I>());
        Arc::make_mut(&mut self.descriptor.casts).insert::<T, I>(cast);
        self
    }

    /// Adds a constructor
    pub fn constructor<Args, F: IntoConstructor<T, Args>>(self, constructor: F) -> Self {
        self.add_constructor(F::parameters(), false, constructor.into_construct_fn())
    }

    /// Adds the constructor to prefer for injection
    pub fn inject_constructor<Args, F: IntoConstructor<T, Args>>(self, constructor: F) -> Self {
        self.add_constructor(F::parameters(), true, constructor.into_construct_fn())
    }

    /// Adds a constructor which may fail, working on the raw arguments
    ///
    /// Use [Instance::cast] to access the arguments
    pub fn fallible_constructor(
        self,
        parameters: Vec<TypeInfo>,
        build: impl Fn(&[Instance]) -> Result<T, DynError> + Send + Sync + 'static,
    ) -> Self {
        self.add_constructor(parameters, false, constructor::fallible(build))
    }

    fn add_constructor(
        mut self,
        parameters: Vec<TypeInfo>,
        inject: bool,
        build: crate::metadata::ConstructFn,
    ) -> Self {
        self.descriptor.constructors.push(ConstructorDescriptor {
            parameters,
            inject,
            build,
        });
        self
    }
}

/// Collects type descriptions
#[derive(Default)]
pub struct RegistryBuilder {
    types: Vec<TypeDescriptor>,
}
impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type<T: ?Sized + 'static>(mut self, ty: TypeBuilder<T>) -> Self {
        self.types.push(ty.descriptor);
        self
    }

    pub fn build(self) -> Result<TypeRegistry, RegistryError> {
        let mut types = HashMap::with_capacity(self.types.len());
        for descriptor in self.types {
            let info = descriptor.info;
            if types.insert(info.type_id, descriptor).is_some() {
                return Err(RegistryError::Duplicate(info));
            }
        }

        let closures: Vec<_> = types
            .values()
            .map(|descriptor| (descriptor.info.type_id, collect_interfaces(&types, descriptor)))
            .collect();
        for (type_id, all_interfaces) in closures {
            if let Some(descriptor) = types.get_mut(&type_id) {
                descriptor.all_interfaces = all_interfaces;
            }
        }

        tracing::debug!("Built type registry with {} types", types.len());
        return Ok(TypeRegistry { types });

        fn collect_interfaces(
            types: &HashMap<TypeId, TypeDescriptor>,
            descriptor: &TypeDescriptor,
        ) -> Vec<TypeInfo> {
            let mut all = Vec::new();
            for interface in &descriptor.interfaces {
                visit(types, &mut all, *interface);
            }
            // An interface never lists itself
            all.retain(|interface| *interface != descriptor.info);
            all
        }

        fn visit(types: &HashMap<TypeId, TypeDescriptor>, all: &mut Vec<TypeInfo>, interface: TypeInfo) {
            if all.contains(&interface) {
                return;
            }
            all.push(interface);

            if let Some(next) = types.get(&interface.type_id) {
                for base in &next.interfaces {
                    visit(types, all, *base);
                }
            }
        }
    }
}

/// [TypeMetadata] built from explicit registrations
pub struct TypeRegistry {
    types: HashMap<TypeId, TypeDescriptor>,
}
impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.types.values()).finish()
    }
}

impl TypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn descriptor(&self, ty: TypeInfo) -> Option<&TypeDescriptor> {
        self.types.get(&ty.type_id)
    }

    /// Wraps a value, castable to every interface registered for its type
    pub fn instance<T: Injectable>(&self, value: T) -> Instance {
        let info = TypeInfo::of::<T>();
        match self.types.get(&info.type_id) {
            Some(descriptor) => {
                Instance::from_parts(info, Arc::new(value), descriptor.casts.clone())
            }
            None => Instance::new(value),
        }
    }
}

impl TypeMetadata for TypeRegistry {
    fn kind_of(&self, ty: TypeInfo) -> Option<TypeKind> {
        self.descriptor(ty).map(|descriptor| descriptor.kind)
    }

    fn interfaces_of(&self, ty: TypeInfo) -> &[TypeInfo] {
        self.descriptor(ty)
            .map(|descriptor| descriptor.all_interfaces.as_slice())
            .unwrap_or_default()
    }

    fn properties_of(&self, ty: TypeInfo) -> &[PropertyDeclaration] {
        self.descriptor(ty)
            .map(|descriptor| descriptor.properties.as_slice())
            .unwrap_or_default()
    }

    fn constructors_of(&self, ty: TypeInfo) -> &[ConstructorDescriptor] {
        self.descriptor(ty)
            .map(|descriptor| descriptor.constructors.as_slice())
            .unwrap_or_default()
    }

    fn casts_of(&self, ty: TypeInfo) -> Option<Arc<CastTable>> {
        self.descriptor(ty).map(|descriptor| descriptor.casts.clone())
    }

    fn instantiate(&self, ty: TypeInfo, args: Vec<Instance>) -> Result<Instance, InstantiationError> {
        let descriptor = self
            .descriptor(ty)
            .ok_or(InstantiationError::NotRegistered(ty))?;
        if descriptor.kind == TypeKind::Interface {
            return Err(InstantiationError::NotConstructible(ty));
        }
        if descriptor.constructors.is_empty() {
            return Err(InstantiationError::NoConstructor(ty));
        }

        let arguments: Vec<TypeInfo> = args.iter().map(|arg| arg.info).collect();

        // Inject marked constructors are tried first
        let marked = descriptor.constructors.iter().filter(|c| c.inject);
        let unmarked = descriptor.constructors.iter().filter(|c| !c.inject);
        let constructor = marked
            .chain(unmarked)
            .find(|constructor| {
                constructor.parameters.len() == arguments.len()
                    && constructor
                        .parameters
                        .iter()
                        .zip(&arguments)
                        .all(|(parameter, argument)| self.is_assignable(*parameter, *argument))
            })
            .ok_or_else(|| InstantiationError::NoMatchingConstructor {
                ty,
                arguments: arguments.clone(),
            })?;

        let built = (constructor.build)(&args).map_err(|error| {
            InstantiationError::ConstructorFailed {
                ty,
                error: Arc::new(error),
            }
        })?;

        Ok(Instance::from_parts(ty, built, descriptor.casts.clone()))
    }
}
