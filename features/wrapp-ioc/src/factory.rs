use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    fmt::Debug,
    sync::Arc,
};

use parking_lot::{ReentrantMutex, RwLock};

use crate::{
    builder::ContextFactoryBuilder,
    dependency_graph::{DependencyGraph, DependencyGraphErrors},
    errors::ResolveError,
    metadata::TypeMetadata,
    resolver::{ConstructionNode, ImplementationResolver},
    selector::select_constructor,
    types::{Instance, TypeInfo},
};

/// Builds and caches the objects a context describes
///
/// Every property is constructed at most once per factory; clones share the
/// same cache.
#[derive(Clone)]
pub struct ContextFactory(pub(crate) Arc<ContextFactoryInner>);
pub(crate) struct ContextFactoryInner {
    context: TypeInfo,
    metadata: Arc<dyn TypeMetadata>,
    /// Property name to its one instance - written once, never replaced
    singletons: RwLock<HashMap<String, Instance>>,
    /// Properties bound to a pre-built instance
    bound: HashMap<String, TypeInfo>,
    /// Held for a whole top level request, nested requests from
    /// constructors on the same thread share its state
    build_lock: ReentrantMutex<RefCell<ResolutionState>>,
}
impl Debug for ContextFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let singletons = self.0.singletons.read();
        let mut names: Vec<_> = singletons.keys().collect();
        names.sort();

        let mut map = f.debug_struct("ContextFactory");
        map.field("context", &self.0.context.type_name);
        for name in names {
            map.field(name, &singletons[name].info.type_name);
        }
        map.finish()
    }
}

/// Bookkeeping of one top level request
#[derive(Default)]
struct ResolutionState {
    /// Set while a top level request runs
    active: bool,
    /// Properties currently being constructed, innermost last
    constructing: Vec<String>,
    /// Constructed nodes waiting for property injection
    pending_injection: VecDeque<ConstructionNode>,
    /// Properties cached by this request, evicted if it fails
    created: Vec<String>,
}
impl ResolutionState {
    fn is_constructing(&self, property: &str) -> bool {
        self.constructing.iter().any(|name| name == property)
    }

    /// The part of the stack forming a cycle through `property`
    fn cycle_through(&self, property: &str) -> Vec<String> {
        let start = self
            .constructing
            .iter()
            .position(|name| name == property)
            .unwrap_or_default();
        let mut chain = self.constructing[start..].to_vec();
        chain.push(property.to_owned());
        chain
    }
}

/// Ends the outermost request, also when unwinding from a panicking constructor
///
/// Resets the shared state and evicts everything cached unless the request succeeded.
struct RequestScope<'f> {
    factory: &'f ContextFactoryInner,
    state: &'f RefCell<ResolutionState>,
    succeeded: bool,
}
impl Drop for RequestScope<'_> {
    fn drop(&mut self) {
        let finished = self.state.take();
        if self.succeeded || finished.created.is_empty() {
            return;
        }

        tracing::debug!("Request failed, evicting {:?}", finished.created);
        let mut singletons = self.factory.singletons.write();
        for property in &finished.created {
            singletons.remove(property);
        }
    }
}

impl ContextFactory {
    /// Factory for the context type `context`
    pub fn new(metadata: Arc<dyn TypeMetadata>, context: TypeInfo) -> Self {
        Self::with_instances(metadata, context, HashMap::new())
    }

    /// Bound instances are cached as is, see [Self::inject_bound]
    pub(crate) fn with_instances(
        metadata: Arc<dyn TypeMetadata>,
        context: TypeInfo,
        instances: HashMap<String, Instance>,
    ) -> Self {
        let bound = instances
            .iter()
            .map(|(name, instance)| (name.clone(), instance.info))
            .collect();
        Self(Arc::new(ContextFactoryInner {
            context,
            metadata,
            bound,
            singletons: RwLock::new(instances),
            build_lock: ReentrantMutex::new(RefCell::new(ResolutionState::default())),
        }))
    }

    pub fn builder<Context: ?Sized + 'static>(
        metadata: impl TypeMetadata + 'static,
    ) -> ContextFactoryBuilder {
        ContextFactoryBuilder::new(Arc::new(metadata), TypeInfo::of::<Context>())
    }

    pub fn context_type(&self) -> TypeInfo {
        self.0.context
    }

    pub fn metadata(&self) -> &dyn TypeMetadata {
        self.0.metadata.as_ref()
    }

    fn resolver(&self) -> ImplementationResolver<'_> {
        ImplementationResolver::new(self.0.metadata.as_ref(), self.0.context)
    }

    /// Returns the instance of `property`, constructing it and everything it
    /// depends on if needed
    ///
    /// Objects returned have all their injected properties set. When called
    /// from a constructor the outer request is continued instead, and the
    /// returned object is injected before that request returns.
    pub fn get(&self, property: &str) -> Result<Instance, ResolveError> {
        self.request(|resolver, state| {
            tracing::debug!("Resolving '{property}' of {}", self.0.context);
            let instance = self.resolve_internal(resolver, state, property)?;
            tracing::debug!("Resolved '{property}' as {}", instance.info);
            Ok(instance)
        })
    }

    /// Runs `resolve` as part of the current request, starting one if none is active
    ///
    /// The request that started it drains the injection queue. If anything
    /// fails, every property it cached is evicted again.
    fn request<T>(
        &self,
        resolve: impl FnOnce(&ImplementationResolver<'_>, &RefCell<ResolutionState>) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        let guard = self.0.build_lock.lock();
        let state: &RefCell<ResolutionState> = &guard;
        let resolver = self.resolver();

        let nested = std::mem::replace(&mut state.borrow_mut().active, true);
        if nested {
            return resolve(&resolver, state);
        }

        let mut scope = RequestScope {
            factory: &self.0,
            state,
            succeeded: false,
        };
        let value = resolve(&resolver, state)?;
        self.drain_injections(&resolver, state)?;
        scope.succeeded = true;
        Ok(value)
    }

    fn resolve_internal(
        &self,
        resolver: &ImplementationResolver<'_>,
        state: &RefCell<ResolutionState>,
        property: &str,
    ) -> Result<Instance, ResolveError> {
        let cycle = {
            let state = state.borrow();
            state
                .is_constructing(property)
                .then(|| state.cycle_through(property))
        };
        if let Some(chain) = cycle {
            return Err(ResolveError::CyclicDependency {
                context: self.0.context,
                chain,
            });
        }

        if let Some(instance) = self.cached(property) {
            tracing::trace!("Cache hit for '{property}'");
            return Ok(instance);
        }

        let mut node = resolver.resolve(property)?;
        let Some(implementation) = node.implementation else {
            return Err(ResolveError::NoImplementationFound {
                context: self.0.context,
                property: property.to_owned(),
            });
        };

        state.borrow_mut().constructing.push(property.to_owned());
        let constructed = self.construct(resolver, state, &node, implementation);
        state.borrow_mut().constructing.pop();
        let instance = constructed?;

        tracing::debug!("Constructed instance of {implementation} for '{property}'");
        self.0
            .singletons
            .write()
            .insert(property.to_owned(), instance.clone());

        node.built = Some(instance.clone());
        let mut state = state.borrow_mut();
        state.created.push(property.to_owned());
        state.pending_injection.push_back(node);
        Ok(instance)
    }

    /// Resolves the constructor arguments and constructs the node
    fn construct(
        &self,
        resolver: &ImplementationResolver<'_>,
        state: &RefCell<ResolutionState>,
        node: &ConstructionNode,
        implementation: TypeInfo,
    ) -> Result<Instance, ResolveError> {
        let metadata = self.0.metadata.as_ref();
        let Some(constructor) = select_constructor(metadata, implementation) else {
            // Let the metadata report why it can't be built
            return Ok(metadata.instantiate(implementation, Vec::new())?);
        };
        let member = node.member.unwrap_or(self.0.context);

        let mut args = Vec::with_capacity(constructor.parameters.len());
        for parameter in &constructor.parameters {
            let matched = resolver
                .property_for_type(*parameter, member)?
                .ok_or_else(|| self.unmatched(node, *parameter))?;
            args.push(self.resolve_internal(resolver, state, &matched.name)?);
        }

        Ok(metadata.instantiate(implementation, args)?)
    }

    /// Injects properties until no constructed node is left
    ///
    /// Injection may construct further nodes, which are injected in turn.
    fn drain_injections(
        &self,
        resolver: &ImplementationResolver<'_>,
        state: &RefCell<ResolutionState>,
    ) -> Result<(), ResolveError> {
        loop {
            // The borrow must end before injecting, injection may construct
            let next = state.borrow_mut().pending_injection.pop_front();
            let Some(node) = next else {
                return Ok(());
            };
            let (Some(built), Some(implementation)) = (&node.built, node.implementation) else {
                continue;
            };
            let member = node.member.unwrap_or(self.0.context);

            for point in resolver.injection_points(implementation) {
                let matched = resolver
                    .property_for_type(point.declared_type, member)?
                    .ok_or_else(|| self.unmatched(&node, point.declared_type))?;

                let value = self.resolve_internal(resolver, state, &matched.name)?;
                point.inject(built, value)?;
                tracing::debug!(
                    "Injected '{}' into {} of '{}'",
                    point.name,
                    implementation,
                    node.property
                );
            }
        }
    }

    /// Injects the properties of every bound instance which declares injection points
    pub(crate) fn inject_bound(&self) -> Result<(), ResolveError> {
        let needs_injection: Vec<(String, Instance)> = {
            let singletons = self.0.singletons.read();
            let resolver = self.resolver();
            self.0
                .bound
                .iter()
                .filter(|(_, info)| !resolver.injection_points(**info).is_empty())
                .filter_map(|(name, _)| Some((name.clone(), singletons.get(name)?.clone())))
                .collect()
        };
        if needs_injection.is_empty() {
            return Ok(());
        }

        self.request(|resolver, state| {
            for (property, instance) in needs_injection {
                let mut node = resolver.resolve(&property)?;
                node.implementation = Some(instance.info);
                node.built = Some(instance);
                state.borrow_mut().pending_injection.push_back(node);
            }
            tracing::debug!("Injecting bound instances of {}", self.0.context);
            Ok(())
        })
    }

    fn unmatched(&self, node: &ConstructionNode, parameter: TypeInfo) -> ResolveError {
        ResolveError::PropertyDependencyResolutionFailure {
            context: self.0.context,
            property: node
                .declaration
                .as_ref()
                .map_or_else(|| node.property.clone(), |declaration| declaration.name.clone()),
            parameter,
        }
    }

    /// Returns the instance of `property` viewed as `T`
    pub fn require<T: ?Sized + 'static>(&self, property: &str) -> Result<Arc<T>, ResolveError> {
        let instance = self.get(property)?;
        instance
            .cast::<T>()
            .map_err(|actual_type| ResolveError::DowncastFailed {
                required_type: std::any::type_name::<T>(),
                actual_type,
            })
    }

    fn cached(&self, property: &str) -> Option<Instance> {
        self.0.singletons.read().get(property).cloned()
    }

    pub fn is_cached(&self, property: &str) -> bool {
        self.0.singletons.read().contains_key(property)
    }

    /// Names of all constructed or bound properties, sorted
    pub fn cached_properties(&self) -> Vec<String> {
        let mut names: Vec<_> = self.0.singletons.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Declared type of `property`, taken from its most derived declaration
    pub fn type_for_property(&self, property: &str) -> Option<TypeInfo> {
        self.resolver().declared_type(property)
    }

    /// The type `property` would be constructed as, without constructing it
    pub fn implementation_type_for_property(
        &self,
        property: &str,
    ) -> Result<Option<TypeInfo>, ResolveError> {
        Ok(self.resolver().resolve(property)?.implementation)
    }

    /// Every property the context declares, most derived declaration first
    pub fn property_names(&self) -> Vec<String> {
        self.resolver().property_names()
    }

    /// Dependency graph of the whole context
    pub fn graph(&self) -> Result<DependencyGraph, DependencyGraphErrors> {
        DependencyGraph::new(self.0.metadata.as_ref(), self.0.context, &self.0.bound)
    }
}
