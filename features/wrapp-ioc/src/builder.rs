use std::{collections::HashMap, sync::Arc};

use crate::{
    errors::BuildError,
    factory::ContextFactory,
    metadata::TypeMetadata,
    resolver::ImplementationResolver,
    types::{Instance, TypeInfo},
};

/// What [ContextFactoryBuilder::build] does before handing out the factory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FactoryOptions {
    /// Resolve the whole dependency graph and reject cycles and unresolvable properties
    pub validate: bool,
    /// Construct every property up front
    pub preload: bool,
}

/// Collects pre-built instances and options for a [ContextFactory]
pub struct ContextFactoryBuilder {
    metadata: Arc<dyn TypeMetadata>,
    context: TypeInfo,
    /// Instances bound to a property instead of being constructed
    instances: HashMap<String, Instance>,
    options: FactoryOptions,
    /// First issue found while adding instances, reported by build
    error: Option<BuildError>,
}

impl ContextFactoryBuilder {
    pub(crate) fn new(metadata: Arc<dyn TypeMetadata>, context: TypeInfo) -> Self {
        ContextFactoryBuilder {
            metadata,
            context,
            instances: HashMap::new(),
            options: FactoryOptions::default(),
            error: None,
        }
    }

    /// Binds `property` to an existing instance
    ///
    /// The property must be declared by a member of the context and may only be bound once.
    /// The instance can be viewed as every interface registered for its type. Injection
    /// points of its type are assigned by [Self::build].
    pub fn add_instance(mut self, property: impl Into<String>, instance: Instance) -> Self {
        if self.error.is_some() {
            return self;
        }

        let property = property.into();
        let resolver = ImplementationResolver::new(self.metadata.as_ref(), self.context);
        if resolver.declared_type(&property).is_none() {
            self.error = Some(BuildError::UnknownProperty {
                context: self.context,
                property,
            });
        } else if self.instances.contains_key(&property) {
            self.error = Some(BuildError::DuplicateInstance(property));
        } else {
            let instance = match self.metadata.casts_of(instance.info) {
                Some(casts) => instance.with_casts(casts),
                None => instance,
            };
            self.instances.insert(property, instance);
        }
        self
    }

    pub fn options(mut self, options: FactoryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.options.validate = validate;
        self
    }

    pub fn preload(mut self, preload: bool) -> Self {
        self.options.preload = preload;
        self
    }

    pub fn build(self) -> Result<ContextFactory, BuildError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let factory = ContextFactory::with_instances(self.metadata, self.context, self.instances);

        if self.options.validate {
            factory.graph()?.check()?;
            tracing::debug!("Dependency graph of {} is valid", factory.context_type());
        }

        factory.inject_bound()?;

        if self.options.preload {
            for property in factory.property_names() {
                factory.get(&property)?;
            }
            tracing::debug!("Preloaded {:?}", factory.cached_properties());
        }

        Ok(factory)
    }
}
