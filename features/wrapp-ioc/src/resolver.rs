use crate::{
    errors::ResolveError,
    metadata::{PropertyDeclaration, TypeMetadata},
    types::{Instance, TypeInfo},
};

/// Resolution record for one property during one request
#[derive(Debug, Clone)]
pub struct ConstructionNode {
    pub property: String,
    /// Declaration which supplied the implementation
    pub declaration: Option<PropertyDeclaration>,
    /// Hierarchy member the implementation was found on
    pub member: Option<TypeInfo>,
    /// `None` if no member implies a concrete type
    pub implementation: Option<TypeInfo>,
    /// Set once constructed
    pub built: Option<Instance>,
}
impl ConstructionNode {
    fn unresolved(property: &str) -> Self {
        ConstructionNode {
            property: property.to_owned(),
            declaration: None,
            member: None,
            implementation: None,
            built: None,
        }
    }
}

/// Finds implementation types for the properties of a context
///
/// Members of a hierarchy are always visited as: the type itself, then every
/// interface it extends in the order given by [TypeMetadata::interfaces_of].
pub struct ImplementationResolver<'m> {
    metadata: &'m dyn TypeMetadata,
    context: TypeInfo,
}

impl<'m> ImplementationResolver<'m> {
    pub fn new(metadata: &'m dyn TypeMetadata, context: TypeInfo) -> Self {
        Self { metadata, context }
    }

    pub fn context(&self) -> TypeInfo {
        self.context
    }

    /// `start` followed by all its interfaces
    pub fn hierarchy(&self, start: TypeInfo) -> impl Iterator<Item = TypeInfo> + 'm {
        let metadata = self.metadata;
        let interfaces = metadata.interfaces_of(start);
        std::iter::once(start).chain(interfaces.iter().copied())
    }

    /// Slots `member` declares itself, injection points excluded
    fn slots_of(&self, member: TypeInfo) -> impl Iterator<Item = &'m PropertyDeclaration> + 'm {
        let metadata = self.metadata;
        metadata
            .properties_of(member)
            .iter()
            .filter(move |declaration| !metadata.property_has_inject_marker(declaration))
    }

    /// Names of every property of the context, most derived declaration first
    pub fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for member in self.hierarchy(self.context) {
            for declaration in self.slots_of(member) {
                if !names.contains(&declaration.name) {
                    names.push(declaration.name.clone());
                }
            }
        }
        names
    }

    /// Declared type of the most derived declaration of `property`
    pub fn declared_type(&self, property: &str) -> Option<TypeInfo> {
        self.hierarchy(self.context).find_map(|member| {
            self.slots_of(member)
                .find(|declaration| declaration.name == property)
                .map(|declaration| declaration.declared_type)
        })
    }

    /// Finds the implementation of `property`
    ///
    /// The first member implying a type wins. Every later member must imply a
    /// type the winner can be used as, and every interface declared for the
    /// property must be implemented by the winner.
    pub fn resolve(&self, property: &str) -> Result<ConstructionNode, ResolveError> {
        let mut node = ConstructionNode::unresolved(property);
        let mut declared_interfaces = Vec::new();

        for member in self.hierarchy(self.context) {
            let Some(declaration) = self
                .slots_of(member)
                .find(|declaration| declaration.name == property)
            else {
                continue;
            };

            let declared = declaration.declared_type;
            let declared_interface = self.metadata.is_interface(declared);
            if declared_interface {
                declared_interfaces.push((member, declared));
            }

            let implied = self
                .metadata
                .implementation_override_of(declaration)
                .or((!declared_interface).then_some(declared));
            let Some(implied) = implied else {
                continue;
            };

            match (node.implementation, node.member) {
                (Some(first), Some(first_member)) => {
                    if implied != first && !self.metadata.is_assignable(implied, first) {
                        return Err(ResolveError::ConflictingImplementationDeclarations {
                            context: self.context,
                            property: property.to_owned(),
                            first,
                            first_member,
                            second: implied,
                            second_member: member,
                        });
                    }
                }
                _ => {
                    node.implementation = Some(implied);
                    node.member = Some(member);
                    node.declaration = Some(declaration.clone());
                }
            }
        }

        if let Some(implementation) = node.implementation {
            for (member, interface) in declared_interfaces {
                if !self.metadata.is_assignable(interface, implementation) {
                    return Err(ResolveError::ImplementationInterfaceMismatch {
                        context: self.context,
                        property: property.to_owned(),
                        implementation,
                        interface,
                        member,
                    });
                }
            }
        }

        Ok(node)
    }

    /// Finds the property which can supply a value of type `target`
    ///
    /// Searches the hierarchy of `start`. A property matches if its declared
    /// type, or failing that its implementation, can be used as `target`.
    /// The first match wins.
    pub fn property_for_type(
        &self,
        target: TypeInfo,
        start: TypeInfo,
    ) -> Result<Option<&'m PropertyDeclaration>, ResolveError> {
        for member in self.hierarchy(start) {
            for declaration in self.slots_of(member) {
                if self.metadata.is_assignable(target, declaration.declared_type) {
                    return Ok(Some(declaration));
                }

                let node = self.resolve(&declaration.name)?;
                if node
                    .implementation
                    .is_some_and(|implementation| self.metadata.is_assignable(target, implementation))
                {
                    return Ok(Some(declaration));
                }
            }
        }

        Ok(None)
    }

    /// Inject marked properties of `ty`, including those of its interfaces
    ///
    /// A name declared more than once is only reported for the most derived type.
    pub fn injection_points(&self, ty: TypeInfo) -> Vec<&'m PropertyDeclaration> {
        let metadata = self.metadata;
        let mut points: Vec<&PropertyDeclaration> = Vec::new();
        for member in self.hierarchy(ty) {
            for declaration in metadata.properties_of(member) {
                if metadata.property_has_inject_marker(declaration)
                    && !points.iter().any(|point| point.name == declaration.name)
                {
                    points.push(declaration);
                }
            }
        }
        points
    }
}
