use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

use crate::{
    errors::{InstantiationError, ResolveError},
    metadata::TypeMetadata,
    resolver::ImplementationResolver,
    selector::select_constructor,
    types::TypeInfo,
};

/// Graph of every property of a context
/// Used to check for circular dependencies ahead of time and enables visualization of the context
#[derive(Debug)]
pub struct DependencyGraph {
    context: TypeInfo,
    map: BTreeMap<String, DependencyGraphEntry>,
}

/// One property and the properties it depends on
#[derive(Debug, Clone)]
pub struct DependencyGraphEntry {
    pub property: String,
    pub implementation: TypeInfo,
    pub dependencies: Vec<DependencyInfo>,
}

/// An edge of the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyInfo {
    /// The property supplying the value
    pub property: String,
    /// The type asked for
    pub requested: TypeInfo,
    /// If it is assigned after construction instead of passed to the constructor
    pub injected: bool,
}

impl DependencyGraph {
    /// Resolves every property of `context`
    ///
    /// `bound` holds properties with a pre-built instance, only their injected edges are recorded.
    ///
    /// Returns a list of all issues found while resolving
    pub fn new(
        metadata: &dyn TypeMetadata,
        context: TypeInfo,
        bound: &HashMap<String, TypeInfo>,
    ) -> Result<Self, DependencyGraphErrors> {
        let resolver = ImplementationResolver::new(metadata, context);
        let mut graph = Self {
            context,
            map: Default::default(),
        };
        let mut errors = Vec::new();

        for property in resolver.property_names() {
            match entry_for(&resolver, metadata, &property, bound.get(&property).copied()) {
                Ok(entry) => graph.add(entry),
                Err(mut entry_errors) => errors.append(&mut entry_errors),
            }
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(graph);

        fn entry_for(
            resolver: &ImplementationResolver<'_>,
            metadata: &dyn TypeMetadata,
            property: &str,
            bound: Option<TypeInfo>,
        ) -> Result<DependencyGraphEntry, Vec<DependencyGraphError>> {
            let node = resolver.resolve(property).map_err(|e| vec![e.into()])?;
            let member = node.member.unwrap_or(resolver.context());

            // Bound instances only need their injection points
            let (implementation, parameters) = match (bound, node.implementation) {
                (Some(implementation), _) => (implementation, Vec::new()),
                (None, Some(implementation)) => {
                    let parameters = constructor_parameters(metadata, implementation)
                        .map_err(|e| vec![e.into()])?;
                    (implementation, parameters)
                }
                (None, None) => {
                    return Err(vec![ResolveError::NoImplementationFound {
                        context: resolver.context(),
                        property: property.to_owned(),
                    }
                    .into()])
                }
            };

            let constructor_arguments = parameters.into_iter().map(|p| (p, false));
            let injected = resolver
                .injection_points(implementation)
                .into_iter()
                .map(|point| (point.declared_type, true));

            let mut errors = Vec::new();
            let mut dependencies = Vec::new();
            for (requested, injected) in constructor_arguments.chain(injected) {
                match resolver.property_for_type(requested, member) {
                    Ok(Some(matched)) => dependencies.push(DependencyInfo {
                        property: matched.name.clone(),
                        requested,
                        injected,
                    }),
                    Ok(None) => errors.push(DependencyGraphError::MissingDependency {
                        dependency: requested,
                        required_by: property.to_owned(),
                    }),
                    Err(e) => errors.push(e.into()),
                }
            }

            if !errors.is_empty() {
                return Err(errors);
            }

            Ok(DependencyGraphEntry {
                property: property.to_owned(),
                implementation,
                dependencies,
            })
        }
    }

    fn add(&mut self, entry: DependencyGraphEntry) {
        self.map.insert(entry.property.clone(), entry);
    }

    pub fn context(&self) -> TypeInfo {
        self.context
    }

    /// All entries, ordered by property name
    pub fn entries(&self) -> impl Iterator<Item = &DependencyGraphEntry> {
        self.map.values()
    }

    pub fn entry(&self, property: &str) -> Option<&DependencyGraphEntry> {
        self.map.get(property)
    }

    /// Validate the graph
    ///
    /// Only constructor edges can form a cycle, injected edges are resolved
    /// after their owner has been constructed.
    ///
    /// Returns a list of all issues
    pub fn check(&self) -> Result<(), DependencyGraphErrors> {
        let mut checked = HashSet::new();
        let mut errors = Vec::new();
        for entry in self.map.values() {
            let mut dependency_chain = Vec::new();
            check_recurse(
                self,
                &mut checked,
                &mut errors,
                &mut dependency_chain,
                entry,
            );
        }

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        return Ok(());

        fn check_recurse<'g>(
            graph: &'g DependencyGraph,
            checked: &mut HashSet<&'g str>,
            errors: &mut Vec<DependencyGraphError>,
            dependency_chain: &mut Vec<&'g str>,
            entry: &'g DependencyGraphEntry,
        ) {
            // Circular Dependency Check
            if let Some(start) = dependency_chain
                .iter()
                .position(|property| *property == entry.property)
            {
                let mut chain: Vec<String> = dependency_chain[start..]
                    .iter()
                    .map(|property| property.to_string())
                    .collect();
                let from = chain[chain.len() - 1].clone();
                chain.push(entry.property.clone()); // Add current so chain is complete

                errors.push(DependencyGraphError::CircularDependency {
                    from,
                    to: entry.property.clone(),
                    chain,
                });
            }

            // Skip other checks if already checked
            if !checked.insert(entry.property.as_str()) {
                return;
            };

            dependency_chain.push(entry.property.as_str());

            for dependency in &entry.dependencies {
                if dependency.injected {
                    // Don't recurse, this will be checked by itself
                    continue;
                }

                if let Some(next_entry) = graph.map.get(&dependency.property) {
                    check_recurse(graph, checked, errors, dependency_chain, next_entry);
                }
            }

            dependency_chain.pop();
        }
    }
}

/// Parameters of the constructor `implementation` would be built with
fn constructor_parameters(
    metadata: &dyn TypeMetadata,
    implementation: TypeInfo,
) -> Result<Vec<TypeInfo>, InstantiationError> {
    if metadata.kind_of(implementation).is_none() {
        return Err(InstantiationError::NotRegistered(implementation));
    }
    if metadata.is_interface(implementation) {
        return Err(InstantiationError::NotConstructible(implementation));
    }
    select_constructor(metadata, implementation)
        .map(|constructor| constructor.parameters.clone())
        .ok_or(InstantiationError::NoConstructor(implementation))
}

#[derive(Error, Debug, Clone)]
pub enum DependencyGraphError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("'{required_by}' needs '{dependency}' but no property supplies it")]
    MissingDependency {
        dependency: TypeInfo,
        required_by: String,
    },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {chain:?} - Consider injecting one of them as a property")]
    CircularDependency {
        from: String,
        to: String,
        chain: Vec<String>,
    },
}
impl From<InstantiationError> for DependencyGraphError {
    fn from(error: InstantiationError) -> Self {
        Self::Resolve(error.into())
    }
}

impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
