use crate::{
    metadata::{ConstructorDescriptor, TypeMetadata},
    types::TypeInfo,
};

/// Picks the constructor used to build `ty`
///
/// The first inject marked constructor wins, otherwise the first declared one.
/// Returns `None` if `ty` declares no constructor.
pub fn select_constructor<'m>(
    metadata: &'m dyn TypeMetadata,
    ty: TypeInfo,
) -> Option<&'m ConstructorDescriptor> {
    let constructors = metadata.constructors_of(ty);
    constructors
        .iter()
        .find(|constructor| metadata.constructor_has_inject_marker(constructor))
        .or_else(|| constructors.first())
}
