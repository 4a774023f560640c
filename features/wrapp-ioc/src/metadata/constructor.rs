use std::sync::Arc;

use crate::{
    errors::ArgumentError,
    metadata::ConstructFn,
    types::{AnyArc, DynError, Injectable, Instance, TypeInfo},
};

/// A function which can construct `T` from shared dependencies
///
/// Implemented for any `Fn(Arc<A>, Arc<B>, ..) -> T` with up to eight
/// parameters. Parameters may be trait objects, e.g. `Arc<dyn Logger>`.
///
/// `Args` only disambiguates the implementations and is always inferred.
pub trait IntoConstructor<T, Args> {
    /// Parameter types in order
    fn parameters() -> Vec<TypeInfo>;

    fn into_construct_fn(self) -> ConstructFn;
}

/// Takes the next argument and views it as `A`
fn next_argument<'a, A: ?Sized + 'static>(
    args: &mut impl Iterator<Item = &'a Instance>,
) -> Result<Arc<A>, DynError> {
    let expected = TypeInfo::of::<A>();
    let instance = args.next().ok_or(ArgumentError::Missing(expected))?;

    let argument = instance
        .cast::<A>()
        .map_err(|actual| ArgumentError::Mismatch { expected, actual })?;
    Ok(argument)
}

macro_rules! impl_into_constructor {
    ($(($param:ident, $arg:ident)),*) => {
        impl<T, F, $($param,)*> IntoConstructor<T, ($(Arc<$param>,)*)> for F
        where
            T: Injectable,
            F: Fn($(Arc<$param>),*) -> T + Send + Sync + 'static,
            $($param: ?Sized + 'static,)*
        {
            fn parameters() -> Vec<TypeInfo> {
                vec![$(TypeInfo::of::<$param>()),*]
            }

            #[allow(unused_mut, unused_variables)]
            fn into_construct_fn(self) -> ConstructFn {
                Arc::new(move |args: &[Instance]| -> Result<AnyArc, DynError> {
                    let mut args = args.iter();
                    $(let $arg = next_argument::<$param>(&mut args)?;)*
                    Ok(Arc::new((self)($($arg),*)) as AnyArc)
                })
            }
        }
    };
}

impl_into_constructor!();
impl_into_constructor!((A1, a1));
impl_into_constructor!((A1, a1), (A2, a2));
impl_into_constructor!((A1, a1), (A2, a2), (A3, a3));
impl_into_constructor!((A1, a1), (A2, a2), (A3, a3), (A4, a4));
impl_into_constructor!((A1, a1), (A2, a2), (A3, a3), (A4, a4), (A5, a5));
impl_into_constructor!((A1, a1), (A2, a2), (A3, a3), (A4, a4), (A5, a5), (A6, a6));
impl_into_constructor!(
    (A1, a1),
    (A2, a2),
    (A3, a3),
    (A4, a4),
    (A5, a5),
    (A6, a6),
    (A7, a7)
);
impl_into_constructor!(
    (A1, a1),
    (A2, a2),
    (A3, a3),
    (A4, a4),
    (A5, a5),
    (A6, a6),
    (A7, a7),
    (A8, a8)
);

/// Wraps a fallible function taking the raw arguments
pub(crate) fn fallible<T: Injectable>(
    build: impl Fn(&[Instance]) -> Result<T, DynError> + Send + Sync + 'static,
) -> ConstructFn {
    Arc::new(move |args: &[Instance]| build(args).map(|built| Arc::new(built) as AnyArc))
}
