use std::{fmt::Debug, sync::Arc};

use crate::{
    errors::ResolveError,
    factory::ContextFactory,
    types::{Instance, TypeInfo},
};

/// Handle given to application code, forwarding property access to a [ContextFactory]
#[derive(Clone)]
pub struct Context {
    factory: ContextFactory,
}
impl Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Context").field(&self.factory).finish()
    }
}

impl Context {
    /// Returns the instance of `property`
    pub fn get(&self, property: &str) -> Result<Instance, ResolveError> {
        self.factory.get(property)
    }

    /// Returns the instance of `property` viewed as `T`
    pub fn require<T: ?Sized + 'static>(&self, property: &str) -> Result<Arc<T>, ResolveError> {
        self.factory.require(property)
    }

    pub fn factory(&self) -> &ContextFactory {
        &self.factory
    }
}

/// The concrete implementation of a context type
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use wrapp_ioc::{BindContext, Context, ResolveError};
///
/// trait Clock: Send + Sync {}
/// trait AppContext {}
///
/// struct App(Context);
/// impl BindContext for App {
///     type Schema = dyn AppContext;
///
///     fn bind(context: Context) -> Self {
///         App(context)
///     }
/// }
/// impl App {
///     fn clock(&self) -> Result<Arc<dyn Clock>, ResolveError> {
///         self.0.require("clock")
///     }
/// }
/// ```
pub trait BindContext: Sized {
    /// The context type this implementation serves
    type Schema: ?Sized + 'static;

    fn bind(context: Context) -> Self;
}

impl ContextFactory {
    /// Creates the context implementation, bound to this factory
    ///
    /// Fails if `C` was written for a different context type.
    pub fn create<C: BindContext>(&self) -> Result<C, ResolveError> {
        let expected = TypeInfo::of::<C::Schema>();
        if expected != self.context_type() {
            return Err(ResolveError::ContextMismatch {
                expected,
                actual: self.context_type(),
            });
        }

        Ok(C::bind(self.context()))
    }

    /// Untyped handle to this factory
    pub fn context(&self) -> Context {
        Context {
            factory: self.clone(),
        }
    }
}
