use std::{
    any::type_name,
    fmt::Debug,
    ops::Deref,
    sync::{Arc, OnceLock},
};

use crate::errors::AlreadyInjected;

/// Property filled by the engine after its owner was constructed
///
/// Should only be accessed once the request that built the owner has returned.
///
/// ### Panics
///
/// If dereferenced before it was injected
///
/// Note:
///
/// Objects handed out by a [crate::ContextFactory] always have their injected
/// properties set, so no panics should happen unless:
/// - It is accessed from inside a constructor
/// - It is accessed after the request that built the owner failed
///
pub struct Injected<T: ?Sized>(OnceLock<Arc<T>>);
impl<T: ?Sized + Debug> Debug for Injected<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.try_get() {
            Some(value) => f.debug_tuple("Injected").field(value).finish(),
            None => f.debug_tuple("Injected").field(&"<pending>").finish(),
        }
    }
}
impl<T: ?Sized> Default for Injected<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: ?Sized> Deref for Injected<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<T: ?Sized> Injected<T> {
    pub fn new() -> Self {
        Injected(OnceLock::new())
    }

    /// Accesses the injected value
    ///
    /// # Panics
    /// - When accessed before injection has completed
    pub fn get(&self) -> &Arc<T> {
        self.try_get()
            .expect("Injected property accessed before injection")
    }

    /// Try to access the injected value
    pub fn try_get(&self) -> Option<&Arc<T>> {
        self.0.get()
    }

    pub fn is_injected(&self) -> bool {
        self.0.get().is_some()
    }

    /// Assigns the value, once
    pub fn set(&self, value: Arc<T>) -> Result<(), AlreadyInjected> {
        self.0
            .set(value)
            .map_err(|_| AlreadyInjected(type_name::<T>()))
    }
}
