//! Namespaced environment variables and the synchronised [`Environment`] facade.

pub mod cache;
pub mod guard;
pub mod value;

use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use cache::CacheEnvVar;

/// Namespaced environment variable identifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnvVar {
    /// Variables read by the launch cache and its tooling.
    Cache(CacheEnvVar),
}

impl From<CacheEnvVar> for EnvVar {
    fn from(value: CacheEnvVar) -> Self {
        Self::Cache(value)
    }
}

impl EnvVar {
    /// Canonical key of the variable in the process environment.
    pub const fn key(self) -> &'static str {
        match self {
            EnvVar::Cache(inner) => inner.key(),
        }
    }
}

/// Process environment facade.
///
/// Every mutation goes through one process-wide mutex so tests and scoped
/// guards never race on `std::env::set_var`.
pub struct Environment;

impl Environment {
    /// Acquire the global environment mutex.
    ///
    /// A poisoned mutex is recovered: the guarded state is `()` so there is
    /// nothing a panicking holder could have left half-written.
    pub fn lock() -> MutexGuard<'static, ()> {
        static ENV_MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_MUTEX.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read the variable as UTF-8 if present.
    pub fn get(var: impl Into<EnvVar>) -> Option<String> {
        std::env::var(var.into().key()).ok()
    }

    /// Replace the variable (`None` removes it) and return the old value,
    /// atomically with respect to every other mutation made through this crate.
    pub fn swap(var: impl Into<EnvVar>, value: Option<&str>) -> Option<String> {
        let var = var.into();
        let mut guard = Self::lock();
        let previous = Self::get(var);
        match value {
            Some(value) => Self::set_locked(var, value, &mut guard),
            None => Self::remove_locked(var, &mut guard),
        }
        previous
    }

    fn set_locked(var: EnvVar, value: &str, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: holding the environment mutex serialises every mutation made
        // through this crate.
        unsafe { std::env::set_var(var.key(), value) };
    }

    fn remove_locked(var: EnvVar, _guard: &mut MutexGuard<'static, ()>) {
        // SAFETY: see `set_locked`.
        unsafe { std::env::remove_var(var.key()) };
    }
}
