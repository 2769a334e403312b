//! Scoped environment mutation.

use super::{EnvVar, Environment};

/// Puts the variable back the way it was when dropped.
#[must_use = "the variable is restored as soon as the guard is dropped"]
pub struct EnvVarGuard {
    var: EnvVar,
    previous: Option<String>,
}

impl EnvVarGuard {
    pub fn set(var: impl Into<EnvVar>, value: &str) -> Self {
        Self::swap(var.into(), Some(value))
    }

    pub fn unset(var: impl Into<EnvVar>) -> Self {
        Self::swap(var.into(), None)
    }

    fn swap(var: EnvVar, value: Option<&str>) -> Self {
        let previous = Environment::swap(var, value);
        Self { var, previous }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        Environment::swap(self.var, self.previous.as_deref());
    }
}
