//! Typed environment variable descriptors.
//!
//! A [`TypedEnvVar`] is a `const` descriptor: an [`EnvVar`] plus a codec that
//! turns the raw string into a `bool` or a `tracing::Level` and back.
//!
//! ```
//! use dejavu_env::LOG_LEVEL;
//! use tracing::Level;
//!
//! let guard = LOG_LEVEL.set_guard(Level::DEBUG).expect("set log level");
//! assert_eq!(*guard, Level::DEBUG);
//! ```

use std::{borrow::Cow, ops::Deref};

use super::{EnvVar, Environment, guard::EnvVarGuard};

#[derive(Debug, thiserror::Error)]
pub enum EnvVarError {
    #[error("failed to parse environment variable {name} from '{value}': {source}")]
    Parse {
        name: &'static str,
        value: String,
        source: EnvValueError,
    },
    #[error("failed to format environment variable {name}: {source}")]
    Format { name: &'static str, source: EnvValueError },
}

/// Codec failure; carries only a human readable reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EnvValueError(Cow<'static, str>);

impl EnvValueError {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self(reason.into())
    }
}

/// String conversions for one variable type.
#[derive(Clone, Copy)]
pub struct EnvCodec<T> {
    pub parse: fn(&str) -> Result<T, EnvValueError>,
    pub format: fn(&T) -> Result<String, EnvValueError>,
}

#[derive(Clone, Copy)]
pub struct TypedEnvVar<T> {
    var: EnvVar,
    codec: EnvCodec<T>,
}

impl<T> TypedEnvVar<T> {
    pub const fn new(var: EnvVar, codec: EnvCodec<T>) -> Self {
        Self { var, codec }
    }

    #[must_use]
    pub const fn key(&self) -> &'static str {
        self.var.key()
    }

    /// `Ok(None)` when unset.
    pub fn get(&self) -> Result<Option<T>, EnvVarError> {
        Environment::get(self.var).map(|raw| self.decode(raw)).transpose()
    }

    /// Parsed value, or `default` when unset. Malformed values are still errors.
    pub fn get_or(&self, default: T) -> Result<T, EnvVarError> {
        Ok(self.get()?.unwrap_or(default))
    }

    /// Set the variable until the returned guard drops.
    pub fn set_guard(&self, value: T) -> Result<TypedEnvVarGuard<T>, EnvVarError> {
        let restore = EnvVarGuard::set(self.var, &self.encode(&value)?);
        Ok(TypedEnvVarGuard { _restore: restore, value })
    }

    #[must_use]
    pub fn unset_guard(&self) -> EnvVarGuard {
        EnvVarGuard::unset(self.var)
    }

    fn decode(&self, raw: String) -> Result<T, EnvVarError> {
        (self.codec.parse)(&raw).map_err(|source| EnvVarError::Parse {
            name: self.key(),
            value: raw,
            source,
        })
    }

    fn encode(&self, value: &T) -> Result<String, EnvVarError> {
        (self.codec.format)(value).map_err(|source| EnvVarError::Format { name: self.key(), source })
    }
}

/// Holds a typed value in the environment; derefs to that value.
pub struct TypedEnvVarGuard<T> {
    _restore: EnvVarGuard,
    value: T,
}

impl<T> Deref for TypedEnvVarGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
