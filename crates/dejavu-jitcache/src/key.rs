//! Cache keys and the selector ("check key") set they are derived from.

use std::{borrow::Borrow, fmt};

use crate::{JitCacheError, args::KernelArgs};

/// Key used when no check keys are configured: every call maps to one entry.
pub const DEFAULT_CACHE_KEY: &str = "_default_";

/// Identifies one prepared kernel variant.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for CacheKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Ordered constexpr parameter names whose values select a cached kernel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectorKeys(Vec<String>);

impl SelectorKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(keys.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|key| key == name)
    }

    /// Concatenate the textual value of every selector, in selector order.
    ///
    /// Values are joined without a separator, so `A=1, B=12` and `A=11, B=2`
    /// share the key `"112"`. Pick check keys that cannot collide this way.
    pub fn cache_key(&self, args: &KernelArgs) -> Result<CacheKey, JitCacheError> {
        if self.0.is_empty() {
            return Ok(CacheKey::from(DEFAULT_CACHE_KEY));
        }
        let mut key = String::new();
        for name in &self.0 {
            let value = args.get(name).ok_or_else(|| JitCacheError::MissingArgument { name: name.clone() })?;
            key.push_str(&value.to_string());
        }
        Ok(CacheKey(key))
    }

    /// Reject selector values that are not `int`, `bool` or `float`.
    pub fn check_types(&self, args: &KernelArgs) -> Result<(), JitCacheError> {
        for name in &self.0 {
            let value = args.get(name).ok_or_else(|| JitCacheError::MissingArgument { name: name.clone() })?;
            if !value.is_selector_type() {
                return Err(JitCacheError::UnsupportedSelectorType {
                    key: name.clone(),
                    found: value.type_name(),
                });
            }
        }
        Ok(())
    }
}

#[path = "key.test.rs"]
mod tests;
