//! Decorator-style construction: fix the cache options once, wrap many kernels.

use std::sync::Arc;

use crate::{
    JitCacheConfig, JitCacheError, engine::JitCache, key::SelectorKeys, lock::CacheLock, toolchain::{JitKernel, SharedDriver}
};

/// Options shared by every cache a factory produces.
#[derive(Clone, Debug)]
pub struct JitCacheFactory {
    check_keys: SelectorKeys,
    cache_lock: Option<Arc<CacheLock>>,
    cache_launch_grid: Option<bool>,
    config: JitCacheConfig,
}

/// Start a cache factory.
///
/// * `check_keys` - constexpr parameters that select the cached binary; only
///   `int`, `bool` and `float` values are accepted.
/// * `cache_lock` - lock observed by the caches (static mode); `None` gives
///   dynamic mode.
/// * `cache_launch_grid` - the launch grid is static and resolved once per variant;
///   `None` defers to [`JitCacheConfig::cache_launch_grid`] (off unless configured).
///
/// ```
/// use std::sync::Arc;
/// use dejavu_jitcache::{CacheLock, KernelParam, jitcache, sim::{SimDriver, SimKernel}};
///
/// let lock = Arc::new(CacheLock::new("global"));
/// let factory = jitcache(["USE_ALIBI"], Some(Arc::clone(&lock)), None);
/// let kernel = SimKernel::new("attn", [KernelParam::runtime("q"), KernelParam::constexpr("USE_ALIBI")]);
/// let cache = factory.wrap(kernel, Arc::new(SimDriver::new())).expect("supported toolchain");
/// assert!(cache.is_empty());
/// ```
pub fn jitcache<I, S>(check_keys: I, cache_lock: Option<Arc<CacheLock>>, cache_launch_grid: Option<bool>) -> JitCacheFactory
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    JitCacheFactory {
        check_keys: SelectorKeys::new(check_keys),
        cache_lock,
        cache_launch_grid,
        config: JitCacheConfig::default(),
    }
}

impl JitCacheFactory {
    /// Apply environment-derived settings. An explicit `cache_launch_grid` still wins.
    #[must_use]
    pub fn with_config(mut self, config: JitCacheConfig) -> Self {
        self.config = config;
        self
    }

    pub fn wrap<K: JitKernel>(&self, kernel: K, driver: SharedDriver) -> Result<JitCache<K>, JitCacheError> {
        let mut builder = JitCache::builder(kernel, driver)
            .config(&self.config)
            .check_keys(self.check_keys.iter());
        if let Some(cache) = self.cache_launch_grid {
            builder = builder.cache_launch_grid(cache);
        }
        if let Some(lock) = &self.cache_lock {
            builder = builder.cache_lock(Arc::clone(lock));
        }
        builder.build()
    }
}

#[path = "factory.test.rs"]
mod tests;
