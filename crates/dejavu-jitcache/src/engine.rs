//! The launch cache.
//!
//! [`JitCache`] maps a [`CacheKey`] derived from the call's check keys to a
//! [`PreparedKernel`] and launches it through the fast path. Two dispatch
//! modes exist, fixed at construction:
//!
//! - **static** ([`DispatchMode::Static`]): while the shared [`CacheLock`] is
//!   unlocked every call compiles and (re)inserts its variant; once locked,
//!   calls are pure lookups and an unknown key is an error.
//! - **dynamic** ([`DispatchMode::Dynamic`]): compile on miss, never consult a lock.

use std::{sync::Arc, time::Instant};

use rustc_hash::FxHashMap;

use crate::{
    JitCacheConfig, JitCacheError, args::KernelCall, key::{CacheKey, SelectorKeys}, lock::CacheLock, prepared::{PreparedKernel, PreparedParts, bind_runtime_args}, toolchain::{CompiledKernel, JitKernel, LaunchResult, SharedDriver, ToolchainVersion}
};

/// Oldest toolchain whose launcher layout the prepared fast path matches.
pub const MIN_TOOLCHAIN_VERSION: ToolchainVersion = ToolchainVersion::new(3, 0);
/// Newest toolchain whose launcher layout the prepared fast path matches.
pub const MAX_TOOLCHAIN_VERSION: ToolchainVersion = ToolchainVersion::new(3, 2);

#[derive(Clone, Debug)]
pub enum DispatchMode {
    /// Compile while `lock` is open, look up only once it is locked.
    Static(Arc<CacheLock>),
    /// Compile on miss.
    Dynamic,
}

impl DispatchMode {
    fn from_lock(lock: Option<Arc<CacheLock>>) -> Self {
        match lock {
            Some(lock) => DispatchMode::Static(lock),
            None => DispatchMode::Dynamic,
        }
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        matches!(self, DispatchMode::Dynamic)
    }

    #[must_use]
    pub fn lock(&self) -> Option<&Arc<CacheLock>> {
        match self {
            DispatchMode::Static(lock) => Some(lock),
            DispatchMode::Dynamic => None,
        }
    }
}

/// Relaxed-check launch cache around one [`JitKernel`].
///
/// Check keys must be a subset of the kernel's constexpr parameters; only
/// their values pick the cached binary. Every other constant is assumed
/// fixed for the lifetime of the cache, and runtime arguments are forwarded
/// without revalidation.
///
/// # Selector type check
///
/// Check-key values must be `int`, `bool` or `float`, but the check only
/// guards compilation: it runs in unlocked static mode and on a dynamic miss.
/// A lookup that hits compares key text alone, so `Str("1")` launches the
/// variant compiled for `Int(1)`.
///
/// # Key collisions in static mode
///
/// While the lock is open, a call whose key is already cached recompiles and
/// silently replaces the earlier variant; only a `warn` event is emitted.
/// This is expected when warming up by replaying the same calls, but it also
/// hides check keys that are too coarse: two calls differing in a constant
/// that is not a check key end up sharing one binary. Watch for the
/// "already cached" warning during warmup.
///
/// # Concurrency
///
/// [`invoke`](Self::invoke) takes `&mut self` because a miss mutates the map.
/// Share a cache between threads behind a `Mutex`.
pub struct JitCache<K: JitKernel> {
    kernel: K,
    driver: SharedDriver,
    check_keys: SelectorKeys,
    mode: DispatchMode,
    cache_launch_grid: bool,
    debug_launch: bool,
    kernel_cache: FxHashMap<CacheKey, PreparedKernel<K::Compiled>>,
}

impl<K: JitKernel> JitCache<K> {
    /// Build a cache; `cache_lock: None` selects dynamic mode.
    pub fn new<I, S>(
        kernel: K,
        driver: SharedDriver,
        check_keys: I,
        cache_lock: Option<Arc<CacheLock>>,
        cache_launch_grid: bool,
    ) -> Result<Self, JitCacheError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Self::builder(kernel, driver).check_keys(check_keys).cache_launch_grid(cache_launch_grid);
        if let Some(lock) = cache_lock {
            builder = builder.cache_lock(lock);
        }
        builder.build()
    }

    pub fn builder(kernel: K, driver: SharedDriver) -> JitCacheBuilder<K> {
        JitCacheBuilder {
            kernel,
            driver,
            check_keys: SelectorKeys::default(),
            cache_lock: None,
            cache_launch_grid: false,
            debug_launch: false,
        }
    }

    /// Launch `call`, compiling first when the dispatch mode calls for it.
    pub fn invoke(&mut self, call: &KernelCall) -> Result<LaunchResult, JitCacheError> {
        if !call.positional().is_empty() {
            return Err(JitCacheError::PositionalArgs {
                count: call.positional().len(),
            });
        }
        if call.pre_hook().is_some() {
            return Err(JitCacheError::PreHookUnsupported);
        }

        let locked = match &self.mode {
            DispatchMode::Static(lock) => Some(lock.is_locked()),
            DispatchMode::Dynamic => None,
        };
        match locked {
            Some(locked) => self.run_static(locked, call),
            None => self.run_dynamic(call),
        }
    }

    fn run_static(&mut self, locked: bool, call: &KernelCall) -> Result<LaunchResult, JitCacheError> {
        if !locked {
            self.check_keys.check_types(call.args())?;
            let prepared = self.prepare(call)?;
            if self.kernel_cache.contains_key(prepared.key()) {
                tracing::warn!(
                    "Kernel variant '{}' of '{}' already cached, will override (cache lock is not locked). \
                     The check_keys may be ambiguous, or the same call was already executed.",
                    prepared.key(),
                    self.kernel.name()
                );
            }
            self.kernel_cache.insert(prepared.key().clone(), prepared);
        }

        let key = self.check_keys.cache_key(call.args())?;
        let Some(prepared) = self.kernel_cache.get(&key) else {
            let cached = self.cached_keys();
            tracing::error!("Key {} of '{}' not in cache. Current cache: {:?}", key, self.kernel.name(), cached);
            return Err(JitCacheError::KeyNotCached {
                key: key.to_string(),
                cached,
            });
        };
        prepared.invoke(call)
    }

    fn run_dynamic(&mut self, call: &KernelCall) -> Result<LaunchResult, JitCacheError> {
        let key = self.check_keys.cache_key(call.args())?;
        if let Some(prepared) = self.kernel_cache.get(&key) {
            return prepared.invoke(call);
        }

        tracing::debug!(
            "Key {} of '{}' not in cache, compiling... Current cache: {:?}",
            key,
            self.kernel.name(),
            self.cached_keys()
        );
        self.check_keys.check_types(call.args())?;
        let prepared = self.prepare(call)?;
        let prepared = self.kernel_cache.entry(prepared.key().clone()).or_insert(prepared);
        prepared.invoke(call)
    }

    /// Compile the variant selected by `call` and bind it for fast launches.
    ///
    /// Does not touch the cache map.
    pub fn prepare(&self, call: &KernelCall) -> Result<PreparedKernel<K::Compiled>, JitCacheError> {
        let compile_start = Instant::now();
        let compiled = self.kernel.warmup(call)?;
        let compile_end = Instant::now();

        let runtime_arg_names: Vec<String> = self
            .kernel
            .params()
            .iter()
            .filter(|param| !param.kind.is_constant())
            .map(|param| param.name.clone())
            .collect();
        let offending: Vec<String> = runtime_arg_names
            .iter()
            .filter(|name| self.check_keys.contains(name))
            .cloned()
            .collect();
        if !offending.is_empty() {
            return Err(JitCacheError::NonConstantCheckKey {
                kernel: self.kernel.name().to_string(),
                keys: offending,
            });
        }

        let runtime_args = bind_runtime_args(&runtime_arg_names, call.args())?;
        let bind_end = Instant::now();

        let example_grid = call.grid().ok_or(JitCacheError::MissingGrid)?.resolve(call.args())?;
        let device = self.driver.current_device();
        let stream = self.driver.current_stream(device);
        let launch_metadata = compiled.launch_metadata(example_grid, stream, &runtime_args);

        let prepared = PreparedKernel::new(
            PreparedParts {
                kernel: compiled,
                example_grid,
                cache_launch_grid: self.cache_launch_grid,
                launch_metadata,
                runtime_arg_names,
                cache_key: self.check_keys.cache_key(call.args())?,
                device,
                stream,
                debug_launch: self.debug_launch,
            },
            Arc::clone(&self.driver),
        )?;
        let wrapper_end = Instant::now();

        tracing::debug!(
            "JIT compilation of '{}' [{}] took {:?}, binding {:?}, wrapper {:?}.",
            prepared.compiled().name(),
            prepared.key(),
            compile_end - compile_start,
            bind_end - compile_end,
            wrapper_end - bind_end
        );
        Ok(prepared)
    }

    /// Key a call would be looked up under.
    pub fn cache_key(&self, call: &KernelCall) -> Result<CacheKey, JitCacheError> {
        self.check_keys.cache_key(call.args())
    }

    /// Every cached key, sorted.
    pub fn cached_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.kernel_cache.keys().map(ToString::to_string).collect();
        keys.sort_unstable();
        keys
    }

    pub fn get(&self, key: &str) -> Option<&PreparedKernel<K::Compiled>> {
        self.kernel_cache.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.kernel_cache.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.kernel_cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kernel_cache.is_empty()
    }

    pub fn mode(&self) -> &DispatchMode {
        &self.mode
    }

    pub fn check_keys(&self) -> &SelectorKeys {
        &self.check_keys
    }

    pub fn cache_launch_grid(&self) -> bool {
        self.cache_launch_grid
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }
}

impl<K: JitKernel> std::fmt::Debug for JitCache<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JitCache")
            .field("kernel", &self.kernel.name())
            .field("check_keys", &self.check_keys)
            .field("mode", &self.mode)
            .field("cache_launch_grid", &self.cache_launch_grid)
            .field("cached_keys", &self.cached_keys())
            .finish_non_exhaustive()
    }
}

/// Builder for [`JitCache`].
pub struct JitCacheBuilder<K: JitKernel> {
    kernel: K,
    driver: SharedDriver,
    check_keys: SelectorKeys,
    cache_lock: Option<Arc<CacheLock>>,
    cache_launch_grid: bool,
    debug_launch: bool,
}

impl<K: JitKernel> JitCacheBuilder<K> {
    #[must_use]
    pub fn check_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.check_keys = SelectorKeys::new(keys);
        self
    }

    /// Select static mode, observing `lock`.
    #[must_use]
    pub fn cache_lock(mut self, lock: Arc<CacheLock>) -> Self {
        self.cache_lock = Some(lock);
        self
    }

    /// Treat the launch grid as static: resolve it once per variant and reuse it.
    #[must_use]
    pub fn cache_launch_grid(mut self, cache: bool) -> Self {
        self.cache_launch_grid = cache;
        self
    }

    /// Apply environment-derived settings. Later explicit setters win.
    #[must_use]
    pub fn config(mut self, config: &JitCacheConfig) -> Self {
        self.debug_launch = config.debug_launch;
        self.cache_launch_grid = config.cache_launch_grid;
        self
    }

    pub fn build(self) -> Result<JitCache<K>, JitCacheError> {
        let version = self.kernel.toolchain_version();
        if !(MIN_TOOLCHAIN_VERSION..=MAX_TOOLCHAIN_VERSION).contains(&version) {
            return Err(JitCacheError::UnsupportedToolchain {
                found: version,
                min: MIN_TOOLCHAIN_VERSION,
                max: MAX_TOOLCHAIN_VERSION,
            });
        }

        Ok(JitCache {
            kernel: self.kernel,
            driver: self.driver,
            check_keys: self.check_keys,
            mode: DispatchMode::from_lock(self.cache_lock),
            cache_launch_grid: self.cache_launch_grid,
            debug_launch: self.debug_launch,
            kernel_cache: FxHashMap::default(),
        })
    }
}

#[path = "engine.test.rs"]
mod tests;
