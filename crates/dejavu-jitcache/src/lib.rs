//! Relaxed-check launch cache for JIT-compiled compute kernels.
//!
//! Launching a JIT kernel through the general path re-derives its
//! specialization and revalidates every argument on each call. When an
//! application knows which constexpr parameters actually vary, a
//! [`JitCache`] keyed on just those ("check keys") can skip all of that and
//! launch a [`PreparedKernel`] directly.
//!
//! # Usage
//! ```
//! use std::sync::Arc;
//! use dejavu_jitcache::{BufferHandle, CacheLock, JitCache, KernelCall, KernelParam, sim::{SimDriver, SimKernel}};
//!
//! let kernel = SimKernel::new(
//!     "paged_attention",
//!     [KernelParam::runtime("out"), KernelParam::constexpr("SLIDING_WINDOW")],
//! );
//! let lock = Arc::new(CacheLock::new("serving"));
//! let mut cache = JitCache::builder(kernel, Arc::new(SimDriver::new()))
//!     .check_keys(["SLIDING_WINDOW"])
//!     .cache_lock(Arc::clone(&lock))
//!     .build()?;
//!
//! let call = KernelCall::new().with_arg("out", BufferHandle(0x1000)).with_arg("SLIDING_WINDOW", 0i64).with_grid([32u32]);
//! cache.invoke(&call)?; // warmup compiles
//! lock.lock();
//! cache.invoke(&call)?; // pure lookup
//! # Ok::<(), dejavu_jitcache::JitCacheError>(())
//! ```

pub mod args;
mod config;
pub mod engine;
mod error;
pub mod factory;
pub mod grid;
pub mod key;
pub mod lock;
pub mod prepared;
pub mod sim;
pub mod toolchain;

pub use args::{ArgValue, BufferHandle, KernelArgs, KernelCall, PreHook};
pub use config::JitCacheConfig;
pub use engine::{DispatchMode, JitCache, JitCacheBuilder, MAX_TOOLCHAIN_VERSION, MIN_TOOLCHAIN_VERSION};
pub use error::{JitCacheError, ToolchainError};
pub use factory::{JitCacheFactory, jitcache};
pub use grid::{Grid, GridDims, GridSize};
pub use key::{CacheKey, DEFAULT_CACHE_KEY, SelectorKeys};
pub use lock::CacheLock;
pub use prepared::PreparedKernel;
pub use toolchain::{
    CompiledKernel, DeviceId, Driver, FunctionHandle, JitKernel, KernelParam, LaunchHook, LaunchMetadata, LaunchRequest, LaunchResult, LoadedBinary, ModuleHandle, ParamKind, SharedDriver, StreamId, ToolchainVersion
};
