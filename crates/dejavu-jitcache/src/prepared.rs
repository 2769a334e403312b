//! Prepared kernel variants and the fast launch path.

use smallvec::SmallVec;

use crate::{
    JitCacheError, args::{ArgValue, KernelArgs, KernelCall}, grid::GridSize, key::CacheKey, toolchain::{
        CompiledKernel, DeviceId, LaunchHook, LaunchMetadata, LaunchRequest, LaunchResult, LoadedBinary, SharedDriver, StreamId
    }
};

/// Runtime argument values gathered for one launch.
pub(crate) type RuntimeArgs = SmallVec<[ArgValue; 8]>;

/// Collect the values of `names` from `args`, preserving the order of `names`.
pub(crate) fn bind_runtime_args(names: &[String], args: &KernelArgs) -> Result<RuntimeArgs, JitCacheError> {
    names
        .iter()
        .map(|name| {
            args.get(name)
                .cloned()
                .ok_or_else(|| JitCacheError::MissingArgument { name: name.clone() })
        })
        .collect()
}

/// How a prepared kernel obtains its grid at launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LaunchGrid {
    /// Resolved once at preparation and reused for every launch.
    Cached(GridSize),
    /// Resolved from the call's grid on every launch.
    PerCall,
}

/// Inputs gathered by `JitCache::prepare` for one variant.
pub(crate) struct PreparedParts<C> {
    pub kernel: C,
    pub example_grid: GridSize,
    pub cache_launch_grid: bool,
    pub launch_metadata: LaunchMetadata,
    pub runtime_arg_names: Vec<String>,
    pub cache_key: CacheKey,
    pub device: DeviceId,
    pub stream: StreamId,
    pub debug_launch: bool,
}

/// A compiled variant bound to a device and stream, ready to launch.
///
/// Launching only gathers the runtime arguments by name in a fixed order and
/// forwards them; constants, signature and launch metadata are never
/// revalidated. That is the whole point of the cache and also its contract:
/// a call must agree with the variant on every constant that is not a check key.
pub struct PreparedKernel<C: CompiledKernel> {
    kernel: C,
    launch_grid: LaunchGrid,
    launch_metadata: LaunchMetadata,
    enter_hook: Option<LaunchHook>,
    exit_hook: Option<LaunchHook>,
    runtime_arg_names: Vec<String>,
    cache_key: CacheKey,
    device: DeviceId,
    stream: StreamId,
    binary: LoadedBinary,
    driver: SharedDriver,
    debug_launch: bool,
}

impl<C: CompiledKernel> PreparedKernel<C> {
    /// Load the binary onto the device once.
    ///
    /// Fails with [`JitCacheError::OutOfResources`] before loading when the
    /// kernel needs more shared memory than the device offers.
    pub(crate) fn new(parts: PreparedParts<C>, driver: SharedDriver) -> Result<Self, JitCacheError> {
        let PreparedParts {
            kernel,
            example_grid,
            cache_launch_grid,
            launch_metadata,
            runtime_arg_names,
            cache_key,
            device,
            stream,
            debug_launch,
        } = parts;

        let max_shared = driver.max_shared_memory(device)?;
        let required = kernel.shared_memory_bytes();
        if required > max_shared {
            return Err(JitCacheError::OutOfResources {
                resource: "shared memory",
                required,
                available: max_shared,
            });
        }

        let binary = driver.load_binary(&kernel, device)?;
        tracing::debug!(
            "Loaded '{}' for key '{}' on {:?}: {} registers, {} spills",
            kernel.name(),
            cache_key,
            device,
            binary.n_regs,
            binary.n_spills
        );

        let launch_grid = if cache_launch_grid {
            LaunchGrid::Cached(example_grid)
        } else {
            LaunchGrid::PerCall
        };

        Ok(Self {
            enter_hook: kernel.launch_enter_hook(),
            exit_hook: kernel.launch_exit_hook(),
            kernel,
            launch_grid,
            launch_metadata,
            runtime_arg_names,
            cache_key,
            device,
            stream,
            binary,
            driver,
            debug_launch,
        })
    }

    /// Launch this variant with the runtime arguments of `call`.
    pub fn invoke(&self, call: &KernelCall) -> Result<LaunchResult, JitCacheError> {
        if !call.positional().is_empty() {
            return Err(JitCacheError::PositionalArgs {
                count: call.positional().len(),
            });
        }

        let args = bind_runtime_args(&self.runtime_arg_names, call.args())?;
        let grid = match self.launch_grid {
            LaunchGrid::Cached(grid) => grid,
            LaunchGrid::PerCall => call.grid().ok_or(JitCacheError::MissingGrid)?.resolve(call.args())?,
        };

        if self.debug_launch {
            tracing::trace!("Launching '{}' [{}] grid={} args={}", self.kernel.name(), self.cache_key, grid, args.len());
        }

        let result = self.driver.launch(LaunchRequest {
            grid,
            stream: self.stream,
            function: self.binary.function,
            packed_metadata: self.kernel.packed_metadata(),
            launch_metadata: &self.launch_metadata,
            enter_hook: self.enter_hook.as_ref(),
            exit_hook: self.exit_hook.as_ref(),
            args: &args,
        })?;
        Ok(result)
    }

    /// Key this variant is stored under.
    #[inline]
    pub fn key(&self) -> &CacheKey {
        &self.cache_key
    }

    pub fn compiled(&self) -> &C {
        &self.kernel
    }

    /// Grid memoized at preparation, when the cache was built with `cache_launch_grid`.
    pub fn concrete_grid(&self) -> Option<GridSize> {
        match self.launch_grid {
            LaunchGrid::Cached(grid) => Some(grid),
            LaunchGrid::PerCall => None,
        }
    }

    pub fn runtime_arg_names(&self) -> &[String] {
        &self.runtime_arg_names
    }

    pub fn launch_metadata(&self) -> &LaunchMetadata {
        &self.launch_metadata
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn stream(&self) -> StreamId {
        self.stream
    }

    pub fn binary(&self) -> &LoadedBinary {
        &self.binary
    }

    pub fn n_regs(&self) -> u32 {
        self.binary.n_regs
    }

    pub fn n_spills(&self) -> u32 {
        self.binary.n_spills
    }
}

impl<C: CompiledKernel> std::fmt::Debug for PreparedKernel<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedKernel")
            .field("name", &self.kernel.name())
            .field("cache_key", &self.cache_key)
            .field("launch_grid", &self.launch_grid)
            .field("runtime_arg_names", &self.runtime_arg_names)
            .field("device", &self.device)
            .field("stream", &self.stream)
            .field("binary", &self.binary)
            .finish_non_exhaustive()
    }
}

#[path = "prepared.test.rs"]
mod tests;
