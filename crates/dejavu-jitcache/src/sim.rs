//! Host-memory toolchain for tests and demos.
//!
//! [`SimKernel`] "compiles" by recording the constants of a call, and
//! [`SimDriver`] "launches" by recording every request. Counters are shared
//! through `Arc`s so they stay observable after the kernel moves into a cache.

use std::sync::{
    Arc, Mutex, PoisonError, atomic::{AtomicU64, AtomicUsize, Ordering}
};

use crate::{
    ToolchainError, args::{ArgValue, KernelCall}, grid::GridSize, toolchain::{
        CompiledKernel, DeviceId, Driver, FunctionHandle, JitKernel, KernelParam, LaunchHook, LaunchMetadata, LaunchRequest, LaunchResult, LoadedBinary, ModuleHandle, StreamId, ToolchainVersion
    }
};

/// Default shared memory limit of a [`SimDriver`], in bytes.
pub const SIM_MAX_SHARED_MEMORY: usize = 48 * 1024;

/// A kernel signature the simulated toolchain can compile.
pub struct SimKernel {
    name: String,
    params: Vec<KernelParam>,
    version: ToolchainVersion,
    shared_memory_bytes: usize,
    enter_hook: Option<LaunchHook>,
    exit_hook: Option<LaunchHook>,
    compiles: Arc<AtomicUsize>,
}

impl SimKernel {
    pub fn new(name: impl Into<String>, params: impl IntoIterator<Item = KernelParam>) -> Self {
        Self {
            name: name.into(),
            params: params.into_iter().collect(),
            version: ToolchainVersion::new(3, 1),
            shared_memory_bytes: 0,
            enter_hook: None,
            exit_hook: None,
            compiles: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn with_shared_memory(mut self, bytes: usize) -> Self {
        self.shared_memory_bytes = bytes;
        self
    }

    #[must_use]
    pub fn with_toolchain_version(mut self, version: ToolchainVersion) -> Self {
        self.version = version;
        self
    }

    #[must_use]
    pub fn with_launch_hooks(mut self, enter: Option<LaunchHook>, exit: Option<LaunchHook>) -> Self {
        self.enter_hook = enter;
        self.exit_hook = exit;
        self
    }

    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::Relaxed)
    }

    /// Handle to the compile counter that outlives moves of the kernel.
    pub fn compile_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.compiles)
    }
}

/// Output of [`SimKernel::warmup`].
pub struct SimCompiled {
    name: String,
    constants: Vec<(String, String)>,
    binary: Vec<u8>,
    shared_memory_bytes: usize,
    enter_hook: Option<LaunchHook>,
    exit_hook: Option<LaunchHook>,
}

impl SimCompiled {
    /// Constant values baked into this variant, in signature order.
    pub fn constants(&self) -> &[(String, String)] {
        &self.constants
    }
}

impl JitKernel for SimKernel {
    type Compiled = SimCompiled;

    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> &[KernelParam] {
        &self.params
    }

    fn toolchain_version(&self) -> ToolchainVersion {
        self.version
    }

    fn warmup(&self, call: &KernelCall) -> Result<SimCompiled, ToolchainError> {
        let mut constants = Vec::new();
        for param in self.params.iter().filter(|p| p.kind.is_constant()) {
            let value = call.get(&param.name).ok_or_else(|| ToolchainError::Compile {
                kernel: self.name.clone(),
                message: format!("missing constexpr '{}'", param.name),
            })?;
            constants.push((param.name.clone(), value.to_string()));
        }

        let mut binary = self.name.clone().into_bytes();
        for (name, value) in &constants {
            binary.extend_from_slice(format!(";{name}={value}").as_bytes());
        }

        self.compiles.fetch_add(1, Ordering::Relaxed);
        Ok(SimCompiled {
            name: self.name.clone(),
            constants,
            binary,
            shared_memory_bytes: self.shared_memory_bytes,
            enter_hook: self.enter_hook.clone(),
            exit_hook: self.exit_hook.clone(),
        })
    }
}

impl CompiledKernel for SimCompiled {
    fn name(&self) -> &str {
        &self.name
    }

    fn binary(&self) -> &[u8] {
        &self.binary
    }

    fn shared_memory_bytes(&self) -> usize {
        self.shared_memory_bytes
    }

    fn packed_metadata(&self) -> &[u8] {
        &[]
    }

    fn launch_metadata(&self, grid: GridSize, stream: StreamId, args: &[ArgValue]) -> LaunchMetadata {
        LaunchMetadata::new()
            .with("name", self.name.clone())
            .with("grid", grid.to_string())
            .with("stream", stream.0.to_string())
            .with("num_args", args.len().to_string())
    }

    fn launch_enter_hook(&self) -> Option<LaunchHook> {
        self.enter_hook.clone()
    }

    fn launch_exit_hook(&self) -> Option<LaunchHook> {
        self.exit_hook.clone()
    }
}

/// One launch observed by a [`SimDriver`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimLaunch {
    pub grid: GridSize,
    pub stream: StreamId,
    pub function: FunctionHandle,
    pub args: Vec<ArgValue>,
    pub metadata: LaunchMetadata,
}

pub struct SimDriver {
    device: DeviceId,
    stream: StreamId,
    max_shared_memory: usize,
    next_handle: AtomicU64,
    loads: AtomicUsize,
    launches: Mutex<Vec<SimLaunch>>,
}

impl SimDriver {
    pub fn new() -> Self {
        Self {
            device: DeviceId(0),
            stream: StreamId(0),
            max_shared_memory: SIM_MAX_SHARED_MEMORY,
            next_handle: AtomicU64::new(1),
            loads: AtomicUsize::new(0),
            launches: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_max_shared_memory(mut self, bytes: usize) -> Self {
        self.max_shared_memory = bytes;
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: StreamId) -> Self {
        self.stream = stream;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn launches(&self) -> Vec<SimLaunch> {
        self.launches.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn last_launch(&self) -> Option<SimLaunch> {
        self.launches.lock().unwrap_or_else(PoisonError::into_inner).last().cloned()
    }
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for SimDriver {
    fn current_device(&self) -> DeviceId {
        self.device
    }

    fn current_stream(&self, _device: DeviceId) -> StreamId {
        self.stream
    }

    fn max_shared_memory(&self, _device: DeviceId) -> Result<usize, ToolchainError> {
        Ok(self.max_shared_memory)
    }

    fn load_binary(&self, kernel: &dyn CompiledKernel, _device: DeviceId) -> Result<LoadedBinary, ToolchainError> {
        if kernel.binary().is_empty() {
            return Err(ToolchainError::Load {
                kernel: kernel.name().to_string(),
                message: "empty binary".to_string(),
            });
        }
        self.loads.fetch_add(1, Ordering::Relaxed);
        let handle = self.next_handle.fetch_add(2, Ordering::Relaxed);
        Ok(LoadedBinary {
            module: ModuleHandle(handle),
            function: FunctionHandle(handle + 1),
            // Pretend register pressure grows with the specialization string.
            n_regs: 16 + u32::try_from(kernel.binary().len() % 64).unwrap_or(0),
            n_spills: 0,
        })
    }

    fn launch(&self, request: LaunchRequest<'_>) -> Result<LaunchResult, ToolchainError> {
        if let Some(hook) = request.enter_hook {
            hook(request.launch_metadata);
        }
        let event = {
            let mut launches = self.launches.lock().unwrap_or_else(PoisonError::into_inner);
            launches.push(SimLaunch {
                grid: request.grid,
                stream: request.stream,
                function: request.function,
                args: request.args.to_vec(),
                metadata: request.launch_metadata.clone(),
            });
            launches.len() as u64
        };
        if let Some(hook) = request.exit_hook {
            hook(request.launch_metadata);
        }
        Ok(LaunchResult { event: Some(event) })
    }
}
