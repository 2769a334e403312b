//! Interfaces to the compiler and device driver the cache sits on top of.
//!
//! The cache never compiles or launches anything itself. A [`JitKernel`]
//! compiles a variant for the constants in a call, the resulting
//! [`CompiledKernel`] describes its binary and launch metadata, and a
//! [`Driver`] loads that binary and launches it.

use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;

use crate::{
    ToolchainError, args::{ArgValue, KernelCall}, grid::GridSize
};

/// How the toolchain treats a kernel parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    /// Compile-time constant; part of the binary's specialization.
    Constexpr,
    /// Specialized as constant by the toolchain (e.g. a `None` or literal `1`).
    Const,
    /// Passed at launch time.
    Runtime,
}

impl ParamKind {
    #[inline]
    pub const fn is_constant(self) -> bool {
        matches!(self, ParamKind::Constexpr | ParamKind::Const)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelParam {
    pub name: String,
    pub kind: ParamKind,
}

impl KernelParam {
    pub fn constexpr(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Constexpr,
        }
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Const,
        }
    }

    pub fn runtime(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Runtime,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToolchainVersion {
    pub major: u32,
    pub minor: u32,
}

impl ToolchainVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ToolchainVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StreamId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModuleHandle(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionHandle(pub u64);

/// Result of loading a binary onto a device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadedBinary {
    pub module: ModuleHandle,
    pub function: FunctionHandle,
    pub n_regs: u32,
    pub n_spills: u32,
}

/// Per-launch metadata computed once at preparation and handed to the launcher and hooks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchMetadata {
    entries: FxHashMap<String, String>,
}

impl LaunchMetadata {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Callback run by the launcher immediately before or after a launch.
pub type LaunchHook = Arc<dyn Fn(&LaunchMetadata) + Send + Sync>;

/// Everything the driver needs to issue one launch.
pub struct LaunchRequest<'a> {
    pub grid: GridSize,
    pub stream: StreamId,
    pub function: FunctionHandle,
    pub packed_metadata: &'a [u8],
    pub launch_metadata: &'a LaunchMetadata,
    pub enter_hook: Option<&'a LaunchHook>,
    pub exit_hook: Option<&'a LaunchHook>,
    /// Runtime arguments in the kernel's declared parameter order.
    pub args: &'a [ArgValue],
}

/// Whatever the launcher hands back; typically nothing, or an event to synchronize on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LaunchResult {
    pub event: Option<u64>,
}

/// A compiled kernel variant.
pub trait CompiledKernel {
    fn name(&self) -> &str;

    /// Device binary handed to [`Driver::load_binary`].
    fn binary(&self) -> &[u8];

    /// Static shared memory the kernel needs, in bytes.
    fn shared_memory_bytes(&self) -> usize;

    /// Toolchain-packed metadata forwarded verbatim to the launcher.
    fn packed_metadata(&self) -> &[u8];

    fn launch_metadata(&self, grid: GridSize, stream: StreamId, args: &[ArgValue]) -> LaunchMetadata;

    fn launch_enter_hook(&self) -> Option<LaunchHook> {
        None
    }

    fn launch_exit_hook(&self) -> Option<LaunchHook> {
        None
    }
}

/// A JIT-compilable kernel function.
pub trait JitKernel {
    type Compiled: CompiledKernel;

    fn name(&self) -> &str;

    /// Every declared parameter, in signature order.
    fn params(&self) -> &[KernelParam];

    fn toolchain_version(&self) -> ToolchainVersion;

    /// Compile (or fetch from the toolchain's own cache) the variant for the
    /// constants in `call`, without launching it.
    fn warmup(&self, call: &KernelCall) -> Result<Self::Compiled, ToolchainError>;
}

/// Device driver primitives.
pub trait Driver: Send + Sync {
    fn current_device(&self) -> DeviceId;

    fn current_stream(&self, device: DeviceId) -> StreamId;

    fn max_shared_memory(&self, device: DeviceId) -> Result<usize, ToolchainError>;

    fn load_binary(&self, kernel: &dyn CompiledKernel, device: DeviceId) -> Result<LoadedBinary, ToolchainError>;

    fn launch(&self, request: LaunchRequest<'_>) -> Result<LaunchResult, ToolchainError>;
}

pub type SharedDriver = Arc<dyn Driver>;
