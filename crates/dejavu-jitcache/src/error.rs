use thiserror::Error;

use crate::toolchain::ToolchainVersion;

/// Failures reported by the compiler or driver behind a [`JitKernel`](crate::JitKernel).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolchainError {
    #[error("Compilation of '{kernel}' failed: {message}")]
    Compile { kernel: String, message: String },
    #[error("Loading binary '{kernel}' failed: {message}")]
    Load { kernel: String, message: String },
    #[error("Launch failed: {0}")]
    Launch(String),
    #[error("Device query failed: {0}")]
    Device(String),
}

#[derive(Error, Debug)]
pub enum JitCacheError {
    #[error("JitCache only supports keyword arguments, got {count} positional")]
    PositionalArgs { count: usize },
    #[error("JitCache does not support pre_hook; per-call argument mutation defeats the relaxed checks")]
    PreHookUnsupported,
    #[error("Missing argument '{name}'")]
    MissingArgument { name: String },
    #[error("Check key '{key}' has type {found}; only int, bool and float select a cached kernel")]
    UnsupportedSelectorType { key: String, found: &'static str },
    #[error("check_keys of '{kernel}' must only contain constexpr parameters, but {keys:?} are runtime arguments")]
    NonConstantCheckKey { kernel: String, keys: Vec<String> },
    #[error("Key {key} not in cache. Current cache: {cached:?}")]
    KeyNotCached { key: String, cached: Vec<String> },
    #[error("Out of resources: {resource}, required {required}, hardware limit {available}")]
    OutOfResources {
        resource: &'static str,
        required: usize,
        available: usize,
    },
    #[error("No launch grid supplied")]
    MissingGrid,
    #[error("Launch grid must have 1 to 3 dimensions, got {dims}")]
    InvalidGrid { dims: usize },
    #[error("Toolchain {found} is not supported (expected {min} ..= {max})")]
    UnsupportedToolchain {
        found: ToolchainVersion,
        min: ToolchainVersion,
        max: ToolchainVersion,
    },
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),
}
