//! Process environment helpers shared by the dejavu crates.

pub mod environment;

pub use environment::{
    EnvVar, Environment, cache::{CACHE_LAUNCH_GRID, CacheEnvVar, DEBUG_LAUNCH, LOG_LEVEL}, guard::EnvVarGuard, value::{EnvCodec, EnvValueError, EnvVarError, TypedEnvVar, TypedEnvVarGuard}
};
