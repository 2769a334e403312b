#![cfg(test)]

use dejavu_env::{CacheEnvVar, EnvVarGuard};
use serial_test::serial;

use super::*;
use crate::sim::{SimDriver, SimKernel};

fn kernel() -> SimKernel {
    SimKernel::new(
        "rotary",
        [crate::KernelParam::runtime("x"), crate::KernelParam::constexpr("A")],
    )
}

#[test]
#[serial]
fn environment_sets_grid_default_when_not_given() {
    let _grid = EnvVarGuard::set(CacheEnvVar::CacheLaunchGrid, "true");
    let config = JitCacheConfig::from_env().expect("config should parse");
    assert!(config.cache_launch_grid);

    let lock = Arc::new(CacheLock::new("warmup"));
    let cache = jitcache(["A"], Some(lock), None)
        .with_config(config)
        .wrap(kernel(), Arc::new(SimDriver::new()))
        .expect("supported toolchain");
    assert!(cache.cache_launch_grid());
}

#[test]
#[serial]
fn explicit_grid_flag_overrides_environment() {
    let _grid = EnvVarGuard::set(CacheEnvVar::CacheLaunchGrid, "true");
    let config = JitCacheConfig::from_env().expect("config should parse");

    let cache = jitcache(["A"], None, Some(false))
        .with_config(config)
        .wrap(kernel(), Arc::new(SimDriver::new()))
        .expect("supported toolchain");
    assert!(!cache.cache_launch_grid());
}

#[test]
fn grid_flag_defaults_off_without_config() {
    let cache = jitcache(["A"], None, None)
        .wrap(kernel(), Arc::new(SimDriver::new()))
        .expect("supported toolchain");
    assert!(!cache.cache_launch_grid());
    assert!(cache.mode().is_dynamic());
}
