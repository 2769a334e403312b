#![cfg(test)]

use std::sync::{Arc, atomic::Ordering};

use super::*;
use crate::{
    args::{ArgValue, BufferHandle, KernelArgs}, grid::{Grid, GridSize}, sim::{SimDriver, SimKernel}, toolchain::KernelParam
};

fn attention() -> SimKernel {
    SimKernel::new(
        "attention",
        [
            KernelParam::runtime("x"),
            KernelParam::runtime("y"),
            KernelParam::constexpr("A"),
            KernelParam::constexpr("B"),
        ],
    )
}

fn call(a: impl Into<ArgValue>) -> KernelCall {
    KernelCall::new()
        .with_arg("x", BufferHandle(1))
        .with_arg("y", BufferHandle(2))
        .with_arg("A", a)
        .with_arg("B", 64i64)
        .with_grid([4u32])
}

fn static_cache(
    kernel: SimKernel,
    driver: &Arc<SimDriver>,
    lock: &Arc<CacheLock>,
) -> JitCache<SimKernel> {
    JitCache::new(kernel, Arc::clone(driver) as SharedDriver, ["A"], Some(Arc::clone(lock)), false).expect("supported toolchain")
}

fn dynamic_cache(kernel: SimKernel, driver: &Arc<SimDriver>) -> JitCache<SimKernel> {
    JitCache::new(kernel, Arc::clone(driver) as SharedDriver, ["A"], None, false).expect("supported toolchain")
}

#[test]
fn dynamic_mode_compiles_once_per_key() {
    let kernel = attention();
    let compiles = kernel.compile_counter();
    let driver = Arc::new(SimDriver::new());
    let mut cache = dynamic_cache(kernel, &driver);
    assert!(cache.mode().is_dynamic());

    for _ in 0..3 {
        cache.invoke(&call(1i64)).expect("launch");
    }
    cache.invoke(&call(2i64)).expect("launch");

    assert_eq!(compiles.load(Ordering::Relaxed), 2);
    assert_eq!(driver.load_count(), 2);
    assert_eq!(driver.launch_count(), 4);
    assert_eq!(cache.cached_keys(), ["1", "2"]);
}

#[test]
fn static_mode_recompiles_until_locked() {
    let kernel = attention();
    let compiles = kernel.compile_counter();
    let driver = Arc::new(SimDriver::new());
    let lock = Arc::new(CacheLock::new("attention"));
    let mut cache = static_cache(kernel, &driver, &lock);
    assert!(!cache.mode().is_dynamic());

    cache.invoke(&call(1i64)).expect("warmup");
    cache.invoke(&call(1i64)).expect("warmup overwrites");
    assert_eq!(compiles.load(Ordering::Relaxed), 2);
    assert_eq!(cache.len(), 1);

    lock.lock();
    cache.invoke(&call(1i64)).expect("locked hit");
    assert_eq!(compiles.load(Ordering::Relaxed), 2);
    assert_eq!(driver.launch_count(), 3);
}

#[test]
fn locked_miss_lists_cached_keys() {
    let kernel = attention();
    let compiles = kernel.compile_counter();
    let driver = Arc::new(SimDriver::new());
    let lock = Arc::new(CacheLock::new("attention"));
    let mut cache = static_cache(kernel, &driver, &lock);

    cache.invoke(&call(2i64)).expect("warmup");
    cache.invoke(&call(1i64)).expect("warmup");
    lock.lock();

    match cache.invoke(&call(3i64)) {
        Err(JitCacheError::KeyNotCached { key, cached }) => {
            assert_eq!(key, "3");
            assert_eq!(cached, ["1", "2"]);
        }
        other => panic!("expected a cache miss, got {other:?}"),
    }
    assert_eq!(compiles.load(Ordering::Relaxed), 2);
    assert_eq!(driver.launch_count(), 2);
}

#[test]
fn unlocking_resumes_warmup() {
    let driver = Arc::new(SimDriver::new());
    let lock = Arc::new(CacheLock::new("attention"));
    let mut cache = static_cache(attention(), &driver, &lock);

    lock.lock();
    assert!(cache.invoke(&call(1i64)).is_err());
    lock.unlock();
    cache.invoke(&call(1i64)).expect("compiled after unlock");
    assert!(cache.contains_key("1"));
}

#[test]
fn empty_check_keys_share_one_variant() {
    let kernel = attention();
    let compiles = kernel.compile_counter();
    let driver = Arc::new(SimDriver::new());
    let mut cache = JitCache::new(kernel, Arc::clone(&driver) as SharedDriver, Vec::<String>::new(), None, false)
        .expect("supported toolchain");

    cache.invoke(&call(1i64)).expect("launch");
    // A differs but is not a check key, so the first binary is reused.
    cache.invoke(&call(2i64)).expect("launch");

    assert_eq!(compiles.load(Ordering::Relaxed), 1);
    assert_eq!(cache.cached_keys(), [crate::key::DEFAULT_CACHE_KEY]);
    let prepared = cache.get(crate::key::DEFAULT_CACHE_KEY).expect("cached");
    assert_eq!(prepared.compiled().constants()[0], ("A".to_string(), "1".to_string()));
}

#[test]
fn selector_type_is_checked_before_compiling() {
    let kernel = attention();
    let compiles = kernel.compile_counter();
    let driver = Arc::new(SimDriver::new());
    let lock = Arc::new(CacheLock::new("attention"));
    let mut cache = static_cache(kernel, &driver, &lock);

    match cache.invoke(&call(vec![1.0f64, 2.0])) {
        Err(JitCacheError::UnsupportedSelectorType { key, found }) => {
            assert_eq!(key, "A");
            assert_eq!(found, "list[float]");
        }
        other => panic!("expected a selector type error, got {other:?}"),
    }
    assert_eq!(compiles.load(Ordering::Relaxed), 0);
    assert!(cache.is_empty());
}

#[test]
fn selector_type_is_not_rechecked_on_hit() {
    let kernel = attention();
    let compiles = kernel.compile_counter();
    let driver = Arc::new(SimDriver::new());
    let lock = Arc::new(CacheLock::new("attention"));
    let mut cache = static_cache(kernel, &driver, &lock);

    cache.invoke(&call(1i64)).expect("warmup");
    lock.lock();
    cache.invoke(&call("1")).expect("same key text hits the int variant");
    assert_eq!(compiles.load(Ordering::Relaxed), 1);
    assert_eq!(driver.launch_count(), 2);

    lock.unlock();
    assert!(matches!(
        cache.invoke(&call("1")),
        Err(JitCacheError::UnsupportedSelectorType { found: "str", .. })
    ));
}

#[test]
fn non_constant_check_key_never_launches() {
    let driver = Arc::new(SimDriver::new());
    let mut cache = JitCache::new(attention(), Arc::clone(&driver) as SharedDriver, ["x"], None, false)
        .expect("supported toolchain");

    // An int runtime value passes the selector type check and reaches preparation.
    let call = call(1i64).with_arg("x", 3i64);
    match cache.invoke(&call) {
        Err(JitCacheError::NonConstantCheckKey { kernel, keys }) => {
            assert_eq!(kernel, "attention");
            assert_eq!(keys, ["x"]);
        }
        other => panic!("expected a non-constant check key error, got {other:?}"),
    }
    assert_eq!(driver.launch_count(), 0);
    assert!(cache.is_empty());
}

#[test]
fn positional_and_pre_hook_are_rejected() {
    let driver = Arc::new(SimDriver::new());
    let mut cache = dynamic_cache(attention(), &driver);

    let positional = call(1i64).with_positional(BufferHandle(9));
    assert!(matches!(
        cache.invoke(&positional),
        Err(JitCacheError::PositionalArgs { count: 1 })
    ));

    let hooked = call(1i64).with_pre_hook(Arc::new(|args: &mut KernelArgs| {
        args.insert("A".into(), ArgValue::Int(7));
    }));
    assert!(matches!(cache.invoke(&hooked), Err(JitCacheError::PreHookUnsupported)));
    assert!(cache.is_empty());
    assert_eq!(driver.launch_count(), 0);
}

#[test]
fn missing_check_key_argument_is_reported() {
    let driver = Arc::new(SimDriver::new());
    let mut cache = dynamic_cache(attention(), &driver);
    let call = KernelCall::new()
        .with_arg("x", BufferHandle(1))
        .with_arg("y", BufferHandle(2))
        .with_grid(1u32);
    match cache.invoke(&call) {
        Err(JitCacheError::MissingArgument { name }) => assert_eq!(name, "A"),
        other => panic!("expected a missing argument, got {other:?}"),
    }
}

#[test]
fn missing_grid_fails_preparation() {
    let driver = Arc::new(SimDriver::new());
    let mut cache = dynamic_cache(attention(), &driver);
    let call = KernelCall::new()
        .with_arg("x", BufferHandle(1))
        .with_arg("y", BufferHandle(2))
        .with_arg("A", 1i64)
        .with_arg("B", 64i64);
    assert!(matches!(cache.invoke(&call), Err(JitCacheError::MissingGrid)));
    assert!(cache.is_empty());
}

#[test]
fn toolchain_outside_supported_range_is_rejected() {
    for (major, minor) in [(2, 9), (3, 3), (4, 0)] {
        let kernel = attention().with_toolchain_version(ToolchainVersion::new(major, minor));
        match JitCache::builder(kernel, Arc::new(SimDriver::new())).build() {
            Err(JitCacheError::UnsupportedToolchain { found, min, max }) => {
                assert_eq!(found, ToolchainVersion::new(major, minor));
                assert_eq!(min, MIN_TOOLCHAIN_VERSION);
                assert_eq!(max, MAX_TOOLCHAIN_VERSION);
            }
            other => panic!("expected unsupported toolchain, got {other:?}"),
        }
    }

    for minor in 0..=2 {
        let kernel = attention().with_toolchain_version(ToolchainVersion::new(3, minor));
        assert!(JitCache::builder(kernel, Arc::new(SimDriver::new())).build().is_ok());
    }
}

#[test]
fn cached_launch_grid_ignores_later_resolvers() {
    let driver = Arc::new(SimDriver::new());
    let mut cache = JitCache::builder(attention(), Arc::clone(&driver) as SharedDriver)
        .check_keys(["A"])
        .cache_launch_grid(true)
        .build()
        .expect("supported toolchain");
    assert!(cache.cache_launch_grid());

    let first = call(1i64).with_grid(Grid::resolver(|_: &KernelArgs| [128u32, 1, 1]));
    cache.invoke(&first).expect("launch");
    let second = call(1i64).with_grid(Grid::resolver(|_: &KernelArgs| [7u32, 7, 1]));
    cache.invoke(&second).expect("launch");

    let grids: Vec<GridSize> = driver.launches().iter().map(|l| l.grid).collect();
    assert_eq!(grids, [GridSize::new(128, 1, 1), GridSize::new(128, 1, 1)]);
    assert_eq!(cache.get("1").and_then(|p| p.concrete_grid()), Some(GridSize::new(128, 1, 1)));
}

#[test]
fn per_call_grid_follows_resolver() {
    let driver = Arc::new(SimDriver::new());
    let mut cache = dynamic_cache(attention(), &driver);

    cache.invoke(&call(1i64).with_grid([128u32, 1, 1])).expect("launch");
    cache.invoke(&call(1i64).with_grid([7u32, 7])).expect("launch");

    let grids: Vec<GridSize> = driver.launches().iter().map(|l| l.grid).collect();
    assert_eq!(grids, [GridSize::new(128, 1, 1), GridSize::new(7, 7, 1)]);
}

#[test]
fn config_sets_launch_options() {
    let config = JitCacheConfig {
        debug_launch: true,
        cache_launch_grid: true,
    };
    let cache = JitCache::builder(attention(), Arc::new(SimDriver::new()))
        .config(&config)
        .build()
        .expect("supported toolchain");
    assert!(cache.cache_launch_grid());
    assert!(cache.debug_launch);

    let cache = JitCache::builder(attention(), Arc::new(SimDriver::new()))
        .config(&config)
        .cache_launch_grid(false)
        .build()
        .expect("supported toolchain");
    assert!(!cache.cache_launch_grid());
}

#[test]
fn prepare_does_not_touch_the_map() {
    let driver = Arc::new(SimDriver::new());
    let cache = dynamic_cache(attention(), &driver);
    let prepared = cache.prepare(&call(5i64)).expect("prepared");
    assert_eq!(prepared.key().as_str(), "5");
    assert_eq!(prepared.runtime_arg_names(), ["x", "y"]);
    assert_eq!(prepared.launch_metadata().get("num_args"), Some("2"));
    assert!(cache.is_empty());
    assert_eq!(driver.launch_count(), 0);
}
