use std::sync::{Arc, Mutex, atomic::Ordering};

use dejavu_jitcache::{
    BufferHandle, CacheLock, JitCacheError, KernelCall, KernelParam, jitcache, sim::{SimDriver, SimKernel}
};

fn kernel(name: &str) -> SimKernel {
    SimKernel::new(
        name,
        [
            KernelParam::runtime("q"),
            KernelParam::runtime("out"),
            KernelParam::constexpr("USE_ALIBI"),
            KernelParam::constexpr("HEAD_DIM"),
        ],
    )
}

fn call(use_alibi: bool) -> KernelCall {
    KernelCall::new()
        .with_arg("q", BufferHandle(0x100))
        .with_arg("out", BufferHandle(0x200))
        .with_arg("USE_ALIBI", use_alibi)
        .with_arg("HEAD_DIM", 128i64)
        .with_grid([16u32, 8])
}

#[test]
fn one_lock_freezes_every_cache_it_was_given() {
    let lock = Arc::new(CacheLock::new("serving"));
    let driver = Arc::new(SimDriver::new());
    let factory = jitcache(["USE_ALIBI"], Some(Arc::clone(&lock)), Some(false));

    let prefill = kernel("prefill");
    let decode = kernel("decode");
    let decode_compiles = decode.compile_counter();
    let mut prefill = factory.wrap(prefill, driver.clone()).expect("prefill cache");
    let mut decode = factory.wrap(decode, driver.clone()).expect("decode cache");

    prefill.invoke(&call(true)).expect("warmup");
    prefill.invoke(&call(false)).expect("warmup");
    decode.invoke(&call(false)).expect("warmup");
    assert_eq!(prefill.cached_keys(), ["False", "True"]);

    lock.lock();
    prefill.invoke(&call(true)).expect("locked hit");
    decode.invoke(&call(false)).expect("locked hit");
    match decode.invoke(&call(true)) {
        Err(JitCacheError::KeyNotCached { key, cached }) => {
            assert_eq!(key, "True");
            assert_eq!(cached, ["False"]);
        }
        other => panic!("expected a cache miss, got {other:?}"),
    }
    assert_eq!(decode_compiles.load(Ordering::Relaxed), 1);
    assert_eq!(driver.launch_count(), 5);
}

#[test]
fn caches_without_a_lock_keep_compiling() {
    let driver = Arc::new(SimDriver::new());
    let factory = jitcache(["USE_ALIBI", "HEAD_DIM"], None, Some(false));
    let mut cache = factory.wrap(kernel("decode"), driver.clone()).expect("cache");

    cache.invoke(&call(true)).expect("launch");
    cache.invoke(&call(false).with_arg("HEAD_DIM", 64i64)).expect("launch");
    assert_eq!(cache.cached_keys(), ["False64", "True128"]);
    assert!(cache.mode().lock().is_none());
}

#[test]
fn cache_behind_a_mutex_serves_many_threads() {
    let driver = Arc::new(SimDriver::new());
    let kernel = kernel("decode");
    let compiles = kernel.compile_counter();
    let cache = jitcache(["USE_ALIBI"], None, None).wrap(kernel, driver.clone()).expect("cache");
    let cache = Arc::new(Mutex::new(cache));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for _ in 0..8 {
                    let mut cache = cache.lock().expect("cache mutex");
                    cache.invoke(&call(i % 2 == 0)).expect("launch");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker");
    }

    assert_eq!(compiles.load(Ordering::Relaxed), 2);
    assert_eq!(driver.launch_count(), 32);
}
