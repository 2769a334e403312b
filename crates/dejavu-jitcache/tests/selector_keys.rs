use std::sync::Arc;

use dejavu_jitcache::{
    ArgValue, BufferHandle, CacheKey, JitCache, JitCacheError, KernelCall, KernelParam, sim::{SimDriver, SimKernel}
};

fn cache(check_keys: &[&str]) -> JitCache<SimKernel> {
    let kernel = SimKernel::new(
        "softmax",
        [
            KernelParam::runtime("x"),
            KernelParam::constexpr("SCALE"),
            KernelParam::constexpr("CAUSAL"),
            KernelParam::constant("BLOCK"),
        ],
    );
    JitCache::builder(kernel, Arc::new(SimDriver::new()))
        .check_keys(check_keys.iter().copied())
        .build()
        .expect("supported toolchain")
}

fn call(scale: impl Into<ArgValue>, causal: impl Into<ArgValue>) -> KernelCall {
    KernelCall::new()
        .with_arg("x", BufferHandle(7))
        .with_arg("SCALE", scale)
        .with_arg("CAUSAL", causal)
        .with_arg("BLOCK", 32i64)
        .with_grid(1u32)
}

#[test]
fn int_float_and_bool_keys_stay_distinct() {
    let mut cache = cache(&["SCALE"]);
    cache.invoke(&call(1i64, true)).expect("int");
    cache.invoke(&call(1.0f64, true)).expect("float");
    cache.invoke(&call(true, true)).expect("bool");
    assert_eq!(cache.cached_keys(), ["1", "1.0", "True"]);
}

#[test]
fn keys_concatenate_in_selector_order() {
    let cache = cache(&["CAUSAL", "SCALE"]);
    let key = cache.cache_key(&call(0.5f64, false)).expect("key");
    assert_eq!(key, CacheKey::from("False0.5"));
}

#[test]
fn non_finite_floats_have_stable_keys() {
    let mut cache = cache(&["SCALE"]);
    cache.invoke(&call(f64::NAN, true)).expect("nan");
    cache.invoke(&call(f64::INFINITY, true)).expect("inf");
    cache.invoke(&call(f64::NEG_INFINITY, true)).expect("-inf");
    cache.invoke(&call(f64::NAN, true)).expect("nan hit");
    assert_eq!(cache.cached_keys(), ["-inf", "inf", "nan"]);
}

#[test]
fn string_selector_is_rejected() {
    let mut cache = cache(&["SCALE"]);
    let err = cache.invoke(&call("wide", true)).expect_err("str selectors are unsupported");
    assert!(matches!(err, JitCacheError::UnsupportedSelectorType { found: "str", .. }));
    assert!(err.to_string().contains("SCALE"));
}
