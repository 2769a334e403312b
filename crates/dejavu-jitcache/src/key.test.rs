#![cfg(test)]

use super::*;
use crate::args::{ArgValue, BufferHandle};

fn args(pairs: &[(&str, ArgValue)]) -> KernelArgs {
    pairs.iter().map(|(name, value)| (name.to_string(), value.clone())).collect()
}

#[test]
fn identical_selector_values_give_identical_keys() {
    let keys = SelectorKeys::new(["USE_ALIBI", "BLOCK"]);
    let a = args(&[
        ("USE_ALIBI", ArgValue::Bool(true)),
        ("BLOCK", ArgValue::Int(64)),
        ("x", ArgValue::Buffer(BufferHandle(1))),
    ]);
    let b = args(&[
        ("BLOCK", ArgValue::Int(64)),
        ("USE_ALIBI", ArgValue::Bool(true)),
        ("x", ArgValue::Buffer(BufferHandle(2))),
    ]);
    let key_a = keys.cache_key(&a).expect("key");
    assert_eq!(key_a, keys.cache_key(&b).expect("key"));
    assert_eq!(key_a.as_str(), "True64");
}

#[test]
fn empty_selector_set_uses_sentinel() {
    let keys = SelectorKeys::default();
    assert!(keys.is_empty());
    let a = args(&[("A", ArgValue::Int(1))]);
    let b = args(&[("A", ArgValue::Int(2))]);
    assert_eq!(keys.cache_key(&a).expect("key").as_str(), DEFAULT_CACHE_KEY);
    assert_eq!(keys.cache_key(&b).expect("key").as_str(), DEFAULT_CACHE_KEY);
}

#[test]
fn key_follows_selector_order_not_argument_order() {
    let keys = SelectorKeys::new(["B", "A"]);
    let a = args(&[("A", ArgValue::Int(1)), ("B", ArgValue::Float(0.5))]);
    assert_eq!(keys.cache_key(&a).expect("key").to_string(), "0.51");
}

#[test]
fn missing_selector_is_reported_by_name() {
    let keys = SelectorKeys::new(["SLIDING_WINDOW"]);
    match keys.cache_key(&KernelArgs::default()) {
        Err(JitCacheError::MissingArgument { name }) => assert_eq!(name, "SLIDING_WINDOW"),
        other => panic!("expected missing argument, got {other:?}"),
    }
}

#[test]
fn check_types_rejects_strings_and_lists() {
    let keys = SelectorKeys::new(["A", "MODE"]);
    let ok = args(&[("A", ArgValue::Int(1)), ("MODE", ArgValue::Float(2.0))]);
    assert!(keys.check_types(&ok).is_ok());

    let bad = args(&[("A", ArgValue::Int(1)), ("MODE", ArgValue::Str("causal".into()))]);
    match keys.check_types(&bad) {
        Err(JitCacheError::UnsupportedSelectorType { key, found }) => {
            assert_eq!(key, "MODE");
            assert_eq!(found, "str");
        }
        other => panic!("expected type error, got {other:?}"),
    }

    let list = args(&[("A", ArgValue::FloatList(vec![1.0])), ("MODE", ArgValue::Int(0))]);
    assert!(matches!(
        keys.check_types(&list),
        Err(JitCacheError::UnsupportedSelectorType { found: "list[float]", .. })
    ));
}

#[test]
fn contains_and_iter_preserve_order() {
    let keys = SelectorKeys::new(vec!["X".to_string(), "Y".to_string()]);
    assert_eq!(keys.len(), 2);
    assert!(keys.contains("Y"));
    assert!(!keys.contains("Z"));
    assert_eq!(keys.iter().collect::<Vec<_>>(), ["X", "Y"]);
}
