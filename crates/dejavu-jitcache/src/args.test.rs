#![cfg(test)]

use super::*;

#[test]
fn display_distinguishes_scalar_types() {
    assert_eq!(ArgValue::Int(1).to_string(), "1");
    assert_eq!(ArgValue::Float(1.0).to_string(), "1.0");
    assert_eq!(ArgValue::Bool(true).to_string(), "True");
    assert_eq!(ArgValue::Bool(false).to_string(), "False");
    assert_eq!(ArgValue::Float(0.125).to_string(), "0.125");
    assert_eq!(ArgValue::Float(f64::NAN).to_string(), "nan");
    assert_eq!(ArgValue::Float(f64::NEG_INFINITY).to_string(), "-inf");
}

#[test]
fn large_floats_use_exponent_not_integer_text() {
    assert_eq!(ArgValue::Float(1e16).to_string(), "1e16");
    assert_ne!(ArgValue::Float(1e16).to_string(), ArgValue::Int(10_000_000_000_000_000).to_string());
    assert_eq!(ArgValue::Float(1e-7).to_string(), "1e-7");
}

#[test]
fn display_of_non_selector_values() {
    assert_eq!(ArgValue::FloatList(vec![1.0, 2.5]).to_string(), "[1.0, 2.5]");
    assert_eq!(ArgValue::Buffer(BufferHandle(0x10)).to_string(), "<buffer 0x10>");
    assert_eq!(ArgValue::None.to_string(), "None");
}

#[test]
fn selector_types_are_int_bool_float_only() {
    assert!(ArgValue::from(3i32).is_selector_type());
    assert!(ArgValue::from(true).is_selector_type());
    assert!(ArgValue::from(0.5f32).is_selector_type());
    assert!(!ArgValue::from("causal").is_selector_type());
    assert!(!ArgValue::from(vec![1.0f64]).is_selector_type());
    assert!(!ArgValue::None.is_selector_type());
    assert!(!ArgValue::from(BufferHandle(1)).is_selector_type());
}

#[test]
fn call_builder_collects_arguments() {
    let mut call = KernelCall::new().with_arg("BLOCK", 64i64).with_arg("x", BufferHandle(7)).with_grid([4u32]);
    assert_eq!(call.get("BLOCK"), Some(&ArgValue::Int(64)));
    assert!(call.positional().is_empty());
    assert!(call.pre_hook().is_none());
    assert!(call.grid().is_some());

    let previous = call.set_arg("BLOCK", 128i64);
    assert_eq!(previous, Some(ArgValue::Int(64)));
    assert_eq!(call.args().len(), 2);
}

#[test]
fn debug_output_hides_hook_body() {
    let hook: PreHook = Arc::new(|_args: &mut KernelArgs| {});
    let call = KernelCall::new().with_pre_hook(hook);
    let rendered = format!("{call:?}");
    assert!(rendered.contains("pre_hook: true"));
}
