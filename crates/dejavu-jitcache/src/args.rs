//! Keyword arguments of a kernel call.

use std::{fmt, sync::Arc};

use rustc_hash::FxHashMap;

use crate::grid::Grid;

/// Opaque device buffer address passed through to the launcher untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Value of one kernel argument.
#[derive(Clone, Debug, PartialEq)]
pub enum ArgValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    FloatList(Vec<f64>),
    Buffer(BufferHandle),
}

impl ArgValue {
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            ArgValue::None => "none",
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Str(_) => "str",
            ArgValue::FloatList(_) => "list[float]",
            ArgValue::Buffer(_) => "buffer",
        }
    }

    /// Only scalars with a stable textual form may select a cached kernel.
    #[must_use]
    pub const fn is_selector_type(&self) -> bool {
        matches!(self, ArgValue::Bool(_) | ArgValue::Int(_) | ArgValue::Float(_))
    }
}

fn write_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("nan")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "inf" } else { "-inf" })
    } else {
        // Debug prints either a fractional part ("1.0") or an exponent ("1e16"),
        // never a bare integer.
        write!(f, "{value:?}")
    }
}

/// Textual form used when deriving cache keys.
///
/// Booleans print as `True`/`False` and finite floats always carry a `.` or an
/// exponent, so `Int(1)`, `Float(1.0)` and `Bool(true)` never share a key.
impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::None => f.write_str("None"),
            ArgValue::Bool(true) => f.write_str("True"),
            ArgValue::Bool(false) => f.write_str("False"),
            ArgValue::Int(v) => write!(f, "{v}"),
            ArgValue::Float(v) => write_float(f, *v),
            ArgValue::Str(v) => f.write_str(v),
            ArgValue::FloatList(values) => {
                f.write_str("[")?;
                for (idx, v) in values.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write_float(f, *v)?;
                }
                f.write_str("]")
            }
            ArgValue::Buffer(handle) => write!(f, "<buffer {:#x}>", handle.0),
        }
    }
}

macro_rules! arg_value_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    ArgValue::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

arg_value_from! {
    bool => Bool as bool,
    i64 => Int as i64,
    i32 => Int as i64,
    u32 => Int as i64,
    f64 => Float as f64,
    f32 => Float as f64,
    String => Str as String,
    &str => Str as String,
    Vec<f64> => FloatList as Vec<f64>,
    BufferHandle => Buffer as BufferHandle,
}

pub type KernelArgs = FxHashMap<String, ArgValue>;

/// Hook that rewrites arguments right before a launch.
pub type PreHook = Arc<dyn Fn(&mut KernelArgs) + Send + Sync>;

/// One invocation request: keyword arguments plus the launch grid.
///
/// Positional arguments and a pre-hook can be attached for parity with the
/// general JIT launch path, but the cache rejects both.
#[derive(Clone, Default)]
pub struct KernelCall {
    args: KernelArgs,
    positional: Vec<ArgValue>,
    grid: Option<Grid>,
    pre_hook: Option<PreHook>,
}

impl KernelCall {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_grid(mut self, grid: impl Into<Grid>) -> Self {
        self.grid = Some(grid.into());
        self
    }

    #[must_use]
    pub fn with_positional(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    #[must_use]
    pub fn with_pre_hook(mut self, hook: PreHook) -> Self {
        self.pre_hook = Some(hook);
        self
    }

    /// Replace one argument in place, returning the previous value.
    pub fn set_arg(&mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        self.args.insert(name.into(), value.into())
    }

    pub fn set_grid(&mut self, grid: impl Into<Grid>) {
        self.grid = Some(grid.into());
    }

    #[must_use]
    pub fn args(&self) -> &KernelArgs {
        &self.args
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.args.get(name)
    }

    #[must_use]
    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    #[must_use]
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    #[must_use]
    pub fn pre_hook(&self) -> Option<&PreHook> {
        self.pre_hook.as_ref()
    }
}

impl fmt::Debug for KernelCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelCall")
            .field("args", &self.args)
            .field("positional", &self.positional)
            .field("grid", &self.grid)
            .field("pre_hook", &self.pre_hook.is_some())
            .finish()
    }
}

#[path = "args.test.rs"]
mod tests;
