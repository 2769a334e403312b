//! Launch grids.
//!
//! A call carries a [`Grid`] that is either a fixed list of one to three
//! dimensions or a resolver evaluated against the call's arguments. Either
//! way it resolves to a three-dimensional [`GridSize`], unspecified dimensions
//! defaulting to 1.

use std::{fmt, sync::Arc};

use smallvec::SmallVec;

use crate::{JitCacheError, args::KernelArgs};

/// Concrete three-dimensional launch grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl GridSize {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    pub const fn d1(width: u32) -> Self {
        Self {
            width,
            height: 1,
            depth: 1,
        }
    }

    pub const fn d2(width: u32, height: u32) -> Self {
        Self { width, height, depth: 1 }
    }

    /// Pad `dims` to three dimensions.
    pub fn from_dims(dims: &[u32]) -> Result<Self, JitCacheError> {
        match *dims {
            [width] => Ok(Self::d1(width)),
            [width, height] => Ok(Self::d2(width, height)),
            [width, height, depth] => Ok(Self::new(width, height, depth)),
            _ => Err(JitCacheError::InvalidGrid { dims: dims.len() }),
        }
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Unpadded grid dimensions as supplied by a caller or resolver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridDims(SmallVec<[u32; 3]>);

impl GridDims {
    #[must_use]
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }
}

impl<const N: usize> From<[u32; N]> for GridDims {
    fn from(value: [u32; N]) -> Self {
        Self(SmallVec::from_slice(&value))
    }
}

impl From<&[u32]> for GridDims {
    fn from(value: &[u32]) -> Self {
        Self(SmallVec::from_slice(value))
    }
}

impl From<Vec<u32>> for GridDims {
    fn from(value: Vec<u32>) -> Self {
        Self(SmallVec::from_vec(value))
    }
}

impl From<u32> for GridDims {
    fn from(value: u32) -> Self {
        Self::from([value])
    }
}

impl From<GridSize> for GridDims {
    fn from(value: GridSize) -> Self {
        Self::from([value.width, value.height, value.depth])
    }
}

pub type GridResolver = Arc<dyn Fn(&KernelArgs) -> GridDims + Send + Sync>;

/// Launch grid attached to a call.
#[derive(Clone)]
pub enum Grid {
    Fixed(GridDims),
    Resolver(GridResolver),
}

impl Grid {
    /// Grid computed from the call's arguments at launch time.
    pub fn resolver<F, D>(resolve: F) -> Self
    where
        F: Fn(&KernelArgs) -> D + Send + Sync + 'static,
        D: Into<GridDims>,
    {
        Grid::Resolver(Arc::new(move |args: &KernelArgs| resolve(args).into()))
    }

    #[must_use]
    pub fn is_resolver(&self) -> bool {
        matches!(self, Grid::Resolver(_))
    }

    pub fn resolve(&self, args: &KernelArgs) -> Result<GridSize, JitCacheError> {
        match self {
            Grid::Fixed(dims) => GridSize::from_dims(dims.as_slice()),
            Grid::Resolver(resolve) => GridSize::from_dims(resolve(args).as_slice()),
        }
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grid::Fixed(dims) => f.debug_tuple("Fixed").field(&dims.as_slice()).finish(),
            Grid::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<GridDims> for Grid {
    fn from(value: GridDims) -> Self {
        Grid::Fixed(value)
    }
}

impl<const N: usize> From<[u32; N]> for Grid {
    fn from(value: [u32; N]) -> Self {
        Grid::Fixed(value.into())
    }
}

impl From<u32> for Grid {
    fn from(value: u32) -> Self {
        Grid::Fixed(value.into())
    }
}

impl From<Vec<u32>> for Grid {
    fn from(value: Vec<u32>) -> Self {
        Grid::Fixed(value.into())
    }
}

impl From<GridSize> for Grid {
    fn from(value: GridSize) -> Self {
        Grid::Fixed(value.into())
    }
}

#[path = "grid.test.rs"]
mod tests;
