#![cfg(test)]

use super::*;
use crate::args::ArgValue;

#[test]
fn missing_dimensions_default_to_one() {
    assert_eq!(GridSize::from_dims(&[128]).ok(), Some(GridSize::new(128, 1, 1)));
    assert_eq!(GridSize::from_dims(&[8, 4]).ok(), Some(GridSize::new(8, 4, 1)));
    assert_eq!(GridSize::from_dims(&[2, 3, 5]).ok(), Some(GridSize::new(2, 3, 5)));
}

#[test]
fn empty_or_four_dimensional_grids_are_rejected() {
    assert!(matches!(GridSize::from_dims(&[]), Err(JitCacheError::InvalidGrid { dims: 0 })));
    assert!(matches!(
        GridSize::from_dims(&[1, 1, 1, 1]),
        Err(JitCacheError::InvalidGrid { dims: 4 })
    ));
}

#[test]
fn resolver_reads_call_arguments() {
    let grid = Grid::resolver(|args: &KernelArgs| match args.get("n_rows") {
        Some(ArgValue::Int(n)) => [u32::try_from(*n).unwrap_or(0), 2],
        _ => [1, 1],
    });
    assert!(grid.is_resolver());

    let mut args = KernelArgs::default();
    args.insert("n_rows".to_string(), ArgValue::Int(96));
    assert_eq!(grid.resolve(&args).ok(), Some(GridSize::d2(96, 2)));

    args.insert("n_rows".to_string(), ArgValue::Int(7));
    assert_eq!(grid.resolve(&args).ok(), Some(GridSize::d2(7, 2)));
}

#[test]
fn fixed_grid_ignores_arguments() {
    let grid = Grid::from([16u32, 16]);
    assert!(!grid.is_resolver());
    assert_eq!(grid.resolve(&KernelArgs::default()).ok(), Some(GridSize::d2(16, 16)));
    assert_eq!(format!("{grid:?}"), "Fixed([16, 16])");
    assert_eq!(GridSize::new(4, 2, 1).to_string(), "4x2x1");
}
