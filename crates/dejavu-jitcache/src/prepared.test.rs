#![cfg(test)]

use std::sync::{
    Arc, atomic::{AtomicUsize, Ordering}
};

use super::*;
use crate::{
    args::BufferHandle, grid::Grid, sim::{SimCompiled, SimDriver, SimKernel}, toolchain::{JitKernel, KernelParam}
};

fn kernel() -> SimKernel {
    SimKernel::new(
        "axpy",
        [
            KernelParam::runtime("x"),
            KernelParam::runtime("y"),
            KernelParam::constexpr("BLOCK"),
            KernelParam::runtime("n"),
        ],
    )
}

fn call(n: i64) -> KernelCall {
    KernelCall::new()
        .with_arg("n", n)
        .with_arg("y", BufferHandle(0x20))
        .with_arg("BLOCK", 128i64)
        .with_arg("x", BufferHandle(0x10))
        .with_grid(Grid::resolver(|args: &KernelArgs| match args.get("n") {
            Some(ArgValue::Int(n)) => u32::try_from(*n).unwrap_or(0).div_ceil(128),
            _ => 1,
        }))
}

fn prepare(
    kernel: &SimKernel,
    call: &KernelCall,
    driver: &Arc<SimDriver>,
    cache_launch_grid: bool,
) -> Result<PreparedKernel<SimCompiled>, JitCacheError> {
    let compiled = kernel.warmup(call)?;
    let example_grid = call.grid().ok_or(JitCacheError::MissingGrid)?.resolve(call.args())?;
    let shared: SharedDriver = Arc::clone(driver) as SharedDriver;
    PreparedKernel::new(
        PreparedParts {
            kernel: compiled,
            example_grid,
            cache_launch_grid,
            launch_metadata: LaunchMetadata::new().with("tag", "test"),
            runtime_arg_names: vec!["x".into(), "y".into(), "n".into()],
            cache_key: CacheKey::from("128"),
            device: DeviceId(0),
            stream: StreamId(7),
            debug_launch: true,
        },
        shared,
    )
}

#[test]
fn bind_runtime_args_follows_name_order() {
    let args = bind_runtime_args(&["n".to_string(), "x".to_string()], call(5).args()).expect("bound");
    assert_eq!(args.as_slice(), [ArgValue::Int(5), ArgValue::Buffer(BufferHandle(0x10))]);
}

#[test]
fn bind_runtime_args_reports_missing_name() {
    match bind_runtime_args(&["z".to_string()], call(5).args()) {
        Err(JitCacheError::MissingArgument { name }) => assert_eq!(name, "z"),
        other => panic!("expected missing argument, got {other:?}"),
    }
}

#[test]
fn construction_loads_binary_once() {
    let driver = Arc::new(SimDriver::new());
    let prepared = prepare(&kernel(), &call(1024), &driver, false).expect("prepared");
    assert_eq!(driver.load_count(), 1);
    assert_eq!(prepared.key().as_str(), "128");
    assert_eq!(prepared.stream(), StreamId(7));
    assert_eq!(prepared.device(), DeviceId(0));
    assert!(prepared.n_regs() >= 16);
    assert_eq!(prepared.n_spills(), 0);
    assert_eq!(prepared.concrete_grid(), None);

    prepared.invoke(&call(1024)).expect("launch");
    prepared.invoke(&call(256)).expect("launch");
    assert_eq!(driver.load_count(), 1);
    assert_eq!(driver.launch_count(), 2);
}

#[test]
fn launch_passes_runtime_args_in_declared_order() {
    let driver = Arc::new(SimDriver::new());
    let prepared = prepare(&kernel(), &call(300), &driver, false).expect("prepared");
    let result = prepared.invoke(&call(300)).expect("launch");
    assert_eq!(result.event, Some(1));

    let launch = driver.last_launch().expect("one launch recorded");
    assert_eq!(
        launch.args,
        vec![
            ArgValue::Buffer(BufferHandle(0x10)),
            ArgValue::Buffer(BufferHandle(0x20)),
            ArgValue::Int(300),
        ]
    );
    assert_eq!(launch.stream, StreamId(7));
    assert_eq!(launch.function, prepared.binary().function);
    assert_eq!(launch.metadata.get("tag"), Some("test"));
}

#[test]
fn dynamic_grid_is_resolved_per_call() {
    let driver = Arc::new(SimDriver::new());
    let prepared = prepare(&kernel(), &call(128), &driver, false).expect("prepared");
    prepared.invoke(&call(128)).expect("launch");
    prepared.invoke(&call(1000)).expect("launch");
    let grids: Vec<GridSize> = driver.launches().iter().map(|l| l.grid).collect();
    assert_eq!(grids, [GridSize::d1(1), GridSize::d1(8)]);
}

#[test]
fn cached_grid_is_never_re_resolved() {
    let driver = Arc::new(SimDriver::new());
    let prepared = prepare(&kernel(), &call(128 * 128), &driver, true).expect("prepared");
    assert_eq!(prepared.concrete_grid(), Some(GridSize::new(128, 1, 1)));

    prepared.invoke(&call(5)).expect("launch");
    let without_grid = KernelCall::new()
        .with_arg("x", BufferHandle(1))
        .with_arg("y", BufferHandle(2))
        .with_arg("n", 1i64);
    prepared.invoke(&without_grid).expect("cached grid needs no call grid");
    assert!(driver.launches().iter().all(|l| l.grid == GridSize::new(128, 1, 1)));
}

#[test]
fn shared_memory_over_limit_is_out_of_resources() {
    let driver = Arc::new(SimDriver::new().with_max_shared_memory(1024));
    let big = kernel().with_shared_memory(4096);
    match prepare(&big, &call(1), &driver, false) {
        Err(JitCacheError::OutOfResources {
            resource,
            required,
            available,
        }) => {
            assert_eq!(resource, "shared memory");
            assert_eq!(required, 4096);
            assert_eq!(available, 1024);
        }
        other => panic!("expected out of resources, got {other:?}"),
    }
    assert_eq!(driver.load_count(), 0);
}

#[test]
fn positional_arguments_are_rejected() {
    let driver = Arc::new(SimDriver::new());
    let prepared = prepare(&kernel(), &call(1), &driver, false).expect("prepared");
    let positional = call(1).with_positional(3i64);
    assert!(matches!(
        prepared.invoke(&positional),
        Err(JitCacheError::PositionalArgs { count: 1 })
    ));
    assert_eq!(driver.launch_count(), 0);
}

#[test]
fn missing_grid_without_cached_grid_fails() {
    let driver = Arc::new(SimDriver::new());
    let prepared = prepare(&kernel(), &call(1), &driver, false).expect("prepared");
    let no_grid = KernelCall::new()
        .with_arg("x", BufferHandle(1))
        .with_arg("y", BufferHandle(2))
        .with_arg("n", 1i64);
    assert!(matches!(prepared.invoke(&no_grid), Err(JitCacheError::MissingGrid)));
}

#[test]
fn hooks_wrap_each_launch() {
    let entered = Arc::new(AtomicUsize::new(0));
    let exited = Arc::new(AtomicUsize::new(0));
    let enter: LaunchHook = {
        let entered = Arc::clone(&entered);
        Arc::new(move |meta: &LaunchMetadata| {
            assert_eq!(meta.get("tag"), Some("test"));
            entered.fetch_add(1, Ordering::Relaxed);
        })
    };
    let exit: LaunchHook = {
        let exited = Arc::clone(&exited);
        Arc::new(move |_meta: &LaunchMetadata| {
            exited.fetch_add(1, Ordering::Relaxed);
        })
    };

    let driver = Arc::new(SimDriver::new());
    let hooked = kernel().with_launch_hooks(Some(enter), Some(exit));
    let prepared = prepare(&hooked, &call(64), &driver, false).expect("prepared");
    prepared.invoke(&call(64)).expect("launch");
    prepared.invoke(&call(64)).expect("launch");
    assert_eq!(entered.load(Ordering::Relaxed), 2);
    assert_eq!(exited.load(Ordering::Relaxed), 2);
}
