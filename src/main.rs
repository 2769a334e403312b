use std::sync::Arc;

use anyhow::{Context as _, Result};
use dejavu_jitcache::{
    BufferHandle, CacheLock, Grid, JitCacheConfig, JitCacheError, KernelArgs, KernelCall, KernelParam, SharedDriver, jitcache, sim::{SimDriver, SimKernel}
};

mod config;
mod logging;

use config::AppConfig;

const HEAD_SIZES: [i64; 3] = [64, 128, 256];

fn paged_attention() -> SimKernel {
    SimKernel::new(
        "paged_attention",
        [
            KernelParam::runtime("out"),
            KernelParam::runtime("query"),
            KernelParam::runtime("key_cache"),
            KernelParam::runtime("num_seqs"),
            KernelParam::constexpr("HEAD_SIZE"),
            KernelParam::constexpr("USE_ALIBI"),
            KernelParam::constexpr("BLOCK_SIZE"),
        ],
    )
}

fn attention_call(head_size: i64, num_seqs: i64) -> KernelCall {
    KernelCall::new()
        .with_arg("out", BufferHandle(0x1000))
        .with_arg("query", BufferHandle(0x2000))
        .with_arg("key_cache", BufferHandle(0x3000))
        .with_arg("num_seqs", num_seqs)
        .with_arg("HEAD_SIZE", head_size)
        .with_arg("USE_ALIBI", false)
        .with_arg("BLOCK_SIZE", 16i64)
        .with_grid(Grid::resolver(|args: &KernelArgs| {
            let seqs = match args.get("num_seqs") {
                Some(dejavu_jitcache::ArgValue::Int(n)) => u32::try_from(*n).unwrap_or(1),
                _ => 1,
            };
            [seqs, 8]
        }))
}

fn main() -> Result<()> {
    let app_config = AppConfig::from_env().context("loading app configuration")?;
    logging::init(app_config.log_level);
    let cache_config = JitCacheConfig::from_env().context("loading cache configuration")?;

    let driver = Arc::new(SimDriver::new());
    let lock = Arc::new(CacheLock::new("serving"));
    let kernel = paged_attention();
    let compiles = kernel.compile_counter();
    let mut cache = jitcache(["HEAD_SIZE"], Some(Arc::clone(&lock)), None)
        .with_config(cache_config)
        .wrap(kernel, Arc::clone(&driver) as SharedDriver)?;

    tracing::info!("Warming up {} variants", HEAD_SIZES.len());
    for head_size in HEAD_SIZES {
        cache.invoke(&attention_call(head_size, 1))?;
    }
    lock.lock();

    for (step, head_size) in HEAD_SIZES.iter().cycle().take(9).enumerate() {
        let num_seqs = i64::try_from(step + 1)?;
        cache.invoke(&attention_call(*head_size, num_seqs))?;
    }
    tracing::info!(
        "Replayed {} launches with {} compiles; cached keys {:?}",
        driver.launch_count(),
        compiles.load(std::sync::atomic::Ordering::Relaxed),
        cache.cached_keys()
    );

    match cache.invoke(&attention_call(96, 1)) {
        Err(JitCacheError::KeyNotCached { key, cached }) => {
            tracing::info!("Locked cache refused unseen HEAD_SIZE {key}; cached: {cached:?}");
        }
        Err(err) => return Err(err.into()),
        Ok(_) => anyhow::bail!("locked cache compiled an unseen variant"),
    }

    for head_size in HEAD_SIZES {
        let key = head_size.to_string();
        if let Some(prepared) = cache.get(&key) {
            tracing::info!(
                "HEAD_SIZE={key}: {} registers, {} spills, stream {:?}",
                prepared.n_regs(),
                prepared.n_spills(),
                prepared.stream()
            );
        }
    }
    Ok(())
}
