use dejavu_env::{CACHE_LAUNCH_GRID, DEBUG_LAUNCH, EnvVarError};

/// Cache settings read from the process environment.
///
/// Read once when a cache is built; launches never touch the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JitCacheConfig {
    /// Emit a `trace` event for every fast-path launch (`DEJAVU_DEBUG_LAUNCH`).
    pub debug_launch: bool,
    /// Default for `cache_launch_grid` (`DEJAVU_CACHE_LAUNCH_GRID`).
    pub cache_launch_grid: bool,
}

impl JitCacheConfig {
    pub fn from_env() -> Result<Self, EnvVarError> {
        Ok(Self {
            debug_launch: DEBUG_LAUNCH.get_or(false)?,
            cache_launch_grid: CACHE_LAUNCH_GRID.get_or(false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use dejavu_env::{CacheEnvVar, EnvVarGuard};
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn defaults_when_unset() {
        let _launch = EnvVarGuard::unset(CacheEnvVar::DebugLaunch);
        let _grid = EnvVarGuard::unset(CacheEnvVar::CacheLaunchGrid);
        assert_eq!(JitCacheConfig::from_env().ok(), Some(JitCacheConfig::default()));
    }

    #[test]
    #[serial]
    fn reads_both_flags() {
        let _launch = EnvVarGuard::set(CacheEnvVar::DebugLaunch, "1");
        let _grid = EnvVarGuard::set(CacheEnvVar::CacheLaunchGrid, "true");
        let config = JitCacheConfig::from_env().expect("config should parse");
        assert!(config.debug_launch);
        assert!(config.cache_launch_grid);
    }

    #[test]
    #[serial]
    fn malformed_grid_flag_is_an_error() {
        let _grid = EnvVarGuard::set(CacheEnvVar::CacheLaunchGrid, "perhaps");
        assert!(matches!(JitCacheConfig::from_env(), Err(EnvVarError::Parse { .. })));
    }
}
