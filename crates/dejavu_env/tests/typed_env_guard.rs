use dejavu_env::{CACHE_LAUNCH_GRID, CacheEnvVar, DEBUG_LAUNCH, EnvVarError, EnvVarGuard, LOG_LEVEL};
use serial_test::serial;
use tracing::Level;

#[test]
#[serial]
fn typed_guard_writes_formatted_value_and_restores() {
    let _outer = EnvVarGuard::set(CacheEnvVar::LogLevel, "error");
    {
        let guard = LOG_LEVEL.set_guard(Level::WARN).expect("level should format");
        assert_eq!(*guard, Level::WARN);
        assert_eq!(std::env::var("DEJAVU_LOG_LEVEL").ok().as_deref(), Some("WARN"));
    }
    assert_eq!(LOG_LEVEL.get_or(Level::INFO).ok(), Some(Level::ERROR));
}

#[test]
#[serial]
fn nested_guards_unwind_in_order() {
    let _outer = DEBUG_LAUNCH.unset_guard();
    {
        let _on = EnvVarGuard::set(CacheEnvVar::DebugLaunch, "yes");
        {
            let _off = EnvVarGuard::set(CacheEnvVar::DebugLaunch, "off");
            assert_eq!(DEBUG_LAUNCH.get_or(true).ok(), Some(false));
        }
        assert_eq!(DEBUG_LAUNCH.get_or(false).ok(), Some(true));
    }
    assert_eq!(DEBUG_LAUNCH.get().ok(), Some(None));
}

#[test]
#[serial]
fn get_or_still_reports_malformed_values() {
    let _bad = EnvVarGuard::set(CacheEnvVar::CacheLaunchGrid, "2");
    assert!(matches!(CACHE_LAUNCH_GRID.get_or(false), Err(EnvVarError::Parse { .. })));
}
