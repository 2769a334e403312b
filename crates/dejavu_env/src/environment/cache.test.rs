#![cfg(test)]

use serial_test::serial;

use super::*;
use crate::{EnvVarError, EnvVarGuard};

#[test]
fn keys_are_namespaced() {
    assert_eq!(CacheEnvVar::LogLevel.key(), "DEJAVU_LOG_LEVEL");
    assert_eq!(DEBUG_LAUNCH.key(), "DEJAVU_DEBUG_LAUNCH");
    assert_eq!(CACHE_LAUNCH_GRID.key(), "DEJAVU_CACHE_LAUNCH_GRID");
}

#[test]
fn truthy_flag_accepts_presence_style_values() {
    assert_eq!(parse_truthy_flag("").ok(), Some(false));
    assert_eq!(parse_truthy_flag("1").ok(), Some(true));
    assert_eq!(parse_truthy_flag("anything").ok(), Some(true));
    assert_eq!(parse_truthy_flag(" Off ").ok(), Some(false));
}

#[test]
fn strict_bool_rejects_unknown_words() {
    assert_eq!(parse_bool("YES").ok(), Some(true));
    assert_eq!(parse_bool("0").ok(), Some(false));
    assert!(parse_bool("maybe").is_err());
}

#[test]
#[serial]
fn log_level_round_trips_through_guard() {
    let _clear = LOG_LEVEL.unset_guard();
    assert_eq!(LOG_LEVEL.get().ok().flatten(), None);
    {
        let guard = LOG_LEVEL.set_guard(Level::TRACE).expect("level should format");
        assert_eq!(*guard, Level::TRACE);
        assert_eq!(LOG_LEVEL.get().ok().flatten(), Some(Level::TRACE));
    }
    assert_eq!(LOG_LEVEL.get().ok().flatten(), None);
}

#[test]
#[serial]
fn malformed_value_reports_name_and_raw_value() {
    let _bad = EnvVarGuard::set(CacheEnvVar::CacheLaunchGrid, "sometimes");
    match CACHE_LAUNCH_GRID.get() {
        Err(EnvVarError::Parse { name, value, .. }) => {
            assert_eq!(name, "DEJAVU_CACHE_LAUNCH_GRID");
            assert_eq!(value, "sometimes");
        }
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
#[serial]
fn explicit_negative_differs_from_unset() {
    {
        let _set = EnvVarGuard::set(CacheEnvVar::DebugLaunch, "0");
        assert_eq!(DEBUG_LAUNCH.get().ok(), Some(Some(false)));
    }
    let _clear = EnvVarGuard::unset(CacheEnvVar::DebugLaunch);
    assert_eq!(DEBUG_LAUNCH.get().ok(), Some(None));
}
