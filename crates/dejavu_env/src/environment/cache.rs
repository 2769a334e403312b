//! Variables read by the launch cache and the `dejavu` binary.

use tracing::Level;

use super::{
    EnvVar, value::{EnvCodec, EnvValueError, TypedEnvVar}
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEnvVar {
    /// Maximum tracing level installed by the binary.
    LogLevel,
    /// Emit a trace event for every fast-path launch.
    DebugLaunch,
    /// Default for `cache_launch_grid` when building from the environment.
    CacheLaunchGrid,
}

impl CacheEnvVar {
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            CacheEnvVar::LogLevel => "DEJAVU_LOG_LEVEL",
            CacheEnvVar::DebugLaunch => "DEJAVU_DEBUG_LAUNCH",
            CacheEnvVar::CacheLaunchGrid => "DEJAVU_CACHE_LAUNCH_GRID",
        }
    }

    #[must_use]
    pub const fn into_env(self) -> EnvVar {
        EnvVar::Cache(self)
    }
}

const LEVEL: EnvCodec<Level> = EnvCodec {
    parse: parse_log_level,
    format: format_level,
};
const TRUTHY_FLAG: EnvCodec<bool> = EnvCodec {
    parse: parse_truthy_flag,
    format: format_bool,
};
const STRICT_BOOL: EnvCodec<bool> = EnvCodec {
    parse: parse_bool,
    format: format_bool,
};

/// `DEJAVU_LOG_LEVEL`
pub const LOG_LEVEL: TypedEnvVar<Level> = TypedEnvVar::new(CacheEnvVar::LogLevel.into_env(), LEVEL);
/// `DEJAVU_DEBUG_LAUNCH`; empty or a negative word means off, anything else on.
pub const DEBUG_LAUNCH: TypedEnvVar<bool> = TypedEnvVar::new(CacheEnvVar::DebugLaunch.into_env(), TRUTHY_FLAG);
/// `DEJAVU_CACHE_LAUNCH_GRID`; must be a recognised boolean word.
pub const CACHE_LAUNCH_GRID: TypedEnvVar<bool> = TypedEnvVar::new(CacheEnvVar::CacheLaunchGrid.into_env(), STRICT_BOOL);

fn parse_log_level(value: &str) -> Result<Level, EnvValueError> {
    value.trim().parse::<Level>().map_err(|_| EnvValueError::new("invalid tracing level"))
}

fn format_level(level: &Level) -> Result<String, EnvValueError> {
    Ok(level.to_string())
}

fn parse_truthy_flag(value: &str) -> Result<bool, EnvValueError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(false);
    }
    Ok(!matches!(trimmed.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
}

fn parse_bool(value: &str) -> Result<bool, EnvValueError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EnvValueError::new("value is not a recognised boolean")),
    }
}

fn format_bool(value: &bool) -> Result<String, EnvValueError> {
    Ok(value.to_string())
}

#[path = "cache.test.rs"]
mod tests;
