//! Settings of the demo binary.

use dejavu_env::{EnvVarError, LOG_LEVEL};
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum AppConfigError {
    #[error("invalid log level '{value}'")]
    InvalidLogLevel { value: String },
    #[error("failed to read dejavu environment: {source}")]
    EnvVar {
        #[from]
        source: EnvVarError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Maximum level the fmt subscriber lets through.
    pub log_level: Level,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { log_level: Level::INFO }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppConfigError> {
        let log_level = match LOG_LEVEL.get() {
            Ok(Some(level)) => level,
            Ok(None) => Level::INFO,
            Err(EnvVarError::Parse { value, .. }) => return Err(AppConfigError::InvalidLogLevel { value }),
            Err(err) => return Err(err.into()),
        };
        Ok(Self { log_level })
    }
}

#[cfg(test)]
mod tests {
    use dejavu_env::{CacheEnvVar, EnvVarGuard};
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn log_level_defaults_to_info() {
        let _guard = EnvVarGuard::unset(CacheEnvVar::LogLevel);
        let config = AppConfig::from_env().expect("config");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    #[serial]
    fn log_level_is_read_from_env() {
        let _guard = EnvVarGuard::set(CacheEnvVar::LogLevel, "debug");
        assert_eq!(AppConfig::from_env().expect("config").log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn invalid_log_level_is_reported_with_its_value() {
        let _guard = EnvVarGuard::set(CacheEnvVar::LogLevel, "chatty");
        match AppConfig::from_env() {
            Err(AppConfigError::InvalidLogLevel { value }) => assert_eq!(value, "chatty"),
            other => panic!("expected invalid log level, got {other:?}"),
        }
    }
}
