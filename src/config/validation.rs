//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, StoreBackend};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("websocket.ping_interval_secs must be greater than zero")]
    ZeroPingInterval,
    #[error("websocket.read_timeout_secs ({read}) must exceed ping_interval_secs ({ping})")]
    ReadTimeoutTooShort { read: u64, ping: u64 },
    #[error("websocket.write_timeout_secs must be greater than zero")]
    ZeroWriteTimeout,
    #[error("store.redis_url is required when store.backend = \"redis\"")]
    MissingRedisUrl,
    #[error("store.room_ttl_secs must be greater than zero")]
    ZeroRoomTtl,
    #[error("lock.timeout_ms must be greater than zero")]
    ZeroLockTimeout,
    #[error("lock.max_retries must be greater than zero")]
    ZeroLockRetries,
    #[error("admin.api_key must not be empty when set")]
    EmptyAdminKey,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let ws = &config.websocket;
    if ws.ping_interval_secs == 0 {
        errors.push(ValidationError::ZeroPingInterval);
    }
    if ws.read_timeout_secs <= ws.ping_interval_secs {
        errors.push(ValidationError::ReadTimeoutTooShort {
            read: ws.read_timeout_secs,
            ping: ws.ping_interval_secs,
        });
    }
    if ws.write_timeout_secs == 0 {
        errors.push(ValidationError::ZeroWriteTimeout);
    }

    if config.store.backend == StoreBackend::Redis
        && config.store.redis_url.as_deref().is_none_or(str::is_empty)
    {
        errors.push(ValidationError::MissingRedisUrl);
    }
    if config.store.room_ttl_secs == 0 {
        errors.push(ValidationError::ZeroRoomTtl);
    }

    if config.lock.timeout_ms == 0 {
        errors.push(ValidationError::ZeroLockTimeout);
    }
    if config.lock.max_retries == 0 {
        errors.push(ValidationError::ZeroLockRetries);
    }

    if config.admin.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
        errors.push(ValidationError::EmptyAdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(validate(&Config::default()), Ok(()));
    }

    #[test]
    fn reports_every_problem() {
        let mut config = Config::default();
        config.websocket.ping_interval_secs = 60;
        config.websocket.read_timeout_secs = 30;
        config.store.backend = StoreBackend::Redis;
        config.lock.max_retries = 0;
        config.admin.api_key = Some("  ".into());

        let errors = validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ReadTimeoutTooShort { read: 30, ping: 60 },
                ValidationError::MissingRedisUrl,
                ValidationError::ZeroLockRetries,
                ValidationError::EmptyAdminKey,
            ]
        );
    }

    #[test]
    fn redis_with_url_is_valid() {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Redis;
        config.store.redis_url = Some("redis://localhost:6379".into());
        assert!(validate(&config).is_ok());
    }
}
