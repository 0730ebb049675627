//! Configuration validation

use crate::schema::{RawConfig, RawDefaults, RawEnforcerKind};
use focus_api::{
    normalize_domain, MAX_DURATION_MINUTES, MAX_SESSIONS_BEFORE_LONG_BREAK, MIN_DURATION_MINUTES,
    MIN_SESSIONS_BEFORE_LONG_BREAK,
};
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Service config error: {0}")]
    ServiceError(String),

    #[error("Enforcer config error: {0}")]
    EnforcerError(String),

    #[error("Default '{field}' = {value} is outside {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: u32,
        max: u32,
    },

    #[error("Invalid domain '{0}' in {1}")]
    InvalidDomain(String, &'static str),
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.service.tick_interval_ms == Some(0) {
        errors.push(ValidationError::ServiceError(
            "tick_interval_ms must be greater than zero".into(),
        ));
    }
    if config.service.collaborator_timeout_ms == Some(0) {
        errors.push(ValidationError::ServiceError(
            "collaborator_timeout_ms must be greater than zero".into(),
        ));
    }

    if config.enforcer.kind == RawEnforcerKind::HostsFile && config.enforcer.hosts_path.is_none() {
        errors.push(ValidationError::EnforcerError(
            "hosts_file enforcer requires hosts_path".into(),
        ));
    }

    errors.extend(validate_defaults(&config.defaults));

    errors
}

fn validate_defaults(defaults: &RawDefaults) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let durations = [
        ("work_minutes", defaults.work_minutes),
        ("break_minutes", defaults.break_minutes),
        ("long_break_minutes", defaults.long_break_minutes),
    ];
    for (field, value) in durations {
        if let Some(value) = value {
            check_range(&mut errors, field, value, MIN_DURATION_MINUTES, MAX_DURATION_MINUTES);
        }
    }

    if let Some(value) = defaults.sessions_before_long_break {
        check_range(
            &mut errors,
            "sessions_before_long_break",
            value,
            MIN_SESSIONS_BEFORE_LONG_BREAK,
            MAX_SESSIONS_BEFORE_LONG_BREAK,
        );
    }

    let lists = [
        ("denylist", &defaults.denylist),
        ("allowlist", &defaults.allowlist),
    ];
    for (field, list) in lists {
        for domain in list.iter().flatten() {
            if normalize_domain(domain).is_none() {
                errors.push(ValidationError::InvalidDomain(domain.clone(), field));
            }
        }
    }

    errors
}

fn check_range(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: i64,
    min: u32,
    max: u32,
) {
    if value < i64::from(min) || value > i64::from(max) {
        errors.push(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
}
