//! Validated configuration structures

use crate::schema::{RawConfig, RawDefaults, RawEnforcerConfig, RawEnforcerKind, RawServiceConfig};
use focus_api::{Settings, SettingsPatch};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;
const DEFAULT_COLLABORATOR_TIMEOUT_MS: u64 = 2000;

/// Validated configuration ready for use by the service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub service: ServiceSection,
    pub enforcer: EnforcerConfig,
    /// Settings used when the store has none yet
    pub default_settings: Settings,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig {
            config_version: crate::CURRENT_CONFIG_VERSION,
            service: RawServiceConfig::default(),
            enforcer: RawEnforcerConfig::default(),
            defaults: RawDefaults::default(),
        })
    }
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceSection::from_raw(raw.service),
            enforcer: EnforcerConfig::from_raw(raw.enforcer),
            default_settings: Settings::from_patch(&defaults_patch(raw.defaults)),
        }
    }
}

/// Service paths and timing
#[derive(Debug, Clone)]
pub struct ServiceSection {
    pub socket_path: PathBuf,
    pub data_dir: PathBuf,
    pub tick_interval: Duration,
    pub collaborator_timeout: Duration,
}

impl ServiceSection {
    fn from_raw(raw: RawServiceConfig) -> Self {
        Self {
            socket_path: raw
                .socket_path
                .unwrap_or_else(focus_util::socket_path_without_env),
            data_dir: raw
                .data_dir
                .unwrap_or_else(focus_util::data_dir_without_env),
            tick_interval: Duration::from_millis(
                raw.tick_interval_ms.unwrap_or(DEFAULT_TICK_INTERVAL_MS),
            ),
            collaborator_timeout: Duration::from_millis(
                raw.collaborator_timeout_ms
                    .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT_MS),
            ),
        }
    }
}

/// Which denylist enforcer the service drives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnforcerConfig {
    Passive,
    HostsFile { hosts_path: PathBuf },
}

impl EnforcerConfig {
    fn from_raw(raw: RawEnforcerConfig) -> Self {
        match (raw.kind, raw.hosts_path) {
            (RawEnforcerKind::HostsFile, Some(hosts_path)) => EnforcerConfig::HostsFile { hosts_path },
            // Validation rejects hosts_file without a path
            _ => EnforcerConfig::Passive,
        }
    }
}

fn defaults_patch(raw: RawDefaults) -> SettingsPatch {
    SettingsPatch {
        work_duration_minutes: raw.work_minutes,
        break_duration_minutes: raw.break_minutes,
        long_break_duration_minutes: raw.long_break_minutes,
        sessions_before_long_break: raw.sessions_before_long_break,
        notifications_enabled: raw.notifications_enabled,
        blocking_enabled: raw.blocking_enabled,
        denylist: raw.denylist,
        allowlist: raw.allowlist,
        auto_start_breaks: raw.auto_start_breaks,
        auto_start_work: raw.auto_start_work,
        block_while_paused: raw.block_while_paused,
        ..Default::default()
    }
}
