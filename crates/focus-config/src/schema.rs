//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Denylist enforcer selection
    #[serde(default)]
    pub enforcer: RawEnforcerConfig,

    /// Seed values for user settings, used when nothing is stored yet
    #[serde(default)]
    pub defaults: RawDefaults,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// IPC socket path (default: $XDG_RUNTIME_DIR/focusd/focusd.sock)
    pub socket_path: Option<PathBuf>,

    /// Data directory for the store
    pub data_dir: Option<PathBuf>,

    /// Tick cadence in milliseconds (default: 1000)
    pub tick_interval_ms: Option<u64>,

    /// Deadline for notifier and enforcer calls (default: 2000)
    pub collaborator_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEnforcerKind {
    /// Log only; observers enforce via `check_domain`
    #[default]
    Passive,
    /// Maintain a marked block in a hosts file
    HostsFile,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawEnforcerConfig {
    #[serde(default)]
    pub kind: RawEnforcerKind,

    /// Hosts file to manage (required for `hosts_file`)
    pub hosts_path: Option<PathBuf>,
}

/// Settings seed. Field names follow TOML conventions rather than the
/// persisted camelCase shape.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawDefaults {
    pub work_minutes: Option<i64>,
    pub break_minutes: Option<i64>,
    pub long_break_minutes: Option<i64>,
    pub sessions_before_long_break: Option<i64>,
    pub notifications_enabled: Option<bool>,
    pub blocking_enabled: Option<bool>,
    pub auto_start_breaks: Option<bool>,
    pub auto_start_work: Option<bool>,
    pub block_while_paused: Option<bool>,
    pub denylist: Option<Vec<String>>,
    pub allowlist: Option<Vec<String>>,
}
