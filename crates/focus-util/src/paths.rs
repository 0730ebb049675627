//! Default paths for focusd components
//!
//! Paths are user-writable by default (no root required):
//! - Socket: `$XDG_RUNTIME_DIR/focusd/focusd.sock` or `/tmp/focusd-$USER/focusd.sock`
//! - Data: `$XDG_DATA_HOME/focusd` or `~/.local/share/focusd`
//! - Config: `$XDG_CONFIG_HOME/focusd/config.toml` or `~/.config/focusd/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the socket path
pub const FOCUSD_SOCKET_ENV: &str = "FOCUSD_SOCKET";

/// Environment variable for overriding the data directory
pub const FOCUSD_DATA_DIR_ENV: &str = "FOCUSD_DATA_DIR";

const SOCKET_FILENAME: &str = "focusd.sock";
const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "focusd";

fn home_subdir(parts: &[&str]) -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    let mut path = PathBuf::from(home);
    for part in parts {
        path.push(part);
    }
    Some(path.join(APP_DIR))
}

/// Get the default socket path.
///
/// Order of precedence:
/// 1. `$FOCUSD_SOCKET`
/// 2. `$XDG_RUNTIME_DIR/focusd/focusd.sock`
/// 3. `/tmp/focusd-$USER/focusd.sock`
pub fn default_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(FOCUSD_SOCKET_ENV) {
        return PathBuf::from(path);
    }

    socket_path_without_env()
}

/// Socket path ignoring `FOCUSD_SOCKET`, for config defaults where the env
/// var is applied separately by the CLI layer.
pub fn socket_path_without_env() -> PathBuf {
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(APP_DIR).join(SOCKET_FILENAME);
    }

    let username = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/{}-{}", APP_DIR, username)).join(SOCKET_FILENAME)
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$FOCUSD_DATA_DIR`
/// 2. `$XDG_DATA_HOME/focusd`
/// 3. `~/.local/share/focusd`
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(FOCUSD_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Data directory ignoring `FOCUSD_DATA_DIR`.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    home_subdir(&[".local", "share"]).unwrap_or_else(|| PathBuf::from("/tmp").join(APP_DIR).join("data"))
}

/// Get the default configuration file path.
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    home_subdir(&[".config"])
        .unwrap_or_else(|| PathBuf::from("/etc").join(APP_DIR))
        .join(CONFIG_FILENAME)
}
