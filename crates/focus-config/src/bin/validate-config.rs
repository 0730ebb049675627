//! Config validation CLI tool
//!
//! Validates a focusd configuration file and reports any errors.

use focus_config::{ConfigError, EnforcerConfig, CURRENT_CONFIG_VERSION};
use focus_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a focusd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match focus_config::load_config(&config_path) {
        Ok(config) => {
            let settings = &config.default_settings;
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!("  Socket: {}", config.service.socket_path.display());
            println!("  Data dir: {}", config.service.data_dir.display());
            println!("  Tick: {:?}", config.service.tick_interval);
            match &config.enforcer {
                EnforcerConfig::Passive => println!("  Enforcer: passive"),
                EnforcerConfig::HostsFile { hosts_path } => {
                    println!("  Enforcer: hosts file ({})", hosts_path.display())
                }
            }
            println!(
                "  Timer: {}m work / {}m break / {}m long break every {}",
                settings.work_duration_minutes,
                settings.break_duration_minutes,
                settings.long_break_duration_minutes,
                settings.sessions_before_long_break
            );
            println!("  Denylist: {} domains", settings.denylist.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
