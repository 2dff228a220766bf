//! Configuration management for cmdjail
//!
//! Provides TOML-based configuration with defaults, environment overrides and
//! validation. Location: ~/.cmdjail/config.toml
//!
//! Precedence, lowest first: built-in defaults, config file, environment
//! variables (`ALLOWED_DIR`, `ALLOWED_COMMANDS`, `ALLOWED_FLAGS`,
//! `MAX_COMMAND_LENGTH`, `COMMAND_TIMEOUT`), command-line flags.

use crate::errors::{GatewayError, Result};
use crate::policy::{
    AllowList, SecurityPolicy, DEFAULT_ALLOWED_COMMANDS, DEFAULT_ALLOWED_FLAGS,
    DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_MAX_COMMAND_LENGTH,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_ALLOWED_DIR: &str = "ALLOWED_DIR";
pub const ENV_ALLOWED_COMMANDS: &str = "ALLOWED_COMMANDS";
pub const ENV_ALLOWED_FLAGS: &str = "ALLOWED_FLAGS";
pub const ENV_MAX_COMMAND_LENGTH: &str = "MAX_COMMAND_LENGTH";
pub const ENV_COMMAND_TIMEOUT: &str = "COMMAND_TIMEOUT";

/// Complete configuration for cmdjail
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sandbox: SandboxConfig,
    pub telemetry: TelemetryConfig,
}

/// Sandbox policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Root directory commands are confined to (required)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_dir: Option<PathBuf>,
    /// Comma-separated command names, or `all`
    pub allowed_commands: String,
    /// Comma-separated flags, or `all`
    pub allowed_flags: String,
    pub max_command_length: usize,
    pub command_timeout_secs: u64,
    /// Upper bound on simultaneous child processes
    pub max_parallel: usize,
}

/// Telemetry display configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub default_verbosity: String,
    pub color_output: bool,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            allowed_dir: None,
            allowed_commands: DEFAULT_ALLOWED_COMMANDS.to_string(),
            allowed_flags: DEFAULT_ALLOWED_FLAGS.to_string(),
            max_command_length: DEFAULT_MAX_COMMAND_LENGTH,
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            max_parallel: crate::tools::executor::default_max_parallel(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_verbosity: "normal".to_string(),
            color_output: true,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::ConfigError(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| GatewayError::ConfigError(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cmdjail").join("config.toml"))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_ALLOWED_DIR).filter(|d| !d.is_empty()) {
            self.sandbox.allowed_dir = Some(PathBuf::from(dir));
        }
        if let Some(commands) = lookup(ENV_ALLOWED_COMMANDS) {
            self.sandbox.allowed_commands = commands;
        }
        if let Some(flags) = lookup(ENV_ALLOWED_FLAGS) {
            self.sandbox.allowed_flags = flags;
        }
        if let Some(raw) = lookup(ENV_MAX_COMMAND_LENGTH) {
            self.sandbox.max_command_length = parse_number(ENV_MAX_COMMAND_LENGTH, &raw)?;
        }
        if let Some(raw) = lookup(ENV_COMMAND_TIMEOUT) {
            self.sandbox.command_timeout_secs = parse_number(ENV_COMMAND_TIMEOUT, &raw)?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.sandbox.max_command_length == 0 {
            return Err(GatewayError::ConfigError(
                "max_command_length must be greater than 0".to_string(),
            ));
        }

        if self.sandbox.command_timeout_secs == 0 {
            return Err(GatewayError::ConfigError(
                "command_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.sandbox.max_parallel == 0 {
            return Err(GatewayError::ConfigError(
                "max_parallel must be greater than 0".to_string(),
            ));
        }

        if crate::cli::Verbosity::parse(&self.telemetry.default_verbosity).is_none() {
            return Err(GatewayError::ConfigError(format!(
                "Invalid verbosity level: {}",
                self.telemetry.default_verbosity
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).map_err(|e| {
            GatewayError::ConfigError(format!("Failed to serialize config: {}", e))
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GatewayError::ConfigError(format!("Failed to create config dir: {}", e))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| GatewayError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// The allowed root, which has no default
    pub fn allowed_dir(&self) -> Result<PathBuf> {
        self.sandbox.allowed_dir.clone().ok_or_else(|| {
            GatewayError::ConfigError(format!(
                "Valid {} is required (set it in the config file, the environment, or --allowed-dir)",
                ENV_ALLOWED_DIR
            ))
        })
    }

    /// Build the immutable security policy
    pub fn to_policy(&self) -> SecurityPolicy {
        SecurityPolicy::new(
            AllowList::parse(&self.sandbox.allowed_commands),
            AllowList::parse(&self.sandbox.allowed_flags),
        )
        .with_max_command_length(self.sandbox.max_command_length)
        .with_timeout(Duration::from_secs(self.sandbox.command_timeout_secs))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        GatewayError::ConfigError(format!("{} must be a non-negative integer, got '{}'", key, raw))
    })
}
