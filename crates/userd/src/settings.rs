//! Configuration schema and loading.
//!
//! Values come from, in increasing priority: built-in defaults, the TOML
//! config file, `USERD__*` environment variables (`__` separates sections),
//! and finally the plain `PORT` variable.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::user::SeedUser;

pub const APP_NAME: &str = "userd";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profile: String,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
    /// Users loaded into the store at startup, in order.
    pub seed_users: Vec<SeedUser>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            logging: LoggingConfig::default(),
            server: ServerConfig::default(),
            static_files: StaticFilesConfig::default(),
            seed_users: SeedUser::defaults(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub enabled: bool,
    /// Directory to serve; `~` and environment variables are expanded.
    pub dir: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "public".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `path` (optional) and the environment.
    pub fn load(path: &Path) -> Result<Self> {
        let config = Self::load_with_prefix(path, &env_prefix())?;
        config.with_port_override(std::env::var("PORT").ok())
    }

    /// Load using `prefix` for section overrides such as `PREFIX__SERVER__PORT`.
    pub fn load_with_prefix(path: &Path, prefix: &str) -> Result<Self> {
        let built = Config::builder()
            .add_source(
                File::from(path)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading config from {}", path.display()))?;

        built
            .try_deserialize()
            .with_context(|| format!("parsing config from {}", path.display()))
    }

    /// Apply a `PORT`-style override, ignoring empty values.
    pub fn with_port_override(mut self, port: Option<String>) -> Result<Self> {
        if let Some(port) = port.filter(|p| !p.trim().is_empty()) {
            self.server.port = port
                .trim()
                .parse()
                .with_context(|| format!("invalid PORT value '{port}'"))?;
        }
        Ok(self)
    }
}

/// Write the default configuration to `path`, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    let mut buffer = String::new();
    buffer.push_str("# Configuration for ");
    buffer.push_str(APP_NAME);
    buffer.push('\n');
    buffer.push_str("# File: ");
    buffer.push_str(&path.display().to_string());
    buffer.push('\n');
    buffer.push('\n');
    buffer
}

/// Environment variable prefix derived from the app name (`USERD`).
pub fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PREFIX: &str = "USERD_SETTINGS_TEST_UNSET";

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AppConfig::load_with_prefix(&dir.path().join("absent.toml"), TEST_PREFIX).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.seed_users, SeedUser::defaults());
        assert!(config.static_files.enabled);
    }

    #[test]
    fn test_default_config_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        write_default_config(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Configuration for userd"));

        let config = AppConfig::load_with_prefix(&path, TEST_PREFIX).unwrap();
        assert_eq!(config.profile, "default");
        assert_eq!(config.seed_users.len(), 2);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[server]
port = 8080

[static_files]
enabled = false

[[seed_users]]
name = "Solo"
email = "solo@example.com"
"#,
        )
        .unwrap();

        let config = AppConfig::load_with_prefix(&path, TEST_PREFIX).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(!config.static_files.enabled);
        assert_eq!(
            config.seed_users,
            vec![SeedUser::new("Solo", "solo@example.com")]
        );
    }

    #[test]
    fn test_port_override() {
        let config = AppConfig::default()
            .with_port_override(Some("4321".to_string()))
            .unwrap();
        assert_eq!(config.server.port, 4321);

        let config = AppConfig::default()
            .with_port_override(Some(String::new()))
            .unwrap();
        assert_eq!(config.server.port, 3000);

        assert!(
            AppConfig::default()
                .with_port_override(Some("not-a-port".to_string()))
                .is_err()
        );
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(env_prefix(), "USERD");
    }
}
