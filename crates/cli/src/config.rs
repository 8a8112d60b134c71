//! Runtime configuration.
//!
//! Read from a TOML file (`tracker.toml` unless `--config` names another),
//! then overridden by environment variables. Every field has a default, so an
//! absent default file is not an error.
//!
//! ```toml
//! database = "tracker.db"
//! listen = "127.0.0.1:8080"
//!
//! [github]
//! api_base = "https://api.github.com"
//! token = "ghp_..."
//! timeout_secs = 10
//!
//! [webhook]
//! secret = "..."
//!
//! [log]
//! format = "json"
//! otlp_endpoint = "http://localhost:4317"
//! ```

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use anyhow::Context;
use github::GithubConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE: &str = "tracker.toml";
pub const DEFAULT_DATABASE: &str = "tracker.db";
pub const DEFAULT_PORT: u16 = 8080;

pub const ENV_GITHUB_TOKEN: &str = "TRACKER_GITHUB_TOKEN";
pub const ENV_WEBHOOK_SECRET: &str = "TRACKER_WEBHOOK_SECRET";
pub const ENV_DATABASE: &str = "TRACKER_DATABASE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,
    /// Address `serve` binds to.
    pub listen: SocketAddr,
    pub github: GithubConfig,
    pub webhook: WebhookConfig,
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            github: GithubConfig::default(),
            webhook: WebhookConfig::default(),
            log: LogConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Shared secret GitHub signs deliveries with. Without it every delivery
    /// is rejected.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// OTLP/gRPC collector. Spans are exported only when set.
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Loads `path`, or [`DEFAULT_CONFIG_FILE`] when `path` is `None`, and
    /// applies environment overrides.
    ///
    /// A missing file is an error only when it was named explicitly.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_toml(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound && !explicit => Self::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("cannot read config file {}", path.display()))
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Overrides secrets and the database path from the environment. Empty
    /// values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());
        if let Some(token) = lookup(ENV_GITHUB_TOKEN) {
            self.github.token = Some(token);
        }
        if let Some(secret) = lookup(ENV_WEBHOOK_SECRET) {
            self.webhook.secret = Some(secret);
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            self.database = PathBuf::from(database);
        }
    }
}
