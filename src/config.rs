use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::render::OutputFormat;

pub const DEFAULT_CONFIG_FILE: &str = ".issue2md.toml";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";
pub const DEFAULT_USER_AGENT: &str = "issue2md";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },
}

/// Top-level configuration loaded from `.issue2md.toml`.
/// Every field is optional; the tool works with no config file at all.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API token. If None, falls back to the GITHUB_TOKEN env var.
    pub token: Option<String>,
    pub api_url: String,
    pub graphql_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        GitHubConfig {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub enable_reactions: bool,
    pub enable_user_links: bool,
    pub format: OutputFormat,
}

/// Settings read from process environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub github_token: Option<String>,
    pub debug: bool,
    pub no_color: bool,
    /// Variables that were set but could not be parsed. Reported once logging is up.
    pub invalid_vars: Vec<(String, String)>,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup, so tests don't touch the real environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut invalid_vars = Vec::new();
        let debug = bool_var(&lookup, "DEBUG", false, &mut invalid_vars);
        let no_color = bool_var(&lookup, "NO_COLOR", false, &mut invalid_vars);
        Environment {
            github_token: lookup("GITHUB_TOKEN").filter(|t| !t.trim().is_empty()),
            debug,
            no_color,
            invalid_vars,
        }
    }

    pub fn log_invalid_vars(&self) {
        for (key, value) in &self.invalid_vars {
            warn!(key = %key, value = %value, "failed to parse boolean environment variable, using default");
        }
    }
}

fn bool_var<F>(lookup: &F, key: &str, default: bool, invalid: &mut Vec<(String, String)>) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(key).filter(|v| !v.is_empty()) else {
        return default;
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            invalid.push((key.to_string(), value));
            default
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `.issue2md.toml` in the current
    /// directory when no path is given. A missing default file yields defaults;
    /// a missing explicit path is an error.
    pub fn load(path: Option<&Path>, env: &Environment) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        if config.github.token.is_none() {
            config.github.token = env.github_token.clone();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.timeout_secs == 0 {
            return Err(invalid("github.timeout_secs", "timeout must be greater than zero"));
        }
        if self.github.user_agent.trim().is_empty() {
            return Err(invalid("github.user_agent", "user agent is required"));
        }
        if self.github.api_url.trim().is_empty() {
            return Err(invalid("github.api_url", "API URL is required"));
        }
        if self.github.graphql_url.trim().is_empty() {
            return Err(invalid("github.graphql_url", "GraphQL URL is required"));
        }
        Ok(())
    }
}

impl GitHubConfig {
    /// The configured token, ignoring blank values.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}
