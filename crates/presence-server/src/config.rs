use std::time::Duration;

use thiserror::Error;

use presence_sampler::{ProbeConfig, Target};

/// Placeholder secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me", "changeme", "secret", "dev-secret-change-me"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{0} is still a placeholder")]
    Placeholder(&'static str),
    #[error("{var} has an invalid value {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub api_key: String,
    pub host: String,
    pub port: u16,
    pub probe: ProbeConfig,
    pub targets: Vec<Target>,
    pub debug: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(var))
        };
        let optional = |var: &'static str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = required("DATABASE_URL")?;
        // Validated only; nothing reads the secret after startup.
        let secret_key = required("SECRET_KEY")?;
        if PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
            return Err(ConfigError::Placeholder("SECRET_KEY"));
        }
        let probe_url = required("PROBE_URL")?;
        let api_key = required("API_KEY")?;

        let host = optional("PRESENCE_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(optional("PRESENCE_PORT"), "PRESENCE_PORT", 8080)?;
        let timeout_secs: u64 = parse_or(optional("PROBE_TIMEOUT_SECS"), "PROBE_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "PROBE_TIMEOUT_SECS",
                value: "0".into(),
            });
        }
        let retries = parse_or(optional("PROBE_RETRIES"), "PROBE_RETRIES", 0)?;

        let targets = optional("PROBE_TARGETS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(Target::for_user)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            api_key,
            host,
            port,
            probe: ProbeConfig {
                url: probe_url,
                timeout: Duration::from_secs(timeout_secs),
                retries,
            },
            targets,
            debug: lookup("DEBUG").is_some_and(|v| !v.is_empty()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}
