use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// What to do when every file of a required file field failed to reach storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequiredFilePolicy {
    /// Persist the submission anyway; the upload failure is only logged.
    #[default]
    BestEffort,
    /// Reject the submission with 502 and remove what was already stored.
    Strict,
}

impl FromStr for RequiredFilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "best_effort" => Ok(RequiredFilePolicy::BestEffort),
            "strict" => Ok(RequiredFilePolicy::Strict),
            other => Err(other.to_string()),
        }
    }
}

/// Base URL + service key of an external HTTP collaborator.
#[derive(Debug, Clone)]
pub struct ServiceEndpoint {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: String,
    pub identity: ServiceEndpoint,
    pub storage: Option<ServiceEndpoint>,
    pub storage_bucket: String,
    pub email: Option<ServiceEndpoint>,
    pub email_from: String,
    pub dashboard_url: Option<String>,
    pub upstream_timeout: Duration,
    pub form_cache_ttl: Duration,
    pub max_upload_bytes: usize,
    pub required_file_policy: RequiredFilePolicy,
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} must be set"),
            ConfigError::Invalid { key, value } => write!(f, "{key} has invalid value '{value}'"),
        }
    }
}

impl Default for Config {
    /// Local settings with no external storage or email; handy for tests.
    fn default() -> Self {
        Config {
            database_url: String::new(),
            bind_addr: "127.0.0.1:3001".to_string(),
            identity: ServiceEndpoint { url: String::new(), key: String::new() },
            storage: None,
            storage_bucket: "form-uploads".to_string(),
            email: None,
            email_from: "notifications@localhost".to_string(),
            dashboard_url: None,
            upstream_timeout: Duration::from_secs(10),
            form_cache_ttl: Duration::from_secs(60),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            required_file_policy: RequiredFilePolicy::BestEffort,
        }
    }
}

fn var(key: &'static str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    var(key).ok_or(ConfigError::Missing(key))
}

fn parsed<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match var(key) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

/// Both halves of an endpoint, or neither.
fn endpoint(url_key: &'static str, key_key: &'static str) -> Result<Option<ServiceEndpoint>, ConfigError> {
    match (var(url_key), var(key_key)) {
        (Some(url), Some(key)) => Ok(Some(ServiceEndpoint {
            url: url.trim_end_matches('/').to_string(),
            key,
        })),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::Missing(key_key)),
        (None, Some(_)) => Err(ConfigError::Missing(url_key)),
    }
}

impl Config {
    /// Read configuration from the process environment.
    /// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let identity = endpoint("IDENTITY_URL", "IDENTITY_API_KEY")?
            .ok_or(ConfigError::Missing("IDENTITY_URL"))?;

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            identity,
            storage: endpoint("STORAGE_URL", "STORAGE_KEY")?,
            storage_bucket: var("STORAGE_BUCKET").unwrap_or(defaults.storage_bucket),
            email: endpoint("EMAIL_API_URL", "EMAIL_API_KEY")?,
            email_from: var("EMAIL_FROM").unwrap_or(defaults.email_from),
            dashboard_url: var("DASHBOARD_URL").map(|u| u.trim_end_matches('/').to_string()),
            upstream_timeout: Duration::from_secs(parsed("UPSTREAM_TIMEOUT_SECS", 10u64)?),
            form_cache_ttl: Duration::from_secs(parsed("FORM_CACHE_TTL_SECS", 60u64)?),
            max_upload_bytes: parsed("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            required_file_policy: parsed("REQUIRED_FILE_POLICY", RequiredFilePolicy::BestEffort)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_known_values() {
        assert_eq!("strict".parse::<RequiredFilePolicy>(), Ok(RequiredFilePolicy::Strict));
        assert_eq!(" best_effort ".parse::<RequiredFilePolicy>(), Ok(RequiredFilePolicy::BestEffort));
        assert!("lenient".parse::<RequiredFilePolicy>().is_err());
    }

    #[test]
    fn defaults_match_documented_limits() {
        let cfg = Config::default();
        assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(cfg.upstream_timeout, Duration::from_secs(10));
        assert_eq!(cfg.storage_bucket, "form-uploads");
    }
}
