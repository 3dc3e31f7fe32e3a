use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const ENV_HOSTNAME: &str = "HOSTNAME";
pub const ENV_AWS_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_API_URL: &str = "PREFECT_API_URL";
pub const ENV_TASK_FAMILY: &str = "ECS_TASK_FAMILY";
pub const ENV_CLUSTER: &str = "ECS_CLUSTER";
pub const ENV_METADATA_URI: &str = "ECS_CONTAINER_METADATA_URI_V4";

const UNKNOWN: &str = "unknown";
const NOT_SET: &str = "not_set";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub internet_probe: InternetProbeConfig,
    #[serde(default)]
    pub metadata_probe: MetadataProbeConfig,
    #[serde(default)]
    pub resources: ResourceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InternetProbeConfig {
    #[serde(default = "default_internet_url")]
    pub url: String,
    #[serde(default = "default_internet_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataProbeConfig {
    #[serde(default = "default_metadata_path")]
    pub path: String,
    #[serde(default = "default_metadata_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResourceConfig {
    #[serde(default = "default_cpu_sample_ms")]
    pub cpu_sample_ms: u64,
    #[serde(default = "default_disk_mount")]
    pub disk_mount: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            internet_probe: InternetProbeConfig::default(),
            metadata_probe: MetadataProbeConfig::default(),
            resources: ResourceConfig::default(),
        }
    }
}

impl Default for InternetProbeConfig {
    fn default() -> Self {
        Self {
            url: default_internet_url(),
            timeout_ms: default_internet_timeout_ms(),
        }
    }
}

impl Default for MetadataProbeConfig {
    fn default() -> Self {
        Self {
            path: default_metadata_path(),
            timeout_ms: default_metadata_timeout_ms(),
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            cpu_sample_ms: default_cpu_sample_ms(),
            disk_mount: default_disk_mount(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults".
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user_agent must not be empty".to_string(),
            ));
        }
        if self.internet_probe.url.trim().is_empty() {
            return Err(ConfigError::Validation(
                "internet_probe.url must not be empty".to_string(),
            ));
        }
        if self.internet_probe.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "internet_probe.timeout_ms must be > 0".to_string(),
            ));
        }
        if !self.metadata_probe.path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "metadata_probe.path '{}' must start with '/'",
                self.metadata_probe.path
            )));
        }
        if self.metadata_probe.timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "metadata_probe.timeout_ms must be > 0".to_string(),
            ));
        }
        if self.resources.cpu_sample_ms == 0 {
            return Err(ConfigError::Validation(
                "resources.cpu_sample_ms must be > 0".to_string(),
            ));
        }
        if self.resources.disk_mount.trim().is_empty() {
            return Err(ConfigError::Validation(
                "resources.disk_mount must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

/// Orchestration environment, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvSettings {
    pub container_hostname: String,
    pub aws_region: String,
    pub api_url: String,
    pub task_family: String,
    pub cluster_name: String,
    /// Base URL of the ECS task metadata endpoint. `None` disables the metadata probe.
    pub metadata_uri: Option<String>,
}

impl EnvSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default =
            |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());
        Self {
            container_hostname: or_default(ENV_HOSTNAME, UNKNOWN),
            aws_region: or_default(ENV_AWS_REGION, UNKNOWN),
            api_url: or_default(ENV_API_URL, NOT_SET),
            task_family: or_default(ENV_TASK_FAMILY, UNKNOWN),
            cluster_name: or_default(ENV_CLUSTER, UNKNOWN),
            metadata_uri: lookup(ENV_METADATA_URI).filter(|v| !v.is_empty()),
        }
    }
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_internet_url() -> String {
    "https://httpbin.org/ip".to_string()
}

const fn default_internet_timeout_ms() -> u64 {
    10_000
}

fn default_metadata_path() -> String {
    "/task".to_string()
}

const fn default_metadata_timeout_ms() -> u64 {
    5_000
}

const fn default_cpu_sample_ms() -> u64 {
    1_000
}

fn default_disk_mount() -> String {
    "/".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let cfg = Config::default();
        cfg.validate().expect("default config must validate");
        assert_eq!(cfg.internet_probe.timeout_ms, 10_000);
        assert_eq!(cfg.metadata_probe.timeout_ms, 5_000);
        assert_eq!(cfg.resources.cpu_sample_ms, 1_000);
        assert_eq!(cfg.resources.disk_mount, "/");
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg = Config::from_yaml(Config::example_yaml()).expect("example must parse");
        cfg.validate().expect("example must validate");
        assert_eq!(cfg.internet_probe.url, "https://httpbin.org/ip");
        assert_eq!(cfg.metadata_probe.path, "/task");
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let cfg = Config::from_yaml("internet_probe:\n  timeout_ms: 250\n").unwrap();
        assert_eq!(cfg.internet_probe.timeout_ms, 250);
        assert_eq!(cfg.internet_probe.url, "https://httpbin.org/ip");
        assert_eq!(cfg.metadata_probe.timeout_ms, 5_000);

        let empty = Config::from_yaml("").unwrap();
        assert_eq!(empty.resources.cpu_sample_ms, 1_000);
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        let mut cfg = Config::default();
        cfg.internet_probe.timeout_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        let mut cfg = Config::default();
        cfg.metadata_probe.timeout_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        let mut cfg = Config::default();
        cfg.resources.cpu_sample_ms = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn metadata_path_must_be_absolute() {
        let mut cfg = Config::default();
        cfg.metadata_probe.path = "task".to_string();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load_from_file("/nonexistent/workercheck.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn env_settings_default_when_unset() {
        let env = EnvSettings::from_lookup(|_| None);
        assert_eq!(env.container_hostname, "unknown");
        assert_eq!(env.aws_region, "unknown");
        assert_eq!(env.api_url, "not_set");
        assert_eq!(env.task_family, "unknown");
        assert_eq!(env.cluster_name, "unknown");
        assert_eq!(env.metadata_uri, None);
    }

    #[test]
    fn env_settings_take_actual_values() {
        let env = EnvSettings::from_lookup(lookup_from(&[
            (ENV_HOSTNAME, "ip-10-0-0-1"),
            (ENV_AWS_REGION, "eu-west-1"),
            (ENV_API_URL, "https://api.example.com"),
            (ENV_TASK_FAMILY, "worker"),
            (ENV_CLUSTER, "prod"),
            (ENV_METADATA_URI, "http://169.254.170.2/v4/abc"),
        ]));
        assert_eq!(env.container_hostname, "ip-10-0-0-1");
        assert_eq!(env.aws_region, "eu-west-1");
        assert_eq!(env.api_url, "https://api.example.com");
        assert_eq!(env.task_family, "worker");
        assert_eq!(env.cluster_name, "prod");
        assert_eq!(
            env.metadata_uri.as_deref(),
            Some("http://169.254.170.2/v4/abc")
        );
    }

    #[test]
    fn empty_metadata_uri_counts_as_unset() {
        let env = EnvSettings::from_lookup(lookup_from(&[(ENV_METADATA_URI, "")]));
        assert_eq!(env.metadata_uri, None);
    }

    #[test]
    fn whitespace_metadata_uri_still_enables_probe() {
        let env = EnvSettings::from_lookup(lookup_from(&[(ENV_METADATA_URI, "  ")]));
        assert_eq!(env.metadata_uri.as_deref(), Some("  "));
    }
}
