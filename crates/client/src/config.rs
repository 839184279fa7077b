use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read { path: String, source: std::io::Error },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    Parse { path: String, source: toml::de::Error },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Deserialize, Debug, Clone)]
pub struct ClientConfig {
    /// Region-scoped API root, e.g. `https://us-west2-api.compute.cloud.hpe.com`.
    pub base_url: String,
    pub api_token: String,

    #[serde(default = "default_jobs_endpoint")]
    pub jobs_endpoint: String,
    #[serde(default = "default_job_uri_prefixes")]
    pub job_uri_prefixes: Vec<String>,
    #[serde(default = "default_schedules_endpoint")]
    pub schedules_endpoint: String,
    #[serde(default = "default_activities_endpoint")]
    pub activities_endpoint: String,
    #[serde(default = "default_servers_endpoint")]
    pub servers_endpoint: String,
    #[serde(default = "default_job_templates_endpoint")]
    pub job_templates_endpoint: String,

    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_collection_settle_seconds")]
    pub collection_settle_seconds: u64,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Job template name -> template id.
    #[serde(default)]
    pub job_templates: BTreeMap<String, String>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialClientConfig {
    base_url: Option<String>,
    api_token: Option<String>,
    jobs_endpoint: Option<String>,
    job_uri_prefixes: Option<Vec<String>>,
    schedules_endpoint: Option<String>,
    activities_endpoint: Option<String>,
    servers_endpoint: Option<String>,
    job_templates_endpoint: Option<String>,
    poll_timeout_seconds: Option<u64>,
    poll_interval_seconds: Option<u64>,
    collection_settle_seconds: Option<u64>,
    request_timeout_seconds: Option<u64>,
    log_dir: Option<String>,
    job_templates: Option<BTreeMap<String, String>>,
}

fn default_jobs_endpoint() -> String {
    "/compute-ops-mgmt/v1beta3/jobs".to_string()
}

fn default_job_uri_prefixes() -> Vec<String> {
    vec![
        "/compute-ops/v1beta2/jobs/".to_string(),
        "/compute-ops-mgmt/v1beta3/jobs/".to_string(),
    ]
}

fn default_schedules_endpoint() -> String {
    "/compute-ops-mgmt/v1beta2/schedules".to_string()
}

fn default_activities_endpoint() -> String {
    "/compute-ops-mgmt/v1beta2/activities".to_string()
}

fn default_servers_endpoint() -> String {
    "/compute-ops-mgmt/v1beta2/servers".to_string()
}

fn default_job_templates_endpoint() -> String {
    "/compute-ops-mgmt/v1beta2/job-templates".to_string()
}

fn default_poll_timeout_seconds() -> u64 {
    300
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_collection_settle_seconds() -> u64 {
    5
}

fn default_request_timeout_seconds() -> u64 {
    60
}

fn default_log_dir() -> String {
    "logs".to_string()
}

impl ClientConfig {
    /// Configuration with every optional field at its default.
    pub fn for_base_url(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            jobs_endpoint: default_jobs_endpoint(),
            job_uri_prefixes: default_job_uri_prefixes(),
            schedules_endpoint: default_schedules_endpoint(),
            activities_endpoint: default_activities_endpoint(),
            servers_endpoint: default_servers_endpoint(),
            job_templates_endpoint: default_job_templates_endpoint(),
            poll_timeout_seconds: default_poll_timeout_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
            collection_settle_seconds: default_collection_settle_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
            log_dir: default_log_dir(),
            job_templates: BTreeMap::new(),
        }
    }

    /// Loads configuration: TOML file (optional), then `FLEETOPS_*` environment
    /// variables on top, then defaults for whatever is still unset.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialClientConfig = match config_path {
            Some(path_str) if Path::new(path_str).exists() => {
                let contents = fs::read_to_string(path_str).map_err(|source| ConfigError::Read {
                    path: path_str.to_string(),
                    source,
                })?;
                Self::parse_toml(path_str, &contents)?
            }
            _ => PartialClientConfig::default(),
        };

        // 2. Load from environment variables
        let env_config: PartialClientConfig = envy::prefixed("FLEETOPS_").from_env()?;

        // 3. Merge: environment overrides file
        Self::merge(file_config, env_config)
    }

    fn parse_toml(path: &str, contents: &str) -> Result<PartialClientConfig, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    fn merge(file: PartialClientConfig, env: PartialClientConfig) -> Result<Self, ConfigError> {
        Ok(ClientConfig {
            base_url: env.base_url.or(file.base_url)
                .ok_or(ConfigError::Missing("FLEETOPS_BASE_URL"))?,
            api_token: env.api_token.or(file.api_token)
                .ok_or(ConfigError::Missing("FLEETOPS_API_TOKEN"))?,
            jobs_endpoint: env.jobs_endpoint.or(file.jobs_endpoint)
                .unwrap_or_else(default_jobs_endpoint),
            job_uri_prefixes: env.job_uri_prefixes.or(file.job_uri_prefixes)
                .unwrap_or_else(default_job_uri_prefixes),
            schedules_endpoint: env.schedules_endpoint.or(file.schedules_endpoint)
                .unwrap_or_else(default_schedules_endpoint),
            activities_endpoint: env.activities_endpoint.or(file.activities_endpoint)
                .unwrap_or_else(default_activities_endpoint),
            servers_endpoint: env.servers_endpoint.or(file.servers_endpoint)
                .unwrap_or_else(default_servers_endpoint),
            job_templates_endpoint: env.job_templates_endpoint.or(file.job_templates_endpoint)
                .unwrap_or_else(default_job_templates_endpoint),
            poll_timeout_seconds: env.poll_timeout_seconds.or(file.poll_timeout_seconds)
                .unwrap_or_else(default_poll_timeout_seconds),
            poll_interval_seconds: env.poll_interval_seconds.or(file.poll_interval_seconds)
                .unwrap_or_else(default_poll_interval_seconds),
            collection_settle_seconds: env.collection_settle_seconds.or(file.collection_settle_seconds)
                .unwrap_or_else(default_collection_settle_seconds),
            request_timeout_seconds: env.request_timeout_seconds.or(file.request_timeout_seconds)
                .unwrap_or_else(default_request_timeout_seconds),
            log_dir: env.log_dir.or(file.log_dir)
                .unwrap_or_else(default_log_dir),
            job_templates: env.job_templates.or(file.job_templates)
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_values_and_defaults() {
        let file = ClientConfig::parse_toml(
            "fleetops.toml",
            r#"
            base_url = "https://eu-central-api.example.com"
            api_token = "t0k3n"
            poll_interval_seconds = 10

            [job_templates]
            "PowerOn.New" = "0cbb2377-1834-488d-840c-d5bf788c34fb"
            "#,
        )
        .unwrap();

        let config = ClientConfig::merge(file, PartialClientConfig::default()).unwrap();
        assert_eq!(config.base_url, "https://eu-central-api.example.com");
        assert_eq!(config.poll_interval_seconds, 10);
        assert_eq!(config.poll_timeout_seconds, 300);
        assert_eq!(config.job_uri_prefixes.len(), 2);
        assert_eq!(
            config.job_templates.get("PowerOn.New").map(String::as_str),
            Some("0cbb2377-1834-488d-840c-d5bf788c34fb")
        );
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = PartialClientConfig {
            base_url: Some("https://file.example.com".to_string()),
            api_token: Some("file-token".to_string()),
            poll_timeout_seconds: Some(120),
            ..PartialClientConfig::default()
        };
        let env = PartialClientConfig {
            api_token: Some("env-token".to_string()),
            ..PartialClientConfig::default()
        };

        let config = ClientConfig::merge(file, env).unwrap();
        assert_eq!(config.base_url, "https://file.example.com");
        assert_eq!(config.api_token, "env-token");
        assert_eq!(config.poll_timeout_seconds, 120);
    }

    #[test]
    fn test_missing_base_url_is_reported() {
        let err = ClientConfig::merge(PartialClientConfig::default(), PartialClientConfig::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("FLEETOPS_BASE_URL")));
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let err = ClientConfig::parse_toml("broken.toml", "base_url = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
