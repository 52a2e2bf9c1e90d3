use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use assignment::{AssignmentOptions, DedupKey, ExecuteOptions, Intent};
use graph::{AuthConfig, AuthMethod, RetryConfig};

use crate::paths;

// ============================================================================
// Config Schema
// ============================================================================

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub auth: AuthSection,
    pub assign: AssignSection,
    pub graph: GraphSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    pub method: AuthMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// JSON file with `tenant_id`, `app_id` and `clientSecret`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignSection {
    pub intent: Intent,
    pub notify: bool,
    pub restart_required: bool,
    pub override_existing: bool,
    pub dedup: DedupKey,
    pub jobs: usize,
    /// Consecutive authentication failures before a batch stops; 0 never stops
    pub auth_failure_limit: usize,
}

impl Default for AssignSection {
    fn default() -> Self {
        let options = AssignmentOptions::default();
        let execute = ExecuteOptions::default();
        Self {
            intent: Intent::default(),
            notify: options.notify,
            restart_required: options.restart_required,
            override_existing: options.override_existing,
            dedup: DedupKey::default(),
            jobs: execute.jobs,
            auth_failure_limit: execute.auth_failure_limit.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Fetch member counts when listing groups (one extra call per group)
    pub member_counts: bool,
    pub retry_attempts: u32,
    /// Delay before the first read retry, in seconds
    pub retry_delay_secs: u64,
}

impl Default for GraphSection {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            base_url: None,
            member_counts: true,
            retry_attempts: retry.max_attempts,
            retry_delay_secs: retry.base_delay.as_secs(),
        }
    }
}

impl Config {
    /// Load from an explicit path; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML format in {}", path.display()))
    }

    /// Write the config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Could not write {}", path.display()))?;
        Ok(())
    }

    /// Sign-in settings with file values layered over the defaults
    pub fn auth_config(&self) -> AuthConfig {
        let mut config = AuthConfig {
            method: self.auth.method,
            credentials_file: self.credentials_path(),
            ..AuthConfig::default()
        };
        if let Some(tenant) = &self.auth.tenant_id {
            config.tenant_id.clone_from(tenant);
        }
        if let Some(client) = &self.auth.client_id {
            config.client_id.clone_from(client);
        }
        config
    }

    /// Credentials file with `~` and variables expanded
    pub fn credentials_path(&self) -> Option<PathBuf> {
        self.auth
            .credentials_file
            .as_deref()
            .map(paths::expand_path)
    }

    pub fn assignment_options(&self) -> AssignmentOptions {
        AssignmentOptions {
            notify: self.assign.notify,
            restart_required: self.assign.restart_required,
            override_existing: self.assign.override_existing,
        }
    }

    pub fn execute_options(&self) -> ExecuteOptions {
        ExecuteOptions {
            jobs: self.assign.jobs.max(1),
            auth_failure_limit: (self.assign.auth_failure_limit > 0)
                .then_some(self.assign.auth_failure_limit),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            base_delay: Duration::from_secs(self.graph.retry_delay_secs),
            ..RetryConfig::with_attempts(self.graph.retry_attempts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.auth.method, AuthMethod::DeviceCode);
        assert_eq!(config.assign.intent, Intent::Required);
        assert_eq!(config.assignment_options(), AssignmentOptions::default());
        assert_eq!(config.execute_options().jobs, 4);
        assert_eq!(config.execute_options().auth_failure_limit, Some(3));
        assert!(config.graph.member_counts);
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[auth]
method = "client-secret"
tenant_id = "contoso.onmicrosoft.com"
credentials_file = "/etc/intune/creds.json"

[assign]
intent = "available"
notify = false
dedup = "group-and-intent"
auth_failure_limit = 0
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.assign.intent, Intent::Available);
        assert_eq!(config.assign.dedup, DedupKey::GroupAndIntent);
        assert!(!config.assignment_options().notify);
        assert!(config.assignment_options().override_existing);
        assert_eq!(config.execute_options().auth_failure_limit, None);

        let auth = config.auth_config();
        assert_eq!(auth.method, AuthMethod::ClientSecret);
        assert_eq!(auth.tenant_id, "contoso.onmicrosoft.com");
        assert_eq!(auth.client_id, graph::auth::PUBLIC_CLIENT_ID);
        assert_eq!(
            auth.credentials_file,
            Some(PathBuf::from("/etc/intune/creds.json"))
        );
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[assign]\nintent = \"sometimes\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.assign.jobs = 8;
        config.graph.member_counts = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.assign.jobs, 8);
        assert!(!loaded.graph.member_counts);
        assert_eq!(loaded.retry_config().max_attempts, 4);
    }
}
