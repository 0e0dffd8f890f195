//! Configuration management for git-sync
//!
//! Settings are layered with figment, lowest precedence first:
//!
//! 1. built-in defaults ([`SyncSettings::default`])
//! 2. an optional TOML/YAML/JSON file named with `--config`
//! 3. values from the command line, which clap already merged with the
//!    `GIT_SYNC_*` environment variables
//!
//! The merged [`SyncSettings`] are then validated into an immutable
//! [`SyncConfig`] that is built once and passed to the loop.

use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::git::credentials::Credentials;
use crate::sync::permissions::FileMode;
use crate::sync::scheduler::{DEFAULT_WAIT, ERROR_LIMIT, Schedule};

/// Raw settings as they appear in a config file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncSettings {
    /// Repository URL
    pub repo: String,

    pub branch: String,

    /// Commit SHA, tag or symbolic ref to pin the working tree to
    pub rev: String,

    /// Destination path
    pub dest: PathBuf,

    /// Shallow clone depth, 0 for full history
    pub depth: u32,

    /// Seconds between syncs
    pub wait: u64,

    pub one_time: bool,

    pub username: String,

    pub password: String,

    /// Octal digits such as 744, 0 leaves permissions unchanged
    pub change_permissions: u32,

    pub callback_url: String,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            repo: String::new(),
            branch: "master".to_string(),
            rev: "HEAD".to_string(),
            dest: PathBuf::new(),
            depth: 0,
            wait: DEFAULT_WAIT.as_secs(),
            one_time: false,
            username: String::new(),
            password: String::new(),
            change_permissions: 0,
            callback_url: String::new(),
        }
    }
}

/// Values given explicitly on the command line or through the environment.
/// Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_permissions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl SyncSettings {
    /// Merge defaults, the optional config file and `overrides`.
    pub fn load(
        config_file: Option<&Path>,
        overrides: &SettingsOverrides,
    ) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(SyncSettings::default()));

        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::MissingFile {
                    path: path.to_path_buf(),
                });
            }
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        figment = figment.merge(Serialized::defaults(overrides));

        Ok(figment.extract()?)
    }

    /// Validate into the immutable runtime configuration.
    pub fn resolve(self) -> Result<SyncConfig, ConfigError> {
        let repo = self.repo.trim().to_string();
        if repo.is_empty() {
            return Err(ConfigError::MissingRepo);
        }
        if self.dest.as_os_str().is_empty() {
            return Err(ConfigError::MissingDest);
        }
        if self.branch.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "branch",
                reason: "must not be empty".to_string(),
            });
        }
        if self.rev.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "rev",
                reason: "must not be empty".to_string(),
            });
        }

        let permissions = FileMode::from_digits(self.change_permissions).map_err(|reason| {
            ConfigError::InvalidValue {
                field: "change-permissions",
                reason,
            }
        })?;

        let callback_url = match self.callback_url.trim() {
            "" => None,
            url => {
                reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                    field: "callback-url",
                    reason: e.to_string(),
                })?;
                Some(url.to_string())
            }
        };

        let credentials = Credentials::from_parts(&self.username, &self.password);
        if credentials.is_none() && (!self.username.is_empty() || !self.password.is_empty()) {
            tracing::warn!("both username and password are required for authentication, ignoring");
        }

        Ok(SyncConfig {
            target: SyncTarget {
                repo,
                branch: self.branch,
                rev: self.rev,
                dest: self.dest,
                depth: self.depth,
                permissions,
                callback_url,
            },
            credentials,
            schedule: Schedule {
                wait: Duration::from_secs(self.wait),
                one_time: self.one_time,
                error_limit: ERROR_LIMIT,
            },
        })
    }
}

/// What to sync and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub repo: String,
    pub branch: String,
    pub rev: String,
    pub dest: PathBuf,
    pub depth: u32,
    pub permissions: Option<FileMode>,
    pub callback_url: Option<String>,
}

/// Validated configuration, immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub target: SyncTarget,
    pub credentials: Option<Credentials>,
    pub schedule: Schedule,
}
