//! Error types for git-sync.
//!
//! Startup errors (`ConfigError`, `GitSyncError`) end the process. `SyncError`
//! covers a single failed iteration and is counted by the sync loop instead.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::git::command::CommandError;
use crate::sync::SyncStep;

/// Invalid or incomplete configuration, detected before the loop starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required repository url (--repo or GIT_SYNC_REPO)")]
    MissingRepo,

    #[error("missing required destination path (--dest or GIT_SYNC_DEST)")]
    MissingDest,

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("config file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

/// Fatal conditions that terminate the process with a non-zero status.
#[derive(Error, Debug)]
pub enum GitSyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("required {tool} executable not found: {source}")]
    ToolNotFound {
        tool: &'static str,
        #[source]
        source: which::Error,
    },

    #[error("error setting up git credentials: {0}")]
    CredentialSetup(#[source] CommandError),

    #[error(transparent)]
    Loop(#[from] LoopError),
}

/// Reasons the sync loop gives up.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoopError {
    #[error("error limit of {limit} exceeded")]
    ErrorLimitExceeded { limit: u32 },
}

/// Failure of one sync iteration. Never fatal on its own.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("error checking if repo exists {}: {source}", path.display())]
    MetadataCheck {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{step} failed: {source}")]
    Step {
        step: SyncStep,
        #[source]
        source: CommandError,
    },

    #[error("get url {url} failed: {source}")]
    CallbackRequest {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed with status code {status}")]
    CallbackStatus { url: String, status: u16 },
}

impl SyncError {
    /// The step that failed, for log fields.
    pub fn step(&self) -> SyncStep {
        match self {
            SyncError::MetadataCheck { .. } => SyncStep::MetadataCheck,
            SyncError::Step { step, .. } => *step,
            SyncError::CallbackRequest { .. } | SyncError::CallbackStatus { .. } => {
                SyncStep::Callback
            }
        }
    }
}
