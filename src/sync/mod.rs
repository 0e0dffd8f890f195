//! Repository synchronization
//!
//! One call to [`SyncOperation::sync_once`] brings the destination directory
//! in line with the remote branch:
//!
//! 1. clone (metadata only) when `<dest>/.git` is absent
//! 2. `git remote set-url origin <repo>`
//! 3. `git pull origin <branch>`
//! 4. `git reset --hard <rev>`
//! 5. optional `chmod -R <mode> <dest>`
//! 6. optional HTTP GET to the callback URL
//!
//! Steps are strictly sequential; the first failure ends the attempt.

use async_trait::async_trait;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::config::SyncTarget;
use crate::error::SyncError;
use crate::git::command::{CommandError, CommandRunner};
use crate::git::{Git, METADATA_DIR};

pub mod callback;
pub mod permissions;
pub mod scheduler;

use callback::CallbackNotifier;

/// The individual steps of a sync attempt, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    MetadataCheck,
    Clone,
    SetRemote,
    Pull,
    Reset,
    Permissions,
    Callback,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncStep::MetadataCheck => "metadata check",
            SyncStep::Clone => "clone",
            SyncStep::SetRemote => "set remote url",
            SyncStep::Pull => "pull",
            SyncStep::Reset => "reset",
            SyncStep::Permissions => "change permissions",
            SyncStep::Callback => "callback",
        };
        f.write_str(name)
    }
}

/// What a successful attempt did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// The destination was empty and had to be cloned first.
    pub cloned: bool,
    pub rev: String,
    pub permissions_applied: bool,
    pub notified: bool,
}

/// A single synchronization attempt, driven repeatedly by the sync loop.
#[async_trait]
pub trait SyncOperation: Send + Sync {
    async fn sync_once(&self) -> Result<SyncReport, SyncError>;
}

/// Syncs one [`SyncTarget`] with the system `git`.
pub struct RepoSyncer<R> {
    git: Git<R>,
    target: SyncTarget,
    chmod: PathBuf,
    notifier: Option<CallbackNotifier>,
}

impl<R: CommandRunner> RepoSyncer<R> {
    pub fn new(git: Git<R>, target: SyncTarget) -> Self {
        let notifier = target.callback_url.clone().map(CallbackNotifier::new);
        Self {
            git,
            target,
            chmod: PathBuf::from("chmod"),
            notifier,
        }
    }

    /// Use a specific `chmod` executable instead of resolving it from `PATH`.
    pub fn with_chmod(mut self, chmod: impl Into<PathBuf>) -> Self {
        self.chmod = chmod.into();
        self
    }

    pub fn git(&self) -> &Git<R> {
        &self.git
    }

    /// Whether the destination already holds git metadata.
    async fn has_metadata(&self) -> Result<bool, SyncError> {
        let path = self.target.dest.join(METADATA_DIR);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(SyncError::MetadataCheck { path, source }),
        }
    }
}

fn step_error(step: SyncStep) -> impl FnOnce(CommandError) -> SyncError {
    move |source| SyncError::Step { step, source }
}

#[async_trait]
impl<R: CommandRunner> SyncOperation for RepoSyncer<R> {
    async fn sync_once(&self) -> Result<SyncReport, SyncError> {
        let target = &self.target;
        let dest = target.dest.as_path();

        let cloned = if self.has_metadata().await? {
            false
        } else {
            let output = self
                .git
                .clone_no_checkout(&target.repo, &target.branch, target.depth, dest)
                .await
                .map_err(step_error(SyncStep::Clone))?;
            tracing::debug!("clone {:?}: {}", target.repo, output.output.trim_end());
            true
        };

        let output = self
            .git
            .set_remote_url(dest, &target.repo)
            .await
            .map_err(step_error(SyncStep::SetRemote))?;
        tracing::debug!("set remote-url to {}: {}", target.repo, output.output.trim_end());

        let output = self
            .git
            .pull(dest, &target.branch)
            .await
            .map_err(step_error(SyncStep::Pull))?;
        tracing::debug!("fetch {:?}: {}", target.branch, output.output.trim_end());

        let output = self
            .git
            .reset_hard(dest, &target.rev)
            .await
            .map_err(step_error(SyncStep::Reset))?;
        tracing::debug!("reset {:?}: {}", target.rev, output.output.trim_end());

        let permissions_applied = match target.permissions {
            Some(mode) => {
                permissions::apply(self.git.runner(), &self.chmod, mode, dest)
                    .await
                    .map_err(step_error(SyncStep::Permissions))?;
                true
            }
            None => false,
        };

        let notified = match &self.notifier {
            Some(notifier) => {
                notifier.notify().await?;
                true
            }
            None => false,
        };

        Ok(SyncReport {
            cloned,
            rev: target.rev.clone(),
            permissions_applied,
            notified,
        })
    }
}
