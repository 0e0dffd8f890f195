//! Git integration layer for git-sync
//!
//! git-sync never links a git library; it shells out to the `git` executable
//! found on `PATH` and interprets exit status and output. [`Git`] builds each
//! invocation and hands it to a [`CommandRunner`].

use std::path::{Path, PathBuf};

use crate::error::GitSyncError;

pub mod command;
pub mod credentials;

use command::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Name of the metadata directory whose presence marks a cloned destination.
pub const METADATA_DIR: &str = ".git";

/// Locate an executable on `PATH`.
pub fn find_tool(tool: &'static str) -> Result<PathBuf, GitSyncError> {
    which::which(tool).map_err(|source| GitSyncError::ToolNotFound { tool, source })
}

/// Git command builder bound to one executable and one runner
pub struct Git<R> {
    program: PathBuf,
    runner: R,
}

impl<R: CommandRunner> Git<R> {
    pub fn new(program: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            program: program.into(),
            runner,
        }
    }

    /// Resolve `git` from `PATH`.
    pub fn discover(runner: R) -> Result<Self, GitSyncError> {
        Ok(Self::new(find_tool("git")?, runner))
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.program)
    }

    /// Clone only metadata and refs of `branch`; the working tree stays empty.
    pub async fn clone_no_checkout(
        &self,
        repo: &str,
        branch: &str,
        depth: u32,
        dest: &Path,
    ) -> Result<CommandOutput, CommandError> {
        let mut spec = self.command().args(["clone", "--no-checkout", "-b", branch]);
        if depth > 0 {
            spec = spec.arg("--depth").arg(depth.to_string());
        }
        let spec = spec.arg(repo).arg(dest.as_os_str());
        self.runner.run(&spec).await
    }

    pub async fn set_remote_url(
        &self,
        dest: &Path,
        repo: &str,
    ) -> Result<CommandOutput, CommandError> {
        let spec = self
            .command()
            .args(["remote", "set-url", "origin", repo])
            .current_dir(dest);
        self.runner.run(&spec).await
    }

    pub async fn pull(&self, dest: &Path, branch: &str) -> Result<CommandOutput, CommandError> {
        let spec = self
            .command()
            .args(["pull", "origin", branch])
            .current_dir(dest);
        self.runner.run(&spec).await
    }

    /// Discards local modifications; the destination is a mirror.
    pub async fn reset_hard(&self, dest: &Path, rev: &str) -> Result<CommandOutput, CommandError> {
        let spec = self
            .command()
            .args(["reset", "--hard", rev])
            .current_dir(dest);
        self.runner.run(&spec).await
    }

    /// Point the global credential helper at git's in-memory cache.
    pub async fn use_credential_cache(&self) -> Result<CommandOutput, CommandError> {
        let spec = self
            .command()
            .args(["config", "--global", "credential.helper", "cache"]);
        self.runner.run(&spec).await
    }

    /// Store credentials through `git credential approve`.
    pub async fn approve_credentials(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<CommandOutput, CommandError> {
        let spec = self
            .command()
            .args(["credential", "approve"])
            .stdin(format!("url={url}\nusername={username}\npassword={password}\n"));
        self.runner.run(&spec).await
    }
}
