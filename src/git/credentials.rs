//! One-time credential cache setup
//!
//! Mutates the global git configuration, so it runs once before the sync
//! loop starts and is never retried.

use std::fmt;

use super::Git;
use super::command::CommandRunner;
use crate::error::GitSyncError;

/// Username and password for the remote. Both are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Returns `None` unless both parts are present.
    pub fn from_parts(username: &str, password: &str) -> Option<Self> {
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Enable git's credential cache and store `credentials` for `repo`.
pub async fn setup_credential_cache<R: CommandRunner>(
    git: &Git<R>,
    repo: &str,
    credentials: &Credentials,
) -> Result<(), GitSyncError> {
    tracing::debug!("setting up the git credential cache");
    git.use_credential_cache()
        .await
        .map_err(GitSyncError::CredentialSetup)?;

    tracing::debug!("git credential approve for user {}", credentials.username);
    git.approve_credentials(repo, &credentials.username, &credentials.password)
        .await
        .map_err(GitSyncError::CredentialSetup)?;

    tracing::debug!("setting up the git credential cache completed");
    Ok(())
}
