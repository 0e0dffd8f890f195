//! # git-sync
//!
//! Keeps a local directory in sync with a branch of a remote git repository.
//! Meant to run next to an application container that reads the directory.
//!
//! Each iteration clones the repository if needed, points `origin` at the
//! configured URL, pulls the branch, hard-resets to the configured revision,
//! optionally fixes permissions and pings a callback URL. Failures are
//! counted; more than five in a row end the process.
//!
//! ```bash
//! git-sync --repo https://github.com/example/site.git --dest /srv/site --wait 60
//! GIT_SYNC_REPO=... GIT_SYNC_DEST=/srv/site GIT_SYNC_ONE_TIME=true git-sync
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod sync;

pub use cli::Cli;
pub use config::{SyncConfig, SyncSettings, SyncTarget};
pub use error::{ConfigError, GitSyncError, LoopError, SyncError};
