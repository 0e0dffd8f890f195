//! Command-line interface for git-sync
//!
//! Every flag can also be set through an environment variable, which is how
//! the tool is usually configured when it runs as a sidecar container. An
//! explicit flag wins over the environment.

use anyhow::Result;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::config::{SettingsOverrides, SyncSettings};
use crate::error::GitSyncError;
use crate::git::command::SystemRunner;
use crate::git::credentials::setup_credential_cache;
use crate::git::{Git, find_tool};
use crate::sync::RepoSyncer;
use crate::sync::scheduler::SyncLoop;

/// Keep a local directory in sync with a remote git branch
#[derive(Parser, Debug)]
#[command(name = "git-sync", author, version, about, long_about = None)]
pub struct Cli {
    /// Git repository URL
    #[arg(long, env = "GIT_SYNC_REPO")]
    pub repo: Option<String>,

    /// Git branch [default: master]
    #[arg(long, env = "GIT_SYNC_BRANCH")]
    pub branch: Option<String>,

    /// Git revision to check out [default: HEAD]
    #[arg(long, env = "GIT_SYNC_REV")]
    pub rev: Option<String>,

    /// Destination path
    #[arg(long, env = "GIT_SYNC_DEST")]
    pub dest: Option<PathBuf>,

    /// Number of seconds to wait before the next sync [default: 300]
    #[arg(long, env = "GIT_SYNC_WAIT")]
    pub wait: Option<u64>,

    /// Exit after the initial checkout
    #[arg(
        long,
        env = "GIT_SYNC_ONE_TIME",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new()
    )]
    pub one_time: bool,

    /// Shallow clone with a history truncated to the specified number of commits
    #[arg(long, env = "GIT_SYNC_DEPTH")]
    pub depth: Option<u32>,

    /// Username for the git credential cache
    #[arg(long, env = "GIT_SYNC_USERNAME")]
    pub username: Option<String>,

    /// Password for the git credential cache
    #[arg(long, env = "GIT_SYNC_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Recursively change the permissions of the destination, e.g. 744
    #[arg(long = "change-permissions", env = "GIT_SYNC_PERMISSIONS")]
    pub change_permissions: Option<u32>,

    /// URL to call after each successful sync
    #[arg(long, env = "CALLBACK_URL")]
    pub callback_url: Option<String>,

    /// Optional TOML, YAML or JSON file with the same settings
    #[arg(long, value_name = "FILE", env = "GIT_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log verbosity (0 = info, 1-2 = debug, 3+ = trace)
    #[arg(short = 'v', long, env = "GIT_SYNC_VERBOSITY", default_value_t = 0)]
    pub verbosity: u8,
}

impl Cli {
    /// Settings given on the command line or through the environment.
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            repo: self.repo.clone(),
            branch: self.branch.clone(),
            rev: self.rev.clone(),
            dest: self.dest.clone(),
            depth: self.depth,
            wait: self.wait,
            one_time: self.one_time.then_some(true),
            username: self.username.clone(),
            password: self.password.clone(),
            change_permissions: self.change_permissions,
            callback_url: self.callback_url.clone(),
        }
    }

    /// Load configuration, prepare git and run the sync loop.
    ///
    /// Returns `Ok` only after a one-time sync; in continuous mode the loop
    /// ends with an error once the failure limit is exceeded.
    pub async fn run(self) -> Result<()> {
        setup_logging(self.verbosity);

        let config = SyncSettings::load(self.config.as_deref(), &self.overrides())
            .and_then(SyncSettings::resolve)
            .map_err(GitSyncError::from)?;

        tracing::info!(
            "sync repo {} to {}",
            config.target.repo,
            config.target.dest.display()
        );

        let git = Git::discover(SystemRunner)?;

        if let Some(credentials) = &config.credentials {
            setup_credential_cache(&git, &config.target.repo, credentials).await?;
        }

        let mut syncer = RepoSyncer::new(git, config.target.clone());
        if config.target.permissions.is_some() {
            syncer = syncer.with_chmod(find_tool("chmod")?);
        }

        SyncLoop::new(config.schedule.clone())
            .run(&syncer)
            .await
            .map_err(GitSyncError::from)?;

        Ok(())
    }
}

fn setup_logging(verbosity: u8) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbosity {
            0 => tracing_subscriber::EnvFilter::new("info"),
            1 | 2 => tracing_subscriber::EnvFilter::new("debug,hyper=info,reqwest=info"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // try_init: tests may have installed a subscriber already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};

    /// Parse `args` with every environment fallback removed.
    fn parse_without_env(args: &[&str]) -> Cli {
        let matches = Cli::command()
            .mut_args(|arg| arg.env(None::<&'static str>))
            .try_get_matches_from(args.iter().copied())
            .unwrap();
        Cli::from_arg_matches(&matches).unwrap()
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "git-sync",
            "--repo",
            "https://github.com/example/r.git",
            "--dest",
            "/srv/r",
            "--branch",
            "main",
            "--one-time",
            "--depth",
            "1",
            "--change-permissions",
            "744",
            "-v",
            "2",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.repo.as_deref(), Some("https://github.com/example/r.git"));
        assert_eq!(overrides.dest, Some(PathBuf::from("/srv/r")));
        assert_eq!(overrides.branch.as_deref(), Some("main"));
        assert_eq!(overrides.one_time, Some(true));
        assert_eq!(overrides.depth, Some(1));
        assert_eq!(overrides.change_permissions, Some(744));
        assert_eq!(cli.verbosity, 2);
    }

    #[test]
    fn test_unset_flags_do_not_override() {
        let cli = parse_without_env(&["git-sync", "--repo", "r", "--dest", "d"]);
        let overrides = cli.overrides();

        assert_eq!(overrides.one_time, None);
        assert_eq!(overrides.wait, None);
        assert_eq!(overrides.branch, None);
        assert_eq!(overrides.change_permissions, None);
        assert_eq!(overrides.callback_url, None);
    }

    #[test]
    fn test_one_time_flag_without_value() {
        let cli = parse_without_env(&["git-sync", "--one-time"]);
        assert!(cli.one_time);
        assert_eq!(cli.overrides().one_time, Some(true));
    }

    #[test]
    fn test_malformed_number_is_usage_error() {
        let err = Cli::try_parse_from(["git-sync", "--wait", "soon"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
