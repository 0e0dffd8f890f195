//! External process execution
//!
//! Every process git-sync starts (git itself, chmod) goes through a
//! [`CommandRunner`]. A run produces a [`CommandOutput`] carrying the argument
//! vector, the exit status and the captured output, and a non-zero exit is
//! reported as [`CommandError::Failed`] wrapping that same output.

use async_trait::async_trait;
use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A process invocation: program, arguments, working directory and optional stdin.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Data written to the child's stdin before it is closed.
    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn get_stdin(&self) -> Option<&str> {
        self.stdin.as_deref()
    }

    /// Program followed by its arguments, as strings.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().map(|a| a.to_string_lossy().into_owned()))
            .collect()
    }

    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }
}

// stdin may carry credentials, so only its length is shown
impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("cwd", &self.cwd)
            .field(
                "stdin",
                &self.stdin.as_ref().map(|input| format!("<{} bytes>", input.len())),
            )
            .finish()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Result of a process that ran to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub argv: Vec<String>,
    pub status: ExitStatus,
    /// stdout followed by stderr
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn command_line(&self) -> String {
        self.argv.join(" ")
    }
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("error running command {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("error writing stdin of command {command:?}: {source}")]
    Stdin {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error(
        "error running command {:?}: {}: {}",
        .0.command_line(),
        .0.status,
        .0.output.trim_end()
    )]
    Failed(CommandOutput),
}

impl CommandError {
    /// Captured output, if the process got as far as producing any.
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            CommandError::Failed(output) => Some(output),
            _ => None,
        }
    }
}

/// Runs external commands. Implemented by [`SystemRunner`] for real processes.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;
}

/// Spawns real processes with tokio. Blocks the task until the child exits;
/// there is no timeout.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let mut cmd = Command::new(spec.program());
        cmd.args(spec.get_args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if spec.get_stdin().is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });
        if let Some(dir) = spec.get_current_dir() {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| CommandError::Spawn {
            command: spec.command_line(),
            source,
        })?;

        if let Some(input) = spec.get_stdin() {
            if let Some(mut stdin) = child.stdin.take() {
                stdin
                    .write_all(input.as_bytes())
                    .await
                    .map_err(|source| CommandError::Stdin {
                        command: spec.command_line(),
                        source,
                    })?;
                // dropping closes the pipe so the child sees EOF
                drop(stdin);
            }
        }

        let result = child
            .wait_with_output()
            .await
            .map_err(|source| CommandError::Spawn {
                command: spec.command_line(),
                source,
            })?;

        let mut output = String::from_utf8_lossy(&result.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&result.stderr));

        let output = CommandOutput {
            argv: spec.argv(),
            status: result.status,
            output,
        };

        if output.success() {
            Ok(output)
        } else {
            Err(CommandError::Failed(output))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_joins_program_and_args() {
        let spec = CommandSpec::new("git")
            .args(["reset", "--hard"])
            .arg("HEAD")
            .current_dir("/tmp/dest");

        assert_eq!(spec.command_line(), "git reset --hard HEAD");
        assert_eq!(spec.get_current_dir(), Some(Path::new("/tmp/dest")));
        assert_eq!(spec.to_string(), "git reset --hard HEAD");
    }

    #[test]
    fn test_debug_hides_stdin() {
        let spec = CommandSpec::new("git")
            .args(["credential", "approve"])
            .stdin("url=https://example.com\nusername=bot\npassword=s3cret\n");

        let debug = format!("{spec:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("credential"));
        assert!(debug.contains("bytes"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_output() {
        let spec = CommandSpec::new("sh").args(["-c", "echo out; echo err >&2"]);
        let output = SystemRunner.run(&spec).await.unwrap();

        assert!(output.success());
        assert!(output.output.contains("out"));
        assert!(output.output.contains("err"));
        assert_eq!(output.argv[0], "sh");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_failure_with_output() {
        let spec = CommandSpec::new("sh").args(["-c", "echo broken >&2; exit 3"]);
        let err = SystemRunner.run(&spec).await.unwrap_err();

        let output = err.output().expect("failed command keeps its output");
        assert_eq!(output.status.code(), Some(3));
        assert!(err.to_string().contains("broken"));
        assert!(err.to_string().contains("sh -c"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_feeds_stdin() {
        let spec = CommandSpec::new("cat").stdin("url=https://example.com\n");
        let output = SystemRunner.run(&spec).await.unwrap();

        assert_eq!(output.output, "url=https://example.com\n");
    }

    #[tokio::test]
    async fn test_system_runner_missing_program() {
        let spec = CommandSpec::new("nonexistent_command_12345");
        let err = SystemRunner.run(&spec).await.unwrap_err();

        assert!(matches!(err, CommandError::Spawn { .. }));
        assert!(err.output().is_none());
    }
}
