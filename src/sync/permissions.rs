//! Recursive permission adjustment of the destination tree.

use std::fmt;
use std::path::Path;

use crate::git::command::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// A permission mode written the way `chmod` takes it, e.g. `744`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(u32);

impl FileMode {
    /// Interpret the decimal digits of `digits` as an octal mode.
    ///
    /// `0` means "leave permissions alone" and yields `Ok(None)`.
    pub fn from_digits(digits: u32) -> Result<Option<Self>, String> {
        if digits == 0 {
            return Ok(None);
        }
        let text = digits.to_string();
        if text.len() > 4 {
            return Err(format!("{digits} has more than four digits"));
        }
        u32::from_str_radix(&text, 8)
            .map(|mode| Some(FileMode(mode)))
            .map_err(|_| format!("{digits} is not an octal mode"))
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.0)
    }
}

/// Run `chmod -R <mode> <dest>` through `runner`.
pub async fn apply<R: CommandRunner + ?Sized>(
    runner: &R,
    chmod: &Path,
    mode: FileMode,
    dest: &Path,
) -> Result<CommandOutput, CommandError> {
    let spec = CommandSpec::new(chmod)
        .arg("-R")
        .arg(mode.to_string())
        .arg(dest.as_os_str());
    tracing::debug!("change permissions of {} to {}", dest.display(), mode);
    runner.run(&spec).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_means_unchanged() {
        assert_eq!(FileMode::from_digits(0).unwrap(), None);
    }

    #[test]
    fn test_digits_are_octal() {
        let mode = FileMode::from_digits(744).unwrap().unwrap();
        assert_eq!(mode.bits(), 0o744);
        assert_eq!(mode.to_string(), "744");

        let mode = FileMode::from_digits(2775).unwrap().unwrap();
        assert_eq!(mode.bits(), 0o2775);
    }

    #[test]
    fn test_rejects_non_octal_digits() {
        assert!(FileMode::from_digits(789).is_err());
        assert!(FileMode::from_digits(98).is_err());
    }

    #[test]
    fn test_rejects_too_many_digits() {
        assert!(FileMode::from_digits(17777).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_apply_changes_tree_permissions() {
        use crate::git::command::SystemRunner;
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("file.txt"), "data").unwrap();

        let mode = FileMode::from_digits(750).unwrap().unwrap();
        apply(&SystemRunner, Path::new("chmod"), mode, temp.path())
            .await
            .unwrap();

        let file_mode = std::fs::metadata(nested.join("file.txt"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o7777, 0o750);
    }
}
