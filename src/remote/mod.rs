//! Remote command execution.
//!
//! Everything the engine needs from the managed host goes through the
//! [`RemoteShell`] trait: a command string in, its standard output back.
//!
//! - `ssh` - [`SshShell`], runs commands through the system `ssh` client
//! - `local` - [`LocalShell`], runs commands with `sh -c` on this machine
//! - `process` - child process handling shared by both

mod local;
mod process;
mod ssh;

use anyhow::Result;
use async_trait::async_trait;

pub use local::LocalShell;
pub use ssh::{SshShell, SshTarget};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteShell: Send + Sync {
    /// Run a shell command on the host and return its standard output.
    /// A non-zero exit status is an error carrying the command's stderr.
    async fn execute(&self, command: &str) -> Result<String>;

    /// Like [`RemoteShell::execute`], with `input` fed to the command's
    /// standard input.
    async fn execute_with_input(&self, command: &str, input: &[u8]) -> Result<String>;

    /// Write `contents` to `path` on the host, replacing any existing file.
    async fn upload(&self, path: &str, contents: &[u8]) -> Result<()>;

    /// Human readable description of the host, for log and error messages.
    fn describe(&self) -> String;
}

/// Quote a value for safe interpolation into a POSIX shell command.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | '+' | ':' | '='))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote_plain() {
        assert_eq!(shell_quote("/srv/tmod/docker-compose.yml"), "/srv/tmod/docker-compose.yml");
        assert_eq!(shell_quote("./"), "./");
    }

    #[test]
    fn test_shell_quote_special() {
        assert_eq!(shell_quote("my mods"), "'my mods'");
        assert_eq!(shell_quote("*.tmod"), "'*.tmod'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
    }
}
