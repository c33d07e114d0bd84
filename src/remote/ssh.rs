//! Remote shell over the system `ssh` client.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use tokio::sync::Mutex;

use super::{RemoteShell, process, shell_quote};

/// Where to connect.
#[derive(Debug, Clone, PartialEq)]
pub struct SshTarget {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub identity: Option<PathBuf>,
}

impl SshTarget {
    /// `user@host` or plain `host`.
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

/// Runs commands on a remote host through `ssh`.
///
/// All commands share one multiplexed control connection and are issued one
/// at a time.
pub struct SshShell {
    target: SshTarget,
    timeout: Duration,
    control_path: PathBuf,
    lock: Mutex<()>,
}

impl SshShell {
    pub fn new(target: SshTarget, timeout: Duration) -> Self {
        let control_path =
            std::env::temp_dir().join(format!("tmodman-{}-%C", std::process::id()));
        Self {
            target,
            timeout,
            control_path,
            lock: Mutex::new(()),
        }
    }

    /// Arguments passed to `ssh` before the remote command.
    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path.display()),
            "-o".to_string(),
            "ControlPersist=60".to_string(),
        ];
        if let Some(port) = self.target.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        if let Some(identity) = &self.target.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(self.target.destination());
        args.push("--".to_string());
        args
    }

    async fn run(&self, command: &str, stdin: Option<&[u8]>) -> Result<String> {
        let _guard = self.lock.lock().await;
        let mut args = self.base_args();
        args.push(command.to_string());

        debug!("ssh {}: {}", self.target.destination(), command);
        let output = process::run("ssh", &args, stdin, self.timeout).await?;
        process::into_stdout(output, command)
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    #[tracing::instrument(skip(self))]
    async fn execute(&self, command: &str) -> Result<String> {
        self.run(command, None).await
    }

    #[tracing::instrument(skip(self, input), fields(bytes = input.len()))]
    async fn execute_with_input(&self, command: &str, input: &[u8]) -> Result<String> {
        self.run(command, Some(input)).await
    }

    #[tracing::instrument(skip(self, contents))]
    async fn upload(&self, path: &str, contents: &[u8]) -> Result<()> {
        let command = format!("cat > {}", shell_quote(path));
        self.run(&command, Some(contents))
            .await
            .with_context(|| format!("Failed to upload {} bytes to {}", contents.len(), path))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.target.destination()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> SshTarget {
        SshTarget {
            host: "10.0.0.5".into(),
            user: Some("steam".into()),
            port: None,
            identity: None,
        }
    }

    #[test]
    fn test_destination() {
        assert_eq!(target().destination(), "steam@10.0.0.5");

        let bare = SshTarget {
            user: None,
            ..target()
        };
        assert_eq!(bare.destination(), "10.0.0.5");
    }

    #[test]
    fn test_base_args_end_with_destination() {
        let shell = SshShell::new(target(), Duration::from_secs(5));
        let args = shell.base_args();

        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ControlMaster=auto".to_string()));
        assert!(!args.contains(&"-p".to_string()));
        assert_eq!(args[args.len() - 2], "steam@10.0.0.5");
        assert_eq!(args[args.len() - 1], "--");
    }

    #[test]
    fn test_base_args_port_and_identity() {
        let shell = SshShell::new(
            SshTarget {
                port: Some(2222),
                identity: Some(PathBuf::from("/home/op/.ssh/id_ed25519")),
                ..target()
            },
            Duration::from_secs(5),
        );
        let args = shell.base_args();

        let port = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[port + 1], "2222");
        let identity = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[identity + 1], "/home/op/.ssh/id_ed25519");
    }
}
