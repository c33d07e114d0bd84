//! Shell on the local machine.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;

use super::{RemoteShell, process, shell_quote};

/// Runs commands with `sh -c` on this machine.
///
/// Used when the game server runs locally, and by the end-to-end tests.
pub struct LocalShell {
    timeout: Duration,
}

impl LocalShell {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn run(&self, command: &str, stdin: Option<&[u8]>) -> Result<String> {
        debug!("sh -c {}", command);
        let args = vec!["-c".to_string(), command.to_string()];
        let output = process::run("sh", &args, stdin, self.timeout).await?;
        process::into_stdout(output, command)
    }
}

#[async_trait]
impl RemoteShell for LocalShell {
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
            .with_context(|| format!("Failed to write {}", path))?;
        Ok(())
    }

    fn describe(&self) -> String {
        "localhost".to_string()
    }
}
