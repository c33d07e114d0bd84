use anyhow::{Context, Result, bail};
use log::{debug, info, warn};

use crate::error::Error;
use crate::remote::{RemoteShell, shell_quote};

/// Suffix of the staging file written next to the target.
pub const STAGING_SUFFIX: &str = ".tmodman.tmp";

/// Replaces a remote file without ever leaving it partially written.
///
/// The contents go to a sibling staging file which is size-checked,
/// made world-readable and then renamed over the target.
#[derive(Debug, Clone, Default)]
pub struct Publisher {
    use_sudo: bool,
}

impl Publisher {
    pub fn new(use_sudo: bool) -> Self {
        Self { use_sudo }
    }

    #[tracing::instrument(skip(self, shell, contents), fields(bytes = contents.len()))]
    pub async fn publish<S: RemoteShell + ?Sized>(
        &self,
        shell: &S,
        path: &str,
        contents: &[u8],
    ) -> crate::error::Result<()> {
        let staging = format!("{}{}", path, STAGING_SUFFIX);

        if let Err(e) = self.replace(shell, path, &staging, contents).await {
            let cleanup = format!("{}rm -f {}", self.sudo(), shell_quote(&staging));
            if let Err(cleanup_err) = shell.execute(&cleanup).await {
                warn!("Failed to remove {}: {:#}", staging, cleanup_err);
            }
            return Err(Error::publish(path, format!("{:#}", e)));
        }

        info!("Published {} ({} bytes)", path, contents.len());
        Ok(())
    }

    async fn replace<S: RemoteShell + ?Sized>(
        &self,
        shell: &S,
        path: &str,
        staging: &str,
        contents: &[u8],
    ) -> Result<()> {
        let quoted = shell_quote(staging);

        if self.use_sudo {
            // the login user may not be able to write next to the target
            shell
                .execute_with_input(&format!("sudo tee {} >/dev/null", quoted), contents)
                .await
                .with_context(|| format!("Failed to write {} with sudo", staging))?;
        } else {
            shell
                .upload(staging, contents)
                .await
                .with_context(|| format!("Failed to upload {}", staging))?;
        }
        debug!("Uploaded {}", staging);

        let size = shell
            .execute(&format!("{}wc -c {}", self.sudo(), quoted))
            .await
            .context("Failed to check uploaded size")?;
        let size: usize = size
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .parse()
            .with_context(|| format!("Unexpected `wc -c` output: {:?}", size))?;
        if size != contents.len() {
            bail!(
                "Uploaded {} bytes but {} holds {} bytes",
                contents.len(),
                staging,
                size
            );
        }

        shell
            .execute(&format!("{}chmod 644 {}", self.sudo(), quoted))
            .await
            .context("Failed to set permissions")?;

        shell
            .execute(&format!(
                "{}mv -f {} {}",
                self.sudo(),
                quoted,
                shell_quote(path)
            ))
            .await
            .with_context(|| format!("Failed to move {} into place", staging))?;

        Ok(())
    }

    fn sudo(&self) -> &'static str {
        if self.use_sudo { "sudo " } else { "" }
    }
}
