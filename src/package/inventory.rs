//! Discovery of installed and enabled mods on the managed host.

use log::{debug, info, warn};
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

use crate::error::{Error, Result};
use crate::remote::{RemoteShell, shell_quote};

use super::{PackageRecord, parse_enabled};

/// Steam app id of tModLoader; Workshop downloads live under `.../content/<app id>/`.
pub const DEFAULT_APP_ID: &str = "1281930";

/// File listing the enabled mods.
pub const ENABLED_FILE: &str = "enabled.json";

/// Reads package state from the host through a [`RemoteShell`].
pub struct RemoteInventory<'a, S: RemoteShell + ?Sized> {
    shell: &'a S,
    app_id: String,
}

impl<'a, S: RemoteShell + ?Sized> RemoteInventory<'a, S> {
    pub fn new(shell: &'a S, app_id: impl Into<String>) -> Self {
        Self {
            shell,
            app_id: app_id.into(),
        }
    }

    /// Fail with `NotFound` unless `path` exists on the host.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_exists(&self, path: &str) -> Result<()> {
        let quoted = shell_quote(path);
        let output = self
            .shell
            .execute(&format!(
                "if [ -e {} ]; then echo exists; else echo missing; fi",
                quoted
            ))
            .await
            .map_err(Error::Remote)?;

        if output.trim() == "exists" {
            Ok(())
        } else {
            Err(Error::NotFound(path.to_string()))
        }
    }

    /// Path of the first file called `file_name` beneath `root`, if any.
    #[tracing::instrument(skip(self))]
    pub async fn locate(&self, root: &str, file_name: &str) -> Result<Option<String>> {
        let output = self
            .shell
            .execute(&format!(
                "find {} -type f -name {} 2>/dev/null || true",
                shell_quote(root),
                shell_quote(file_name)
            ))
            .await
            .map_err(Error::Remote)?;

        Ok(output
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(String::from))
    }

    /// Read a remote file as text.
    pub async fn read(&self, path: &str) -> Result<String> {
        self.shell
            .execute(&format!("cat {}", shell_quote(path)))
            .await
            .map_err(Error::Remote)
    }

    /// Every installed mod beneath `mods_root`, one record per local name.
    #[tracing::instrument(skip(self))]
    pub async fn list_installed(&self, mods_root: &str) -> Result<Vec<PackageRecord>> {
        let output = self
            .shell
            .execute(&format!(
                "find {} -type f -name '*.tmod' 2>/dev/null || true",
                shell_quote(mods_root)
            ))
            .await
            .map_err(|e| Error::Discovery(format!("{:#}", e)))?;

        let records = parse_installed(&output, &self.app_id)?;
        if records.is_empty() {
            return Err(Error::Discovery(format!(
                "no Workshop mods (app {}) found beneath {} on {}",
                self.app_id,
                mods_root,
                self.shell.describe()
            )));
        }

        info!("Found {} installed mod(s)", records.len());
        Ok(records)
    }

    /// Names listed in the `enabled.json` found beneath `root`.
    #[tracing::instrument(skip(self))]
    pub async fn list_enabled(&self, root: &str) -> Result<Vec<String>> {
        let path = self.locate(root, ENABLED_FILE).await?.ok_or_else(|| {
            Error::NotFound(format!("{} beneath {}", ENABLED_FILE, root))
        })?;
        debug!("Reading enabled mods from {}", path);

        let content = self.read(&path).await?;
        let enabled = parse_enabled(&content)?;

        info!("{} mod(s) currently enabled", enabled.len());
        Ok(enabled)
    }
}

/// Extract `(external id, local name)` records from `find` output.
///
/// Lines look like `.../<app id>/<external id>/[<version>/]<LocalName>.tmod`.
/// Other lines are skipped. The first record for a local name wins.
pub fn parse_installed(find_output: &str, app_id: &str) -> Result<Vec<PackageRecord>> {
    let pattern = Regex::new(&format!(
        r"/{}/([^/]+)/(?:[^/]+/)*([^/]+)\.tmod$",
        regex::escape(app_id)
    ))
    .map_err(|e| Error::Discovery(format!("invalid app id {:?}: {}", app_id, e)))?;

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for line in find_output.lines().map(str::trim_end) {
        let Some(caps) = pattern.captures(line) else {
            if !line.trim().is_empty() {
                debug!("Skipping non-Workshop mod file {}", line);
            }
            continue;
        };
        let (external_id, local_name) = (&caps[1], &caps[2]);
        if seen.insert(local_name.to_string()) {
            records.push(PackageRecord::new(external_id, local_name));
        } else if records
            .iter()
            .any(|r| r.local_name == local_name && r.external_id != external_id)
        {
            warn!(
                "{} is installed from several Workshop items; using the first one found",
                local_name
            );
        }
    }
    Ok(records)
}

/// Installed local names that are not enabled, sorted.
pub fn disabled_of(installed: &[PackageRecord], enabled: &[String]) -> BTreeSet<String> {
    let enabled: HashSet<&str> = enabled.iter().map(String::as_str).collect();
    installed
        .iter()
        .filter(|r| !enabled.contains(r.local_name.as_str()))
        .map(|r| r.local_name.clone())
        .collect()
}
