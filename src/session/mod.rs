//! One reconciliation session against a managed server.
//!
//! [`DecisionSession::open`] loads everything up front (installed mods, the
//! enabled set, names and dependency closures). Toggles then only touch
//! in-memory state until [`DecisionSession::commit_final`] publishes the
//! patched compose document.

use log::{debug, info};
use serde::Serialize;

use crate::compose::{self, COMPOSE_FILE, Patched, Publisher};
use crate::error::{Error, Result};
use crate::metadata::{DependencyGraphBuilder, MetadataResolver};
use crate::package::{DEFAULT_APP_ID, PackageRecord, RemoteInventory};
use crate::remote::RemoteShell;
use crate::selection::{SelectionError, SelectionState, ToggleEffect, ToggleRequest};
use crate::workshop::MetadataSource;

/// Where and how to look for the server files.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Server directory holding `docker-compose.yml` and `enabled.json`.
    pub root: String,
    /// Directory searched for `.tmod` files; defaults to `root`.
    pub mods_root: Option<String>,
    pub app_id: String,
    /// Packages resolved concurrently.
    pub concurrency: usize,
    pub use_sudo: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            root: ".".to_string(),
            mods_root: None,
            app_id: DEFAULT_APP_ID.to_string(),
            concurrency: 4,
            use_sudo: false,
        }
    }
}

/// A package as shown to the operator.
#[derive(Debug, Serialize)]
pub struct PackageView<'s> {
    #[serde(flatten)]
    pub record: &'s PackageRecord,
    pub enabled: bool,
}

pub struct DecisionSession<'a, S: RemoteShell + ?Sized> {
    shell: &'a S,
    compose_path: String,
    compose: String,
    selection: SelectionState,
    publisher: Publisher,
}

impl<'a, S: RemoteShell + ?Sized> DecisionSession<'a, S> {
    /// Load the server state and resolve every package's metadata.
    #[tracing::instrument(skip(shell, resolver))]
    pub async fn open<M: MetadataSource>(
        shell: &'a S,
        resolver: &MetadataResolver<M>,
        options: SessionOptions,
    ) -> Result<Self> {
        let inventory = RemoteInventory::new(shell, options.app_id.as_str());

        inventory.ensure_exists(&options.root).await?;

        let compose_path = inventory
            .locate(&options.root, COMPOSE_FILE)
            .await?
            .ok_or_else(|| Error::NotFound(format!("{} beneath {}", COMPOSE_FILE, options.root)))?;
        debug!("Using compose file {}", compose_path);
        let compose = inventory.read(&compose_path).await?;
        compose::validate(&compose)?;

        let mods_root = options.mods_root.as_deref().unwrap_or(&options.root);
        let mut installed = inventory.list_installed(mods_root).await?;
        let enabled = inventory.list_enabled(&options.root).await?;

        info!("Resolving names and dependencies of {} mod(s)", installed.len());
        DependencyGraphBuilder::new(resolver)
            .resolve_all(&mut installed, options.concurrency)
            .await;

        let selection = SelectionState::new(installed, enabled)
            .map_err(|e| Error::InvariantViolation(e.to_string()))?;

        Ok(Self {
            shell,
            compose_path,
            compose,
            selection,
            publisher: Publisher::new(options.use_sudo),
        })
    }

    pub fn compose_path(&self) -> &str {
        &self.compose_path
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Installed packages in discovery order, with their enabled state.
    pub fn list_packages(&self) -> Vec<PackageView<'_>> {
        self.selection
            .packages()
            .iter()
            .map(|record| PackageView {
                record,
                enabled: self.selection.is_enabled(&record.local_name),
            })
            .collect()
    }

    /// Local name for what the operator typed: a local name, or a
    /// display name compared case-insensitively.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let packages = self.selection.packages();
        packages
            .iter()
            .find(|p| p.local_name == name)
            .or_else(|| {
                packages.iter().find(|p| {
                    p.display_name
                        .resolved()
                        .is_some_and(|title| title.eq_ignore_ascii_case(name))
                })
            })
            .map(|p| p.local_name.as_str())
    }

    pub fn request_toggle(&mut self, request: ToggleRequest) -> Result<ToggleEffect, SelectionError> {
        self.selection.request_toggle(request)
    }

    pub fn confirm_cascade(&mut self, accept: bool) -> Result<ToggleEffect, SelectionError> {
        self.selection.confirm_cascade(accept)
    }

    /// The compose document as it would be published now.
    pub fn preview(&self) -> Patched {
        compose::patch(
            &self.compose,
            self.selection.enabled(),
            &self.selection.enabled_external_ids(),
        )
    }

    /// Publish the current decisions.
    ///
    /// Returns `false` when the document would not change, in which case
    /// nothing is written. A document without a `TMOD_ENABLEDMODS` line is
    /// never published.
    #[tracing::instrument(skip(self))]
    pub async fn commit_final(&mut self) -> Result<bool> {
        if let Some(pending) = self.selection.pending() {
            return Err(Error::InvariantViolation(format!(
                "dependency confirmation for {} is still pending",
                pending
            )));
        }
        self.selection
            .check_invariants()
            .map_err(|e| Error::InvariantViolation(e.to_string()))?;

        let patched = self.preview();
        if patched.assignment_lines == 0 {
            return Err(Error::parse(
                &self.compose_path,
                "no TMOD_ENABLEDMODS line to update",
            ));
        }
        if patched.is_identical_to(&self.compose) {
            info!("{} is already up to date", self.compose_path);
            return Ok(false);
        }

        self.publisher
            .publish(self.shell, &self.compose_path, patched.text.as_bytes())
            .await?;
        self.compose = patched.text;
        Ok(true)
    }
}
