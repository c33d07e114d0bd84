//! Enable/disable bookkeeping.
//!
//! [`SelectionState`] is the only owner of the enabled and disabled sets. A
//! front end sends it [`ToggleRequest`]s and renders the [`ToggleEffect`]s it
//! gets back; enabling a package with dependencies is a two-step exchange
//! (`ConfirmRequired`, then [`SelectionState::confirm_cascade`]).

use log::{debug, warn};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use crate::package::{PackageRecord, dedup_preserving_order, disabled_of};

/// Ask for a package to be enabled or disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRequest {
    pub local_name: String,
    pub enable: bool,
}

impl ToggleRequest {
    pub fn enable(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            enable: true,
        }
    }

    pub fn disable(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            enable: false,
        }
    }
}

/// Outcome of a toggle request or a cascade answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum ToggleEffect {
    /// The package was already in the requested state.
    Unchanged { package: String },
    /// Enabling needs the operator to accept the dependency closure first.
    /// `missing` lists closure names no installed package carries.
    ConfirmRequired {
        package: String,
        dependencies: Vec<String>,
        missing: Vec<String>,
    },
    /// The package is enabled; `cascaded` lists the local names enabled
    /// along with it.
    Enabled {
        package: String,
        cascaded: Vec<String>,
    },
    Disabled { package: String },
    /// The cascade was declined; the package stays disabled.
    RolledBack { package: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Unknown mod: {0}")]
    UnknownPackage(String),

    #[error("A dependency confirmation for {0} is still pending")]
    CascadePending(String),

    #[error("No dependency confirmation is pending")]
    NoPendingCascade,

    #[error("Selection invariant violated: {0}")]
    InvariantViolation(String),
}

/// Installed packages together with the current enable decisions.
#[derive(Debug, Clone)]
pub struct SelectionState {
    packages: Vec<PackageRecord>,
    enabled: Vec<String>,
    /// Membership index over `enabled`.
    enabled_index: HashSet<String>,
    disabled: BTreeSet<String>,
    pending: Option<String>,
}

impl SelectionState {
    /// Build the baseline from the installed packages and the declared
    /// enabled names. Declared names that are not installed are dropped.
    pub fn new(packages: Vec<PackageRecord>, declared: Vec<String>) -> Result<Self, SelectionError> {
        let installed: HashSet<&str> = packages.iter().map(|p| p.local_name.as_str()).collect();

        let mut enabled = Vec::new();
        for name in dedup_preserving_order(declared) {
            if installed.contains(name.as_str()) {
                enabled.push(name);
            } else {
                warn!("{} is enabled but not installed; ignoring it", name);
            }
        }

        let disabled = disabled_of(&packages, &enabled);
        let enabled_index = enabled.iter().cloned().collect();
        let state = Self {
            packages,
            enabled,
            enabled_index,
            disabled,
            pending: None,
        };
        state.check_invariants()?;
        Ok(state)
    }

    pub fn packages(&self) -> &[PackageRecord] {
        &self.packages
    }

    pub fn record(&self, local_name: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.local_name == local_name)
    }

    /// Enabled local names, in declaration order with later additions last.
    pub fn enabled(&self) -> &[String] {
        &self.enabled
    }

    pub fn disabled(&self) -> &BTreeSet<String> {
        &self.disabled
    }

    pub fn is_enabled(&self, local_name: &str) -> bool {
        self.enabled_index.contains(local_name)
    }

    /// Package awaiting a cascade answer, if any.
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Workshop ids of the enabled packages, in enabled order.
    pub fn enabled_external_ids(&self) -> Vec<String> {
        self.enabled
            .iter()
            .filter_map(|name| self.record(name))
            .map(|p| p.external_id.clone())
            .collect()
    }

    pub fn request_toggle(&mut self, request: ToggleRequest) -> Result<ToggleEffect, SelectionError> {
        if let Some(pending) = &self.pending {
            return Err(SelectionError::CascadePending(pending.clone()));
        }
        let record = self
            .record(&request.local_name)
            .ok_or_else(|| SelectionError::UnknownPackage(request.local_name.clone()))?;
        let package = record.local_name.clone();

        if request.enable == self.is_enabled(&package) {
            return Ok(ToggleEffect::Unchanged { package });
        }

        if !request.enable {
            self.set_disabled(&package);
            self.check_invariants()?;
            debug!("Disabled {}", package);
            return Ok(ToggleEffect::Disabled { package });
        }

        let dependencies = record.dependencies().to_vec();
        if dependencies.is_empty() {
            self.set_enabled(&package);
            self.check_invariants()?;
            debug!("Enabled {}", package);
            return Ok(ToggleEffect::Enabled {
                package,
                cascaded: Vec::new(),
            });
        }

        let missing = dependencies
            .iter()
            .filter(|dep| self.carriers_of(dep).is_empty())
            .cloned()
            .collect();
        self.pending = Some(package.clone());
        Ok(ToggleEffect::ConfirmRequired {
            package,
            dependencies,
            missing,
        })
    }

    /// Answer the pending cascade.
    ///
    /// Accepting enables every installed package whose display name is in
    /// the closure, then the package itself. Declining leaves it disabled.
    pub fn confirm_cascade(&mut self, accept: bool) -> Result<ToggleEffect, SelectionError> {
        let package = self.pending.take().ok_or(SelectionError::NoPendingCascade)?;

        if !accept {
            debug!("Cascade for {} declined", package);
            return Ok(ToggleEffect::RolledBack { package });
        }

        let dependencies = self
            .record(&package)
            .map(|p| p.dependencies().to_vec())
            .unwrap_or_default();

        let mut cascaded = Vec::new();
        for dep in &dependencies {
            let carriers = self.carriers_of(dep);
            if carriers.len() > 1 {
                warn!(
                    "{} mods are named {:?}; enabling all of them: {}",
                    carriers.len(),
                    dep,
                    carriers.join(", ")
                );
            }
            for local_name in carriers {
                if local_name != package && !self.is_enabled(&local_name) {
                    self.set_enabled(&local_name);
                    cascaded.push(local_name);
                }
            }
        }
        self.set_enabled(&package);
        self.check_invariants()?;

        debug!("Enabled {} with {} dependency mod(s)", package, cascaded.len());
        Ok(ToggleEffect::Enabled { package, cascaded })
    }

    /// Verify `enabled ∩ disabled = ∅` and `enabled ∪ disabled = installed`.
    pub fn check_invariants(&self) -> Result<(), SelectionError> {
        let installed: HashSet<&str> = self.packages.iter().map(|p| p.local_name.as_str()).collect();
        let mut enabled = HashSet::new();

        for name in &self.enabled {
            if !enabled.insert(name.as_str()) {
                return Err(SelectionError::InvariantViolation(format!(
                    "{} is enabled twice",
                    name
                )));
            }
            if !installed.contains(name.as_str()) {
                return Err(SelectionError::InvariantViolation(format!(
                    "{} is enabled but not installed",
                    name
                )));
            }
            if !self.enabled_index.contains(name) {
                return Err(SelectionError::InvariantViolation(format!(
                    "{} is missing from the enabled index",
                    name
                )));
            }
            if self.disabled.contains(name) {
                return Err(SelectionError::InvariantViolation(format!(
                    "{} is both enabled and disabled",
                    name
                )));
            }
        }

        if self.enabled_index.len() != enabled.len() {
            return Err(SelectionError::InvariantViolation(format!(
                "enabled index holds {} names for {} enabled mods",
                self.enabled_index.len(),
                enabled.len()
            )));
        }

        let covered = enabled.len() + self.disabled.len();
        if covered != installed.len()
            || self.disabled.iter().any(|n| !installed.contains(n.as_str()))
        {
            return Err(SelectionError::InvariantViolation(format!(
                "{} enabled + {} disabled mods do not cover {} installed",
                enabled.len(),
                self.disabled.len(),
                installed.len()
            )));
        }
        Ok(())
    }

    /// Local names of installed packages whose display name is `name`.
    fn carriers_of(&self, name: &str) -> Vec<String> {
        self.packages
            .iter()
            .filter(|p| p.display_name.resolved() == Some(name))
            .map(|p| p.local_name.clone())
            .collect()
    }

    fn set_enabled(&mut self, local_name: &str) {
        if self.enabled_index.insert(local_name.to_string()) {
            self.enabled.push(local_name.to_string());
        }
        self.disabled.remove(local_name);
    }

    fn set_disabled(&mut self, local_name: &str) {
        if self.enabled_index.remove(local_name) {
            self.enabled.retain(|n| n != local_name);
        }
        self.disabled.insert(local_name.to_string());
    }
}
