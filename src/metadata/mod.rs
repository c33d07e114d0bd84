//! Metadata resolution for Workshop items.
//!
//! [`MetadataResolver`] turns a [`MetadataSource`] into the two questions the
//! engine asks: "what is this item called?" and "what does it directly
//! require?". Lookups never fail; a failed or slow fetch degrades to a
//! [`NameResolution::Degraded`] name and an empty dependency list.

mod graph;

use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::workshop::{DependencyEdge, MetadataSource, WorkshopPage};

pub use graph::DependencyGraphBuilder;

/// Why a lookup produced placeholder data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradedReason {
    /// The page could not be fetched.
    FetchFailed(String),
    /// The fetch did not finish within the configured timeout.
    TimedOut,
    /// The page was fetched but carried no title.
    TitleMissing,
}

/// Marker for a lookup that fell back to placeholder data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionDegraded {
    pub external_id: String,
    pub reason: DegradedReason,
}

impl fmt::Display for ResolutionDegraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            DegradedReason::FetchFailed(e) => {
                write!(f, "item {} could not be fetched: {}", self.external_id, e)
            }
            DegradedReason::TimedOut => write!(f, "item {} timed out", self.external_id),
            DegradedReason::TitleMissing => {
                write!(f, "item {} has no title on its page", self.external_id)
            }
        }
    }
}

/// Display name of a package, as far as it is known.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum NameResolution {
    /// Not looked up yet.
    #[default]
    Pending,
    Resolved(String),
    /// Looked up and permanently unavailable for this session.
    Degraded(ResolutionDegraded),
}

impl NameResolution {
    /// The resolved name, if any.
    pub fn resolved(&self) -> Option<&str> {
        match self {
            NameResolution::Resolved(name) => Some(name),
            _ => None,
        }
    }

    /// Text to show for this name, with a placeholder when unresolved.
    pub fn display_or(&self, placeholder: &str) -> String {
        match self {
            NameResolution::Resolved(name) => name.clone(),
            NameResolution::Pending => format!("{} (resolving)", placeholder),
            NameResolution::Degraded(_) => format!("{} (unresolved)", placeholder),
        }
    }
}

type PageResult = Result<Arc<WorkshopPage>, ResolutionDegraded>;

/// Memoizing front end over a [`MetadataSource`].
///
/// Each external id is fetched at most once per resolver; concurrent callers
/// asking for the same id wait on the same in-flight fetch.
pub struct MetadataResolver<S: MetadataSource> {
    source: S,
    fetch_timeout: Duration,
    pages: Mutex<HashMap<String, Arc<OnceCell<PageResult>>>>,
}

impl<S: MetadataSource> MetadataResolver<S> {
    pub fn new(source: S, fetch_timeout: Duration) -> Self {
        Self {
            source,
            fetch_timeout,
            pages: Mutex::new(HashMap::new()),
        }
    }

    /// Display name of an item.
    pub async fn resolve_name(&self, external_id: &str) -> NameResolution {
        match self.page(external_id).await {
            Ok(page) => match &page.title {
                Some(title) => NameResolution::Resolved(title.clone()),
                None => NameResolution::Degraded(ResolutionDegraded {
                    external_id: external_id.to_string(),
                    reason: DegradedReason::TitleMissing,
                }),
            },
            Err(degraded) => NameResolution::Degraded(degraded),
        }
    }

    /// Direct required items of an item; empty when the page is unavailable.
    pub async fn resolve_direct_dependencies(&self, external_id: &str) -> Vec<DependencyEdge> {
        match self.page(external_id).await {
            Ok(page) => page.required_items.clone(),
            Err(_) => Vec::new(),
        }
    }

    async fn page(&self, external_id: &str) -> PageResult {
        let cell = {
            let mut pages = self.pages.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(pages.entry(external_id.to_string()).or_default())
        };

        cell.get_or_init(|| self.fetch(external_id)).await.clone()
    }

    #[tracing::instrument(skip(self))]
    async fn fetch(&self, external_id: &str) -> PageResult {
        let degraded = |reason| ResolutionDegraded {
            external_id: external_id.to_string(),
            reason,
        };

        match tokio::time::timeout(self.fetch_timeout, self.source.fetch(external_id)).await {
            Ok(Ok(page)) => Ok(Arc::new(page)),
            Ok(Err(e)) => {
                let degraded = degraded(DegradedReason::FetchFailed(format!("{:#}", e)));
                warn!("{}", degraded);
                Err(degraded)
            }
            Err(_) => {
                let degraded = degraded(DegradedReason::TimedOut);
                warn!("{}", degraded);
                Err(degraded)
            }
        }
    }
}
