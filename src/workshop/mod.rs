//! External metadata source: Steam Workshop item pages.
//!
//! The engine only needs a title and the list of required items for a
//! Workshop id; [`MetadataSource`] is that contract and [`SteamWorkshop`]
//! fulfils it over HTTP.

mod page;

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use crate::http::HttpClient;

pub use page::parse as parse_page;

/// Default base URL of the Steam Community site.
pub const DEFAULT_WORKSHOP_URL: &str = "https://steamcommunity.com";

/// A declared "required item" edge on a Workshop page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub display_name: String,
    pub external_id: String,
}

/// The parts of an item page the engine cares about.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkshopPage {
    pub title: Option<String>,
    pub required_items: Vec<DependencyEdge>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetch and parse the page of one Workshop item.
    async fn fetch(&self, external_id: &str) -> Result<WorkshopPage>;
}

/// Workshop pages fetched from steamcommunity.com (or a mirror).
pub struct SteamWorkshop {
    http: HttpClient,
    base_url: String,
}

impl SteamWorkshop {
    pub fn new(http: HttpClient, base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_WORKSHOP_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self) -> String {
        format!("{}/sharedfiles/filedetails/", self.base_url)
    }
}

#[async_trait]
impl MetadataSource for SteamWorkshop {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, external_id: &str) -> Result<WorkshopPage> {
        let html = self
            .http
            .get_text(&self.item_url(), &[("id", external_id.trim())])
            .await?;
        let page = parse_page(&html);
        debug!(
            "Workshop item {}: title={:?}, {} required item(s)",
            external_id,
            page.title,
            page.required_items.len()
        );
        Ok(page)
    }
}
