//! Field extraction from Workshop item pages.

use regex::Regex;
use std::sync::LazyLock;

use super::{DependencyEdge, WorkshopPage};

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<div\s+class="workshopItemTitle"\s*>(.*?)</div>"#).expect("valid regex")
});

static REQUIRED_SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<div[^>]*\bid="RequiredItems"[^>]*>"#).expect("valid regex"));

static REQUIRED_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)<a[^>]*\bhref="[^"]*[?&]id=(\d+)[^"]*"[^>]*>\s*<div\s+class="requiredItem"\s*>(.*?)</div>"#,
    )
    .expect("valid regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

/// Parse an item page into its title and required items.
///
/// Missing fields are represented as `None` / an empty list; the caller decides
/// what a missing title means.
pub fn parse(html: &str) -> WorkshopPage {
    let title = TITLE
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .filter(|t| !t.is_empty());

    let required_items = match REQUIRED_SECTION.find(html) {
        Some(section) => parse_required(&html[section.end()..]),
        None => Vec::new(),
    };

    WorkshopPage {
        title,
        required_items,
    }
}

fn parse_required(section: &str) -> Vec<DependencyEdge> {
    REQUIRED_ITEM
        .captures_iter(section)
        .filter_map(|c| {
            let name = clean_text(&c[2]);
            if name.is_empty() {
                None
            } else {
                Some(DependencyEdge {
                    display_name: name,
                    external_id: c[1].to_string(),
                })
            }
        })
        .collect()
}

/// Strip markup, decode common entities, collapse whitespace.
fn clean_text(raw: &str) -> String {
    let text = TAG.replace_all(raw, "");
    let text = decode_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        // last, so "&amp;lt;" stays "&lt;"
        .replace("&amp;", "&")
}
