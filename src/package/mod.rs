//! Installed mods and the enabled-set declaration.

mod declaration;
mod inventory;
mod record;

use std::collections::HashSet;

pub use declaration::parse_enabled;
pub use inventory::{
    DEFAULT_APP_ID, ENABLED_FILE, RemoteInventory, disabled_of, parse_installed,
};
pub use record::PackageRecord;

/// Drop repeated names, keeping the first occurrence of each.
pub fn dedup_preserving_order<I: IntoIterator<Item = String>>(items: I) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_preserving_order() {
        let items = ["b", "a", "b", "c", "a"].map(String::from);
        assert_eq!(dedup_preserving_order(items), vec!["b", "a", "c"]);
    }
}
