use serde::Serialize;

use crate::metadata::NameResolution;

/// One installed mod.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageRecord {
    /// Workshop item id.
    pub external_id: String,
    /// `.tmod` file stem, as listed in `enabled.json`.
    pub local_name: String,
    pub display_name: NameResolution,
    dependencies: Option<Vec<String>>,
}

impl PackageRecord {
    pub fn new(external_id: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            local_name: local_name.into(),
            display_name: NameResolution::Pending,
            dependencies: None,
        }
    }

    /// Dependency closure (display names); empty until resolved.
    pub fn dependencies(&self) -> &[String] {
        self.dependencies.as_deref().unwrap_or_default()
    }

    /// Store the dependency closure. Only the first call has an effect.
    pub fn set_dependencies(&mut self, closure: Vec<String>) {
        if self.dependencies.is_none() {
            self.dependencies = Some(closure);
        }
    }

    /// Name to show the operator, falling back to the local name.
    pub fn label(&self) -> String {
        self.display_name.display_or(&self.local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependencies_are_set_once() {
        let mut record = PackageRecord::new("1", "CalamityMod");
        assert!(record.dependencies().is_empty());

        record.set_dependencies(vec!["Lib".into()]);
        record.set_dependencies(vec!["Other".into()]);

        assert_eq!(record.dependencies(), ["Lib"]);
    }

    #[test]
    fn test_label() {
        let mut record = PackageRecord::new("1", "CalamityMod");
        assert_eq!(record.label(), "CalamityMod (resolving)");

        record.display_name = NameResolution::Resolved("Calamity Mod".into());
        assert_eq!(record.label(), "Calamity Mod");
    }
}
