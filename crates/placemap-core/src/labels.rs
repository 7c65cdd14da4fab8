//! Label registry: presentation metadata for place labels.
//!
//! The registry is loaded once per session and never blocks it: any
//! failure falls back to a small built-in table. Datasets can override
//! individual keys of individual labels; [`LabelRegistry::resolve`] is the
//! single place where that precedence is decided.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::api::{fetch_json, ResourceFetcher};
use crate::models::{LabelInfo, LabelPatch, LabelRow, LabelTable};

pub const DEFAULT_LABELS_PATH: &str = "system/labels.json";

/// Built-in table used when the label resource cannot be loaded
const BUILTIN_LABELS: &[(&str, &str, &str, &str)] = &[
    ("Restaurant", "mdi:silverware-fork-knife", "#E53935", "Restaurant"),
    ("Cafe", "mdi:coffee", "#795548", "Cafe"),
    ("Attraction", "mdi:camera", "#1E88E5", "Attraction"),
    ("Beach", "mdi:beach", "#00ACC1", "Beach"),
    ("Lodging", "mdi:bed", "#8E24AA", "Lodging"),
    ("Shopping", "mdi:shopping", "#FB8C00", "Shopping"),
    ("Transit", "mdi:bus", "#546E7A", "Transit"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    Remote,
    BuiltIn,
}

#[derive(Debug, Clone)]
pub struct LabelRegistry {
    base: HashMap<String, LabelInfo>,
    source: LabelSource,
}

impl LabelRegistry {
    pub fn builtin() -> Self {
        let base = BUILTIN_LABELS
            .iter()
            .map(|(name, icon, color, description)| {
                (
                    name.to_string(),
                    LabelInfo {
                        icon: icon.to_string(),
                        color: color.to_string(),
                        description: description.to_string(),
                    },
                )
            })
            .collect();
        Self {
            base,
            source: LabelSource::BuiltIn,
        }
    }

    pub fn from_table(table: LabelTable) -> Self {
        let base = table.labels.into_iter().map(LabelRow::into_info).collect();
        Self {
            base,
            source: LabelSource::Remote,
        }
    }

    /// Load the label table. Never fails; falls back to the built-in table.
    pub async fn load(fetcher: &dyn ResourceFetcher, locator: &str) -> Self {
        match fetch_json::<LabelTable>(fetcher, locator).await {
            Ok(table) if !table.labels.is_empty() => {
                let registry = Self::from_table(table);
                info!(labels = registry.len(), "Label registry loaded");
                registry
            }
            Ok(_) => {
                warn!(locator = %locator, "Label table is empty, using built-in labels");
                Self::builtin()
            }
            Err(e) => {
                warn!(locator = %locator, error = %e, "Failed to load label table, using built-in labels");
                Self::builtin()
            }
        }
    }

    /// Resolve a label: dataset override over base entry over synthesized
    /// default. Override keys left unset keep the lower layer's value.
    pub fn resolve(&self, name: &str, overrides: Option<&HashMap<String, LabelPatch>>) -> LabelInfo {
        let base = self
            .base
            .get(name)
            .cloned()
            .unwrap_or_else(|| LabelInfo::fallback(name));
        match overrides.and_then(|o| o.get(name)) {
            Some(patch) => base.patched(patch),
            None => base,
        }
    }

    /// Merged view for one dataset, covering every base and override key.
    pub fn view(&self, overrides: &HashMap<String, LabelPatch>) -> LabelView {
        let entries = self
            .base
            .keys()
            .chain(overrides.keys())
            .map(|name| (name.clone(), self.resolve(name, Some(overrides))))
            .collect();
        LabelView { entries }
    }

    pub fn get(&self, name: &str) -> Option<&LabelInfo> {
        self.base.get(name)
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    pub fn source(&self) -> LabelSource {
        self.source
    }
}

/// Label metadata as seen from one loaded dataset.
#[derive(Debug, Clone, Default)]
pub struct LabelView {
    entries: HashMap<String, LabelInfo>,
}

impl LabelView {
    pub fn resolve(&self, name: &str) -> LabelInfo {
        self.entries
            .get(name)
            .cloned()
            .unwrap_or_else(|| LabelInfo::fallback(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryFetcher;
    use crate::models::{DEFAULT_LABEL_COLOR, DEFAULT_LABEL_ICON};

    fn registry() -> LabelRegistry {
        let table: LabelTable = serde_json::from_str(
            r##"{"labels":[{"name":"Cafe","icon":"mdi:coffee","color":"#795548","description":"Coffee"}]}"##,
        )
        .unwrap();
        LabelRegistry::from_table(table)
    }

    #[test]
    fn test_resolve_precedence() {
        let registry = registry();
        let mut overrides = HashMap::new();
        overrides.insert(
            "Cafe".to_string(),
            LabelPatch {
                color: Some("#111111".to_string()),
                ..Default::default()
            },
        );
        overrides.insert(
            "Oreum".to_string(),
            LabelPatch {
                icon: Some("mdi:terrain".to_string()),
                ..Default::default()
            },
        );

        // Override key wins, other keys keep the base value
        let cafe = registry.resolve("Cafe", Some(&overrides));
        assert_eq!(cafe.color, "#111111");
        assert_eq!(cafe.icon, "mdi:coffee");
        assert_eq!(cafe.description, "Coffee");

        // Base only
        assert_eq!(registry.resolve("Cafe", None).color, "#795548");

        // Override without base patches the synthesized default
        let oreum = registry.resolve("Oreum", Some(&overrides));
        assert_eq!(oreum.icon, "mdi:terrain");
        assert_eq!(oreum.color, DEFAULT_LABEL_COLOR);
        assert_eq!(oreum.description, "Oreum");

        // Neither
        let unknown = registry.resolve("Museum", Some(&overrides));
        assert_eq!(unknown, LabelInfo::fallback("Museum"));
        assert_eq!(unknown.icon, DEFAULT_LABEL_ICON);
    }

    #[test]
    fn test_view_does_not_mutate_registry() {
        let registry = registry();
        let mut overrides = HashMap::new();
        overrides.insert(
            "Cafe".to_string(),
            LabelPatch {
                icon: Some("mdi:cup".to_string()),
                ..Default::default()
            },
        );

        let view = registry.view(&overrides);
        assert_eq!(view.resolve("Cafe").icon, "mdi:cup");
        assert_eq!(view.resolve("Nowhere"), LabelInfo::fallback("Nowhere"));
        assert_eq!(registry.get("Cafe").unwrap().icon, "mdi:coffee");
    }

    #[tokio::test]
    async fn test_load_falls_back_to_builtin() {
        let fetcher = MemoryFetcher::new();
        let missing = LabelRegistry::load(&fetcher, DEFAULT_LABELS_PATH).await;
        assert_eq!(missing.source(), LabelSource::BuiltIn);
        assert!(missing.get("Cafe").is_some());

        fetcher.insert(DEFAULT_LABELS_PATH, "garbage");
        let malformed = LabelRegistry::load(&fetcher, DEFAULT_LABELS_PATH).await;
        assert_eq!(malformed.source(), LabelSource::BuiltIn);

        fetcher.insert(DEFAULT_LABELS_PATH, r#"{"labels":[{"name":"Oreum"}]}"#);
        let loaded = LabelRegistry::load(&fetcher, DEFAULT_LABELS_PATH).await;
        assert_eq!(loaded.source(), LabelSource::Remote);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.resolve("Oreum", None), LabelInfo::fallback("Oreum"));
    }
}
