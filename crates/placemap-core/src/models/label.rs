use serde::{Deserialize, Serialize};

/// Icon used for labels nobody described
pub const DEFAULT_LABEL_ICON: &str = "mdi:tag";

/// Neutral gray used for labels nobody described
pub const DEFAULT_LABEL_COLOR: &str = "#9E9E9E";

/// Presentation metadata for a place label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LabelInfo {
    pub icon: String,
    pub color: String,
    pub description: String,
}

impl LabelInfo {
    /// Synthesized entry for a label with no metadata anywhere.
    pub fn fallback(name: &str) -> Self {
        Self {
            icon: DEFAULT_LABEL_ICON.to_string(),
            color: DEFAULT_LABEL_COLOR.to_string(),
            description: name.to_string(),
        }
    }

    /// Apply a partial override. Keys the patch leaves unset keep this value.
    pub fn patched(&self, patch: &LabelPatch) -> Self {
        Self {
            icon: patch.icon.clone().unwrap_or_else(|| self.icon.clone()),
            color: patch.color.clone().unwrap_or_else(|| self.color.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
        }
    }
}

/// Partial label metadata as found in a dataset's overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LabelPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Row of the global label table.
#[derive(Debug, Clone, Deserialize)]
pub struct LabelRow {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
}

impl LabelRow {
    pub fn into_info(self) -> (String, LabelInfo) {
        let description = self
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.name.clone());
        let info = LabelInfo {
            icon: self.icon.unwrap_or_else(|| DEFAULT_LABEL_ICON.to_string()),
            color: self.color.unwrap_or_else(|| DEFAULT_LABEL_COLOR.to_string()),
            description,
        };
        (self.name, info)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LabelTable {
    #[serde(default)]
    pub labels: Vec<LabelRow>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patched_keeps_unset_keys() {
        let base = LabelInfo {
            icon: "mdi:coffee".to_string(),
            color: "#795548".to_string(),
            description: "Cafe".to_string(),
        };
        let patch = LabelPatch {
            color: Some("#000000".to_string()),
            ..Default::default()
        };
        let merged = base.patched(&patch);
        assert_eq!(merged.icon, "mdi:coffee");
        assert_eq!(merged.color, "#000000");
        assert_eq!(merged.description, "Cafe");
    }

    #[test]
    fn test_label_row_defaults() {
        let table: LabelTable =
            serde_json::from_str(r##"{"labels":[{"name":"Beach"},{"name":"Cafe","icon":"mdi:coffee","color":"#795548","description":""}]}"##)
                .unwrap();
        let rows: Vec<(String, LabelInfo)> = table.labels.into_iter().map(LabelRow::into_info).collect();
        assert_eq!(rows[0].1, LabelInfo::fallback("Beach"));
        assert_eq!(rows[1].1.icon, "mdi:coffee");
        // Empty descriptions fall back to the name
        assert_eq!(rows[1].1.description, "Cafe");
    }
}
