use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

/// Deep links into external map providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct PlaceUrls {
    #[serde(default, alias = "naver", skip_serializing_if = "Option::is_none")]
    pub navigator1: Option<String>,
    #[serde(default, alias = "kakao", skip_serializing_if = "Option::is_none")]
    pub navigator2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Place {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub description: String,
    /// `None` when the source document has no labels field at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    pub location: Location,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<PlaceUrls>,
}

impl Place {
    pub fn labels(&self) -> &[String] {
        self.labels.as_deref().unwrap_or(&[])
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels().iter().any(|l| l == label)
    }

    pub fn labels_display(&self) -> String {
        if self.labels().is_empty() {
            "-".to_string()
        } else {
            self.labels().join(", ")
        }
    }
}
