use serde::{Deserialize, Serialize};

/// Transportation mode referenced by trip stops. Passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Transportation {
    pub id: String,
    #[serde(rename = "type")]
    pub mode: String,
    #[serde(rename = "iconName", default)]
    pub icon_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportationTable {
    #[serde(default)]
    pub transportations: Vec<Transportation>,
}

impl TransportationTable {
    pub fn get(&self, id: &str) -> Option<&Transportation> {
        self.transportations.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.transportations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transportations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transportation_table() {
        let json = r#"{"transportations":[{"id":"car","type":"driving","iconName":"mdi:car"},{"id":"walk","type":"walking","iconName":"mdi:walk"}]}"#;
        let table: TransportationTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("walk").map(|t| t.mode.as_str()), Some("walking"));
        assert!(table.get("ferry").is_none());
    }
}
