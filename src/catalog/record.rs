//! Raw mutation catalog records as they arrive from the host (JSON).
//! Condition values stay as `serde_json::Value` until parsing: numbers for
//! crop/dependency counts, the string marker for special conditions.

use std::collections::BTreeMap;
use std::fs;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_CATALOG_PATH: &str = "data/mutations.json";

/// One unparsed catalog entry. `size` is a "WxH" string; `conditions` maps
/// crop names, mutation ids, `adjacent_crops`, or `special` to their values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRecord {
    pub name: String,
    pub size: String,
    #[serde(default = "default_tier")]
    pub tier: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ground: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub drops: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub conditions: Map<String, Value>,
}

fn default_tier() -> u8 {
    1
}

/// The full catalog keyed by mutation id.
pub type Catalog = BTreeMap<String, MutationRecord>;

/// Load a catalog file. Returns None if the file is missing or malformed.
pub fn load_catalog(path: &str) -> Option<Catalog> {
    let data = fs::read_to_string(path).ok()?;
    serde_json::from_str(&data).ok()
}

/// Normalize a string for lookup: lowercase, collapse spaces/underscores.
pub fn normalize_lookup(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '_' { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Resolve a mutation by id or display name. Returns None on no match or an
/// ambiguous name.
pub fn resolve_mutation<'a>(
    catalog: &'a Catalog,
    name_or_id: &str,
) -> Option<(&'a str, &'a MutationRecord)> {
    let normalized = normalize_lookup(name_or_id);
    if let Some((id, record)) = catalog
        .iter()
        .find(|(id, _)| normalize_lookup(id) == normalized)
    {
        return Some((id.as_str(), record));
    }
    let by_name: Vec<_> = catalog
        .iter()
        .filter(|(_, record)| normalize_lookup(&record.name) == normalized)
        .collect();
    if by_name.len() == 1 {
        let (id, record) = by_name[0];
        return Some((id.as_str(), record));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(name: &str) -> MutationRecord {
        MutationRecord {
            name: name.to_string(),
            size: "1x1".to_string(),
            tier: 1,
            ground: None,
            drops: BTreeMap::new(),
            effects: Vec::new(),
            conditions: Map::new(),
        }
    }

    #[test]
    fn resolve_by_id_and_by_display_name() {
        let mut catalog = Catalog::new();
        catalog.insert("moon_bloom".to_string(), record("Moon Bloom"));
        catalog.insert("sun_root".to_string(), record("Sun Root"));

        assert_eq!(
            resolve_mutation(&catalog, "Moon Bloom").map(|(id, _)| id),
            Some("moon_bloom")
        );
        assert_eq!(
            resolve_mutation(&catalog, "SUN_ROOT").map(|(id, _)| id),
            Some("sun_root")
        );
        assert!(resolve_mutation(&catalog, "nothing").is_none());
    }

    #[test]
    fn record_deserializes_with_defaults() {
        let raw = json!({
            "name": "Glow Cap",
            "size": "2x1",
            "conditions": { "wheat": 2, "special": "moonlight only" }
        });
        let record: MutationRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(record.tier, 1);
        assert!(record.effects.is_empty());
        assert_eq!(record.conditions.len(), 2);
    }
}
