//! Catalog parsing: raw records become normalized [ParsedMutation] values,
//! cached per id. Parsing never mutates the input catalog; the godseed's
//! computed conditions live only in the cache.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::effects::Effect;
use super::godseed;
use super::record::{Catalog, MutationRecord};
use super::CatalogError;
use crate::garden::geometry::{Cell, Footprint};

/// Condition key whose value 0 marks an isolation requirement.
pub const ADJACENT_CROPS_KEY: &str = "adjacent_crops";
/// Condition key carrying an opaque, non-auto-satisfiable requirement.
pub const SPECIAL_KEY: &str = "special";
/// The pseudo-mutation whose conditions are computed from benefit coverage.
pub const GODSEED_ID: &str = "godseed";

/// Normalized form of a catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMutation {
    pub id: String,
    pub name: String,
    pub width: u8,
    pub height: u8,
    pub tier: u8,
    /// Crop name -> required count in the adjacency ring.
    pub crops: BTreeMap<String, u32>,
    /// Mutation id -> required count of distinct adjacent instances.
    pub deps: BTreeMap<String, u32>,
    pub isolated: bool,
    /// Carries a `special` condition the engine cannot satisfy; the
    /// optimizers skip such mutations.
    pub special: bool,
    pub effects: BTreeSet<Effect>,
    pub drops: BTreeMap<String, f64>,
}

impl ParsedMutation {
    pub fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    pub fn footprint_at(&self, anchor: Cell) -> Footprint {
        Footprint::new(anchor, self.width, self.height)
    }

    pub fn has_spread_effect(&self) -> bool {
        self.effects.iter().any(|e| e.is_spread())
    }

    /// At least one positive tag and no negative tag.
    pub fn has_only_positive_effects(&self) -> bool {
        !self.effects.is_empty() && !self.effects.iter().any(|e| e.is_negative())
    }

    pub fn total_crops_required(&self) -> u32 {
        self.crops.values().sum()
    }

    pub fn size_string(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Lazily parses and caches catalog entries. Each optimizer owns one.
#[derive(Debug, Clone)]
pub struct CatalogParser {
    catalog: Catalog,
    cache: BTreeMap<String, Arc<ParsedMutation>>,
}

impl CatalogParser {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            cache: BTreeMap::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn contains(&self, id: &str) -> bool {
        id == GODSEED_ID || self.catalog.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.catalog.keys().cloned().collect()
    }

    /// Parse an entry, consulting the cache first. The godseed id resolves to
    /// whatever [CatalogParser::parse_godseed] last computed (or a cover over
    /// an empty available set if it was never called).
    pub fn parse(&mut self, id: &str) -> Result<Arc<ParsedMutation>, CatalogError> {
        if let Some(parsed) = self.cache.get(id) {
            return Ok(parsed.clone());
        }
        if id == GODSEED_ID && !self.catalog.contains_key(id) {
            return self.parse_godseed(&BTreeSet::new());
        }
        let record = self
            .catalog
            .get(id)
            .ok_or_else(|| CatalogError::UnknownMutation(id.to_string()))?;
        let parsed = Arc::new(parse_record(id, record, &self.catalog)?);
        self.cache.insert(id.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// Compute the godseed's conditions for a given set of already-available
    /// mutation ids and cache the result under [GODSEED_ID]. The raw catalog
    /// is left untouched.
    pub fn parse_godseed(
        &mut self,
        available: &BTreeSet<String>,
    ) -> Result<Arc<ParsedMutation>, CatalogError> {
        let ids = self.ids();
        let mut pool = Vec::with_capacity(ids.len());
        for id in &ids {
            if id == GODSEED_ID {
                continue;
            }
            pool.push(self.parse(id)?);
        }
        let deps = godseed::cover_conditions(&pool, available);

        let base = self.catalog.get(GODSEED_ID);
        let (width, height) = match base {
            Some(record) => parse_size(GODSEED_ID, &record.size)?,
            None => (3, 3),
        };
        let parsed = Arc::new(ParsedMutation {
            id: GODSEED_ID.to_string(),
            name: base
                .map(|r| r.name.clone())
                .unwrap_or_else(|| "Godseed".to_string()),
            width,
            height,
            tier: base.map(|r| r.tier).unwrap_or(5),
            crops: BTreeMap::new(),
            deps,
            isolated: false,
            special: false,
            effects: base
                .map(|r| parse_effects(&r.effects))
                .unwrap_or_default(),
            drops: base.map(|r| r.drops.clone()).unwrap_or_default(),
        });
        self.cache.insert(GODSEED_ID.to_string(), parsed.clone());
        Ok(parsed)
    }
}

fn parse_effects(tags: &[String]) -> BTreeSet<Effect> {
    tags.iter().filter_map(|t| Effect::parse(t)).collect()
}

fn parse_record(
    id: &str,
    record: &MutationRecord,
    catalog: &Catalog,
) -> Result<ParsedMutation, CatalogError> {
    let (width, height) = parse_size(id, &record.size)?;

    let mut crops = BTreeMap::new();
    let mut deps = BTreeMap::new();
    let mut isolated = false;
    let mut special = false;

    for (key, value) in &record.conditions {
        if key == SPECIAL_KEY {
            special = true;
            continue;
        }
        let Some(count) = value.as_u64() else {
            // Non-numeric values other than `special` carry no placement
            // semantics; the validator reports them.
            continue;
        };
        if key == ADJACENT_CROPS_KEY {
            if count == 0 {
                isolated = true;
            }
            continue;
        }
        if catalog.contains_key(key) {
            deps.insert(key.clone(), count as u32);
        } else {
            crops.insert(key.clone(), count as u32);
        }
    }

    // Isolation forbids ring crops entirely, so crop requirements are moot.
    if isolated {
        crops.clear();
    }

    Ok(ParsedMutation {
        id: id.to_string(),
        name: record.name.clone(),
        width,
        height,
        tier: record.tier,
        crops,
        deps,
        isolated,
        special,
        effects: parse_effects(&record.effects),
        drops: record.drops.clone(),
    })
}

/// Parse a "WxH" size string with both dimensions in 1..=3.
pub fn parse_size(id: &str, size: &str) -> Result<(u8, u8), CatalogError> {
    let invalid = || CatalogError::InvalidSize {
        id: id.to_string(),
        size: size.to_string(),
    };
    let (w, h) = size.split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u8 = w.trim().parse().map_err(|_| invalid())?;
    let height: u8 = h.trim().parse().map_err(|_| invalid())?;
    if !(1..=3).contains(&width) || !(1..=3).contains(&height) {
        return Err(invalid());
    }
    Ok((width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn record(size: &str, conditions: Value) -> MutationRecord {
        MutationRecord {
            name: "Test".to_string(),
            size: size.to_string(),
            tier: 2,
            ground: None,
            drops: BTreeMap::new(),
            effects: vec!["harvest_boost".to_string()],
            conditions: match conditions {
                Value::Object(map) => map,
                _ => Map::new(),
            },
        }
    }

    fn catalog_with(entries: Vec<(&str, MutationRecord)>) -> Catalog {
        entries
            .into_iter()
            .map(|(id, r)| (id.to_string(), r))
            .collect()
    }

    #[test]
    fn conditions_split_into_crops_and_deps() {
        let catalog = catalog_with(vec![
            ("base", record("1x1", json!({}))),
            (
                "chained",
                record("2x2", json!({ "wheat": 2, "base": 1, "potato": 1 })),
            ),
        ]);
        let mut parser = CatalogParser::new(catalog);
        let parsed = parser.parse("chained").unwrap();

        assert_eq!(parsed.crops.get("wheat"), Some(&2));
        assert_eq!(parsed.crops.get("potato"), Some(&1));
        assert_eq!(parsed.deps.get("base"), Some(&1));
        assert_eq!(parsed.total_crops_required(), 3);
        assert_eq!((parsed.width, parsed.height), (2, 2));
    }

    #[test]
    fn adjacent_crops_zero_marks_isolation_and_clears_crops() {
        let catalog = catalog_with(vec![(
            "hermit",
            record("1x1", json!({ "adjacent_crops": 0, "wheat": 3 })),
        )]);
        let mut parser = CatalogParser::new(catalog);
        let parsed = parser.parse("hermit").unwrap();
        assert!(parsed.isolated);
        assert!(parsed.crops.is_empty());
    }

    #[test]
    fn special_condition_flags_the_mutation() {
        let catalog = catalog_with(vec![(
            "weird",
            record("1x1", json!({ "special": "only under rain", "wheat": 1 })),
        )]);
        let mut parser = CatalogParser::new(catalog);
        let parsed = parser.parse("weird").unwrap();
        assert!(parsed.special);
        assert_eq!(parsed.crops.get("wheat"), Some(&1));
    }

    #[test]
    fn malformed_sizes_are_rejected() {
        for size in ["", "x", "4x1", "1x0", "12", "axb"] {
            let catalog = catalog_with(vec![("bad", record(size, json!({})))]);
            let mut parser = CatalogParser::new(catalog);
            assert!(
                matches!(parser.parse("bad"), Err(CatalogError::InvalidSize { .. })),
                "size {size:?} should be invalid"
            );
        }
    }

    #[test]
    fn unknown_id_is_an_error() {
        let mut parser = CatalogParser::new(Catalog::new());
        assert!(matches!(
            parser.parse("ghost"),
            Err(CatalogError::UnknownMutation(_))
        ));
    }

    #[test]
    fn parsing_leaves_the_raw_catalog_unchanged() {
        let catalog = catalog_with(vec![
            ("base", record("1x1", json!({}))),
            ("other", record("1x1", json!({ "wheat": 1 }))),
        ]);
        let before = catalog.clone();
        let mut parser = CatalogParser::new(catalog);
        parser.parse("other").unwrap();
        parser.parse_godseed(&BTreeSet::new()).unwrap();
        assert_eq!(*parser.catalog(), before);
    }
}
