//! Catalog data-quality checks. Run by the CLI `validate` command before a
//! catalog ships; the engine itself tolerates most of what is flagged here.

use std::fmt;

use serde_json::Value;

use super::parser::{parse_size, ADJACENT_CROPS_KEY, SPECIAL_KEY};
use super::record::Catalog;
use crate::catalog::effects::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
    Info,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }
}

/// Validate a raw catalog. Errors make entries unusable; warnings flag data
/// the parser will silently skip.
pub fn validate_catalog(catalog: &Catalog) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (id, record) in catalog {
        let context = format!("mutation '{id}'");

        if record.name.trim().is_empty() {
            report.push(ValidationSeverity::Error, &context, "empty display name");
        }
        if let Err(err) = parse_size(id, &record.size) {
            report.push(ValidationSeverity::Error, &context, err.to_string());
        }

        for tag in &record.effects {
            if Effect::parse(tag).is_none() {
                report.push(
                    ValidationSeverity::Warning,
                    &context,
                    format!("unknown effect tag '{tag}'"),
                );
            }
        }

        for (key, value) in &record.conditions {
            if key == SPECIAL_KEY {
                if !value.is_string() {
                    report.push(
                        ValidationSeverity::Warning,
                        &context,
                        "special condition should carry a descriptive string",
                    );
                }
                continue;
            }
            match value {
                Value::Number(n) if n.as_u64().is_some() => {
                    if key == ADJACENT_CROPS_KEY {
                        continue;
                    }
                    // Keys naming no catalog entry are treated as crop names.
                    if !catalog.contains_key(key) && key.chars().any(|c| c.is_ascii_uppercase()) {
                        report.push(
                            ValidationSeverity::Info,
                            &context,
                            format!("crop name '{key}' is not lowercase"),
                        );
                    }
                }
                _ => {
                    report.push(
                        ValidationSeverity::Warning,
                        &context,
                        format!("condition '{key}' has a non-numeric value; it will be ignored"),
                    );
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::MutationRecord;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn entry(size: &str, effects: Vec<&str>, conditions: serde_json::Value) -> MutationRecord {
        MutationRecord {
            name: "Thing".to_string(),
            size: size.to_string(),
            tier: 1,
            ground: None,
            drops: BTreeMap::new(),
            effects: effects.into_iter().map(String::from).collect(),
            conditions: match conditions {
                serde_json::Value::Object(map) => map,
                _ => serde_json::Map::new(),
            },
        }
    }

    #[test]
    fn clean_catalog_passes() {
        let mut catalog = Catalog::new();
        catalog.insert(
            "ok".to_string(),
            entry("2x1", vec!["harvest_boost"], json!({ "wheat": 1 })),
        );
        let report = validate_catalog(&catalog);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn bad_size_is_an_error_and_bad_effect_a_warning() {
        let mut catalog = Catalog::new();
        catalog.insert(
            "broken".to_string(),
            entry("9x9", vec!["sparkles"], json!({ "wheat": "lots" })),
        );
        let report = validate_catalog(&catalog);
        assert!(report.has_errors());
        let warnings = report
            .diagnostics
            .iter()
            .filter(|d| d.severity == ValidationSeverity::Warning)
            .count();
        assert_eq!(warnings, 2);
    }
}
