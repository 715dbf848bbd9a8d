//! Mutation catalog: raw records, normalization into parsed form, effect
//! vocabulary, godseed condition synthesis, and data-quality validation.

pub mod effects;
pub mod godseed;
pub mod parser;
pub mod record;
pub mod validate;

use std::fmt;

pub use effects::{Benefit, Effect};
pub use parser::{CatalogParser, ParsedMutation, GODSEED_ID};
pub use record::{load_catalog, normalize_lookup, resolve_mutation, Catalog, MutationRecord};
pub use validate::{validate_catalog, ValidationReport, ValidationSeverity};

/// Precondition failures: these indicate caller bugs or broken data, never
/// routine placement infeasibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    UnknownMutation(String),
    InvalidSize { id: String, size: String },
    InvalidQuantity { id: String, quantity: i64 },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMutation(id) => write!(f, "unknown mutation id '{id}'"),
            Self::InvalidSize { id, size } => {
                write!(f, "mutation '{id}' has malformed size '{size}'")
            }
            Self::InvalidQuantity { id, quantity } => {
                write!(f, "mutation '{id}' has invalid quantity {quantity}")
            }
        }
    }
}

impl std::error::Error for CatalogError {}
