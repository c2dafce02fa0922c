use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::CategoryTag;

/// Whether the user wants a given item type or something that goes with the photo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    Specific,
    Complementary,
}

impl SearchMode {
    /// Lenient parse of a model-produced mode string
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "specific" => Some(SearchMode::Specific),
            "complementary" | "complement" => Some(SearchMode::Complementary),
            _ => None,
        }
    }
}

/// Where a query's fields came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuerySource {
    Model,
    Lexicon,
}

/// Structured catalog query produced from the user's comment and photo
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GarmentQuery {
    pub raw_comment: String,
    pub raw_image_ref: Option<String>,
    pub resolved_categories: BTreeSet<CategoryTag>,
    pub keywords: Vec<String>,
    pub search_mode: SearchMode,
    pub rationale: String,
    pub source: QuerySource,
}
