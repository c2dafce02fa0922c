use std::collections::BTreeSet;

use crate::{
    error::AppResult,
    models::{CatalogItem, CategoryTag},
};

/// Read-only catalog abstraction
///
/// Backends must give identical semantics: category filters are
/// case-insensitive substring matches of the item's `category` against a tag's
/// label, search terms are case-insensitive substring matches, and results
/// come back in a stable order so runs are reproducible.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Items whose category contains any of the given tags' labels
    async fn query_by_category(
        &self,
        categories: &BTreeSet<CategoryTag>,
        limit: usize,
    ) -> AppResult<Vec<CatalogItem>>;

    /// Items matching any tag (by category) or any term (by name, description or category)
    async fn query_by_any_field(
        &self,
        terms: &[String],
        categories: &BTreeSet<CategoryTag>,
        limit: usize,
    ) -> AppResult<Vec<CatalogItem>>;

    /// Arbitrary rows, used only when every filter came back empty
    async fn sample_any(&self, limit: usize) -> AppResult<Vec<CatalogItem>>;

    /// Single item lookup
    async fn find_by_id(&self, id: i64) -> AppResult<Option<CatalogItem>>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Escapes LIKE metacharacters and wraps the term for a substring match
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
