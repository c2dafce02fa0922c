use std::{collections::BTreeSet, path::Path};

use crate::{
    db::catalog::CatalogStore,
    error::{AppError, AppResult},
    models::{CatalogItem, CategoryTag},
};

/// Catalog held in memory, optionally loaded from a JSON array file
///
/// Mirrors the PostgreSQL backend's filters and orders rows by id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<CatalogItem>,
}

impl InMemoryCatalog {
    pub fn new(mut items: Vec<CatalogItem>) -> Self {
        items.sort_by_key(|item| item.id);
        Self { items }
    }

    /// Loads a catalog exported as a JSON array of items
    pub fn from_json_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Internal(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let items: Vec<CatalogItem> = serde_json::from_str(&raw).map_err(|e| {
            AppError::Internal(format!("Failed to parse catalog {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            items = items.len(),
            "Loaded catalog from JSON file"
        );

        Ok(Self::new(items))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn in_categories(item: &CatalogItem, categories: &BTreeSet<CategoryTag>) -> bool {
        categories.iter().any(|tag| tag.matches_category(&item.category))
    }

    fn matches_any_term(item: &CatalogItem, terms: &[String]) -> bool {
        let name = item.name.to_lowercase();
        let description = item.description.to_lowercase();
        let category = item.category.to_lowercase();

        terms.iter().any(|term| {
            let term = term.to_lowercase();
            name.contains(&term) || description.contains(&term) || category.contains(&term)
        })
    }
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn query_by_category(
        &self,
        categories: &BTreeSet<CategoryTag>,
        limit: usize,
    ) -> AppResult<Vec<CatalogItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| Self::in_categories(item, categories))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn query_by_any_field(
        &self,
        terms: &[String],
        categories: &BTreeSet<CategoryTag>,
        limit: usize,
    ) -> AppResult<Vec<CatalogItem>> {
        Ok(self
            .items
            .iter()
            .filter(|item| {
                Self::in_categories(item, categories) || Self::matches_any_term(item, terms)
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn sample_any(&self, limit: usize) -> AppResult<Vec<CatalogItem>> {
        Ok(self.items.iter().take(limit).cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<CatalogItem>> {
        Ok(self.items.iter().find(|item| item.id == id).cloned())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
