use std::sync::Arc;

use crate::{
    db::CatalogStore,
    error::AppResult,
    models::{CatalogItem, GarmentQuery, SearchMode},
};

/// Imperative request verbs that carry no search meaning
const STOP_WORDS: &[&str] = &[
    "подбери",
    "подберите",
    "подобрать",
    "найди",
    "найдите",
    "найти",
    "покажи",
    "покажите",
    "посоветуй",
    "посоветуйте",
    "помоги",
    "хочу",
    "нужна",
    "нужен",
    "нужно",
    "нужны",
];

/// Turns a `GarmentQuery` into a bounded, ordered candidate list
///
/// When the primary filter finds nothing the engine falls back to an arbitrary
/// catalog sample. The sample trades relevance for availability so a
/// taxonomy/catalog mismatch never dead-ends the pipeline; it does not claim
/// the rows are relevant.
pub struct CatalogQueryEngine {
    catalog: Arc<dyn CatalogStore>,
    candidate_limit: usize,
    fallback_sample_size: usize,
}

impl CatalogQueryEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        candidate_limit: usize,
        fallback_sample_size: usize,
    ) -> Self {
        Self {
            catalog,
            candidate_limit,
            fallback_sample_size,
        }
    }

    /// Retrieves candidates for the query; catalog errors count as empty results
    pub async fn fetch_candidates(&self, query: &GarmentQuery) -> Vec<CatalogItem> {
        let terms = search_terms(&query.keywords);

        let primary = match query.search_mode {
            SearchMode::Specific => self.by_category(query).await,
            SearchMode::Complementary if terms.is_empty() => self.by_category(query).await,
            SearchMode::Complementary => self.by_any_field(query, &terms).await,
        };

        if !primary.is_empty() || query.resolved_categories.is_empty() {
            tracing::info!(
                rows = primary.len(),
                mode = ?query.search_mode,
                terms = terms.len(),
                backend = self.catalog.name(),
                "Primary catalog query completed"
            );
            return primary;
        }

        // Both primary filters already include every category-only row, so an
        // empty primary result means the category-only retry would be empty too.
        match self.catalog.sample_any(self.fallback_sample_size).await {
            Ok(sample) => {
                tracing::warn!(
                    rows = sample.len(),
                    categories = ?query.resolved_categories,
                    "No catalog rows match the resolved categories, using last-resort sample"
                );
                sample
            }
            Err(e) => {
                tracing::error!(error = %e, "Last-resort catalog sample failed");
                Vec::new()
            }
        }
    }

    async fn by_category(&self, query: &GarmentQuery) -> Vec<CatalogItem> {
        let result = self
            .catalog
            .query_by_category(&query.resolved_categories, self.candidate_limit)
            .await;
        self.rows_or_empty(result, "category")
    }

    async fn by_any_field(&self, query: &GarmentQuery, terms: &[String]) -> Vec<CatalogItem> {
        let result = self
            .catalog
            .query_by_any_field(terms, &query.resolved_categories, self.candidate_limit)
            .await;
        self.rows_or_empty(result, "any_field")
    }

    fn rows_or_empty(
        &self,
        result: AppResult<Vec<CatalogItem>>,
        filter: &'static str,
    ) -> Vec<CatalogItem> {
        match result {
            Ok(mut rows) => {
                rows.truncate(self.candidate_limit);
                if rows.is_empty() {
                    tracing::debug!(filter, "Filter matched nothing");
                }
                rows
            }
            Err(e) => {
                tracing::warn!(error = %e, filter, "Catalog query failed, treating as empty");
                Vec::new()
            }
        }
    }
}

/// Keywords usable as substring filters: longer than two characters, not a
/// request verb, lowercased and deduplicated in order
pub fn search_terms(keywords: &[String]) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for keyword in keywords {
        let term = keyword.trim().to_lowercase();
        if term.chars().count() <= 2 || STOP_WORDS.contains(&term.as_str()) {
            continue;
        }
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}
