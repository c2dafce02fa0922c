use sqlx::{postgres::PgPoolOptions, PgPool};
use std::collections::BTreeSet;

use crate::{
    db::catalog::{like_pattern, CatalogStore},
    error::AppResult,
    models::{CatalogItem, CategoryTag},
};

const ITEM_COLUMNS: &str = "id, name, price, COALESCE(description, '') AS description, url, \
     image_url, image_blob, COALESCE(category, '') AS category";

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Catalog backed by the `clothing_items` table the ingestion job fills
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn category_patterns(categories: &BTreeSet<CategoryTag>) -> Vec<String> {
        categories.iter().map(|tag| like_pattern(tag.label())).collect()
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgCatalog {
    async fn query_by_category(
        &self,
        categories: &BTreeSet<CategoryTag>,
        limit: usize,
    ) -> AppResult<Vec<CatalogItem>> {
        let sql = format!(
            "SELECT {} FROM clothing_items WHERE category ILIKE ANY($1) ORDER BY id LIMIT $2",
            ITEM_COLUMNS
        );

        let items = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(Self::category_patterns(categories))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            categories = categories.len(),
            rows = items.len(),
            "Category query completed"
        );

        Ok(items)
    }

    async fn query_by_any_field(
        &self,
        terms: &[String],
        categories: &BTreeSet<CategoryTag>,
        limit: usize,
    ) -> AppResult<Vec<CatalogItem>> {
        let sql = format!(
            r#"
            SELECT {} FROM clothing_items
            WHERE category ILIKE ANY($1)
               OR name ILIKE ANY($2)
               OR description ILIKE ANY($2)
               OR category ILIKE ANY($2)
            ORDER BY id
            LIMIT $3
            "#,
            ITEM_COLUMNS
        );

        let term_patterns: Vec<String> = terms.iter().map(|t| like_pattern(t)).collect();

        let items = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(Self::category_patterns(categories))
            .bind(term_patterns)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(
            categories = categories.len(),
            terms = terms.len(),
            rows = items.len(),
            "Any-field query completed"
        );

        Ok(items)
    }

    async fn sample_any(&self, limit: usize) -> AppResult<Vec<CatalogItem>> {
        let sql = format!(
            "SELECT {} FROM clothing_items ORDER BY id LIMIT $1",
            ITEM_COLUMNS
        );

        let items = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<CatalogItem>> {
        let sql = format!("SELECT {} FROM clothing_items WHERE id = $1", ITEM_COLUMNS);

        let item = sqlx::query_as::<_, CatalogItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
