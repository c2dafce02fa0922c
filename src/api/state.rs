use std::sync::Arc;

use crate::{db::CatalogStore, services::MatchPipeline};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<MatchPipeline>,
    pub catalog: Arc<dyn CatalogStore>,
    pub default_top_n: usize,
}

impl AppState {
    /// Creates the state from an already-wired pipeline and its catalog
    pub fn new(pipeline: MatchPipeline, catalog: Arc<dyn CatalogStore>, default_top_n: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            catalog,
            default_top_n,
        }
    }
}
