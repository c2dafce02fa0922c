use std::{fmt::Display, sync::Arc, time::Instant};

use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::Config,
    db::CatalogStore,
    error::AppError,
    models::CatalogItem,
    services::{
        catalog_query::CatalogQueryEngine,
        images::{normalize_image, ImageFetcher},
        intent::IntentResolver,
        providers::ModelClient,
        sampler::{group_candidates, sample_groups},
        visual_validator::{ValidationContext, VisualValidator},
    },
};

/// Pipeline tunables
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    pub candidate_limit: usize,
    pub fallback_sample_size: usize,
    pub jpeg_quality: u8,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            candidate_limit: 30,
            fallback_sample_size: 10,
            jpeg_quality: 85,
        }
    }
}

impl From<&Config> for MatchSettings {
    fn from(config: &Config) -> Self {
        Self {
            candidate_limit: config.candidate_limit,
            fallback_sample_size: config.fallback_sample_size,
            jpeg_quality: config.jpeg_quality,
        }
    }
}

/// Pipeline stages, reported on every stage-boundary event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    IntentResolved,
    CandidatesFetched,
    Sampled,
    Validated,
    Truncated,
    Done,
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::IntentResolved => "intent_resolved",
            Stage::CandidatesFetched => "candidates_fetched",
            Stage::Sampled => "sampled",
            Stage::Validated => "validated",
            Stage::Truncated => "truncated",
            Stage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// Photo + comment → top-N catalog items
///
/// Stages run strictly one after another; every collaborator call is awaited
/// before the next one starts. Every component swallows its own errors into
/// its fallback, so `find_matches` always returns.
pub struct MatchPipeline {
    intent: IntentResolver,
    query_engine: CatalogQueryEngine,
    validator: VisualValidator,
    images: Arc<dyn ImageFetcher>,
    settings: MatchSettings,
}

impl MatchPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        model: Arc<dyn ModelClient>,
        images: Arc<dyn ImageFetcher>,
        settings: MatchSettings,
    ) -> Self {
        Self {
            intent: IntentResolver::new(model.clone()),
            query_engine: CatalogQueryEngine::new(
                catalog,
                settings.candidate_limit,
                settings.fallback_sample_size,
            ),
            validator: VisualValidator::new(model, images.clone(), settings.jpeg_quality),
            images,
            settings,
        }
    }

    /// Recommends at most `top_n` items for the photo and comment
    ///
    /// Never fails; a shorter or empty list is the only degraded outcome.
    pub async fn find_matches(
        &self,
        photo_ref: &str,
        comment: &str,
        top_n: usize,
    ) -> Vec<CatalogItem> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("find_matches", run_id = %run_id);
        self.run(photo_ref, comment, top_n).instrument(span).await
    }

    async fn run(&self, photo_ref: &str, comment: &str, top_n: usize) -> Vec<CatalogItem> {
        let start = Instant::now();
        tracing::info!(stage = %Stage::Start, top_n, "Starting match");
        tracing::debug!(comment = %comment, "Match input");

        if top_n == 0 {
            tracing::info!(stage = %Stage::Done, "Nothing requested");
            return Vec::new();
        }

        let photo = self.load_photo(photo_ref).await;
        let photo_ref = Some(photo_ref).filter(|r| !r.trim().is_empty());

        let query = self
            .intent
            .resolve(comment, photo_ref, photo.as_deref())
            .await;
        tracing::info!(
            stage = %Stage::IntentResolved,
            source = ?query.source,
            mode = ?query.search_mode,
            categories = ?query.resolved_categories,
            keywords = ?query.keywords,
            "Intent resolved"
        );

        let candidates = self.query_engine.fetch_candidates(&query).await;
        if candidates.is_empty() {
            tracing::warn!(
                stage = %Stage::Done,
                reason = %AppError::CatalogEmpty,
                "Returning empty result"
            );
            return Vec::new();
        }
        tracing::info!(
            stage = %Stage::CandidatesFetched,
            candidates = candidates.len(),
            "Candidates fetched"
        );

        let groups = group_candidates(candidates);
        let samples = sample_groups(&groups);
        for (key, group) in &groups {
            tracing::info!(
                stage = %Stage::Sampled,
                category = %key,
                retrieved = group.len(),
                sampled = samples.get(key).map_or(0, Vec::len),
                "Category sampled"
            );
        }

        let ctx = ValidationContext {
            photo: photo.as_deref(),
            search_mode: query.search_mode,
            comment,
            rationale: &query.rationale,
        };
        let mut picks = self.validator.pick_all(&ctx, &groups, &samples).await;
        tracing::info!(categories = groups.len(), picks = picks.len(), "All categories validated");

        picks.truncate(top_n);
        tracing::info!(stage = %Stage::Truncated, results = picks.len(), "Picks truncated");

        tracing::info!(
            stage = %Stage::Done,
            results = picks.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Match completed"
        );
        picks
    }

    /// Loads and normalizes the user photo; `None` if it cannot be used
    async fn load_photo(&self, photo_ref: &str) -> Option<Vec<u8>> {
        if photo_ref.trim().is_empty() {
            return None;
        }

        let result = match self.images.fetch(photo_ref).await {
            Ok(bytes) => normalize_image(&bytes, self.settings.jpeg_quality),
            Err(e) => Err(e),
        };

        match result {
            Ok(photo) => Some(photo),
            Err(e) => {
                tracing::warn!(error = %e, photo_ref = %photo_ref, "User photo unusable");
                None
            }
        }
    }
}
