use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateGroup, CatalogItem, SampledGroup, SearchMode},
    services::{
        images::{normalize_image, ImageFetcher},
        matcher::Stage,
        providers::ModelClient,
        response_parser::parse_first_number,
    },
};

/// What the user asked for, as seen by the comparison prompt
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Normalized user photo; `None` when it could not be loaded
    pub photo: Option<&'a [u8]>,
    pub search_mode: SearchMode,
    pub comment: &'a str,
    pub rationale: &'a str,
}

/// Agent 2: one visual comparison per category, one pick per category
pub struct VisualValidator {
    model: Arc<dyn ModelClient>,
    images: Arc<dyn ImageFetcher>,
    jpeg_quality: u8,
}

struct ValidCandidate {
    item: CatalogItem,
    image: Vec<u8>,
}

impl VisualValidator {
    pub fn new(model: Arc<dyn ModelClient>, images: Arc<dyn ImageFetcher>, jpeg_quality: u8) -> Self {
        Self {
            model,
            images,
            jpeg_quality,
        }
    }

    /// Picks one item per category, in group order
    ///
    /// Without a usable photo nothing can be compared, so every category
    /// degrades to its first retrieved item.
    pub async fn pick_all(
        &self,
        ctx: &ValidationContext<'_>,
        groups: &CandidateGroup,
        samples: &SampledGroup,
    ) -> Vec<CatalogItem> {
        if ctx.photo.is_none() {
            tracing::warn!(
                categories = groups.len(),
                "No usable photo, picking first item per category"
            );
            for (key, group) in groups {
                report_pick(key, group.first());
            }
            return first_per_category(groups);
        }

        let mut picks = Vec::with_capacity(groups.len());
        for (key, group) in groups {
            let sample = samples.get(key).map(Vec::as_slice).unwrap_or_default();
            if let Some(pick) = self.pick_for_category(ctx, key, group, sample).await {
                picks.push(pick);
            }
        }
        picks
    }

    /// Chooses one item from a category group
    ///
    /// `group` is the full retrieved group and `sample` its sampled subset.
    pub async fn pick_for_category(
        &self,
        ctx: &ValidationContext<'_>,
        key: &str,
        group: &[CatalogItem],
        sample: &[CatalogItem],
    ) -> Option<CatalogItem> {
        let pick = self.choose(ctx, key, group, sample).await;
        report_pick(key, pick.as_ref());
        pick
    }

    async fn choose(
        &self,
        ctx: &ValidationContext<'_>,
        key: &str,
        group: &[CatalogItem],
        sample: &[CatalogItem],
    ) -> Option<CatalogItem> {
        if group.len() <= 1 {
            return group.first().cloned();
        }

        let Some(photo) = ctx.photo else {
            return group.first().cloned();
        };

        let valid = self.load_candidates(sample).await;
        if valid.is_empty() {
            tracing::warn!(category = %key, "No candidate image survived, picking first item");
            return group.first().cloned();
        }

        let prompt = build_prompt(ctx, valid.len());
        let mut images = Vec::with_capacity(valid.len() + 1);
        images.push(photo.to_vec());
        images.extend(valid.iter().map(|c| c.image.clone()));

        let choice = match self.model.vision_complete(&prompt, &images).await {
            Ok(answer) => resolve_choice(&answer, valid.len()),
            Err(e) => Err(e),
        };

        let index = match choice {
            Ok(index) => index,
            Err(e) => {
                tracing::warn!(
                    category = %key,
                    error = %e,
                    provider = self.model.name(),
                    "Visual comparison unusable, picking first valid candidate"
                );
                0
            }
        };

        tracing::debug!(category = %key, index, candidates = valid.len(), "Comparison resolved");
        valid.into_iter().nth(index).map(|c| c.item)
    }

    /// Fetches and normalizes sample images, skipping any that fail
    async fn load_candidates(&self, sample: &[CatalogItem]) -> Vec<ValidCandidate> {
        let mut valid = Vec::with_capacity(sample.len());
        for item in sample {
            match self.load_image(item).await {
                Ok(image) => valid.push(ValidCandidate {
                    item: item.clone(),
                    image,
                }),
                Err(e) => {
                    tracing::debug!(item_id = item.id, error = %e, "Skipping candidate image")
                }
            }
        }
        valid
    }

    async fn load_image(&self, item: &CatalogItem) -> AppResult<Vec<u8>> {
        let image_ref = item
            .image_ref()
            .ok_or_else(|| AppError::ImageFetchFailure(format!("item {} has no image", item.id)))?;
        let bytes = self.images.fetch(&image_ref).await?;
        normalize_image(&bytes, self.jpeg_quality)
    }
}

fn report_pick(key: &str, pick: Option<&CatalogItem>) {
    tracing::info!(
        stage = %Stage::Validated,
        category = %key,
        item_id = pick.map(|p| p.id),
        "Category validated"
    );
}

/// First retrieved item of every category
pub fn first_per_category(groups: &CandidateGroup) -> Vec<CatalogItem> {
    groups
        .values()
        .filter_map(|group| group.first().cloned())
        .collect()
}

/// Normalizes the model's numeric answer to a zero-based candidate index
///
/// Accepts two 1-based conventions. Counting over the combined image sequence
/// (photo first) gives values in `2..=n+1`, read as `answer - 2`; counting over
/// candidates alone gives `1..=n`, read as `answer - 1`. The combined range is
/// checked first, so overlapping values resolve to the combined convention.
pub fn normalize_choice(answer: i64, candidate_count: usize) -> Option<usize> {
    let n = candidate_count as i64;
    if n == 0 {
        return None;
    }
    if (2..=n + 1).contains(&answer) {
        Some((answer - 2) as usize)
    } else if (1..=n).contains(&answer) {
        Some((answer - 1) as usize)
    } else {
        None
    }
}

/// Parses and normalizes a comparison answer
pub fn resolve_choice(answer: &str, candidate_count: usize) -> AppResult<usize> {
    let number = parse_first_number(answer)
        .map_err(|e| AppError::InvalidModelChoice(format!("{}: {:?}", e, answer)))?;

    normalize_choice(number, candidate_count).ok_or_else(|| {
        AppError::InvalidModelChoice(format!(
            "{} is outside 1..={} candidates",
            number,
            candidate_count + 1
        ))
    })
}

fn build_prompt(ctx: &ValidationContext<'_>, candidate_count: usize) -> String {
    let goal = match ctx.search_mode {
        SearchMode::Specific => "best matches the requested item type",
        SearchMode::Complementary => "best complements the outfit in image 1",
    };

    let mut prompt = format!(
        "Image 1 is the user's photo. Images 2 to {} are catalog candidates, in order.\n\
         Pick the candidate image that {}.",
        candidate_count + 1,
        goal
    );

    if !ctx.comment.trim().is_empty() {
        prompt.push_str(&format!("\nUser comment: \"{}\"", ctx.comment.trim()));
    }
    if !ctx.rationale.trim().is_empty() {
        prompt.push_str(&format!("\nStylist note: {}", ctx.rationale.trim()));
    }

    prompt.push_str(&format!(
        "\nAnswer with exactly one number from 2 to {}, the number of the best image, and nothing else.",
        candidate_count + 1
    ));
    prompt
}
