use serde::Deserialize;
use std::{collections::BTreeSet, sync::Arc};

use crate::{
    error::{AppError, AppResult},
    models::{CategoryTag, GarmentQuery, QuerySource, SearchMode},
    services::{providers::ModelClient, response_parser::parse_json_object},
};

/// Answer shape requested from the intent model
///
/// Every field is optional; defaults are applied in `into_query`.
#[derive(Debug, Default, Deserialize)]
struct IntentAnswer {
    #[serde(default)]
    categories: Vec<String>,
    /// Single-category form some prompts elicit
    #[serde(default)]
    query_category: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    search_mode: Option<String>,
    #[serde(default)]
    rationale: String,
}

/// Agent 1: turns the user's comment (and photo) into a `GarmentQuery`
pub struct IntentResolver {
    model: Arc<dyn ModelClient>,
}

impl IntentResolver {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self { model }
    }

    /// Resolves intent with the model, falling back to the keyword lexicon
    ///
    /// `photo` is the normalized user photo when it could be loaded; without it
    /// the request is text-only. Never fails.
    pub async fn resolve(
        &self,
        comment: &str,
        photo_ref: Option<&str>,
        photo: Option<&[u8]>,
    ) -> GarmentQuery {
        match self.resolve_with_model(comment, photo_ref, photo).await {
            Ok(query) => query,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = self.model.name(),
                    "Intent model failed, using keyword lexicon"
                );
                resolve_with_lexicon(comment, photo_ref)
            }
        }
    }

    async fn resolve_with_model(
        &self,
        comment: &str,
        photo_ref: Option<&str>,
        photo: Option<&[u8]>,
    ) -> AppResult<GarmentQuery> {
        let prompt = build_prompt(comment, photo.is_some());

        let response = match photo {
            Some(bytes) => {
                self.model
                    .vision_complete(&prompt, &[bytes.to_vec()])
                    .await?
            }
            None => self.model.text_complete(&prompt).await?,
        };

        let answer: IntentAnswer = parse_json_object(&response)?;
        into_query(answer, comment, photo_ref)
    }
}

/// Validates a parsed answer against the taxonomy
fn into_query(
    answer: IntentAnswer,
    comment: &str,
    photo_ref: Option<&str>,
) -> AppResult<GarmentQuery> {
    let mut resolved: BTreeSet<CategoryTag> = BTreeSet::new();
    for label in answer.categories.iter().chain(answer.query_category.iter()) {
        match CategoryTag::from_label(label) {
            Some(tag) => {
                resolved.insert(tag);
            }
            None => tracing::debug!(label = %label, "Dropping category outside taxonomy"),
        }
    }

    let search_mode = answer
        .search_mode
        .as_deref()
        .and_then(SearchMode::parse)
        .unwrap_or(SearchMode::Specific);

    if resolved.is_empty() {
        match search_mode {
            SearchMode::Complementary => resolved = CategoryTag::all(),
            SearchMode::Specific => {
                return Err(AppError::ModelMalformedResponse(
                    "no taxonomy category in specific answer".to_string(),
                ))
            }
        }
    }

    let mut keywords: Vec<String> = Vec::new();
    for keyword in answer.keywords {
        let keyword = keyword.trim().to_string();
        if !keyword.is_empty() && !keywords.contains(&keyword) {
            keywords.push(keyword);
        }
    }

    Ok(GarmentQuery {
        raw_comment: comment.to_string(),
        raw_image_ref: photo_ref.map(str::to_string),
        resolved_categories: resolved,
        keywords,
        search_mode,
        rationale: answer.rationale.trim().to_string(),
        source: QuerySource::Model,
    })
}

/// Deterministic resolution from the static category lexicon
pub fn resolve_with_lexicon(comment: &str, photo_ref: Option<&str>) -> GarmentQuery {
    let lowered = comment.to_lowercase();
    let matched = CategoryTag::match_lexicon(&lowered);
    let keywords: Vec<String> = lowered.split_whitespace().map(str::to_string).collect();

    let (search_mode, resolved_categories, rationale) = if matched.is_empty() {
        (
            SearchMode::Complementary,
            CategoryTag::all(),
            "no category keyword in comment".to_string(),
        )
    } else {
        let labels: Vec<&str> = matched.iter().map(|tag| tag.label()).collect();
        (
            SearchMode::Specific,
            matched,
            format!("comment mentions {}", labels.join("; ")),
        )
    };

    GarmentQuery {
        raw_comment: comment.to_string(),
        raw_image_ref: photo_ref.map(str::to_string),
        resolved_categories,
        keywords,
        search_mode,
        rationale,
        source: QuerySource::Lexicon,
    }
}

fn build_prompt(comment: &str, with_photo: bool) -> String {
    let categories = CategoryTag::ALL
        .iter()
        .map(|tag| format!("    \"{}\"", tag.label()))
        .collect::<Vec<_>>()
        .join(",\n");

    let photo_line = if with_photo {
        "The user attached a photo of a garment (first image)."
    } else {
        "No photo is available; rely on the comment."
    };

    format!(
        r#"You are a fashion stylist helping a shopper pick catalog items.
{photo_line}
User comment: "{comment}"

Decide what the user wants:
- "specific": they ask for a particular item type;
- "complementary": they want something that goes with the pictured outfit.

Reply with JSON only:
{{
  "categories": [one or more categories copied verbatim from the list below],
  "keywords": [short search words such as colour, style, material],
  "search_mode": "specific" or "complementary",
  "rationale": "one short sentence"
}}

Allowed categories:
{categories}"#
    )
}
