use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::CategoryTag;

/// A purchasable item as stored by the catalog ingestion job
///
/// Read-only from this crate's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogItem {
    pub id: i64,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Base64-encoded image captured at ingestion time
    #[serde(default, skip_serializing)]
    pub image_blob: Option<String>,
    #[serde(default)]
    pub category: String,
}

impl CatalogItem {
    /// Reference the image fetcher should load for this item
    ///
    /// Prefers the remote URL and falls back to the stored blob as a data URI.
    pub fn image_ref(&self) -> Option<String> {
        if let Some(url) = self.image_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                return Some(url.to_string());
            }
        }

        self.image_blob
            .as_deref()
            .map(str::trim)
            .filter(|blob| !blob.is_empty())
            .map(|blob| format!("data:image/jpeg;base64,{}", blob))
    }

    /// Key the item is grouped under: the taxonomy label when the catalog
    /// category contains one, the raw category otherwise
    pub fn category_key(&self) -> String {
        match CategoryTag::for_category(&self.category) {
            Some(tag) => tag.label().to_string(),
            None => self.category.trim().to_string(),
        }
    }
}

/// Retrieved candidates per category, in encounter order
pub type CandidateGroup = IndexMap<String, Vec<CatalogItem>>;

/// Bounded per-category subsets selected for visual comparison
pub type SampledGroup = IndexMap<String, Vec<CatalogItem>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn item(category: &str) -> CatalogItem {
        CatalogItem {
            id: 1,
            name: "Футболка базовая".to_string(),
            price: "990 ₽".to_string(),
            description: String::new(),
            url: None,
            image_url: None,
            image_blob: None,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_image_ref_prefers_url() {
        let mut it = item("Юбки женские");
        it.image_url = Some("https://cdn.example/1.jpg".to_string());
        it.image_blob = Some("AAAA".to_string());
        assert_eq!(it.image_ref(), Some("https://cdn.example/1.jpg".to_string()));
    }

    #[test]
    fn test_image_ref_falls_back_to_blob() {
        let mut it = item("Юбки женские");
        it.image_url = Some("   ".to_string());
        it.image_blob = Some("AAAA".to_string());
        assert_eq!(
            it.image_ref(),
            Some("data:image/jpeg;base64,AAAA".to_string())
        );
    }

    #[test]
    fn test_image_ref_none() {
        assert_eq!(item("Юбки женские").image_ref(), None);
    }

    #[test]
    fn test_category_key_canonicalises_taxonomy() {
        assert_eq!(
            item("Женщинам/Футболки и топы женские").category_key(),
            "Футболки и топы женские"
        );
        assert_eq!(item(" Платья женские ").category_key(), "Платья женские");
    }

    #[test]
    fn test_deserialize_with_missing_optional_fields() {
        let json = r#"{"id": 3, "name": "Юбка миди", "price": "1 500 ₽"}"#;
        let it: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(it.id, 3);
        assert!(it.description.is_empty());
        assert!(it.category.is_empty());
        assert!(it.image_url.is_none());
    }

    #[test]
    fn test_image_blob_not_serialized() {
        let mut it = item("Юбки женские");
        it.image_blob = Some("AAAA".to_string());
        let json = serde_json::to_value(&it).unwrap();
        assert!(json.get("image_blob").is_none());
    }
}
