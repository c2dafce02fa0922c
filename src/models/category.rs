use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt::Display};

/// One of the fixed garment categories the catalog is organised by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryTag {
    Trousers,
    Blouses,
    Jackets,
    Tops,
    Skirts,
}

impl CategoryTag {
    /// The whole taxonomy, in canonical order
    pub const ALL: [CategoryTag; 5] = [
        CategoryTag::Trousers,
        CategoryTag::Blouses,
        CategoryTag::Jackets,
        CategoryTag::Tops,
        CategoryTag::Skirts,
    ];

    /// Canonical catalog label, exactly as the ingestion job stores it
    pub fn label(&self) -> &'static str {
        match self {
            CategoryTag::Trousers => "Брюки, бриджи и капри женские",
            CategoryTag::Blouses => "Блузы и рубашки женские",
            CategoryTag::Jackets => "Пиджаки, жакеты и жилеты женские",
            CategoryTag::Tops => "Футболки и топы женские",
            CategoryTag::Skirts => "Юбки женские",
        }
    }

    /// Lowercase word stems that single out this category in free text
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            CategoryTag::Trousers => &["брюк", "бридж", "капри", "штан", "джинс", "леггинс"],
            CategoryTag::Blouses => &["блуз", "рубаш", "сорочк"],
            CategoryTag::Jackets => &["пиджак", "жакет", "жилет", "блейзер"],
            CategoryTag::Tops => &["футболк", "топ", "майк", "лонгслив"],
            CategoryTag::Skirts => &["юбк"],
        }
    }

    /// Parses a model-produced label; only verbatim taxonomy members are accepted
    /// (surrounding whitespace and letter case are ignored).
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|tag| tag.label().to_lowercase() == wanted)
    }

    /// True when a catalog category string contains this tag's label
    pub fn matches_category(&self, category: &str) -> bool {
        category
            .to_lowercase()
            .contains(&self.label().to_lowercase())
    }

    /// First taxonomy member whose label appears in the catalog category
    pub fn for_category(category: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tag| tag.matches_category(category))
    }

    /// Categories whose lexicon stems occur in the text
    pub fn match_lexicon(text: &str) -> BTreeSet<CategoryTag> {
        let lowered = text.to_lowercase();
        Self::ALL
            .into_iter()
            .filter(|tag| tag.keywords().iter().any(|kw| lowered.contains(kw)))
            .collect()
    }

    /// The full taxonomy as a set
    pub fn all() -> BTreeSet<CategoryTag> {
        Self::ALL.into_iter().collect()
    }
}

impl Display for CategoryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_exact() {
        assert_eq!(
            CategoryTag::from_label("Юбки женские"),
            Some(CategoryTag::Skirts)
        );
        assert_eq!(
            CategoryTag::from_label("  футболки и топы женские "),
            Some(CategoryTag::Tops)
        );
    }

    #[test]
    fn test_from_label_rejects_partial() {
        assert_eq!(CategoryTag::from_label("Юбки"), None);
        assert_eq!(CategoryTag::from_label("Платья женские"), None);
    }

    #[test]
    fn test_matches_category_substring() {
        assert!(CategoryTag::Tops.matches_category("Одежда / Футболки и топы женские"));
        assert!(!CategoryTag::Tops.matches_category("Юбки женские"));
    }

    #[test]
    fn test_match_lexicon_single() {
        let matched = CategoryTag::match_lexicon("Подбери футболку к джинсам? нет, просто футболку");
        assert!(matched.contains(&CategoryTag::Tops));
    }

    #[test]
    fn test_match_lexicon_union() {
        let matched = CategoryTag::match_lexicon("нужна юбка и блузка");
        assert_eq!(
            matched,
            [CategoryTag::Blouses, CategoryTag::Skirts].into_iter().collect()
        );
    }

    #[test]
    fn test_match_lexicon_none() {
        assert!(CategoryTag::match_lexicon("что-нибудь красивое").is_empty());
        assert!(CategoryTag::match_lexicon("").is_empty());
    }

    #[test]
    fn test_display_is_label() {
        assert_eq!(CategoryTag::Jackets.to_string(), "Пиджаки, жакеты и жилеты женские");
    }
}
