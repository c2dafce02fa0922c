use std::collections::HashSet;

use crate::models::{CandidateGroup, CatalogItem, SampledGroup};

/// Upper bound on images sent per visual comparison
pub const MAX_SAMPLE: usize = 5;

/// Groups the flat candidate list by category, keeping retrieval order both
/// across and within groups
pub fn group_candidates(items: Vec<CatalogItem>) -> CandidateGroup {
    let mut groups = CandidateGroup::new();
    for item in items {
        groups.entry(item.category_key()).or_default().push(item);
    }
    groups
}

/// Spread-out, deduplicated subset of at most `MAX_SAMPLE` items
///
/// Retrieval order puts the most relevant rows first, so the head is always
/// kept and the remaining picks step through to the tail.
pub fn sample_group(items: &[CatalogItem]) -> Vec<CatalogItem> {
    let mut seen = HashSet::new();
    spread_indices(items.len())
        .into_iter()
        .map(|idx| &items[idx])
        .filter(|item| seen.insert(item.id))
        .take(MAX_SAMPLE)
        .cloned()
        .collect()
}

/// Samples every group, preserving group order
pub fn sample_groups(groups: &CandidateGroup) -> SampledGroup {
    groups
        .iter()
        .map(|(key, items)| (key.clone(), sample_group(items)))
        .collect()
}

fn spread_indices(len: usize) -> Vec<usize> {
    match len {
        0 => Vec::new(),
        1..=MAX_SAMPLE => (0..len).collect(),
        6..=10 => {
            // Evenly spaced over [0, len - 1], rounding to nearest
            let last = len - 1;
            (0..MAX_SAMPLE)
                .map(|i| (i * last + (MAX_SAMPLE - 1) / 2) / (MAX_SAMPLE - 1))
                .collect()
        }
        _ => vec![0, 1, len / 2, len - 2, len - 1],
    }
}
