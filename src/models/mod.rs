pub mod catalog_item;
pub mod category;
pub mod query;

pub use catalog_item::{CandidateGroup, CatalogItem, SampledGroup};
pub use category::CategoryTag;
pub use query::{GarmentQuery, QuerySource, SearchMode};
