pub mod catalog_query;
pub mod images;
pub mod intent;
pub mod matcher;
pub mod providers;
pub mod response_parser;
pub mod sampler;
pub mod visual_validator;

pub use matcher::{MatchPipeline, MatchSettings};
