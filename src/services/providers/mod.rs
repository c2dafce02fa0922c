//! Model provider abstraction
//!
//! The pipeline talks to language/vision models only through `ModelClient`;
//! the concrete provider is constructed once at startup and handed down
//! explicitly. Each method is attempted exactly once per pipeline stage.

use crate::error::AppResult;

pub mod openai;

pub use openai::OpenAiClient;

/// Trait for text and vision completion providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ModelClient: Send + Sync {
    /// Plain text completion
    ///
    /// Fails with `AppError::ModelUnavailable` on transport, status or shape errors.
    async fn text_complete(&self, prompt: &str) -> AppResult<String>;

    /// Completion over a prompt plus an ordered sequence of JPEG images
    async fn vision_complete(&self, prompt: &str, images: &[Vec<u8>]) -> AppResult<String>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
