//! OpenAI-compatible chat completions provider
//!
//! Text prompts go out as a single user message. Vision prompts go out as one
//! user message whose content is the prompt followed by each image as a
//! `data:image/jpeg;base64,...` part, in order.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::{
    error::{AppError, AppResult},
    services::providers::ModelClient,
};

#[derive(Clone)]
pub struct OpenAiClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    text_model: String,
    vision_model: String,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        api_url: String,
        text_model: String,
        vision_model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            text_model,
            vision_model,
            max_tokens,
        })
    }

    fn text_request(&self, prompt: &str) -> Value {
        json!({
            "model": self.text_model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": self.max_tokens
        })
    }

    fn vision_request(&self, prompt: &str, images: &[Vec<u8>]) -> Value {
        let mut content = vec![json!({"type": "text", "text": prompt})];
        for image in images {
            content.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:image/jpeg;base64,{}", STANDARD.encode(image))
                }
            }));
        }

        json!({
            "model": self.vision_model,
            "messages": [
                {"role": "user", "content": content}
            ],
            "max_tokens": self.max_tokens
        })
    }

    async fn complete(&self, request: Value) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ModelUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ModelUnavailable(format!(
                "OpenAI API returned status {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|e| AppError::ModelUnavailable(format!("Invalid completion body: {}", e)))?;

        let content = extract_content(completion)?;
        tracing::debug!(response = %content, provider = "openai", "Raw model response");

        Ok(content)
    }
}

fn extract_content(completion: ChatCompletion) -> AppResult<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| AppError::ModelUnavailable("Completion has no message content".to_string()))
}

#[async_trait::async_trait]
impl ModelClient for OpenAiClient {
    async fn text_complete(&self, prompt: &str) -> AppResult<String> {
        self.complete(self.text_request(prompt)).await
    }

    async fn vision_complete(&self, prompt: &str, images: &[Vec<u8>]) -> AppResult<String> {
        tracing::debug!(
            images = images.len(),
            model = %self.vision_model,
            "Sending vision completion"
        );
        self.complete(self.vision_request(prompt, images)).await
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_client() -> OpenAiClient {
        OpenAiClient::new(
            "sk-test".to_string(),
            "http://test.local/v1/".to_string(),
            "gpt-4o-mini".to_string(),
            "gpt-4o".to_string(),
            300,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_api_url_trailing_slash_trimmed() {
        assert_eq!(create_test_client().api_url, "http://test.local/v1");
    }

    #[test]
    fn test_text_request_shape() {
        let request = create_test_client().text_request("hello");
        assert_eq!(request["model"], "gpt-4o-mini");
        assert_eq!(request["messages"][0]["content"], "hello");
        assert_eq!(request["max_tokens"], 300);
    }

    #[test]
    fn test_vision_request_orders_images_after_prompt() {
        let request = create_test_client().vision_request("pick", &[vec![1, 2], vec![3]]);
        let content = request["messages"][0]["content"].as_array().unwrap();

        assert_eq!(request["model"], "gpt-4o");
        assert_eq!(content.len(), 3);
        assert_eq!(content[0]["text"], "pick");
        assert_eq!(
            content[1]["image_url"]["url"],
            format!("data:image/jpeg;base64,{}", STANDARD.encode([1u8, 2]))
        );
        assert_eq!(
            content[2]["image_url"]["url"],
            format!("data:image/jpeg;base64,{}", STANDARD.encode([3u8]))
        );
    }

    #[test]
    fn test_completion_deserialization() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "2"}}]
        }"#;
        let completion: ChatCompletion = serde_json::from_str(json).unwrap();
        assert_eq!(extract_content(completion).unwrap(), "2");
    }

    #[test]
    fn test_completion_without_content_is_unavailable() {
        let json = r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#;
        let completion: ChatCompletion = serde_json::from_str(json).unwrap();
        assert!(matches!(
            extract_content(completion),
            Err(AppError::ModelUnavailable(_))
        ));
    }

    #[test]
    fn test_completion_without_choices_is_unavailable() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            extract_content(completion),
            Err(AppError::ModelUnavailable(_))
        ));
    }
}
