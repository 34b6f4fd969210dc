use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiConfig;
use crate::error::BotError;
use crate::media::DecodedImage;

/// Text generation backend used by the webhook handler.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Single-turn generation from a text prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String, BotError>;

    /// Generation grounded on an image plus a text prompt.
    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &DecodedImage,
    ) -> Result<String, BotError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 of the raw file bytes.
    pub data: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: &'a [Content],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

pub struct GeminiClient {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Start an empty conversation. Sessions are never shared between updates.
    pub fn start_chat(&self) -> ChatSession<'_> {
        ChatSession {
            client: self,
            history: Vec::new(),
        }
    }

    async fn generate(&self, contents: &[Content]) -> Result<String, BotError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        debug!("Sending request to Gemini: {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&GenerateRequest { contents })
            .send()
            .await
            .map_err(|e| BotError::transport("gemini", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BotError::Backend(format!(
                "Gemini API error ({}): {}",
                status, error_body
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| BotError::transport("gemini", e))?;
        let parsed: GenerateResponse = serde_json::from_slice(&body)
            .map_err(|e| BotError::Backend(format!("Failed to parse Gemini response: {}", e)))?;

        extract_text(parsed)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, BotError> {
        self.start_chat().send_message(prompt).await
    }

    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &DecodedImage,
    ) -> Result<String, BotError> {
        let contents = [Content::user(vec![
            Part::text(prompt),
            Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: image.mime_type().to_string(),
                    data: STANDARD.encode(&image.bytes),
                }),
            },
        ])];
        self.generate(&contents).await
    }
}

/// A multi-turn conversation with Gemini.
pub struct ChatSession<'a> {
    client: &'a GeminiClient,
    history: Vec<Content>,
}

impl ChatSession<'_> {
    pub async fn send_message(&mut self, text: &str) -> Result<String, BotError> {
        self.history.push(Content::user(vec![Part::text(text)]));
        let reply = self.client.generate(&self.history).await?;
        self.history.push(Content {
            role: "model".to_string(),
            parts: vec![Part::text(&reply)],
        });
        Ok(reply)
    }
}

fn extract_text(response: GenerateResponse) -> Result<String, BotError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(BotError::Backend(format!(
            "Gemini returned no content ({})",
            reason
        )));
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty response".to_string());
        return Err(BotError::Backend(format!(
            "Gemini returned no text ({})",
            reason
        )));
    }

    Ok(text)
}
