//! Anthropic Claude vision provider implementation.

use serde::{Deserialize, Serialize};

use super::{VisionProvider, encode_png};
use crate::{AiError, error_for_status};

/// Anthropic Claude API provider.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl AnthropicProvider {
    /// Creates a new Anthropic provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            client: reqwest::Client::new(),
        }
    }
}

/// Anthropic API request body.
#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: serde_json::Value,
}

/// Anthropic API response body.
#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Anthropic API error response.
#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    message: String,
}

fn build_request<'a>(
    model: &'a str,
    image_png: &[u8],
    instruction: &str,
    max_tokens: u32,
) -> AnthropicRequest<'a> {
    AnthropicRequest {
        model,
        max_tokens,
        messages: vec![AnthropicMessage {
            role: "user",
            content: serde_json::json!([
                {
                    "type": "image",
                    "source": {
                        "type": "base64",
                        "media_type": "image/png",
                        "data": encode_png(image_png),
                    },
                },
                { "type": "text", "text": instruction },
            ]),
        }],
    }
}

#[async_trait::async_trait]
impl VisionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn read_label(
        &self,
        image_png: &[u8],
        instruction: &str,
        max_tokens: u32,
    ) -> Result<String, AiError> {
        let request = build_request(&self.model, image_png, instruction, max_tokens);

        let resp = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<AnthropicError>(&body).map_or_else(
                |_| format!("HTTP {status}: {body}"),
                |err| match err.error.kind {
                    Some(kind) => format!("{kind}: {}", err.error.message),
                    None => err.error.message,
                },
            );
            return Err(error_for_status(status, message));
        }

        let response: AnthropicResponse = serde_json::from_str(&body)?;

        let text = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContentBlock::Text { text } => Some(text),
                AnthropicContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return Err(AiError::Provider {
                message: "No text in Anthropic response".to_string(),
            });
        }

        Ok(text)
    }
}
