//! `OpenAI` vision provider implementation.
//!
//! Also serves any `OpenAI`-compatible chat completions server (Ollama,
//! vLLM, llama.cpp, LM Studio) through [`OpenAiProvider::with_base_url`].

use serde::{Deserialize, Serialize};

use super::{VisionProvider, png_data_url};
use crate::{AiError, error_for_status};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// `OpenAI` API provider.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    /// Creates a new `OpenAI` provider.
    #[must_use]
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Points the provider at an `OpenAI`-compatible server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAiMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct OpenAiMessage<'a> {
    role: &'a str,
    content: Vec<OpenAiContentPart>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAiContentPart {
    Text { text: String },
    ImageUrl { image_url: OpenAiImageUrl },
}

#[derive(Serialize)]
struct OpenAiImageUrl {
    url: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorDetail,
}

#[derive(Deserialize)]
struct OpenAiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

fn build_request<'a>(
    model: &'a str,
    image_png: &[u8],
    instruction: &str,
    max_tokens: u32,
) -> OpenAiRequest<'a> {
    OpenAiRequest {
        model,
        messages: vec![OpenAiMessage {
            role: "user",
            content: vec![
                OpenAiContentPart::Text {
                    text: instruction.to_string(),
                },
                OpenAiContentPart::ImageUrl {
                    image_url: OpenAiImageUrl {
                        url: png_data_url(image_png),
                    },
                },
            ],
        }],
        max_tokens,
        temperature: 0.0,
    }
}

#[async_trait::async_trait]
impl VisionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn read_label(
        &self,
        image_png: &[u8],
        instruction: &str,
        max_tokens: u32,
    ) -> Result<String, AiError> {
        let request = build_request(&self.model, image_png, instruction, max_tokens);

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Content-Type", "application/json");
        if !self.api_key.is_empty() {
            builder = builder.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let resp = builder.json(&request).send().await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<OpenAiError>(&body).map_or_else(
                |_| format!("HTTP {status}: {body}"),
                |err| match err.error.code {
                    Some(code) => format!("{code}: {}", err.error.message),
                    None => err.error.message,
                },
            );
            return Err(error_for_status(status, message));
        }

        let response: OpenAiResponse = serde_json::from_str(&body)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AiError::Provider {
                message: "No choices in OpenAI response".to_string(),
            })
    }
}
