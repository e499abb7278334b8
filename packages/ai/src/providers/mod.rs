//! Vision provider abstraction and implementations.
//!
//! Supports `OpenAI` (and `OpenAI`-compatible servers) and Anthropic Claude
//! via a common trait.

pub mod anthropic;
pub mod openai;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::AiError;

/// Default `OpenAI` model for label reading.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Default Anthropic model for label reading.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Trait for vision-language providers.
#[async_trait::async_trait]
pub trait VisionProvider: Send + Sync {
    /// Short provider name for logging (e.g. `"openai"`).
    fn name(&self) -> &str;

    /// Sends one PNG image with an instruction and returns the model's
    /// raw text answer.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider returns no
    /// text.
    async fn read_label(
        &self,
        image_png: &[u8],
        instruction: &str,
        max_tokens: u32,
    ) -> Result<String, AiError>;
}

/// Base64 payload for an image.
#[must_use]
pub fn encode_png(image_png: &[u8]) -> String {
    STANDARD.encode(image_png)
}

/// `data:` URL for a PNG image.
#[must_use]
pub fn png_data_url(image_png: &[u8]) -> String {
    format!("data:image/png;base64,{}", encode_png(image_png))
}

/// Creates a vision provider based on environment variables.
///
/// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
/// auto-detects from available credentials (see [`detect_provider`]).
/// `AI_MODEL` overrides the provider's default model and `AI_BASE_URL`
/// points the `OpenAI` provider at a compatible server.
///
/// Returns `Ok(None)` when no provider is requested and no credentials
/// are present, so callers can skip refinement entirely.
///
/// # Errors
///
/// Returns [`AiError::Config`] if the explicitly requested provider is
/// unknown or missing its API key.
pub fn create_provider_from_env() -> Result<Option<Box<dyn VisionProvider>>, AiError> {
    create_provider_with(|key| std::env::var(key).ok())
}

/// [`create_provider_from_env`] over an arbitrary variable lookup.
///
/// # Errors
///
/// See [`create_provider_from_env`].
pub fn create_provider_with(
    var: impl Fn(&str) -> Option<String>,
) -> Result<Option<Box<dyn VisionProvider>>, AiError> {
    let Some(provider) = var("AI_PROVIDER").or_else(|| detect_provider(&var).map(str::to_string))
    else {
        log::info!("No vision provider credentials found; refinement disabled");
        return Ok(None);
    };
    let model = var("AI_MODEL");

    match provider.to_lowercase().as_str() {
        "openai" | "gpt" => {
            let base_url = var("AI_BASE_URL");
            let api_key = match var("OPENAI_API_KEY") {
                Some(key) => key,
                // Local OpenAI-compatible servers usually take no key.
                None if base_url.is_some() => String::new(),
                None => {
                    return Err(AiError::Config {
                        message: "OPENAI_API_KEY environment variable not set".to_string(),
                    });
                }
            };
            let model = model.unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string());
            let mut provider = openai::OpenAiProvider::new(api_key, model);
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url);
            }
            Ok(Some(Box::new(provider)))
        }
        "anthropic" | "claude" => {
            let api_key = var("ANTHROPIC_API_KEY").ok_or_else(|| AiError::Config {
                message: "ANTHROPIC_API_KEY environment variable not set".to_string(),
            })?;
            let model = model.unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string());
            Ok(Some(Box::new(anthropic::AnthropicProvider::new(
                api_key, model,
            ))))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'openai' or 'anthropic'."),
        }),
    }
}

/// Auto-detects which provider to use based on available credentials.
///
/// Checks `OPENAI_API_KEY`, then `AI_BASE_URL`, then `ANTHROPIC_API_KEY`.
/// Returns a provider name that matches the arms in
/// [`create_provider_from_env`], or `None` if nothing is configured.
pub fn detect_provider(var: impl Fn(&str) -> Option<String>) -> Option<&'static str> {
    if var("OPENAI_API_KEY").is_some() {
        log::info!("Auto-detected vision provider: OpenAI (OPENAI_API_KEY found)");
        return Some("openai");
    }

    if var("AI_BASE_URL").is_some() {
        log::info!("Auto-detected vision provider: OpenAI-compatible (AI_BASE_URL found)");
        return Some("openai");
    }

    if var("ANTHROPIC_API_KEY").is_some() {
        log::info!("Auto-detected vision provider: Anthropic (ANTHROPIC_API_KEY found)");
        return Some("anthropic");
    }

    None
}
