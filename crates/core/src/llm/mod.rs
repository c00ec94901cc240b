pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod prompt;

use crate::config::Settings;
use std::sync::Arc;

/// A role-tagged prompt: optional system instructions plus one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateInput {
    pub system: Option<String>,
    pub user: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "gemini" | "google" => Ok(Self::Gemini),
            other => anyhow::bail!("unknown NARRATIVE_PROVIDER: {other}"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

/// One request, one complete response; no streaming, no retry.
///
/// The result is the service's answer as JSON: a string for plain text, or an
/// object when the service answered with structured output.
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_text(&self, input: &GenerateInput) -> anyhow::Result<serde_json::Value>;
}

/// Builds the client named by `NARRATIVE_PROVIDER` (Gemini when unset).
pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn TextGenerator>> {
    let provider = match settings.narrative_provider.as_deref() {
        Some(s) if !s.trim().is_empty() => Provider::parse(s)?,
        _ => Provider::Gemini,
    };

    Ok(match provider {
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
        Provider::Gemini => Arc::new(gemini::GeminiClient::from_settings(settings)?),
    })
}
