use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{GenerateInput, Provider, TextGenerator};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_anthropic_api_key()?.to_string();
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let max_tokens = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_MAX_TOKENS);

        let timeout_secs = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
            max_tokens,
        })
    }

    async fn create_message(&self, req: CreateMessageRequest) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(&req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            let raw_response_json = serde_json::from_str::<Value>(&text).ok();
            return Err(LlmDiagnosticsError {
                provider: Provider::Anthropic,
                stage: "http",
                detail: format!("status={status}"),
                raw_output: Some(text),
                raw_response_json,
            }
            .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text)
            .with_context(|| format!("failed to decode Anthropic response: {text}"))
    }

    fn request(&self, input: &GenerateInput) -> CreateMessageRequest {
        CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: input.system.clone(),
            messages: vec![Message {
                role: "user",
                content: input.user.clone(),
            }],
        }
    }

    /// Text blocks joined by newlines; otherwise the first tool input as a
    /// structured answer.
    fn response_value(res: &CreateMessageResponse) -> Option<Value> {
        let mut out = String::new();
        let mut structured = None;
        for block in &res.content {
            match block {
                ContentBlock::Text { text } => {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(text);
                }
                ContentBlock::ToolUse { input, .. } => {
                    if structured.is_none() && !input.is_null() {
                        structured = Some(input.clone());
                    }
                }
                ContentBlock::Thinking { .. }
                | ContentBlock::RedactedThinking { .. }
                | ContentBlock::Unknown => {}
            }
        }

        if !out.trim().is_empty() {
            Some(Value::String(out.trim().to_string()))
        } else {
            structured
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate_text(&self, input: &GenerateInput) -> anyhow::Result<Value> {
        let res = self.create_message(self.request(input)).await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(
                max_tokens = self.max_tokens,
                "Anthropic stop_reason=max_tokens; narrative may be truncated"
            );
        }

        Self::response_value(&res).ok_or_else(|| {
            LlmDiagnosticsError::new(Provider::Anthropic, "empty_response", "no text content")
                .into()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: Value,
    },

    #[serde(rename = "thinking")]
    Thinking {
        #[serde(default)]
        thinking: String,
    },

    #[serde(rename = "redacted_thinking")]
    RedactedThinking {
        #[serde(default)]
        data: String,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(v: Value) -> CreateMessageResponse {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn joins_text_blocks_and_skips_thinking() {
        let res = decode(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "Beta is high."},
                {"type": "text", "text": "Diversify.\n"},
            ],
            "stop_reason": "end_turn"
        }));

        assert_eq!(
            AnthropicClient::response_value(&res),
            Some(json!("Beta is high.\nDiversify."))
        );
    }

    #[test]
    fn falls_back_to_structured_tool_input() {
        let res = decode(json!({
            "content": [
                {"type": "tool_use", "id": "toolu_1", "name": "explain", "input": {"risks": ["debt"]}},
                {"type": "server_tool_use"},
            ]
        }));

        assert_eq!(
            AnthropicClient::response_value(&res),
            Some(json!({"risks": ["debt"]}))
        );
    }

    #[test]
    fn empty_content_yields_nothing() {
        let res = decode(json!({"content": [{"type": "text", "text": "  "}]}));
        assert_eq!(AnthropicClient::response_value(&res), None);
    }

    #[test]
    fn request_carries_system_prompt_and_single_user_turn() {
        let client = AnthropicClient::from_settings(&Settings {
            anthropic_api_key: Some("a".to_string()),
            ..Default::default()
        })
        .unwrap();

        let req = client.request(&GenerateInput {
            system: Some("sys".to_string()),
            user: "hello".to_string(),
        });
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["system"], json!("sys"));
        assert_eq!(v["messages"], json!([{"role": "user", "content": "hello"}]));
    }
}
