//! Generation collaborator backed by the Anthropic Messages API.

use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use docqa_core::config::GenerationConfig;
use docqa_core::traits::Generator;
use docqa_core::{Error, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct AnthropicGenerator {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    endpoint: String,
}

impl AnthropicGenerator {
    /// Build a generator from configuration. A missing API key (config or
    /// `ANTHROPIC_API_KEY`) is a configuration error.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.resolve_api_key()?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/v1/messages", config.base_url.trim_end_matches('/'));
        info!(model = %config.model, "initialized Anthropic generator");
        Ok(Self { client, api_key, model: config.model.clone(), max_tokens: config.max_tokens, endpoint })
    }

    pub fn model(&self) -> &str { &self.model }

    pub fn endpoint(&self) -> &str { &self.endpoint }
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CreateMessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Concatenate the `text` blocks of a Messages API response body.
fn extract_text_response(body: &str) -> anyhow::Result<String> {
    let parsed: CreateMessageResponse = serde_json::from_str(body).context("failed to parse Claude response")?;
    let answer: String = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if answer.is_empty() {
        bail!("Claude API returned no text in the response content");
    }
    Ok(answer)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body).map(|wrapper| wrapper.error.message).unwrap_or_else(|_| body.to_string())
}

impl Generator for AnthropicGenerator {
    fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String> {
        let request = CreateMessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: vec![Message { role: "user", content: user_message }],
        };
        debug!(endpoint = %self.endpoint, model = %self.model, "sending Messages API request");
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .context("Claude API request failed")?;
        let status = response.status();
        let body = response.text().context("failed to read Claude response body")?;
        if !status.is_success() {
            bail!("Claude API returned {}: {}", status.as_u16(), error_message(&body));
        }
        extract_text_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GenerationConfig {
        GenerationConfig { api_key: Some("test-key".to_string()), ..GenerationConfig::default() }
    }

    #[test]
    fn endpoint_joins_base_url() {
        let generator = AnthropicGenerator::new(&GenerationConfig { base_url: "http://localhost:8080/".to_string(), ..config() }).expect("generator");
        assert_eq!(generator.endpoint(), "http://localhost:8080/v1/messages");
        assert_eq!(generator.model(), docqa_core::config::DEFAULT_MODEL);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = AnthropicGenerator::new(&GenerationConfig { base_url: "localhost".to_string(), ..config() }).err().expect("error");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn request_serialization() {
        let request = CreateMessageRequest {
            model: "claude-3-5-sonnet-20241022",
            max_tokens: 2048,
            system: "be brief",
            messages: vec![Message { role: "user", content: "Hello" }],
        };
        let json = serde_json::to_value(&request).expect("json");
        assert_eq!(json["system"], "be brief");
        assert_eq!(json["max_tokens"], 2048);
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
    }

    #[test]
    fn text_blocks_are_concatenated() {
        let body = r#"{"content":[{"type":"text","text":"Hello "},{"type":"tool_use","id":"x"},{"type":"text","text":"world"}]}"#;
        assert_eq!(extract_text_response(body).expect("text"), "Hello world");
    }

    #[test]
    fn response_without_text_is_an_error() {
        assert!(extract_text_response(r#"{"content":[]}"#).is_err());
        assert!(extract_text_response("not json").is_err());
    }

    #[test]
    fn api_error_message_is_extracted() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens too large"}}"#;
        assert_eq!(error_message(body), "max_tokens too large");
        assert_eq!(error_message("gateway down"), "gateway down");
    }
}
