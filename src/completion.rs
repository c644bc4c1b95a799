//! Single-turn client for an OpenAI-compatible chat-completion endpoint.
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;

const SERVICE: &str = "completion";

/// Turns a rendered prompt into the model's response text.
#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone)]
pub struct CompletionClient {
    http: Client,
    base_url: Url,
    api_key: String,
    model: String,
    temperature: f32,
}

impl fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub stream: bool,
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl CompletionClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        model: impl Into<String>,
        temperature: f32,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("sms-processor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let normalized = format!("{}/", base_url.trim().trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let c = &cfg.completion;
        Ok(Self::new(
            &c.base_url,
            c.api_key.clone(),
            c.model.clone(),
            c.temperature,
        )?)
    }

    pub fn chat_request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            temperature: self.temperature,
        }
    }

    pub fn build_request(&self, prompt: &str) -> Result<reqwest::Request, ApiError> {
        let endpoint = self
            .base_url
            .join("chat/completions")
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let request = self
            .http
            .post(endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&self.chat_request(prompt))
            .build()?;
        Ok(request)
    }

    pub async fn complete(&self, prompt: &str) -> Result<String, ApiError> {
        let request = self.build_request(prompt)?;
        debug!(url = %request.url(), model = %self.model, "sending completion request");
        let res = self.http.execute(request).await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), %body, "completion request failed");
            return Err(ApiError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }
        let body = res.text().await?;
        first_choice_content(&body)
    }
}

#[async_trait]
impl TextCompleter for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(CompletionClient::complete(self, prompt).await?)
    }
}

/// Text of the first choice, verbatim.
pub fn first_choice_content(body: &str) -> Result<String, ApiError> {
    let payload: ChatResponse = serde_json::from_str(body)?;
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(ApiError::EmptyCompletion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> CompletionClient {
        CompletionClient::new(
            "https://api.groq.com/openai/v1",
            "key",
            "llama-3.3-70b-versatile",
            0.5,
        )
        .unwrap()
    }

    #[test]
    fn build_request_sets_headers_and_body() {
        let request = client().build_request("hallo").unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/openai/v1/chat/completions");
        assert_eq!(
            request
                .headers()
                .get("Authorization")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "Bearer key"
        );

        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        let body: serde_json::Value = serde_json::from_slice(bytes).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "llama-3.3-70b-versatile",
                "messages": [{ "role": "user", "content": "hallo" }],
                "stream": false,
                "temperature": 0.5
            })
        );
    }

    #[test]
    fn first_choice_is_returned_verbatim() {
        let body = json!({
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "  [{\"Dag\": \"Zaterdag\"}]\n" } },
                { "index": 1, "message": { "role": "assistant", "content": "other" } }
            ]
        })
        .to_string();
        assert_eq!(
            first_choice_content(&body).unwrap(),
            "  [{\"Dag\": \"Zaterdag\"}]\n"
        );
    }

    #[test]
    fn missing_content_is_an_error() {
        let no_choices = json!({ "choices": [] }).to_string();
        assert!(matches!(
            first_choice_content(&no_choices),
            Err(ApiError::EmptyCompletion)
        ));

        let null_content =
            json!({ "choices": [{ "message": { "role": "assistant", "content": null } }] })
                .to_string();
        assert!(matches!(
            first_choice_content(&null_content),
            Err(ApiError::EmptyCompletion)
        ));

        assert!(matches!(
            first_choice_content("not json"),
            Err(ApiError::Json(_))
        ));
    }
}
