//! The HTTP completion client.
//!
//! One `reqwest` client covers all three provider styles; the style tag
//! decides the URL path, the auth header, the request body shape and where
//! the reply text lives in the response. A single attempt is made per call,
//! bounded by the configured timeout.

use async_trait::async_trait;
use tracing::{debug, error};

use askbot_core::config::{ProviderConfig, ProviderStyle};
use askbot_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, YandexCompletionOptions,
    YandexCompletionRequest, YandexCompletionResponse, YandexMessage,
};

use crate::error::{mask_key, truncate_body, CompletionError};
use crate::traits::CompletionProvider;

/// System prompt prepended for the chat-completions styles.
const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions.";

/// HTTP client for one configured upstream provider.
pub struct CompletionClient {
    /// HTTP client (shared, connection-pooled, request timeout applied).
    http: reqwest::Client,
    config: ProviderConfig,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("style", &self.config.style)
            .field("api_base", &self.config.api_base())
            .field("model", &self.config.model)
            .finish()
    }
}

impl CompletionClient {
    /// Create a client for the configured provider.
    pub fn new(config: ProviderConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        CompletionClient { http, config }
    }

    /// Full completion endpoint URL for the configured style.
    fn completion_url(&self) -> String {
        let base = self.config.api_base().trim_end_matches('/');
        match self.config.style {
            ProviderStyle::OpenAi | ProviderStyle::DeepSeek => {
                format!("{base}/chat/completions")
            }
            ProviderStyle::Yandex => format!("{base}/foundationModels/v1/completion"),
        }
    }

    /// Provider-specific key format check, performed before any request.
    fn check_credential(&self) -> Result<(), CompletionError> {
        let needs_sk_prefix = matches!(
            self.config.style,
            ProviderStyle::OpenAi | ProviderStyle::DeepSeek
        );
        if needs_sk_prefix && !self.config.api_key.starts_with("sk-") {
            error!(
                provider = %self.config.style,
                key = %mask_key(&self.config.api_key),
                "API key does not look like a secret key, refusing to send it"
            );
            return Err(CompletionError::BadCredential);
        }
        Ok(())
    }

    /// Build the style-specific request.
    fn build_request(&self, prompt: &str) -> reqwest::RequestBuilder {
        let url = self.completion_url();
        let config = &self.config;

        match config.style {
            ProviderStyle::OpenAi | ProviderStyle::DeepSeek => {
                let body = ChatCompletionRequest {
                    model: config.model.clone(),
                    messages: vec![
                        ChatMessage::system(SYSTEM_PROMPT),
                        ChatMessage::user(prompt),
                    ],
                    max_tokens: config.max_tokens,
                    temperature: config.temperature,
                    stream: match config.style {
                        ProviderStyle::DeepSeek => Some(false),
                        _ => None,
                    },
                };
                self.http
                    .post(url)
                    .bearer_auth(&config.api_key)
                    .json(&body)
            }
            ProviderStyle::Yandex => {
                // folder_id presence is enforced at config load.
                let folder = config.folder_id.as_deref().unwrap_or("");
                let body = YandexCompletionRequest {
                    model_uri: format!("gpt://{folder}/{}", config.model),
                    completion_options: YandexCompletionOptions {
                        stream: false,
                        temperature: config.temperature,
                        max_tokens: config.max_tokens,
                    },
                    messages: vec![YandexMessage::user(prompt)],
                };
                self.http
                    .post(url)
                    .header("Authorization", format!("Api-Key {}", config.api_key))
                    .json(&body)
            }
        }
    }

    /// Pull the reply text out of a 200 response body.
    async fn extract_text(&self, response: reqwest::Response) -> Result<String, CompletionError> {
        let provider = self.config.style;
        let text = match provider {
            ProviderStyle::OpenAi | ProviderStyle::DeepSeek => response
                .json::<ChatCompletionResponse>()
                .await
                .map_err(|e| {
                    error!(provider = %provider, error = %e, "failed to parse completion response");
                    CompletionError::MalformedBody
                })?
                .into_text(),
            ProviderStyle::Yandex => response
                .json::<YandexCompletionResponse>()
                .await
                .map_err(|e| {
                    error!(provider = %provider, error = %e, "failed to parse completion response");
                    CompletionError::MalformedBody
                })?
                .into_text(),
        };

        text.ok_or_else(|| {
            error!(provider = %provider, "completion response has no message text");
            CompletionError::MalformedBody
        })
    }
}

#[async_trait]
impl CompletionProvider for CompletionClient {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.check_credential()?;

        debug!(
            provider = %self.config.style,
            model = %self.config.model,
            prompt_chars = prompt.chars().count(),
            "requesting completion"
        );

        let response = self.build_request(prompt).send().await.map_err(|e| {
            error!(provider = %self.config.style, error = %e, "completion request failed");
            CompletionError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            let body = truncate_body(&body);
            error!(
                provider = %self.config.style,
                status = %status,
                body = %body,
                "completion API error"
            );
            return Err(CompletionError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let text = self.extract_text(response).await?;
        debug!(
            provider = %self.config.style,
            reply_chars = text.chars().count(),
            "completion received"
        );
        Ok(text)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn make_config(style: ProviderStyle, api_key: &str, api_base: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            style,
            api_key: api_key.to_string(),
            api_base: api_base.map(String::from),
            model: style.default_model().to_string(),
            max_tokens: 500,
            temperature: 0.7,
            timeout: Duration::from_secs(5),
            folder_id: match style {
                ProviderStyle::Yandex => Some("b1gfolder".to_string()),
                _ => None,
            },
        }
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-test",
            "choices": [{
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        })
    }

    // ── Unit tests ──

    #[test]
    fn completion_url_per_style() {
        let openai = CompletionClient::new(make_config(ProviderStyle::OpenAi, "sk-k", None));
        assert_eq!(
            openai.completion_url(),
            "https://api.openai.com/v1/chat/completions"
        );

        let deepseek = CompletionClient::new(make_config(ProviderStyle::DeepSeek, "sk-k", None));
        assert_eq!(
            deepseek.completion_url(),
            "https://api.deepseek.com/chat/completions"
        );

        let yandex = CompletionClient::new(make_config(ProviderStyle::Yandex, "yc-k", None));
        assert_eq!(
            yandex.completion_url(),
            "https://llm.api.cloud.yandex.net/foundationModels/v1/completion"
        );
    }

    #[test]
    fn completion_url_trims_trailing_slash() {
        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-k",
            Some("https://proxy.example.com/v1/"),
        ));
        assert_eq!(
            client.completion_url(),
            "https://proxy.example.com/v1/chat/completions"
        );
    }

    // ── Integration tests with mock server ──

    #[tokio::test]
    async fn openai_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-test-123"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 500
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("Hello there!")))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-test-123",
            Some(&server.uri()),
        ));

        let reply = client.complete("Hello").await.unwrap();
        assert_eq!(reply, "Hello there!");
    }

    #[tokio::test]
    async fn deepseek_sends_stream_false() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer sk-ds-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "deepseek-chat",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("ok")))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::DeepSeek,
            "sk-ds-key",
            Some(&server.uri()),
        ));

        // Body matcher failure would surface as a 404 → Status error.
        let reply = client.complete("test").await.unwrap();
        assert_eq!(reply, "ok");
    }

    #[tokio::test]
    async fn yandex_request_shape_and_extraction() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/foundationModels/v1/completion"))
            .and(header("Authorization", "Api-Key yc-secret"))
            .and(body_partial_json(serde_json::json!({
                "modelUri": "gpt://b1gfolder/yandexgpt-lite",
                "completionOptions": { "stream": false, "maxTokens": 500 },
                "messages": [{ "role": "user", "text": "вопрос" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {
                    "alternatives": [{
                        "message": { "role": "assistant", "text": "ответ" },
                        "status": "ALTERNATIVE_STATUS_FINAL"
                    }]
                }
            })))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::Yandex,
            "yc-secret",
            Some(&server.uri()),
        ));

        let reply = client.complete("вопрос").await.unwrap();
        assert_eq!(reply, "ответ");
    }

    #[tokio::test]
    async fn empty_content_is_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("")))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-test",
            Some(&server.uri()),
        ));

        assert_eq!(client.complete("hi").await.unwrap(), "");
    }

    #[tokio::test]
    async fn non_200_maps_to_status_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-test",
            Some(&server.uri()),
        ));

        let err = client.complete("hi").await.unwrap_err();
        match &err {
            CompletionError::Status { code, body } => {
                assert_eq!(*code, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("expected Status, got {other:?}"),
        }
        assert!(!err.is_auth());
    }

    #[tokio::test]
    async fn rate_limit_classifies_as_auth() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit exceeded", "type": "rate_limit_error" }
            })))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-test",
            Some(&server.uri()),
        ));

        let err = client.complete("hi").await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn missing_fields_map_to_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "unexpected": true
            })))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-test",
            Some(&server.uri()),
        ));

        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedBody));
    }

    #[tokio::test]
    async fn empty_choices_map_to_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-test",
            Some(&server.uri()),
        ));

        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::MalformedBody));
    }

    #[tokio::test]
    async fn connection_failure_maps_to_transport() {
        // Point to a port that's not listening
        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "sk-test",
            Some("http://127.0.0.1:1"),
        ));

        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::Transport(_)));
        assert!(!err.is_auth());
    }

    #[tokio::test]
    async fn bad_key_prefix_sends_nothing() {
        let server = MockServer::start().await;

        // Any request reaching the server would fail the test.
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply("nope")))
            .expect(0)
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::OpenAi,
            "not-a-secret-key",
            Some(&server.uri()),
        ));

        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, CompletionError::BadCredential));
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn yandex_keys_have_no_prefix_check() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/foundationModels/v1/completion"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "alternatives": [{ "message": { "role": "assistant", "text": "да" } }] }
            })))
            .mount(&server)
            .await;

        let client = CompletionClient::new(make_config(
            ProviderStyle::Yandex,
            "AQVNxxxxxxxx",
            Some(&server.uri()),
        ));

        assert_eq!(client.complete("hi").await.unwrap(), "да");
    }
}
