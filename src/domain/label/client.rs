//! OpenAI-compatible chat-completions client (C6)
//!
//! Targets any server that speaks the `/v1/chat/completions` and
//! `/v1/models` surface (Ollama, vLLM, LiteLLM proxies, OpenAI itself).
//! The bearer token, if any, is read from an environment variable rather
//! than the config file — `LlmConfig` has no `api_key` field on purpose,
//! since the config file is meant to be safe to commit.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::core::config::{LlmConfig, TaxonomyConfig};
use crate::core::constants::{DOC_TYPE_OTHER, ENV_LLM_API_KEY, LLM_MAX_TOKENS, LLM_TEMPERATURE};

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not find a JSON object in the model's response")]
    NoJsonFound,

    #[error("response JSON did not match the expected label shape: {0}")]
    Malformed(String),

    #[error("model '{0}' is not listed in the endpoint's /v1/models response")]
    ModelNotAvailable(String),
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

/// A label as parsed from the model's response, before the engine
/// decides whether to escalate.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelResponse {
    pub doc_type: String,
    pub title: Option<String>,
    pub canonical_filename: Option<String>,
    pub suggested_tags: Vec<String>,
    pub target_group_path: Option<String>,
    pub date: Option<String>,
    pub issuer: Option<String>,
    pub confidence: f64,
    pub explanation: Option<String>,
}

pub struct LlmClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
    default_model: String,
    escalation_model: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: std::env::var(ENV_LLM_API_KEY).ok(),
            max_retries: config.max_retries.max(1),
            default_model: config.default_model.clone(),
            escalation_model: config.escalation_model.clone(),
        })
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    /// Probe `/v1/models` at startup to fail fast if the endpoint is
    /// unreachable, or if the configured default/escalation model
    /// identifiers aren't actually served, rather than discovering either
    /// partway through a long labeling run.
    pub async fn probe(&self) -> Result<(), LlmError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self.authed(self.http.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(LlmError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await.unwrap_or_default();
        let models: ModelsResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::Malformed(format!("/v1/models response: {e}")))?;

        for required in [&self.default_model, &self.escalation_model] {
            if !models.data.iter().any(|m| &m.id == required) {
                return Err(LlmError::ModelNotAvailable(required.clone()));
            }
        }

        Ok(())
    }

    /// Run a chat-completion call with the fixed labeling sampling
    /// parameters, retrying up to `max_retries` times with no backoff
    /// between attempts (a hung local model benefits more from retrying
    /// immediately than from waiting).
    pub async fn complete(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt.to_string(),
                },
            ],
            temperature: LLM_TEMPERATURE,
            max_tokens: LLM_MAX_TOKENS,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.try_complete(&url, &request).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "labeling request attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.expect("max_retries is at least 1, loop runs at least once"))
    }

    async fn try_complete(&self, url: &str, request: &ChatRequest<'_>) -> Result<String, LlmError> {
        let response = self.authed(self.http.post(url)).json(request).send().await?;

        if !response.status().is_success() {
            return Err(LlmError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Malformed("no choices in response".to_string()))
    }
}

/// Extract the JSON object embedded in a model's response, tolerating
/// markdown code fences and leading/trailing prose some models add
/// despite being told not to.
fn extract_json_object(raw: &str) -> Result<Value, LlmError> {
    let trimmed = raw.trim();
    let fenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|s| s.trim())
        .unwrap_or(trimmed);
    let fenced = fenced.strip_suffix("```").unwrap_or(fenced).trim();

    let candidate = if fenced.starts_with('{') {
        fenced.to_string()
    } else {
        let start = fenced.find('{').ok_or(LlmError::NoJsonFound)?;
        let end = fenced.rfind('}').ok_or(LlmError::NoJsonFound)?;
        if end < start {
            return Err(LlmError::NoJsonFound);
        }
        fenced[start..=end].to_string()
    };

    serde_json::from_str(&candidate).map_err(|e| LlmError::Malformed(e.to_string()))
}

/// Parse a model's raw response into a `LabelResponse`, substituting
/// `DOC_TYPE_OTHER` and prefixing the explanation when `doc_type` falls
/// outside the configured vocabulary.
pub fn parse_label_response(
    raw: &str,
    taxonomy: &TaxonomyConfig,
) -> Result<LabelResponse, LlmError> {
    let value = extract_json_object(raw)?;
    let obj = value
        .as_object()
        .ok_or_else(|| LlmError::Malformed("top-level value is not an object".to_string()))?;

    let doc_type_raw = obj
        .get("doc_type")
        .and_then(Value::as_str)
        .ok_or_else(|| LlmError::Malformed("missing doc_type".to_string()))?
        .to_string();

    let confidence = obj.get("confidence").and_then(Value::as_f64).unwrap_or(0.0);

    let mut explanation = obj
        .get("explanation")
        .and_then(Value::as_str)
        .map(str::to_string);

    let doc_type = if taxonomy.doc_types.iter().any(|d| d == &doc_type_raw) {
        doc_type_raw
    } else {
        let prefix = crate::core::constants::AUTO_CORRECT_EXPLANATION_PREFIX
            .replace("{original}", &doc_type_raw);
        explanation = Some(format!("{prefix}{}", explanation.unwrap_or_default()));
        DOC_TYPE_OTHER.to_string()
    };

    let suggested_tags = obj
        .get("suggested_tags")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(LabelResponse {
        doc_type,
        title: obj.get("title").and_then(Value::as_str).map(str::to_string),
        canonical_filename: obj
            .get("canonical_filename")
            .and_then(Value::as_str)
            .map(str::to_string),
        suggested_tags,
        target_group_path: obj
            .get("target_group_path")
            .and_then(Value::as_str)
            .map(str::to_string),
        date: obj.get("date").and_then(Value::as_str).map(str::to_string),
        issuer: obj.get("issuer").and_then(Value::as_str).map(str::to_string),
        confidence,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> TaxonomyConfig {
        TaxonomyConfig {
            top_level: vec!["Financial".to_string()],
            doc_types: vec!["invoice".to_string(), "other".to_string()],
            tags: vec![],
            family_members: vec![],
        }
    }

    #[test]
    fn test_extract_json_object_plain() {
        let raw = r#"{"doc_type": "invoice", "confidence": 0.9}"#;
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["doc_type"], "invoice");
    }

    #[test]
    fn test_extract_json_object_markdown_fenced() {
        let raw = "```json\n{\"doc_type\": \"invoice\"}\n```";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["doc_type"], "invoice");
    }

    #[test]
    fn test_extract_json_object_with_surrounding_prose() {
        let raw = "Here is the classification:\n{\"doc_type\": \"invoice\"}\nHope that helps!";
        let value = extract_json_object(raw).unwrap();
        assert_eq!(value["doc_type"], "invoice");
    }

    #[test]
    fn test_parse_label_response_known_doc_type() {
        let raw = r#"{"doc_type": "invoice", "confidence": 0.85, "suggested_tags": ["important"]}"#;
        let label = parse_label_response(raw, &taxonomy()).unwrap();
        assert_eq!(label.doc_type, "invoice");
        assert_eq!(label.confidence, 0.85);
        assert_eq!(label.suggested_tags, vec!["important".to_string()]);
    }

    #[test]
    fn test_parse_label_response_out_of_vocabulary_auto_corrects() {
        let raw = r#"{"doc_type": "spreadsheet", "confidence": 0.4}"#;
        let label = parse_label_response(raw, &taxonomy()).unwrap();
        assert_eq!(label.doc_type, "other");
        assert!(label.explanation.unwrap().contains("spreadsheet"));
    }

    #[test]
    fn test_parse_label_response_missing_doc_type_errors() {
        let raw = r#"{"confidence": 0.5}"#;
        assert!(parse_label_response(raw, &taxonomy()).is_err());
    }

    async fn spawn_mock_llm() -> String {
        use axum::Json;
        use axum::routing::{get, post};
        use serde_json::json;

        let app = axum::Router::new()
            .route(
                "/v1/models",
                get(|| async { Json(json!({"data": [{"id": "test-model"}]})) }),
            )
            .route(
                "/v1/chat/completions",
                post(|| async {
                    Json(json!({
                        "choices": [{"message": {"content": "{\"doc_type\": \"invoice\", \"confidence\": 0.9}"}}]
                    }))
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn llm_config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            default_model: "test-model".to_string(),
            escalation_model: "test-model".to_string(),
            escalation_threshold: 0.7,
            escalation_doc_types: vec![],
            timeout_secs: 5,
            max_retries: 1,
        }
    }

    #[tokio::test]
    async fn test_probe_succeeds_against_mock_server() {
        let base_url = spawn_mock_llm().await;
        let client = LlmClient::new(&llm_config(base_url)).unwrap();
        assert!(client.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_probe_fails_when_escalation_model_missing() {
        let base_url = spawn_mock_llm().await;
        let mut config = llm_config(base_url);
        config.escalation_model = "stronger-model".to_string();
        let client = LlmClient::new(&config).unwrap();

        let err = client.probe().await.unwrap_err();
        assert!(matches!(err, LlmError::ModelNotAvailable(m) if m == "stronger-model"));
    }

    #[tokio::test]
    async fn test_complete_round_trips_through_mock_server() {
        let base_url = spawn_mock_llm().await;
        let client = LlmClient::new(&llm_config(base_url)).unwrap();
        let content = client
            .complete("test-model", "system", "user")
            .await
            .unwrap();
        let label = parse_label_response(&content, &taxonomy()).unwrap();
        assert_eq!(label.doc_type, "invoice");
    }
}
