//! OpenAI-compatible reasoner.
//!
//! Works with OpenRouter, OpenAI, Ollama, vLLM and any endpoint exposing
//! `/chat/completions`. The reply text is returned untouched; parsing it into
//! an instruction is the control loop's job.

use async_trait::async_trait;
use codewright_core::error::ReasoningError;
use codewright_core::reasoning::{Reasoner, ReasoningRequest};
use codewright_core::tool::ToolResult;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::prompt;

pub struct OpenAiCompatReasoner {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiCompatReasoner {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to default HTTP client");
                reqwest::Client::new()
            });

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            max_tokens: None,
            client,
        }
    }

    /// OpenRouter (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    /// OpenAI (convenience constructor).
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    /// Ollama (convenience constructor). No key needed.
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Self {
        Self::new("ollama", base_url.unwrap_or("http://localhost:11434/v1"), "ollama", model)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, system: String, user: String) -> serde_json::Value {
        let messages = vec![
            ApiMessage {
                role: "system".into(),
                content: system,
            },
            ApiMessage {
                role: "user".into(),
                content: user,
            },
        ];

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": self.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    async fn complete(&self, system: String, user: String) -> Result<String, ReasoningError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(system, user);

        debug!(reasoner = %self.name, model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ReasoningError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ReasoningError::RateLimited { retry_after_secs: 5 });
        }

        if status == 401 || status == 403 {
            return Err(ReasoningError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Reasoner returned error");
            return Err(ReasoningError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        extract_content(api_response)
    }
}

fn extract_content(response: ApiResponse) -> Result<String, ReasoningError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ReasoningError::MalformedResponse("No choices in response".into()))?;
    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait]
impl Reasoner for OpenAiCompatReasoner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn propose_initial_plan(&self, request: ReasoningRequest<'_>) -> Result<String, ReasoningError> {
        let system = prompt::system_prompt(&request.perception.environment);
        self.complete(system, prompt::initial_plan_prompt(request)).await
    }

    async fn propose_continuation(
        &self,
        tool_output: &ToolResult,
        request: ReasoningRequest<'_>,
    ) -> Result<String, ReasoningError> {
        let system = prompt::system_prompt(&request.perception.environment);
        self.complete(system, prompt::continuation_prompt(tool_output, request))
            .await
    }
}

// --- API wire types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
