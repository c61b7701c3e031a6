//! Reasoner selection from configuration.

use codewright_config::AppConfig;
use codewright_core::error::ReasoningError;
use codewright_core::reasoning::Reasoner;
use std::sync::Arc;

use crate::openai_compat::OpenAiCompatReasoner;

/// Providers that run locally and need no API key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp", "llama.cpp"];

/// Build the configured default reasoner.
///
/// Per-provider settings in `[providers.<name>]` override the top-level
/// key and model.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Reasoner>, ReasoningError> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());

    let api_key = match api_key {
        Some(key) => key,
        None if KEYLESS_PROVIDERS.contains(&name) => name.to_string(),
        None => {
            return Err(ReasoningError::NotConfigured(format!(
                "No API key for provider '{name}'. Set CODEWRIGHT_API_KEY or run `codewright onboard`."
            )));
        }
    };

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let model = provider_config
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone());

    let reasoner = OpenAiCompatReasoner::new(name, base_url, api_key, model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens);

    Ok(Arc::new(reasoner))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
