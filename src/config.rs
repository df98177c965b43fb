use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::explain::{self, ExplainError};

pub const API_KEY_VAR: &str = "GROQ_API_KEY";

const DEFAULT_MODEL_PROVIDER: &str = "groq";
const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_MODEL_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_SYSTEM_PROMPT: &str = "You are an AI expert in Finance, AI, and Financial Modeling. \
You will generate a structured Wikipedia-style explanation for a given topic, \
starting with simple terms for beginners and progressively increasing in difficulty \
until expert-level knowledge is achieved. \
Use clear, step-by-step explanations with examples.";
const DEFAULT_MODEL_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PDF_OUTPUT_PATH: &str = "finance_ai_knowledge.pdf";

/// Completion-service access token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub model_provider: String,
    pub model: String,
    pub model_base_url: String,
    pub system_prompt: String,
    pub model_timeout_secs: u64,
    pub api_key: Option<ApiKey>,
    pub pdf_output_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_env_with(|key| env::var(key).ok())
    }

    pub(crate) fn from_env_with(mut get_var: impl FnMut(&str) -> Option<String>) -> Self {
        let model_base_url =
            get_var("MODEL_BASE_URL").unwrap_or_else(|| DEFAULT_MODEL_BASE_URL.to_string());
        let model_timeout_secs = parse_model_timeout_secs(get_var("MODEL_TIMEOUT_SECS").as_deref());
        let api_key = parse_api_key(get_var(API_KEY_VAR).as_deref());
        let pdf_output_path = parse_pdf_output_path(get_var("PDF_OUTPUT_PATH").as_deref());

        Self {
            model_provider: get_var("MODEL_PROVIDER")
                .unwrap_or_else(|| DEFAULT_MODEL_PROVIDER.to_string()),
            model: get_var("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            model_base_url,
            system_prompt: get_var("SYSTEM_PROMPT")
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            model_timeout_secs,
            api_key,
            pdf_output_path,
        }
    }

    /// Returns the configured credential, failing when it is missing or cannot
    /// be sent as a bearer token.
    pub fn require_api_key(&self) -> Result<&ApiKey, ExplainError> {
        let key = self.api_key.as_ref().ok_or_else(|| {
            ExplainError::Auth(format!(
                "{API_KEY_VAR} is not set. Export it or add it to a .env file."
            ))
        })?;
        explain::check_credential(key.expose())?;
        Ok(key)
    }
}

fn parse_positive_u64(raw: Option<&str>, default: u64) -> u64 {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn parse_model_timeout_secs(raw: Option<&str>) -> u64 {
    parse_positive_u64(raw, DEFAULT_MODEL_TIMEOUT_SECS)
}

fn parse_api_key(raw: Option<&str>) -> Option<ApiKey> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ApiKey::new)
}

fn parse_pdf_output_path(raw: Option<&str>) -> PathBuf {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PDF_OUTPUT_PATH))
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        model_provider: DEFAULT_MODEL_PROVIDER.to_string(),
        model: DEFAULT_MODEL.to_string(),
        model_base_url: "http://127.0.0.1:9".to_string(),
        system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        model_timeout_secs: 5,
        api_key: Some(ApiKey::new("test-key")),
        pdf_output_path: PathBuf::from(DEFAULT_PDF_OUTPUT_PATH),
    }
}
