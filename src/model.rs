use reqwest::Client;
use tracing::{debug, warn};

use crate::config::{ApiKey, Config};
use crate::explain::ExplainError;
use crate::providers;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

/// Sends `messages` to the configured provider and returns every candidate's
/// text in the order the service listed them.
pub async fn complete(
    client: &Client,
    cfg: &Config,
    api_key: &ApiKey,
    messages: &[Message],
) -> Result<Vec<String>, ExplainError> {
    let provider = cfg.model_provider.to_ascii_lowercase();

    match provider.as_str() {
        "groq" => {
            debug!(
                provider = "groq",
                model = %cfg.model,
                message_count = messages.len(),
                "dispatching completion request"
            );
            providers::groq::complete(client, cfg, api_key, messages).await
        }
        other => {
            warn!(provider = %other, "unsupported model provider configured");
            Err(ExplainError::Service(format!(
                "Unsupported MODEL_PROVIDER='{}'. Supported providers: groq.",
                other
            )))
        }
    }
}
