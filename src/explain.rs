//! Completion requester: turns a topic into a structured explanation.

use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, warn};

use crate::config::{ApiKey, Config};
use crate::model::{self, Message};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExplainError {
    /// The topic was empty or whitespace only.
    EmptyTopic,
    /// The credential is missing, malformed, or was rejected by the service.
    Auth(String),
    /// The completion service failed, timed out, or returned nothing usable.
    Service(String),
}

impl fmt::Display for ExplainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTopic => write!(f, "topic must not be empty"),
            Self::Auth(message) => write!(f, "authentication error: {message}"),
            Self::Service(message) => write!(f, "completion service error: {message}"),
        }
    }
}

impl Error for ExplainError {}

/// An explanation owned by the session that requested it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explanation {
    pub topic: String,
    pub text: String,
}

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<String>, ExplainError>> + 'a>>;

pub trait CompletionBackend {
    fn complete<'a>(
        &'a self,
        client: &'a Client,
        cfg: &'a Config,
        api_key: &'a ApiKey,
        messages: &'a [Message],
    ) -> CompletionFuture<'a>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderBackend;

impl CompletionBackend for ProviderBackend {
    fn complete<'a>(
        &'a self,
        client: &'a Client,
        cfg: &'a Config,
        api_key: &'a ApiKey,
        messages: &'a [Message],
    ) -> CompletionFuture<'a> {
        Box::pin(async move { model::complete(client, cfg, api_key, messages).await })
    }
}

pub struct Explainer<'a, B = ProviderBackend> {
    client: &'a Client,
    cfg: &'a Config,
    api_key: ApiKey,
    backend: B,
}

impl<'a> Explainer<'a, ProviderBackend> {
    pub fn new(client: &'a Client, cfg: &'a Config, api_key: ApiKey) -> Self {
        Self {
            client,
            cfg,
            api_key,
            backend: ProviderBackend,
        }
    }
}

impl<'a, B> Explainer<'a, B> {
    pub fn with_backend(client: &'a Client, cfg: &'a Config, api_key: ApiKey, backend: B) -> Self {
        Self {
            client,
            cfg,
            api_key,
            backend,
        }
    }
}

impl<'a, B> Explainer<'a, B>
where
    B: CompletionBackend,
{
    /// Issues exactly one completion request for `topic`. Both the credential
    /// and the topic are validated first, so invalid input never reaches the
    /// network.
    pub async fn explain(&self, topic: &str) -> Result<Explanation, ExplainError> {
        check_credential(self.api_key.expose())?;
        let topic = check_topic(topic)?;
        let messages = build_messages(self.cfg, topic);

        info!(
            model = %self.cfg.model,
            topic_len = topic.len(),
            "requesting explanation"
        );
        let candidates = self
            .backend
            .complete(self.client, self.cfg, &self.api_key, &messages)
            .await?;
        let text = first_candidate(candidates)?;
        debug!(explanation_len = text.len(), "explanation received");

        Ok(Explanation {
            topic: topic.to_string(),
            text,
        })
    }
}

/// One-call form of [`Explainer::explain`] returning only the text.
pub async fn request_explanation(
    client: &Client,
    cfg: &Config,
    topic: &str,
    credential: &str,
) -> Result<String, ExplainError> {
    Explainer::new(client, cfg, ApiKey::new(credential))
        .explain(topic)
        .await
        .map(|explanation| explanation.text)
}

pub fn check_credential(credential: &str) -> Result<(), ExplainError> {
    if credential.trim().is_empty() {
        return Err(ExplainError::Auth("API key is empty".to_string()));
    }
    if !credential.chars().all(|ch| ch.is_ascii_graphic()) {
        return Err(ExplainError::Auth(
            "API key contains whitespace or non-printable characters".to_string(),
        ));
    }
    Ok(())
}

pub fn check_topic(topic: &str) -> Result<&str, ExplainError> {
    let trimmed = topic.trim();
    if trimmed.is_empty() {
        return Err(ExplainError::EmptyTopic);
    }
    Ok(trimmed)
}

pub fn build_messages(cfg: &Config, topic: &str) -> Vec<Message> {
    vec![
        Message::system(cfg.system_prompt.clone()),
        Message::user(format!(
            "Explain {topic} in a structured manner, starting from simple terms \
             and increasing difficulty step by step."
        )),
    ]
}

fn first_candidate(candidates: Vec<String>) -> Result<String, ExplainError> {
    let Some(first) = candidates.into_iter().next() else {
        warn!("completion response contained no candidates");
        return Err(ExplainError::Service(
            "completion response contained no candidates".to_string(),
        ));
    };
    if first.trim().is_empty() {
        warn!("first completion candidate was empty");
        return Err(ExplainError::Service(
            "completion service returned an empty explanation".to_string(),
        ));
    }
    Ok(first)
}
