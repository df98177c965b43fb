//! Groq's OpenAI-compatible chat-completions endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ApiKey, Config};
use crate::explain::ExplainError;
use crate::model::Message;
use crate::providers::http_errors::{completion_request_error, completion_status_error};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
    messages
        .iter()
        .map(|msg| ChatMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}

fn candidate_texts(response: ChatCompletionResponse) -> Vec<String> {
    response
        .choices
        .into_iter()
        .map(|choice| choice.message.content.unwrap_or_default())
        .collect()
}

pub async fn complete(
    client: &Client,
    cfg: &Config,
    api_key: &ApiKey,
    messages: &[Message],
) -> Result<Vec<String>, ExplainError> {
    let api_url = completions_url(&cfg.model_base_url);
    let body = ChatCompletionRequest {
        model: &cfg.model,
        messages: to_chat_messages(messages),
    };
    debug!(
        api_url = %api_url,
        model = %cfg.model,
        message_count = messages.len(),
        "sending chat completion request"
    );

    let response = client
        .post(&api_url)
        .bearer_auth(api_key.expose())
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            warn!(
                api_url = %api_url,
                model = %cfg.model,
                error = %err,
                "completion request failed"
            );
            completion_request_error(err, &api_url, cfg.model_timeout_secs)
        })?;

    if !response.status().is_success() {
        let status = response.status();
        let response_body = response
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read response body>".to_string());
        warn!(
            api_url = %api_url,
            model = %cfg.model,
            status = %status,
            response_body_len = response_body.len(),
            "completion API returned non-success status"
        );
        return Err(completion_status_error(status, &response_body));
    }

    let parsed: ChatCompletionResponse = response.json().await.map_err(|err| {
        ExplainError::Service(format!("Failed to parse completion response: {err}"))
    })?;
    let candidates = candidate_texts(parsed);
    debug!(
        model = %cfg.model,
        candidate_count = candidates.len(),
        first_len = candidates.first().map(String::len).unwrap_or(0),
        "received chat completion response"
    );
    Ok(candidates)
}
