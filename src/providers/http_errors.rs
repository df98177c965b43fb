use reqwest::StatusCode;
use std::error::Error as StdError;
use std::io::ErrorKind;

use crate::explain::ExplainError;

const MAX_ERROR_BODY_CHARS: usize = 300;

fn error_chain_matches(
    err: &(dyn StdError + 'static),
    kind: ErrorKind,
    needle: &str,
) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(source) = current {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>()
            && io_err.kind() == kind
        {
            return true;
        }

        if source.to_string().to_ascii_lowercase().contains(needle) {
            return true;
        }

        current = source.source();
    }

    false
}

fn error_chain_has_connection_refused(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::ConnectionRefused, "connection refused")
}

fn error_chain_has_timeout(err: &(dyn StdError + 'static)) -> bool {
    error_chain_matches(err, ErrorKind::TimedOut, "timed out")
}

/// Maps a transport failure into a service error that names the setting to fix.
pub(crate) fn completion_request_error(
    err: reqwest::Error,
    api_url: &str,
    timeout_secs: u64,
) -> ExplainError {
    if err.is_timeout() || error_chain_has_timeout(&err) {
        return ExplainError::Service(format!(
            "Completion request timed out after {}s while calling '{}'. \
             Increase MODEL_TIMEOUT_SECS or retry later.",
            timeout_secs, api_url
        ));
    }

    if err.is_connect() {
        if error_chain_has_connection_refused(&err) {
            return ExplainError::Service(format!(
                "Connection refused by completion API at '{}'. \
                 Check MODEL_BASE_URL.",
                api_url
            ));
        }

        return ExplainError::Service(format!(
            "Failed to connect to completion API at '{}'. \
             Check MODEL_BASE_URL and network connectivity.",
            api_url
        ));
    }

    ExplainError::Service(format!(
        "Failed to call completion API at '{}': {}",
        api_url, err
    ))
}

/// Maps a non-success HTTP status. Rejected credentials surface as auth errors.
pub(crate) fn completion_status_error(status: StatusCode, body: &str) -> ExplainError {
    let body = truncate_body(body);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ExplainError::Auth(format!(
            "Completion API rejected the API key (status {}): {}",
            status, body
        ));
    }

    ExplainError::Service(format!(
        "Completion request failed with status {}: {}",
        status, body
    ))
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
    cut.push_str("...");
    cut
}
