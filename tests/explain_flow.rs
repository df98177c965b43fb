mod common;

use serde_json::json;
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use common::{BIN, MockCompletionServer, MockResponse, unique_temp_dir};
use knowledge_hub::config::Config;
use knowledge_hub::explain::{ExplainError, request_explanation};
use knowledge_hub::render::render_document;

const DCF_TOPIC: &str = "What is Discounted Cash Flow?";
const DCF_ANSWER: &str = "# Discounted Cash Flow\n\
    \n\
    ## Level 1: The idea\n\
    Discounted Cash Flow (DCF) asks what money you receive later is worth today.\n\
    \n\
    ## Level 2: Example\n\
    Receiving $110 in one year at a 10% discount rate is worth $100 today.";

fn config_for(base_url: &str) -> Config {
    let mut cfg = Config::from_env();
    cfg.model_provider = "groq".to_string();
    cfg.model = "llama-3.3-70b-versatile".to_string();
    cfg.model_base_url = base_url.to_string();
    cfg.model_timeout_secs = 5;
    cfg
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("client should build")
}

#[tokio::test]
async fn dcf_scenario_returns_explanation_and_renders_pdf() {
    let server = MockCompletionServer::start(vec![MockResponse::completion(&[DCF_ANSWER])]);
    let cfg = config_for(&server.base_url);

    let text = request_explanation(&client(), &cfg, DCF_TOPIC, "test-key")
        .await
        .expect("explanation should succeed");

    assert_eq!(text, DCF_ANSWER);
    assert!(text.contains("Discounted"));

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert!(
        request.request_line.starts_with("POST /openai/v1/chat/completions "),
        "unexpected request line: {}",
        request.request_line
    );
    assert_eq!(request.header("authorization"), Some("Bearer test-key"));

    let body = request.json();
    assert_eq!(body["model"], "llama-3.3-70b-versatile");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["role"], "user");
    assert!(
        body["messages"][1]["content"]
            .as_str()
            .is_some_and(|content| content.contains(DCF_TOPIC))
    );

    let pdf = render_document(&text).expect("render should succeed");
    assert!(pdf.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn only_the_first_candidate_is_used() {
    let server =
        MockCompletionServer::start(vec![MockResponse::completion(&["first answer", "second"])]);
    let cfg = config_for(&server.base_url);

    let text = request_explanation(&client(), &cfg, "NPV", "test-key")
        .await
        .expect("explanation should succeed");

    assert_eq!(text, "first answer");
    server.finish();
}

#[tokio::test]
async fn rejected_key_is_reported_as_auth_error() {
    let server = MockCompletionServer::start(vec![MockResponse::json(
        401,
        json!({ "error": { "message": "Invalid API Key" } }),
    )]);
    let cfg = config_for(&server.base_url);

    let err = request_explanation(&client(), &cfg, DCF_TOPIC, "gsk_revoked")
        .await
        .expect_err("401 should fail");

    assert!(matches!(err, ExplainError::Auth(_)), "got {err:?}");
    assert!(err.to_string().contains("Invalid API Key"));
    server.finish();
}

#[tokio::test]
async fn server_error_is_reported_as_service_error() {
    let server = MockCompletionServer::start(vec![MockResponse::json(
        500,
        json!({ "error": "overloaded" }),
    )]);
    let cfg = config_for(&server.base_url);

    let err = request_explanation(&client(), &cfg, DCF_TOPIC, "test-key")
        .await
        .expect_err("500 should fail");

    assert!(matches!(err, ExplainError::Service(_)), "got {err:?}");
    assert!(err.to_string().contains("500"));
    server.finish();
}

#[tokio::test]
async fn empty_choices_are_a_service_error() {
    let server = MockCompletionServer::start(vec![MockResponse::completion(&[])]);
    let cfg = config_for(&server.base_url);

    let err = request_explanation(&client(), &cfg, DCF_TOPIC, "test-key")
        .await
        .expect_err("no candidates should fail");

    assert!(matches!(err, ExplainError::Service(_)), "got {err:?}");
    server.finish();
}

#[tokio::test]
async fn invalid_input_fails_before_any_connection() {
    // Nothing listens here; reaching the network would yield a service error.
    let cfg = config_for("http://127.0.0.1:9/openai/v1");

    let empty_key = request_explanation(&client(), &cfg, DCF_TOPIC, "").await;
    assert!(matches!(empty_key, Err(ExplainError::Auth(_))));

    let empty_topic = request_explanation(&client(), &cfg, "", "test-key").await;
    assert_eq!(empty_topic, Err(ExplainError::EmptyTopic));

    let blank_topic = request_explanation(&client(), &cfg, "  \t ", "test-key").await;
    assert_eq!(blank_topic, Err(ExplainError::EmptyTopic));
}

#[test]
fn one_shot_mode_prints_the_explanation() {
    let server = MockCompletionServer::start(vec![MockResponse::completion(&[DCF_ANSWER])]);
    let dir = unique_temp_dir("one-shot");

    let output = Command::new(BIN)
        .args(DCF_TOPIC.split(' '))
        .current_dir(&dir)
        .env("GROQ_API_KEY", "test-key")
        .env("MODEL_BASE_URL", &server.base_url)
        .env_remove("MODEL_PROVIDER")
        .env_remove("LOG_OUTPUT")
        .output()
        .expect("failed to run knowledge-hub binary");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "one-shot run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Discounted Cash Flow (DCF)"), "stdout:\n{stdout}");

    let requests = server.finish();
    let body = requests[0].json();
    assert!(
        body["messages"][1]["content"]
            .as_str()
            .is_some_and(|content| content.contains(DCF_TOPIC))
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn interactive_mode_explains_then_writes_pdf_on_a_separate_command() {
    let server = MockCompletionServer::start(vec![MockResponse::completion(&[DCF_ANSWER])]);
    let dir = unique_temp_dir("interactive");
    let pdf_path = dir.join("out").join("dcf.pdf");

    let mut child = Command::new(BIN)
        .current_dir(&dir)
        .env("GROQ_API_KEY", "test-key")
        .env("MODEL_BASE_URL", &server.base_url)
        .env_remove("MODEL_PROVIDER")
        .env_remove("LOG_OUTPUT")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start knowledge-hub binary");

    {
        let stdin = child.stdin.as_mut().expect("stdin should be piped");
        writeln!(stdin, "{DCF_TOPIC}").expect("write topic");
        writeln!(stdin, "/pdf {}", pdf_path.display()).expect("write pdf command");
        writeln!(stdin, "/pdf {}", pdf_path.display()).expect("write repeated pdf command");
        writeln!(stdin, "exit").expect("write exit");
    }
    let output = child.wait_with_output().expect("binary should exit");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout:\n{stdout}");
    assert!(stdout.contains("Discounted Cash Flow (DCF)"), "stdout:\n{stdout}");
    assert_eq!(
        stdout.matches("PDF ready for download").count(),
        2,
        "stdout:\n{stdout}"
    );

    let bytes = fs::read(&pdf_path).expect("pdf should be written");
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(bytes, render_document(DCF_ANSWER).expect("render"));

    assert_eq!(server.finish().len(), 1, "the PDF action must not call the service");
    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn interactive_pdf_without_explanation_reports_inline_error() {
    let dir = unique_temp_dir("interactive-empty");

    let mut child = Command::new(BIN)
        .current_dir(&dir)
        .env("GROQ_API_KEY", "test-key")
        .env("MODEL_BASE_URL", "http://127.0.0.1:9/openai/v1")
        .env_remove("PDF_OUTPUT_PATH")
        .env_remove("LOG_OUTPUT")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to start knowledge-hub binary");

    {
        let stdin = child.stdin.as_mut().expect("stdin should be piped");
        writeln!(stdin, "/pdf").expect("write pdf command");
        writeln!(stdin, "   ").expect("write blank line");
    }
    let output = child.wait_with_output().expect("binary should exit");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "errors inside actions must not end the session");
    assert!(stdout.contains("Error generating PDF"), "stdout:\n{stdout}");
    assert!(!dir.join("finance_ai_knowledge.pdf").exists());

    let _ = fs::remove_dir_all(&dir);
}
