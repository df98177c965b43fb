pub mod config;
pub mod explain;
pub mod logging;
pub mod model;
pub mod providers;
pub mod render;
pub mod repl;

use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::time::Duration;
use tracing::info;

use config::{API_KEY_VAR, Config};
use explain::Explainer;
use repl::{Session, run_repl};

pub async fn run() -> Result<()> {
    let cfg = Config::from_env();
    info!(
        provider = %cfg.model_provider,
        model = %cfg.model,
        base_url = %cfg.model_base_url,
        timeout_secs = cfg.model_timeout_secs,
        pdf_output_path = %cfg.pdf_output_path.display(),
        api_key_present = cfg.api_key.is_some(),
        "loaded runtime configuration"
    );

    let api_key = cfg
        .require_api_key()
        .with_context(|| format!("{API_KEY_VAR} is required; refusing to start"))?
        .clone();

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.model_timeout_secs))
        .build()
        .context("Failed to initialize HTTP client")?;

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        let mut session = Session::new(&client, &cfg, api_key);
        run_repl(&mut session, &cfg.model).await
    } else {
        let topic = args.join(" ");
        let explanation = Explainer::new(&client, &cfg, api_key)
            .explain(&topic)
            .await?;
        println!("{}", explanation.text.trim());
        Ok(())
    }
}
