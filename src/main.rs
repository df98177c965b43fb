use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = knowledge_hub::logging::init();
    knowledge_hub::run().await
}
