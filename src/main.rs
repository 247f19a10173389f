use anyhow::Context;
use dotenv::dotenv;
use log::info;
use melchat::{
    api::OllamaClient, app::App, config::initialize_config, conversation::ConversationStore,
    logging::init_logging, storage::FileStore, ui::run_ui,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = initialize_config().context("failed to load configuration")?;
    let _logger = init_logging(&config.data_dir.join("logs"), &config.log_level)
        .context("failed to start logging")?;
    info!(
        "Starting melchat against {} with model {}",
        config.base_url, config.model
    );

    let client = OllamaClient::new(&config)?;
    let store = ConversationStore::restore(
        Arc::new(client),
        Box::new(FileStore::new(&config.data_dir)),
    );

    run_ui(App::new(store)).await?;
    info!("Exiting");
    Ok(())
}
