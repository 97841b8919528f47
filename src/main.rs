use std::sync::Arc;

use tracing::info;

use chathub::assistant::{OpenAiClient, ResponseGenerator};
use chathub::chat::Hub;
use chathub::Config;

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = chathub::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        chathub::logging::init_console_only(&config.logging.level);
    }

    let generator: Option<Arc<dyn ResponseGenerator>> = OpenAiClient::new(
        &config.assistant.api_key,
        &config.assistant.api_base,
        &config.assistant.model,
    )
    .map(|client| Arc::new(client) as Arc<dyn ResponseGenerator>);

    if generator.is_some() {
        info!("GPT assistant enabled (model: {})", config.assistant.model);
    } else {
        info!("GPT assistant disabled (no API key)");
    }

    let hub = Arc::new(Hub::new(
        config.chat.clone(),
        config.assistant.clone(),
        generator,
    ));

    info!(
        "chathub starting on {}:{}",
        config.server.host, config.server.port
    );

    if let Err(e) = chathub::web::serve(hub, &config.server).await {
        eprintln!("Server error: {e}");
        std::process::exit(1);
    }
}
