use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatKind};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use buddybot::chatbot::ChatbotEngine;
use buddybot::config::Config;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "buddybot.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    // Setup logging
    let log_dir = config.data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("buddybot.log"))
        .expect("Failed to open log file");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::EnvFilter::from_default_env()
                        .add_directive(tracing::Level::INFO.into()),
                ),
        )
        .init();

    info!("🚀 Starting buddybot...");
    info!("Loaded config from {config_path}");

    let engine = match ChatbotEngine::from_config(&config) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let bot = Bot::new(&config.telegram_bot_token);
    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![engine])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Reply to private text messages; everything else is ignored.
async fn handle_message(bot: Bot, msg: Message, engine: Arc<ChatbotEngine>) -> ResponseResult<()> {
    if !matches!(msg.chat.kind, ChatKind::Private(_)) {
        return Ok(());
    }
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let user_id = msg.chat.id.to_string();
    bot.send_chat_action(msg.chat.id, ChatAction::Typing).await.ok();

    let reply = engine.handle_message(&user_id, text).await;
    if let Err(e) = bot.send_message(msg.chat.id, reply).await {
        warn!("Failed to send reply to {user_id}: {e}");
    }

    Ok(())
}
