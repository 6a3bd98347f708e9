use telegram_top_bot::config::BotConfig;
use telegram_top_bot::{logging, telegram};

#[tokio::main]
async fn main() {
    let config = match BotConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    let _logger = match logging::init(&config.log_dir()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("failed to initialize logging: {}", e);
            None
        }
    };

    if let Err(e) = telegram::run(config).await {
        log::error!("Bot stopped: {}", e);
        std::process::exit(1);
    }
}
