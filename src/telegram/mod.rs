pub mod auth;
pub mod responder;
pub mod source;

use std::path::Path;
use std::sync::Arc;

use grammers_client::types::Update;
use grammers_client::{Client, UpdatesConfiguration};
use grammers_mtsender::SenderPool;
use grammers_session::storages::SqliteSession;
use grammers_tl_types as tl;

use crate::bot::responder::EventAck;
use crate::bot::Bot;
use crate::config::BotConfig;
use crate::error::AppError;
use crate::paging::nav::NavigationEvent;
use crate::paging::token::ActionToken;
use crate::session::RequesterId;
use responder::GrammersResponder;
use source::GrammersSource;

fn open_session(path: &Path) -> Result<Arc<SqliteSession>, AppError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let path = path
        .to_str()
        .ok_or_else(|| AppError::Other("invalid session path".to_string()))?;
    let session = SqliteSession::open(path)
        .map_err(|e| AppError::Other(format!("session error: {}", e)))?;
    Ok(Arc::new(session))
}

/// Connect both accounts and serve updates until Ctrl+C.
///
/// The bot account receives commands and button presses and sends every
/// reply. The user account only reads channel history.
pub async fn run(config: BotConfig) -> Result<(), AppError> {
    let api_id = config.telegram.api_id;

    let bot_pool = SenderPool::new(open_session(&config.session_path())?, api_id);
    let bot_client = Client::new(&bot_pool);
    let SenderPool {
        runner, updates, ..
    } = bot_pool;
    let bot_runner = tokio::spawn(async move {
        runner.run().await;
    });

    // Updates of the reading account are never consumed.
    let user_pool = SenderPool::new(open_session(&config.user_session_path())?, api_id);
    let user_client = Client::new(&user_pool);
    let SenderPool { runner, .. } = user_pool;
    let user_runner = tokio::spawn(async move {
        runner.run().await;
    });

    let authorized = bot_client
        .is_authorized()
        .await
        .map_err(|e| AppError::Auth(format!("auth check failed: {}", e)))?;
    if !authorized {
        bot_client
            .bot_sign_in(&config.telegram.bot_token, &config.telegram.api_hash)
            .await
            .map_err(|e| AppError::Auth(format!("bot sign in failed: {}", e)))?;
    }
    auth::ensure_user_signed_in(&user_client, &config.telegram).await?;
    log::info!("Bot and user clients signed in, listening for commands");

    let bot = Arc::new(Bot::new(
        Arc::new(GrammersSource::new(user_client)),
        Arc::new(GrammersResponder::new(bot_client.clone())),
        config.scan.clone(),
        &config.paging,
    ));

    let mut updates = bot_client.stream_updates(
        updates,
        UpdatesConfiguration {
            catch_up: false,
            ..Default::default()
        },
    );

    loop {
        let update = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = updates.next() => update,
        };
        match update {
            Ok(update) => {
                let bot = Arc::clone(&bot);
                tokio::spawn(async move { dispatch(&bot, update).await });
            }
            Err(e) => log::warn!("Update stream error: {}", e),
        }
    }

    log::info!("Shutting down");
    updates.sync_update_state();
    bot_runner.abort();
    user_runner.abort();
    Ok(())
}

async fn dispatch(bot: &Bot, update: Update) {
    match update {
        Update::NewMessage(message) if !message.outgoing() => {
            let requester = message.peer_id().bot_api_dialog_id();
            // Channel posts and supergroups are not served.
            if requester <= -1_000_000_000_000 {
                return;
            }
            if let Err(e) = bot.handle_text(requester, message.text()).await {
                log::error!("Failed to handle command from {}: {}", requester, e);
            }
        }
        Update::CallbackQuery(query) => {
            let Some(event) = navigation_event(&query.raw) else {
                return;
            };
            match bot.handle_navigation(event).await {
                Ok(outcome) => log::debug!("Navigation from {}: {:?}", event.requester, outcome),
                Err(e) => log::warn!("Navigation from {} failed: {}", event.requester, e),
            }
        }
        _ => {}
    }
}

fn dialog_id(peer: &tl::enums::Peer) -> RequesterId {
    match peer {
        tl::enums::Peer::User(u) => u.user_id,
        tl::enums::Peer::Chat(c) => -c.chat_id,
        tl::enums::Peer::Channel(c) => -(1_000_000_000_000 + c.channel_id),
    }
}

fn navigation_event(raw: &tl::enums::Update) -> Option<NavigationEvent> {
    let tl::enums::Update::BotCallbackQuery(query) = raw else {
        return None;
    };
    let data = query.data.as_deref()?;
    let token = match ActionToken::from_bytes(data) {
        Ok(token) => token,
        Err(e) => {
            log::debug!("Ignoring callback: {}", e);
            return None;
        }
    };
    Some(NavigationEvent {
        requester: dialog_id(&query.peer),
        token,
        message_id: query.msg_id as i64,
        ack: EventAck {
            query_id: query.query_id,
        },
    })
}
