mod callbacks;
mod commands;
mod config;
mod error;
mod inline;
mod link;
mod relay;
mod sessions;
mod state;
mod texts;
mod util;

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;

use crate::commands::Command;
use crate::config::Config;
use crate::sessions::Sessions;
use crate::state::{AppCtx, AppStateInner};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "murmur=debug".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    let db = murmur_db::Database::open(&cfg.db_path)?;

    let bot = Bot::from_env();
    let me = bot.get_me().await?;
    let bot_username = me.username().to_owned();
    info!("Authorized as @{bot_username}");

    commands::register_command_menu(&bot).await?;

    let ctx: AppCtx = Arc::new(AppStateInner {
        db,
        sessions: Sessions::new(cfg.session_ttl),
        cfg,
        bot_username,
    });

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(commands::handle),
        )
        .branch(Update::filter_edited_message().endpoint(relay::handle_edited))
        .branch(Update::filter_message().endpoint(relay::handle_content))
        .branch(Update::filter_callback_query().endpoint(callbacks::handle))
        .branch(Update::filter_inline_query().endpoint(inline::handle));

    info!("Starting relay bot...");
    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Shut down");
    Ok(())
}
