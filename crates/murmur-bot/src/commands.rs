use teloxide::Bot;
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, Message, User};
use teloxide::utils::command::BotCommands;
use tracing::info;

use crate::error::{RelayResult, blocking};
use crate::state::AppCtx;
use crate::{link, relay, texts, util};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
pub enum Command {
    #[command(description = "🚀 start and get your link")]
    Start(String),
    #[command(description = "📊 view your statistics")]
    Mystats,
    #[command(description = "🔄 generate a new link")]
    Url,
    #[command(description = "🗑 clear your block list")]
    Blacklist,
    #[command(description = "💭 send feedback")]
    Issue,
    #[command(hide)]
    Cleardb,
}

pub async fn handle(bot: Bot, msg: Message, cmd: Command, ctx: AppCtx) -> anyhow::Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    let chat = msg.chat.id;

    // Any command discards a pending compose target; /start with a valid
    // code sets a fresh one below.
    ctx.sessions.clear(user.id.0 as i64);

    let result = match cmd {
        Command::Start(param) => start(&bot, chat, &user, &ctx, param.trim()).await,
        Command::Mystats => mystats(&bot, chat, &user, &ctx).await,
        Command::Url => regenerate(&bot, chat, &user, &ctx).await,
        Command::Blacklist => clear_blacklist(&bot, chat, &user, &ctx).await,
        Command::Issue => issue(&bot, chat).await,
        Command::Cleardb => clear_db(&bot, chat, &user, &ctx).await,
    };

    if let Err(err) = result {
        util::report_failure(&bot, chat, &err).await?;
    }
    Ok(())
}

/// `/start <code>` puts the caller into compose mode towards the code's
/// owner; a bare `/start` (or a dead code) presents the caller's own link.
async fn start(bot: &Bot, chat: ChatId, user: &User, ctx: &AppCtx, param: &str) -> RelayResult<()> {
    if !param.is_empty() {
        let code = param.to_owned();
        let db = ctx.db.clone();
        if let Some(target) = blocking(move || db.user_by_link_code(&code)).await? {
            let sender_id = user.id.0 as i64;
            ctx.sessions.set_target(sender_id, target.user_id);
            util::send_html(bot, chat, texts::COMPOSE_PROMPT).await?;
            return Ok(());
        }
    }

    relay::present_link(bot, chat, ctx, user).await
}

async fn mystats(bot: &Bot, chat: ChatId, user: &User, ctx: &AppCtx) -> RelayResult<()> {
    let user_id = user.id.0 as i64;
    let db = ctx.db.clone();
    let username = user.username.clone();
    let first_name = user.first_name.clone();

    let (code, stats) = blocking(move || {
        // Upsert first so the rank scan always includes the caller.
        let code = link::ensure_code(&db, user_id, username.as_deref(), Some(&first_name))?;
        let stats = murmur_stats::compute(&db, user_id)?;
        Ok((code, stats))
    })
    .await?;

    let link = texts::share_link(&ctx.bot_username, &code);
    util::send_html_with(
        bot,
        chat,
        &texts::stats(&stats, &link),
        util::share_button(&texts::share_text(&link)),
    )
    .await?;
    Ok(())
}

async fn regenerate(bot: &Bot, chat: ChatId, user: &User, ctx: &AppCtx) -> RelayResult<()> {
    let user_id = user.id.0 as i64;
    let db = ctx.db.clone();
    let code = blocking(move || link::regenerate_code(&db, user_id)).await?;

    let link = texts::share_link(&ctx.bot_username, &code);
    util::send_html(bot, chat, &texts::new_link(&link)).await?;
    Ok(())
}

async fn clear_blacklist(bot: &Bot, chat: ChatId, user: &User, ctx: &AppCtx) -> RelayResult<()> {
    let user_id = user.id.0 as i64;
    let db = ctx.db.clone();
    let had_entries = blocking(move || db.clear_blocks(user_id)).await?;

    let text = if had_entries {
        texts::BLACKLIST_CLEARED
    } else {
        texts::BLACKLIST_EMPTY
    };
    util::send_html(bot, chat, text).await?;
    Ok(())
}

async fn issue(bot: &Bot, chat: ChatId) -> RelayResult<()> {
    util::send_html(bot, chat, texts::ISSUE_CONTACT).await?;
    Ok(())
}

/// Administrative wipe: drops all messages and blocks, strips user profiles
/// but keeps link codes so existing shared links stay valid.
async fn clear_db(bot: &Bot, chat: ChatId, user: &User, ctx: &AppCtx) -> RelayResult<()> {
    let user_id = user.id.0 as i64;
    if ctx.cfg.admin_id != Some(user_id) {
        util::send_html(bot, chat, texts::ADMIN_ONLY).await?;
        return Ok(());
    }

    let db = ctx.db.clone();
    let (messages, blocks, users) = blocking(move || {
        let messages = db.delete_all_messages()?;
        let blocks = db.delete_all_blocks()?;
        let users = db.strip_user_profiles()?;
        Ok((messages, blocks, users))
    })
    .await?;

    info!(messages, blocks, users, "administrative wipe complete");
    util::send_html(bot, chat, texts::DB_CLEARED).await?;
    Ok(())
}

pub async fn register_command_menu(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
