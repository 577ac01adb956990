//! Content routing: the conversation state machine for non-command messages.
//!
//! Precedence for an inbound content message:
//! 1. a platform-level reply to a tracked notification threads back to the
//!    original sender, resolved purely through the stored delivery reference;
//! 2. a pending compose target (set by following a share link) routes the
//!    content there;
//! 3. otherwise the bot presents the sender's own share link.

use chrono::Utc;
use murmur_db::Database;
use murmur_db::models::MessageRow;
use murmur_types::{MessageKind, MessagePayload};
use teloxide::Bot;
use teloxide::payloads::{
    SendAnimationSetters, SendMessageSetters, SendPhotoSetters, SendVoiceSetters,
};
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, InputFile, Message, MessageId, ParseMode, User};
use tracing::{error, info, warn};

use crate::error::{RelayError, RelayResult, blocking};
use crate::state::AppCtx;
use crate::{link, texts, util};

pub async fn handle_content(bot: Bot, msg: Message, ctx: AppCtx) -> anyhow::Result<()> {
    let Some(user) = msg.from.clone() else {
        return Ok(());
    };
    // Unrecognized commands fall through the command filter; never relay them
    // as content.
    if msg.text().is_some_and(|t| t.starts_with('/')) {
        return Ok(());
    }
    if let Err(err) = route_content(&bot, &msg, &user, &ctx).await {
        util::report_failure(&bot, msg.chat.id, &err).await?;
    }
    Ok(())
}

pub async fn handle_edited(bot: Bot, msg: Message, _ctx: AppCtx) -> anyhow::Result<()> {
    // Edits are never relayed; fixed notice, no state change.
    util::send_html(&bot, msg.chat.id, texts::EDITS_NOT_SUPPORTED).await?;
    Ok(())
}

async fn route_content(bot: &Bot, msg: &Message, user: &User, ctx: &AppCtx) -> RelayResult<()> {
    let sender_id = user.id.0 as i64;
    let chat = msg.chat.id;

    if let Some(replied) = msg.reply_to_message() {
        let replied_tg_id = replied.id.0 as i64;
        let db = ctx.db.clone();
        let original =
            blocking(move || db.message_by_delivery_ref(sender_id, replied_tg_id)).await?;
        if let Some(original) = original {
            return relay_threaded(bot, msg, ctx, sender_id, original, replied_tg_id).await;
        }
        // A reply to anything we did not deliver falls through to the
        // ordinary flows.
    }

    if let Some(target) = ctx.sessions.target(sender_id) {
        return relay_pending(bot, msg, ctx, sender_id, target).await;
    }

    present_link(bot, chat, ctx, user).await
}

/// Idle interaction: upsert the user and show their shareable link.
pub async fn present_link(bot: &Bot, chat: ChatId, ctx: &AppCtx, user: &User) -> RelayResult<()> {
    let user_id = user.id.0 as i64;
    let db = ctx.db.clone();
    let username = user.username.clone();
    let first_name = user.first_name.clone();
    let code =
        blocking(move || link::ensure_code(&db, user_id, username.as_deref(), Some(&first_name)))
            .await?;

    let link = texts::share_link(&ctx.bot_username, &code);
    util::send_html_with(
        bot,
        chat,
        &texts::welcome(&link),
        util::share_button(&texts::share_text(&link)),
    )
    .await?;
    Ok(())
}

/// Pre-send access decision. Nothing is persisted or delivered unless this
/// comes back `Allowed`. The self-send rule only applies to direct sends
/// started from a share link; threaded replies are already scoped by the
/// original message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendPermit {
    Allowed,
    SelfMessage,
    Blocked,
}

fn send_permit(
    db: &Database,
    sender_id: i64,
    recipient_id: i64,
    direct: bool,
) -> anyhow::Result<SendPermit> {
    if direct && sender_id == recipient_id {
        return Ok(SendPermit::SelfMessage);
    }
    if db.is_blocked(recipient_id, sender_id)? {
        return Ok(SendPermit::Blocked);
    }
    Ok(SendPermit::Allowed)
}

async fn relay_pending(
    bot: &Bot,
    msg: &Message,
    ctx: &AppCtx,
    sender_id: i64,
    target: i64,
) -> RelayResult<()> {
    let chat = msg.chat.id;

    let db = ctx.db.clone();
    match blocking(move || send_permit(&db, sender_id, target, true)).await? {
        SendPermit::SelfMessage => {
            ctx.sessions.clear(sender_id);
            util::send_html(bot, chat, texts::SELF_MESSAGE).await?;
            return Ok(());
        }
        SendPermit::Blocked => {
            util::send_html(bot, chat, texts::SENDER_BLOCKED).await?;
            return Ok(());
        }
        SendPermit::Allowed => {}
    }

    let Some(payload) = extract_payload(msg) else {
        util::send_html(bot, chat, texts::UNSUPPORTED_CONTENT).await?;
        return Ok(());
    };

    // The pending target is spent once a delivery attempt is made, whether
    // or not the send goes through.
    ctx.sessions.clear(sender_id);

    match persist_and_deliver(bot, ctx, sender_id, target, payload, None).await {
        Ok(()) => {
            util::send_html(bot, chat, texts::SENT_OK).await?;
            Ok(())
        }
        Err(RelayError::Platform(e)) => {
            warn!(sender_id, recipient_id = target, "delivery failed: {e}");
            util::send_html(bot, chat, texts::DELIVERY_FAILED).await?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn relay_threaded(
    bot: &Bot,
    msg: &Message,
    ctx: &AppCtx,
    sender_id: i64,
    original: MessageRow,
    replied_tg_id: i64,
) -> RelayResult<()> {
    let chat = msg.chat.id;
    let recipient_id = original.sender_id;

    let db = ctx.db.clone();
    if blocking(move || send_permit(&db, sender_id, recipient_id, false)).await?
        != SendPermit::Allowed
    {
        util::send_html(bot, chat, texts::SENDER_BLOCKED).await?;
        return Ok(());
    }

    let Some(payload) = extract_payload(msg) else {
        util::send_html(bot, chat, texts::UNSUPPORTED_CONTENT).await?;
        return Ok(());
    };

    match persist_and_deliver(bot, ctx, sender_id, recipient_id, payload, Some(replied_tg_id)).await
    {
        Ok(()) => {
            util::send_html(bot, chat, texts::SENT_OK).await?;
            Ok(())
        }
        Err(RelayError::Platform(e)) => {
            warn!(sender_id, recipient_id, "reply delivery failed: {e}");
            util::send_html(bot, chat, texts::DELIVERY_FAILED).await?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// persist → deliver → backfill the delivery reference. A failed backfill
/// leaves the record without its reference; that inconsistency is accepted
/// and logged rather than unwound.
async fn persist_and_deliver(
    bot: &Bot,
    ctx: &AppCtx,
    sender_id: i64,
    recipient_id: i64,
    payload: MessagePayload,
    reply_to_tg_id: Option<i64>,
) -> RelayResult<()> {
    let db = ctx.db.clone();
    let stored = payload.clone();
    let created_at = Utc::now().to_rfc3339();
    let message_id = blocking(move || {
        db.insert_message(sender_id, recipient_id, &stored, reply_to_tg_id, &created_at)
    })
    .await?;

    let sent = deliver(bot, recipient_id, &payload, message_id).await?;

    let db = ctx.db.clone();
    let tg_id = sent.0 as i64;
    if let Err(err) = blocking(move || db.set_delivery_ref(message_id, tg_id)).await {
        error!(message_id, "delivery ref backfill failed: {err}");
    }

    info!(message_id, sender_id, recipient_id, "anonymous message delivered");
    Ok(())
}

async fn deliver(
    bot: &Bot,
    recipient_id: i64,
    payload: &MessagePayload,
    message_id: i64,
) -> Result<MessageId, teloxide::RequestError> {
    let chat = ChatId(recipient_id);
    let markup = util::block_button(message_id);

    let sent = match payload.kind {
        MessageKind::Text => {
            bot.send_message(chat, texts::text_notification(&payload.content))
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?
        }
        MessageKind::Voice => {
            bot.send_voice(chat, InputFile::file_id(payload.content.clone()))
                .caption(texts::voice_notification())
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?
        }
        MessageKind::Photo => {
            bot.send_photo(chat, InputFile::file_id(payload.content.clone()))
                .caption(texts::media_notification(payload.caption.as_deref()))
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?
        }
        MessageKind::Animation => {
            bot.send_animation(chat, InputFile::file_id(payload.content.clone()))
                .caption(texts::media_notification(payload.caption.as_deref()))
                .parse_mode(ParseMode::Html)
                .reply_markup(markup)
                .await?
        }
    };

    Ok(sent.id)
}

/// Maps an inbound message to the payload kinds the relay accepts.
/// Photos use the highest-resolution variant Telegram provides.
fn extract_payload(msg: &Message) -> Option<MessagePayload> {
    if let Some(text) = msg.text() {
        return Some(MessagePayload::text(text));
    }
    if let Some(voice) = msg.voice() {
        return Some(MessagePayload {
            kind: MessageKind::Voice,
            content: voice.file.id.clone(),
            caption: None,
        });
    }
    if let Some(photos) = msg.photo() {
        return photos.last().map(|photo| MessagePayload {
            kind: MessageKind::Photo,
            content: photo.file.id.clone(),
            caption: msg.caption().map(str::to_owned),
        });
    }
    if let Some(animation) = msg.animation() {
        return Some(MessagePayload {
            kind: MessageKind::Animation,
            content: animation.file.id.clone(),
            caption: msg.caption().map(str::to_owned),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: &str = "2025-06-01T12:00:00Z";

    #[test]
    fn direct_send_to_self_is_refused() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(
            send_permit(&db, 100, 100, true).unwrap(),
            SendPermit::SelfMessage
        );
        assert_eq!(
            send_permit(&db, 100, 200, true).unwrap(),
            SendPermit::Allowed
        );
    }

    #[test]
    fn blocked_sender_is_refused_before_anything_is_persisted() {
        let db = Database::open_in_memory().unwrap();
        db.add_block(100, 200, NOW).unwrap();

        // The relay flows insert only after an Allowed permit, so a Blocked
        // outcome leaves the message store untouched.
        assert_eq!(
            send_permit(&db, 200, 100, true).unwrap(),
            SendPermit::Blocked
        );
        assert_eq!(db.count_received(100, None).unwrap(), 0);
        assert_eq!(db.count_sent(200, None).unwrap(), 0);

        // Threaded replies honor the same block.
        assert_eq!(
            send_permit(&db, 200, 100, false).unwrap(),
            SendPermit::Blocked
        );
        // The block is directional: the blocker can still message out.
        assert_eq!(
            send_permit(&db, 100, 200, true).unwrap(),
            SendPermit::Allowed
        );
    }

    #[test]
    fn unblocking_restores_the_permit() {
        let db = Database::open_in_memory().unwrap();
        db.add_block(100, 200, NOW).unwrap();
        assert_eq!(
            send_permit(&db, 200, 100, true).unwrap(),
            SendPermit::Blocked
        );

        db.remove_block(100, 200).unwrap();
        assert_eq!(
            send_permit(&db, 200, 100, true).unwrap(),
            SendPermit::Allowed
        );
    }
}
