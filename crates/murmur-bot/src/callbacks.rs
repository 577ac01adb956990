use chrono::Utc;
use teloxide::Bot;
use teloxide::payloads::{AnswerCallbackQuerySetters, EditMessageCaptionSetters};
use teloxide::prelude::Requester;
use teloxide::types::{CallbackQuery, ChatId};
use tracing::info;

use crate::error::{RelayResult, blocking};
use crate::state::AppCtx;
use crate::{texts, util};

/// Recognized button payloads. Anything else is answered and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `forward_<code>` — resend the share blurb for this link code.
    Forward(String),
    /// `block_<messageId>` — block the sender of this stored message.
    Block(i64),
    /// `unblock_<senderId>` — remove one sender from the block list.
    Unblock(i64),
}

pub fn parse_action(data: &str) -> Option<Action> {
    if let Some(code) = data.strip_prefix("forward_") {
        return (!code.is_empty()).then(|| Action::Forward(code.to_owned()));
    }
    if let Some(id) = data.strip_prefix("block_") {
        return id.parse().ok().map(Action::Block);
    }
    if let Some(id) = data.strip_prefix("unblock_") {
        return id.parse().ok().map(Action::Unblock);
    }
    None
}

pub async fn handle(bot: Bot, q: CallbackQuery, ctx: AppCtx) -> anyhow::Result<()> {
    let Some(action) = q.data.as_deref().and_then(parse_action) else {
        // Unknown payload: just dismiss the spinner.
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };

    if let Err(err) = route(&bot, &q, &ctx, action).await {
        let presser = ChatId(q.from.id.0 as i64);
        util::report_failure(&bot, presser, &err).await?;
    }
    Ok(())
}

async fn route(bot: &Bot, q: &CallbackQuery, ctx: &AppCtx, action: Action) -> RelayResult<()> {
    let presser = q.from.id.0 as i64;

    match action {
        Action::Forward(code) => {
            let link = texts::share_link(&ctx.bot_username, &code);
            bot.send_message(ChatId(presser), texts::share_text(&link))
                .await?;
            bot.answer_callback_query(q.id.clone())
                .text(texts::FORWARD_HINT)
                .await?;
        }

        Action::Block(message_id) => {
            bot.answer_callback_query(q.id.clone()).await?;

            let db = ctx.db.clone();
            let Some(message) = blocking(move || db.message_by_id(message_id)).await? else {
                bot.send_message(ChatId(presser), texts::BLOCK_MESSAGE_GONE)
                    .await?;
                return Ok(());
            };

            let sender_id = message.sender_id;
            let db = ctx.db.clone();
            let now = Utc::now().to_rfc3339();
            blocking(move || db.add_block(presser, sender_id, &now)).await?;
            info!(blocker = presser, blocked = sender_id, "sender blocked");

            // Turn the notification itself into the confirmation. Media
            // notifications carry the text as a caption, not a body.
            match q.message.as_ref().and_then(|m| m.regular_message()) {
                Some(m) if m.text().is_some() => {
                    bot.edit_message_text(m.chat.id, m.id, texts::BLOCK_CONFIRMED)
                        .await?;
                }
                Some(m) => {
                    bot.edit_message_caption(m.chat.id, m.id)
                        .caption(texts::BLOCK_CONFIRMED)
                        .await?;
                }
                None => {
                    bot.send_message(ChatId(presser), texts::BLOCK_CONFIRMED)
                        .await?;
                }
            }
        }

        Action::Unblock(sender_id) => {
            bot.answer_callback_query(q.id.clone()).await?;

            let db = ctx.db.clone();
            let removed = blocking(move || db.remove_block(presser, sender_id)).await?;
            let text = if removed {
                texts::UNBLOCKED
            } else {
                texts::UNBLOCK_NOT_FOUND
            };
            bot.send_message(ChatId(presser), text).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_recognized_prefixes() {
        assert_eq!(
            parse_action("forward_abc123_-xyz"),
            Some(Action::Forward("abc123_-xyz".into()))
        );
        assert_eq!(parse_action("block_42"), Some(Action::Block(42)));
        assert_eq!(parse_action("unblock_1153"), Some(Action::Unblock(1153)));
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(parse_action(""), None);
        assert_eq!(parse_action("forward_"), None);
        assert_eq!(parse_action("block_notanumber"), None);
        assert_eq!(parse_action("unblock_"), None);
        assert_eq!(parse_action("something_else"), None);
    }
}
