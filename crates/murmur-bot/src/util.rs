use teloxide::Bot;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::Requester;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, Message, ParseMode};
use tracing::{error, warn};

use crate::error::RelayError;
use crate::texts;

pub async fn send_html(
    bot: &Bot,
    chat: ChatId,
    text: &str,
) -> Result<Message, teloxide::RequestError> {
    bot.send_message(chat, text).parse_mode(ParseMode::Html).await
}

pub async fn send_html_with(
    bot: &Bot,
    chat: ChatId,
    text: &str,
    markup: InlineKeyboardMarkup,
) -> Result<Message, teloxide::RequestError> {
    bot.send_message(chat, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup)
        .await
}

/// Share button attached to the welcome and stats messages; pressing it
/// opens the platform's pick-a-chat flow with the blurb prefilled.
pub fn share_button(share_text: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::switch_inline_query(
        texts::SHARE_BUTTON,
        share_text,
    )]])
}

/// Block button carried by every delivered notification.
pub fn block_button(message_id: i64) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        texts::BLOCK_BUTTON,
        format!("block_{message_id}"),
    )]])
}

/// Handler boundary: log the failure by kind, then show the generic notice.
/// Nothing propagates past here except a failure to send the notice itself.
pub async fn report_failure(
    bot: &Bot,
    chat: ChatId,
    err: &RelayError,
) -> Result<(), teloxide::RequestError> {
    match err {
        RelayError::Store(e) => error!(chat_id = chat.0, "storage failure: {e:#}"),
        RelayError::Platform(e) => warn!(chat_id = chat.0, "telegram failure: {e}"),
    }
    bot.send_message(chat, texts::GENERIC_ERROR).await?;
    Ok(())
}
