use teloxide::Bot;
use teloxide::payloads::AnswerInlineQuerySetters;
use teloxide::prelude::Requester;
use teloxide::types::{
    InlineQuery, InlineQueryResult, InlineQueryResultArticle, InputMessageContent,
    InputMessageContentText,
};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::{RelayError, RelayResult, blocking};
use crate::state::AppCtx;
use crate::{link, texts};

/// `@bot <anything>` autocomplete: one article that drops the caller's
/// share blurb into the chosen chat.
pub async fn handle(bot: Bot, q: InlineQuery, ctx: AppCtx) -> anyhow::Result<()> {
    if let Err(err) = answer(&bot, &q, &ctx).await {
        // Inline queries have no chat to report into; log and move on.
        match err {
            RelayError::Store(e) => error!(user_id = q.from.id.0, "inline query: {e:#}"),
            RelayError::Platform(e) => warn!(user_id = q.from.id.0, "inline query: {e}"),
        }
    }
    Ok(())
}

async fn answer(bot: &Bot, q: &InlineQuery, ctx: &AppCtx) -> RelayResult<()> {
    let user_id = q.from.id.0 as i64;
    let db = ctx.db.clone();
    let username = q.from.username.clone();
    let first_name = q.from.first_name.clone();
    let code =
        blocking(move || link::ensure_code(&db, user_id, username.as_deref(), Some(&first_name)))
            .await?;

    let link = texts::share_link(&ctx.bot_username, &code);
    let content = InputMessageContent::Text(InputMessageContentText::new(texts::share_text(&link)));
    let article = InlineQueryResultArticle::new(Uuid::new_v4().to_string(), texts::INLINE_TITLE, content)
        .description(link);

    bot.answer_inline_query(q.id.clone(), vec![InlineQueryResult::Article(article)])
        .cache_time(300)
        .await?;
    Ok(())
}
