//! Every user-facing string in one place. Outbound notifications never carry
//! meaning for routing — reply-threading runs on stored delivery references,
//! so rewording anything here is always safe.

use murmur_types::UserStats;
use teloxide::utils::html::escape;

pub fn share_link(bot_username: &str, code: &str) -> String {
    format!("t.me/{bot_username}?start={code}")
}

/// The ready-to-forward blurb placed into inline-query results and the
/// share button.
pub fn share_text(link: &str) -> String {
    format!("You can send me an anonymous message through this link:\n\n{link}")
}

pub fn welcome(link: &str) -> String {
    format!(
        "<b>🚀 Start receiving anonymous messages right now!</b>\n\n\
         <b>Your link:</b>\n{link}\n\n\
         👆 Put this link in your <b>Telegram/TikTok/Instagram</b> profile \
         bio to start receiving anonymous messages 💭"
    )
}

pub fn new_link(link: &str) -> String {
    format!("✅ Your new link:\n\n{link}")
}

pub fn stats(s: &UserStats, link: &str) -> String {
    format!(
        "<b>📊 Profile statistics</b>\n\n\
         ━ Today:\n\
         💬 Messages: {}\n\
         👥 Link visits: {}\n\
         {}\n\n\
         ━ All time:\n\
         💬 Messages: {}\n\
         👥 Link visits: {}\n\
         📈 Rank: {}/{}\n\n\
         Share your personal link to climb the ranking:\n👉 {link}",
        s.today.messages,
        s.today.visits,
        s.rank.tier.label(),
        s.total.messages,
        s.total.visits,
        s.rank.position,
        s.rank.total_users,
    )
}

/// Notification wrapping a text message; the body is HTML-escaped.
pub fn text_notification(body: &str) -> String {
    format!("{NOTIFY_BANNER}\n\n{}\n\n{NOTIFY_FOOTER}", escape(body))
}

/// Caption for photo/animation notifications; the sender's caption, if any,
/// sits between banner and footer.
pub fn media_notification(caption: Option<&str>) -> String {
    match caption {
        Some(c) => format!("{NOTIFY_BANNER}\n\n{}\n\n{NOTIFY_FOOTER}", escape(c)),
        None => format!("{NOTIFY_BANNER}\n\n{NOTIFY_FOOTER}"),
    }
}

pub fn voice_notification() -> String {
    format!("{NOTIFY_BANNER}\n\n{NOTIFY_FOOTER}")
}

const NOTIFY_BANNER: &str = "<b>📨 You have a new anonymous message!</b>";
const NOTIFY_FOOTER: &str = "↩️ Swipe left on this message to reply";

pub const COMPOSE_PROMPT: &str =
    "<i>Send your message. It can be text, a voice message, or media 🎭</i>";
pub const SENT_OK: &str = "<b>✅ Your message has been sent</b>\n<i>Statistics — /mystats</i>";
pub const SELF_MESSAGE: &str = "<i>⚠️ You cannot send a message to yourself.</i>";
pub const SENDER_BLOCKED: &str = "<i>You cannot send messages to this user.</i>";
pub const DELIVERY_FAILED: &str =
    "<i>Could not deliver your message. Please try again later.</i>";
pub const UNSUPPORTED_CONTENT: &str =
    "<i>Only text, voice, photo and GIF messages can be sent anonymously.</i>";
pub const EDITS_NOT_SUPPORTED: &str =
    "<i>⚠️ Edited messages are not relayed. Please send a new message.</i>";
pub const GENERIC_ERROR: &str = "❌ Something went wrong. Please try again later.";

pub const SHARE_BUTTON: &str = "🔗 Share link";
pub const BLOCK_BUTTON: &str = "🚫 Block";
pub const BLOCK_CONFIRMED: &str = "✅ This sender has been blocked.\n\
     They can no longer message you.\n\n\
     Use /blacklist to clear your block list.";
pub const BLOCK_MESSAGE_GONE: &str = "Nothing to block: the message is no longer available.";
pub const UNBLOCKED: &str = "✅ The user has been unblocked and can message you again.";
pub const UNBLOCK_NOT_FOUND: &str = "❌ That user is not on your block list.";
pub const BLACKLIST_CLEARED: &str = "✅ Your block list has been cleared.";
pub const BLACKLIST_EMPTY: &str = "ℹ️ Your block list is already empty.";

pub const ISSUE_CONTACT: &str =
    "Send your ideas and feedback for improving the bot to the maintainer listed in the bot's bio.";
pub const ADMIN_ONLY: &str = "❌ This command is for the operator only.";
pub const DB_CLEARED: &str = "✅ The database has been cleared:\n\
     • messages\n\
     • blocks\n\
     • user statistics";
pub const FORWARD_HINT: &str = "Choose where to forward the message";
pub const INLINE_TITLE: &str = "Share your anonymous message link";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_link_format() {
        assert_eq!(
            share_link("murmurbot", "abc123_-xyz"),
            "t.me/murmurbot?start=abc123_-xyz"
        );
    }

    #[test]
    fn text_notification_escapes_html() {
        let out = text_notification("<script>alert(1)</script> & more");
        assert!(out.contains("&lt;script&gt;"));
        assert!(out.contains("&amp; more"));
        assert!(out.starts_with(NOTIFY_BANNER));
    }

    #[test]
    fn media_notification_with_and_without_caption() {
        assert!(media_notification(Some("hi <b>")).contains("hi &lt;b&gt;"));
        let bare = media_notification(None);
        assert!(bare.contains(NOTIFY_BANNER) && bare.contains(NOTIFY_FOOTER));
    }

    #[test]
    fn welcome_carries_the_link() {
        let link = share_link("murmurbot", "c0000000001");
        assert!(welcome(&link).contains("t.me/murmurbot?start=c0000000001"));
    }
}
