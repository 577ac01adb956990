use serde::{Deserialize, Serialize};

/// The four content kinds the relay accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Voice,
    Photo,
    Animation,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Voice => "voice",
            MessageKind::Photo => "photo",
            MessageKind::Animation => "animation",
        }
    }

}

impl std::str::FromStr for MessageKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "voice" => Ok(MessageKind::Voice),
            "photo" => Ok(MessageKind::Photo),
            "animation" => Ok(MessageKind::Animation),
            _ => Err(UnknownKind),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownKind;

impl std::fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("unknown message kind")
    }
}

impl std::error::Error for UnknownKind {}

/// One anonymous message's content, independent of who sent it.
/// For `Text`, `content` is the message body; for media kinds it is the
/// platform file id of the media object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub kind: MessageKind,
    pub content: String,
    pub caption: Option<String>,
}

impl MessagePayload {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Text,
            content: body.into(),
            caption: None,
        }
    }
}
