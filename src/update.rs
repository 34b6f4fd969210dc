use serde::Deserialize;

use crate::error::BotError;

/// Bot command that triggers the welcome message.
pub const START_COMMAND: &str = "/start";

/// Prompt used for a photo sent without a caption.
pub const DEFAULT_IMAGE_PROMPT: &str = "Describe the image";

/// The subset of a Telegram `Update` the webhook cares about.
#[derive(Debug, Deserialize)]
struct RawUpdate {
    message: Option<RawMessage>,
    edited_message: Option<RawMessage>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    chat: RawChat,
    text: Option<String>,
    caption: Option<String>,
    /// Telegram lists every available size of the same photo.
    #[serde(default)]
    photo: Vec<RawPhotoSize>,
}

#[derive(Debug, Deserialize)]
struct RawChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawPhotoSize {
    file_id: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// One received notification, reduced to what the handler acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub chat_id: i64,
    pub is_edit: bool,
    pub text: Option<String>,
    /// File id of the largest size of an attached photo.
    pub photo_reference: Option<String>,
    pub caption: Option<String>,
}

impl InboundEvent {
    pub fn from_slice(payload: &[u8]) -> Result<Self, BotError> {
        let update: RawUpdate = serde_json::from_slice(payload)?;
        Self::from_update(update)
    }

    fn from_update(update: RawUpdate) -> Result<Self, BotError> {
        let is_edit = update.edited_message.is_some();
        let message = update
            .message
            .or(update.edited_message)
            .ok_or_else(|| BotError::Parse("update carries no message".to_string()))?;

        // Ties resolve to the last entry, which is the largest in Telegram's ordering.
        let photo_reference = message
            .photo
            .into_iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
            .map(|p| p.file_id);

        Ok(Self {
            chat_id: message.chat.id,
            is_edit,
            text: message.text,
            photo_reference,
            caption: message.caption,
        })
    }

    pub fn is_start_command(&self) -> bool {
        self.text.as_deref() == Some(START_COMMAND)
    }

    /// Prompt to pair with an attached photo: the caption, unless it is empty.
    pub fn image_prompt(&self) -> &str {
        match self.caption.as_deref() {
            Some(caption) if !caption.is_empty() => caption,
            _ => DEFAULT_IMAGE_PROMPT,
        }
    }
}
