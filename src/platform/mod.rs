pub mod telegram;

use async_trait::async_trait;

use crate::error::BotError;

/// How the platform should interpret message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupMode {
    Plain,
    MarkdownV2,
}

/// A message the bot has sent and may edit later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Server-side handle to an uploaded file, valid for downloading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub file_id: String,
    pub path: String,
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        mode: MarkupMode,
    ) -> Result<SentMessage, BotError>;

    async fn edit_message_text(
        &self,
        message: SentMessage,
        text: &str,
        mode: MarkupMode,
    ) -> Result<(), BotError>;

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, BotError>;

    async fn download_bytes(&self, file: &RemoteFile) -> Result<Vec<u8>, BotError>;
}

