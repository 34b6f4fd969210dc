use anyhow::{Context, Result};
use async_trait::async_trait;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{FileId, MessageId, ParseMode};
use tracing::{debug, info};

use crate::error::BotError;
use crate::platform::{MarkupMode, Messenger, RemoteFile, SentMessage};

const SERVICE: &str = "telegram";

/// `Messenger` backed by the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Point Telegram at `<base_url>/webhook`.
    pub async fn register_webhook(&self, base_url: &str) -> Result<()> {
        let url = webhook_endpoint(base_url)?;
        self.bot
            .set_webhook(url.clone())
            .await
            .with_context(|| format!("Failed to register webhook at {}", url))?;
        info!("Webhook registered at {}", url);
        Ok(())
    }
}

fn webhook_endpoint(base_url: &str) -> Result<reqwest::Url> {
    let endpoint = format!("{}/webhook", base_url.trim_end_matches('/'));
    reqwest::Url::parse(&endpoint).with_context(|| format!("Invalid webhook URL: {}", endpoint))
}

fn parse_mode(mode: MarkupMode) -> Option<ParseMode> {
    match mode {
        MarkupMode::Plain => None,
        MarkupMode::MarkdownV2 => Some(ParseMode::MarkdownV2),
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        mode: MarkupMode,
    ) -> Result<SentMessage, BotError> {
        let mut request = self.bot.send_message(ChatId(chat_id), text);
        if let Some(parse_mode) = parse_mode(mode) {
            request = request.parse_mode(parse_mode);
        }
        let message = request
            .await
            .map_err(|e| BotError::transport(SERVICE, e))?;

        Ok(SentMessage {
            chat_id,
            message_id: message.id.0,
        })
    }

    async fn edit_message_text(
        &self,
        message: SentMessage,
        text: &str,
        mode: MarkupMode,
    ) -> Result<(), BotError> {
        let mut request = self.bot.edit_message_text(
            ChatId(message.chat_id),
            MessageId(message.message_id),
            text,
        );
        if let Some(parse_mode) = parse_mode(mode) {
            request = request.parse_mode(parse_mode);
        }
        request
            .await
            .map_err(|e| BotError::transport(SERVICE, e))?;
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, BotError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| BotError::transport(SERVICE, e))?;

        debug!("Resolved file {} to {}", file_id, file.path);
        Ok(RemoteFile {
            file_id: file_id.to_string(),
            path: file.path,
        })
    }

    async fn download_bytes(&self, file: &RemoteFile) -> Result<Vec<u8>, BotError> {
        debug!("Downloading file {}", file.file_id);
        let mut bytes = Vec::new();
        self.bot
            .download_file(&file.path, &mut bytes)
            .await
            .map_err(|e| BotError::transport(SERVICE, e))?;
        Ok(bytes)
    }
}
