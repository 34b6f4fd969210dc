use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::BotError;
use crate::llm::Generator;
use crate::markup;
use crate::media::DecodedImage;
use crate::platform::{MarkupMode, Messenger, SentMessage};
use crate::update::InboundEvent;

pub const PLACEHOLDER_TEXT: &str = "Processing your request...";
pub const WELCOME_TEXT: &str =
    "Welcome to Gemini Bot. Send me a message or an image to get started.";
pub const APOLOGY_TEXT: &str =
    "Sorry, I am not able to generate content for you right now. Please try again later.";

/// Long-lived client handles shared by every webhook invocation.
pub struct AppState {
    messenger: Arc<dyn Messenger>,
    generator: Arc<dyn Generator>,
}

impl AppState {
    pub fn new(messenger: Arc<dyn Messenger>, generator: Arc<dyn Generator>) -> Self {
        Self {
            messenger,
            generator,
        }
    }
}

/// Terminal state of a successful invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    EditIgnored,
    WelcomeSent,
    ReplyEdited,
}

/// Instruction returned in the webhook response body, executed by Telegram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FallbackMessage {
    pub method: &'static str,
    pub chat_id: Option<i64>,
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReply {
    Ack,
    Fallback(FallbackMessage),
}

impl WebhookReply {
    pub fn fallback(chat_id: Option<i64>) -> Self {
        WebhookReply::Fallback(FallbackMessage {
            method: "sendMessage",
            chat_id,
            text: APOLOGY_TEXT,
        })
    }
}

/// Turn one raw update into exactly one terminal action.
///
/// Never fails: any fault becomes a fallback apology addressed to the chat,
/// if the chat could be identified.
pub async fn handle_update(state: &AppState, payload: &[u8]) -> WebhookReply {
    let event = match InboundEvent::from_slice(payload) {
        Ok(event) => event,
        Err(e) => {
            error!("Error occurred ({}) before chat was known: {}", e.kind(), e);
            return WebhookReply::fallback(None);
        }
    };

    let chat_id = event.chat_id;
    let mut placeholder = None;

    match process_event(state, &event, &mut placeholder).await {
        Ok(outcome) => {
            debug!("Update for chat {} finished as {:?}", chat_id, outcome);
            WebhookReply::Ack
        }
        Err(e) => {
            error!("Error occurred ({}) in chat {}: {}", e.kind(), chat_id, e);
            if let Some(message) = placeholder {
                warn!(
                    "Placeholder message {} in chat {} left unedited",
                    message.message_id, chat_id
                );
            }
            WebhookReply::fallback(Some(chat_id))
        }
    }
}

async fn process_event(
    state: &AppState,
    event: &InboundEvent,
    placeholder: &mut Option<SentMessage>,
) -> Result<Outcome, BotError> {
    if event.is_edit {
        debug!("Ignoring edited message in chat {}", event.chat_id);
        return Ok(Outcome::EditIgnored);
    }

    let sent = state
        .messenger
        .send_message(event.chat_id, PLACEHOLDER_TEXT, MarkupMode::Plain)
        .await?;
    *placeholder = Some(sent);

    if event.is_start_command() {
        state
            .messenger
            .send_message(event.chat_id, WELCOME_TEXT, MarkupMode::Plain)
            .await?;
        return Ok(Outcome::WelcomeSent);
    }

    let reply = match &event.photo_reference {
        Some(file_id) => describe_photo(state, event, file_id).await?,
        None => {
            let text = event.text.as_deref().ok_or_else(|| {
                BotError::Parse("message has neither text nor photo".to_string())
            })?;
            info!("Generating reply for chat {}", event.chat_id);
            state.generator.generate_text(text).await?
        }
    };

    state
        .messenger
        .edit_message_text(sent, &markup::escape(&reply), MarkupMode::MarkdownV2)
        .await?;

    Ok(Outcome::ReplyEdited)
}

async fn describe_photo(
    state: &AppState,
    event: &InboundEvent,
    file_id: &str,
) -> Result<String, BotError> {
    info!("Image file id is {}", file_id);
    let file = state.messenger.get_file(file_id).await?;
    let bytes = state.messenger.download_bytes(&file).await?;
    let image = DecodedImage::decode(bytes)?;

    let (width, height) = image.dimensions();
    let prompt = event.image_prompt();
    info!(
        "Describing {}x{} {} image with prompt: {}",
        width,
        height,
        image.mime_type(),
        prompt
    );

    state.generator.generate_from_image(prompt, &image).await
}
