//! In-memory stand-ins for Telegram and Gemini used by unit tests.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::BotError;
use crate::llm::Generator;
use crate::media::DecodedImage;
use crate::platform::{MarkupMode, Messenger, RemoteFile, SentMessage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Send {
        chat_id: i64,
        text: String,
        mode: MarkupMode,
    },
    Edit {
        chat_id: i64,
        message_id: i32,
        text: String,
        mode: MarkupMode,
    },
    GetFile(String),
    Download(String),
}

impl Call {
    pub fn send(chat_id: i64, text: &str, mode: MarkupMode) -> Self {
        Call::Send {
            chat_id,
            text: text.to_string(),
            mode,
        }
    }
}

/// Outbound operation a `RecordingMessenger` can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Send,
    Edit,
    GetFile,
    Download,
}

/// Records every successful outbound call; message ids start at 1.
pub struct RecordingMessenger {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    file_bytes: Vec<u8>,
    fail_at: Option<FailAt>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::with_file(Vec::new())
    }

    pub fn with_file(file_bytes: Vec<u8>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1),
            file_bytes,
            fail_at: None,
        }
    }

    pub fn failing_at(self, fail_at: FailAt) -> Self {
        Self {
            fail_at: Some(fail_at),
            ..self
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn check(&self, operation: FailAt) -> Result<(), BotError> {
        if self.fail_at == Some(operation) {
            let err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
            return Err(BotError::transport("telegram", err));
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        mode: MarkupMode,
    ) -> Result<SentMessage, BotError> {
        self.check(FailAt::Send)?;
        self.record(Call::send(chat_id, text, mode));
        Ok(SentMessage {
            chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn edit_message_text(
        &self,
        message: SentMessage,
        text: &str,
        mode: MarkupMode,
    ) -> Result<(), BotError> {
        self.check(FailAt::Edit)?;
        self.record(Call::Edit {
            chat_id: message.chat_id,
            message_id: message.message_id,
            text: text.to_string(),
            mode,
        });
        Ok(())
    }

    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, BotError> {
        self.check(FailAt::GetFile)?;
        self.record(Call::GetFile(file_id.to_string()));
        Ok(RemoteFile {
            file_id: file_id.to_string(),
            path: format!("photos/{}.jpg", file_id),
        })
    }

    async fn download_bytes(&self, file: &RemoteFile) -> Result<Vec<u8>, BotError> {
        self.check(FailAt::Download)?;
        self.record(Call::Download(file.file_id.clone()));
        Ok(self.file_bytes.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Text(String),
    Image {
        prompt: String,
        mime_type: &'static str,
    },
}

/// Returns a fixed reply, or a backend fault when built with `failing`.
pub struct ScriptedGenerator {
    reply: Option<String>,
    calls: Mutex<Vec<Generation>>,
}

impl ScriptedGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Generation> {
        self.calls.lock().unwrap().clone()
    }

    fn respond(&self, call: Generation) -> Result<String, BotError> {
        self.calls.lock().unwrap().push(call);
        self.reply
            .clone()
            .ok_or_else(|| BotError::Backend("quota exceeded".to_string()))
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate_text(&self, prompt: &str) -> Result<String, BotError> {
        self.respond(Generation::Text(prompt.to_string()))
    }

    async fn generate_from_image(
        &self,
        prompt: &str,
        image: &DecodedImage,
    ) -> Result<String, BotError> {
        self.respond(Generation::Image {
            prompt: prompt.to_string(),
            mime_type: image.mime_type(),
        })
    }
}
