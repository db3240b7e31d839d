//! Telegram Bot API transport.
//!
//! Sends, copies, edits and deletes through the Bot API and receives updates
//! by long-polling. The Bot API cannot read arbitrary messages by id, so
//! fetching forwards each message into a private inspection chat, reads the
//! forwarded copy and deletes it again.

use async_trait::async_trait;
use futures::Stream;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::types::{
    CallbackQuery, ChatKind, FileAttachment, ForwardOrigin, InboundMessage, InboundUpdate,
    MediaKind, SourceMessage,
};
use super::{Transport, UpdateSource};
use crate::error::{TransportError, TransportResult};

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org/bot";
/// Default timeout for Telegram API calls (seconds)
const API_TIMEOUT_SECS: u64 = 30;
/// `deleteMessages` accepts at most this many ids per call.
const DELETE_BATCH_LIMIT: usize = 100;
/// Back-off after a failed poll.
const POLL_ERROR_BACKOFF_SECS: u64 = 5;

/// Telegram transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    #[serde(default)]
    pub bot_token: String,
    /// Bot username, used to build `t.me` deep links
    #[serde(default)]
    pub bot_username: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-poll timeout in seconds (default: 30)
    #[serde(default = "default_polling_timeout", alias = "polling_timeout_secs")]
    pub polling_timeout: u32,
    /// Private chat the bot forwards messages into to read their contents
    #[serde(default)]
    pub inspection_chat_id: Option<i64>,
}

fn default_api_base() -> String {
    TELEGRAM_API_BASE.to_string()
}

fn default_polling_timeout() -> u32 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self::new("")
    }
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            bot_username: None,
            api_base: default_api_base(),
            polling_timeout: default_polling_timeout(),
            inspection_chat_id: None,
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into().trim_start_matches('@').to_string());
        self
    }

    /// Point at another Bot API server (e.g. a local one).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_polling_timeout(mut self, timeout: u32) -> Self {
        self.polling_timeout = timeout;
        self
    }

    pub fn with_inspection_chat(mut self, chat_id: i64) -> Self {
        self.inspection_chat_id = Some(chat_id);
        self
    }
}

#[derive(Clone)]
pub struct TelegramTransport {
    config: TelegramConfig,
    client: Client,
    polling_active: Arc<AtomicBool>,
    /// Last update ID for long-polling
    last_update_id: Arc<AtomicI64>,
}

impl TelegramTransport {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            polling_active: Arc::new(AtomicBool::new(false)),
            last_update_id: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn with_token(bot_token: impl Into<String>) -> Self {
        Self::new(TelegramConfig::new(bot_token))
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        !self.config.bot_token.is_empty()
    }

    pub fn last_update_id(&self) -> i64 {
        self.last_update_id.load(Ordering::SeqCst)
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}{}/{}", self.config.api_base, self.config.bot_token, method)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> TransportResult<T> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&params)
            .timeout(timeout)
            .send()
            .await?;

        let status = response.status();
        let body: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(format!("{} ({}): {}", method, status, e)))?;
        body.into_result(method)
    }

    async fn call_default<T: DeserializeOwned>(&self, method: &str, params: Value) -> TransportResult<T> {
        self.call(method, params, Duration::from_secs(API_TIMEOUT_SECS))
            .await
    }

    /// Check the token by calling getMe.
    pub async fn get_me(&self) -> TransportResult<TelegramUser> {
        self.call_default("getMe", json!({})).await
    }

    async fn poll_updates(&self) -> TransportResult<Vec<TelegramUpdate>> {
        let offset = self.last_update_id.load(Ordering::SeqCst);
        let params = json!({
            "offset": if offset > 0 { offset + 1 } else { 0 },
            "timeout": self.config.polling_timeout,
            "allowed_updates": ["message", "callback_query"],
        });

        let updates: Vec<TelegramUpdate> = self
            .call(
                "getUpdates",
                params,
                Duration::from_secs(self.config.polling_timeout as u64 + 10),
            )
            .await?;

        if let Some(last) = updates.last() {
            self.last_update_id.store(last.update_id, Ordering::SeqCst);
        }
        Ok(updates)
    }

    fn convert_update(update: TelegramUpdate) -> Option<InboundUpdate> {
        if let Some(query) = update.callback_query {
            return Some(InboundUpdate::Callback(CallbackQuery {
                id: query.id,
                sender_id: query.from.id,
                chat_id: query.message.as_ref().map(|message| message.chat.id),
                message_id: query.message.as_ref().map(|message| message.message_id),
                data: query.data.unwrap_or_default(),
            }));
        }

        let message = update.message?;
        let chat_kind = match message.chat.r#type.as_str() {
            "private" => ChatKind::Private,
            "channel" => ChatKind::Channel,
            _ => ChatKind::Group,
        };
        let forward_origin = message.forward_origin();
        let photo_file_id = message.largest_photo().map(|photo| photo.file_id.clone());
        let sender_id = message.from.as_ref().map(|user| user.id);
        let chat_id = message.chat.id;
        let message_id = message.message_id;

        Some(InboundUpdate::Message(InboundMessage {
            chat_id,
            chat_kind,
            sender_id,
            photo_file_id,
            forward_origin,
            content: message.into_source(chat_id, message_id),
        }))
    }
}

#[async_trait]
impl Transport for TelegramTransport {
    async fn fetch_messages(&self, chat_id: i64, ids: &[i64]) -> TransportResult<Vec<SourceMessage>> {
        let Some(inspection_chat) = self.config.inspection_chat_id else {
            return Err(TransportError::Api {
                code: 400,
                description: "fetching messages requires telegram.inspection_chat_id".to_string(),
            });
        };

        let mut messages = Vec::with_capacity(ids.len());
        let mut inspected = Vec::new();
        let mut outcome = Ok(());

        for &id in ids {
            let params = json!({
                "chat_id": inspection_chat,
                "from_chat_id": chat_id,
                "message_id": id,
                "disable_notification": true,
            });
            match self.call_default::<TelegramMessage>("forwardMessage", params).await {
                Ok(forwarded) => {
                    inspected.push(forwarded.message_id);
                    messages.push(forwarded.into_source(chat_id, id));
                }
                Err(e @ (TransportError::RateLimited(_) | TransportError::Http(_))) => {
                    outcome = Err(e);
                    break;
                }
                Err(TransportError::NotFound(reason)) => {
                    debug!("Message {} in {} not found: {}", id, chat_id, reason);
                }
                Err(e) => warn!("Cannot read message {} in {}: {}", id, chat_id, e),
            }
        }

        if !inspected.is_empty()
            && let Err(e) = self.delete_messages(inspection_chat, &inspected).await
        {
            warn!("Failed to clean up {} inspection copies: {}", inspected.len(), e);
        }

        outcome.map(|_| messages)
    }

    async fn copy_message(
        &self,
        message: &SourceMessage,
        target_chat_id: i64,
        caption: Option<&str>,
    ) -> TransportResult<i64> {
        let mut params = json!({
            "chat_id": target_chat_id,
            "from_chat_id": message.chat_id,
            "message_id": message.message_id,
        });
        if let Some(caption) = caption {
            params["caption"] = Value::String(caption.to_string());
            params["parse_mode"] = Value::String("HTML".to_string());
        }

        let copied: TelegramMessageId = self.call_default("copyMessage", params).await?;
        Ok(copied.message_id)
    }

    async fn send_message(&self, chat_id: i64, text: &str) -> TransportResult<i64> {
        let params = json!({
            "chat_id": chat_id,
            "text": text,
            "parse_mode": "HTML",
            "link_preview_options": { "is_disabled": true },
        });
        let sent: TelegramMessageId = self.call_default("sendMessage", params).await?;
        Ok(sent.message_id)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> TransportResult<()> {
        let params = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
            "parse_mode": "HTML",
            "link_preview_options": { "is_disabled": true },
        });
        let _: Value = self.call_default("editMessageText", params).await?;
        Ok(())
    }

    async fn delete_messages(&self, chat_id: i64, ids: &[i64]) -> TransportResult<()> {
        for batch in ids.chunks(DELETE_BATCH_LIMIT) {
            let params = json!({ "chat_id": chat_id, "message_ids": batch });
            let _: bool = self.call_default("deleteMessages", params).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for TelegramTransport {
    fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundUpdate> + Send>>> {
        if !self.is_configured() {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let transport = self.clone();

        tokio::spawn(async move {
            transport.polling_active.store(true, Ordering::SeqCst);
            info!("Starting Telegram polling");

            while transport.polling_active.load(Ordering::SeqCst) {
                match transport.poll_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            let Some(update) = Self::convert_update(update) else {
                                continue;
                            };
                            if tx.send(update).is_err() {
                                warn!("Update receiver dropped, stopping polling");
                                transport.polling_active.store(false, Ordering::SeqCst);
                                break;
                            }
                        }
                    }
                    Err(TransportError::RateLimited(wait)) => {
                        warn!("Polling rate limited, waiting {}s", wait.as_secs());
                        tokio::time::sleep(wait).await;
                    }
                    Err(e) => {
                        error!("Telegram polling error: {}", e);
                        tokio::time::sleep(Duration::from_secs(POLL_ERROR_BACKOFF_SECS)).await;
                    }
                }
            }

            info!("Telegram polling stopped");
        });

        Some(Box::pin(
            tokio_stream::wrappers::UnboundedReceiverStream::new(rx),
        ))
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()> {
        let mut params = json!({ "callback_query_id": callback_id });
        if let Some(text) = text {
            params["text"] = Value::String(text.to_string());
        }
        let _: bool = self.call_default("answerCallbackQuery", params).await?;
        Ok(())
    }

    fn stop_receiving(&self) {
        self.polling_active.store(false, Ordering::SeqCst);
    }
}

/// Map a Bot API failure onto the transport taxonomy.
fn classify_error(
    code: Option<i64>,
    description: String,
    parameters: Option<ResponseParameters>,
) -> TransportError {
    let retry_after = parameters.and_then(|p| p.retry_after);
    if code == Some(429) || retry_after.is_some() {
        return TransportError::RateLimited(Duration::from_secs(retry_after.unwrap_or(1)));
    }

    let lowered = description.to_lowercase();
    if lowered.contains("message is not modified") {
        TransportError::NotModified
    } else if lowered.contains("not found") || lowered.contains("message_id_invalid") {
        TransportError::NotFound(description)
    } else {
        TransportError::Api {
            code: code.unwrap_or_default(),
            description,
        }
    }
}

// ============================================================================
// Telegram API Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
    parameters: Option<ResponseParameters>,
}

impl<T> TelegramResponse<T> {
    fn into_result(self, method: &str) -> TransportResult<T> {
        if self.ok {
            return self
                .result
                .ok_or_else(|| TransportError::Decode(format!("{} returned ok but no result", method)));
        }
        Err(classify_error(
            self.error_code,
            self.description.unwrap_or_default(),
            self.parameters,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TelegramUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
    callback_query: Option<TelegramCallbackQuery>,
}

#[derive(Debug, Deserialize)]
struct TelegramCallbackQuery {
    id: String,
    from: TelegramUser,
    message: Option<TelegramMessage>,
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessageId {
    message_id: i64,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    message_id: i64,
    from: Option<TelegramUser>,
    chat: TelegramChat,
    text: Option<String>,
    caption: Option<String>,
    document: Option<TelegramFile>,
    video: Option<TelegramFile>,
    audio: Option<TelegramFile>,
    photo: Option<Vec<TelegramPhotoSize>>,
    forward_origin: Option<TelegramMessageOrigin>,
    forward_from_chat: Option<TelegramChat>,
    forward_from_message_id: Option<i64>,
}

impl TelegramMessage {
    fn largest_photo(&self) -> Option<&TelegramPhotoSize> {
        self.photo
            .as_ref()?
            .iter()
            .max_by_key(|photo| photo.file_size.unwrap_or(0))
    }

    fn forward_origin(&self) -> Option<ForwardOrigin> {
        if let Some(origin) = &self.forward_origin
            && let (Some(chat), Some(message_id)) = (&origin.chat, origin.message_id)
        {
            return Some(ForwardOrigin {
                chat_id: chat.id,
                message_id,
            });
        }
        match (&self.forward_from_chat, self.forward_from_message_id) {
            (Some(chat), Some(message_id)) => Some(ForwardOrigin {
                chat_id: chat.id,
                message_id,
            }),
            _ => None,
        }
    }

    fn attachment(&self) -> Option<FileAttachment> {
        let with_name = |kind: MediaKind, file: &TelegramFile| {
            let attachment = FileAttachment::new(kind, file.file_id.clone());
            match &file.file_name {
                Some(name) => attachment.with_file_name(name.clone()),
                None => attachment,
            }
        };
        if let Some(document) = &self.document {
            return Some(with_name(MediaKind::Document, document));
        }
        if let Some(video) = &self.video {
            return Some(with_name(MediaKind::Video, video));
        }
        if let Some(audio) = &self.audio {
            return Some(with_name(MediaKind::Audio, audio));
        }
        self.largest_photo()
            .map(|photo| FileAttachment::new(MediaKind::Photo, photo.file_id.clone()))
    }

    /// Content of this message, addressed as `chat_id`/`message_id`.
    fn into_source(self, chat_id: i64, message_id: i64) -> SourceMessage {
        let file = self.attachment();
        SourceMessage {
            chat_id,
            message_id,
            text: self.text,
            caption: self.caption,
            file,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramMessageOrigin {
    #[allow(dead_code)]
    r#type: String,
    chat: Option<TelegramChat>,
    message_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TelegramFile {
    file_id: String,
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramPhotoSize {
    file_id: String,
    file_size: Option<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TelegramChat {
    id: i64,
    #[serde(default)]
    r#type: String,
}

// ============================================================================
// Tests
// ============================================================================
