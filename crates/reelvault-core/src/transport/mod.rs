//! Messaging transport boundary.
//!
//! Any call may fail with [`TransportError::RateLimited`] carrying the wait the
//! provider asked for. Callers own the retry discipline.

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod telegram;
pub mod types;

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::TransportResult;

pub use telegram::{TelegramConfig, TelegramTransport};
pub use types::{
    CallbackQuery, ChatKind, FileAttachment, ForwardOrigin, InboundMessage, InboundUpdate,
    MediaKind, SourceMessage,
};

/// Send/copy/edit/delete primitives against a chat provider.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch messages by id. Ids that no longer exist are omitted from the result.
    async fn fetch_messages(&self, chat_id: i64, ids: &[i64]) -> TransportResult<Vec<SourceMessage>>;

    /// Copy a message into `target_chat_id`, optionally replacing its caption.
    /// Returns the id of the new message.
    async fn copy_message(
        &self,
        message: &SourceMessage,
        target_chat_id: i64,
        caption: Option<&str>,
    ) -> TransportResult<i64>;

    /// Send an HTML text message, returning its id.
    async fn send_message(&self, chat_id: i64, text: &str) -> TransportResult<i64>;

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> TransportResult<()>;

    async fn delete_messages(&self, chat_id: i64, ids: &[i64]) -> TransportResult<()>;
}

/// Source of inbound updates for the bot runtime.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Start receiving. Returns `None` if the source is not configured.
    fn start_receiving(&self) -> Option<Pin<Box<dyn Stream<Item = InboundUpdate> + Send>>>;

    /// Acknowledge a button press, optionally showing a toast.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> TransportResult<()>;

    fn stop_receiving(&self);
}
