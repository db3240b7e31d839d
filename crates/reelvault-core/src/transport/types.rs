use serde::{Deserialize, Serialize};

/// Kind of file attached to a message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Document,
    Video,
    Audio,
    Photo,
}

impl MediaKind {
    /// Whether copies of this kind get a rewritten caption.
    pub fn takes_caption_template(&self) -> bool {
        matches!(self, MediaKind::Document | MediaKind::Video | MediaKind::Audio)
    }

    /// File name used when the provider reports none.
    pub fn fallback_file_name(&self) -> &'static str {
        match self {
            MediaKind::Video => "video.mp4",
            MediaKind::Audio => "audio.mp3",
            MediaKind::Document | MediaKind::Photo => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileAttachment {
    pub kind: MediaKind,
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl FileAttachment {
    pub fn new(kind: MediaKind, file_id: impl Into<String>) -> Self {
        Self {
            kind,
            file_id: file_id.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.file_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| self.kind.fallback_file_name())
    }
}

/// A message as it exists in its home chat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceMessage {
    pub chat_id: i64,
    pub message_id: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub file: Option<FileAttachment>,
}

impl SourceMessage {
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            chat_id,
            message_id,
            text: None,
            caption: None,
            file: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    pub fn with_file(mut self, file: FileAttachment) -> Self {
        self.file = Some(file);
        self
    }

    /// The attachment, if it is one whose caption gets rewritten on copy.
    pub fn captionable_file(&self) -> Option<&FileAttachment> {
        self.file
            .as_ref()
            .filter(|file| file.kind.takes_caption_template())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

/// Where a forwarded message originally lived.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForwardOrigin {
    pub chat_id: i64,
    pub message_id: i64,
}

/// A message received by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    pub chat_kind: ChatKind,
    pub sender_id: Option<i64>,
    /// Largest photo size, when the message is a photo.
    pub photo_file_id: Option<String>,
    pub forward_origin: Option<ForwardOrigin>,
    /// Content as received (text, caption, file).
    pub content: SourceMessage,
}

impl InboundMessage {
    pub fn new(chat_kind: ChatKind, sender_id: Option<i64>, content: SourceMessage) -> Self {
        Self {
            chat_id: content.chat_id,
            chat_kind,
            sender_id,
            photo_file_id: None,
            forward_origin: None,
            content,
        }
    }

    /// A private-chat message, where the chat id is the sender's id.
    pub fn private(user_id: i64, content: SourceMessage) -> Self {
        Self::new(ChatKind::Private, Some(user_id), content)
    }

    pub fn with_forward_origin(mut self, chat_id: i64, message_id: i64) -> Self {
        self.forward_origin = Some(ForwardOrigin {
            chat_id,
            message_id,
        });
        self
    }

    pub fn with_photo(mut self, file_id: impl Into<String>) -> Self {
        self.photo_file_id = Some(file_id.into());
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.content.text.as_deref()
    }

    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Private
    }
}

/// An inline-button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackQuery {
    pub id: String,
    pub sender_id: i64,
    pub chat_id: Option<i64>,
    pub message_id: Option<i64>,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundUpdate {
    Message(InboundMessage),
    Callback(CallbackQuery),
}
