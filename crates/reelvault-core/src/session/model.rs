use serde::{Deserialize, Serialize};

use crate::models::CatalogCoordinates;

/// What an admin's next message will be taken as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    #[default]
    Idle,
    AddingLanguage,
    AddingSeason,
    AddingQuality,
    AddingEpisode,
    AddingEpisodeQuality,
    UpdatingPoster,
    EditingDetails,
    AwaitingBatchFirst,
    AwaitingBatchLast,
    AwaitingEpisodeFile,
}

impl SessionAction {
    /// Prompt shown when the action begins.
    pub fn prompt(&self) -> &'static str {
        match self {
            SessionAction::Idle => "",
            SessionAction::AddingLanguage => "Send the language name.",
            SessionAction::AddingSeason => "Send the season name (e.g. Season 1).",
            SessionAction::AddingQuality => "Send the quality name (e.g. 720p).",
            SessionAction::AddingEpisode => "Send the episode name (e.g. Episode 1).",
            SessionAction::AddingEpisodeQuality => "Send the episode quality name.",
            SessionAction::UpdatingPoster => "Send the poster as a photo.",
            SessionAction::EditingDetails => {
                "Send the details as lines:\nTitle: ...\nYear: ...\nGenre: ...\nRating: ..."
            }
            SessionAction::AwaitingBatchFirst => {
                "Forward the FIRST message of the batch from the source channel."
            }
            SessionAction::AwaitingBatchLast => {
                "Now forward the LAST message of the batch from the same channel."
            }
            SessionAction::AwaitingEpisodeFile => "Send or forward the episode file.",
        }
    }
}

/// One pending multi-step operation of one admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub action: SessionAction,
    pub coordinates: CatalogCoordinates,
    /// Bot message the session edits in place.
    pub anchor_message_id: Option<i64>,
    pub pending_first_id: Option<i64>,
    pub pending_source_channel: Option<i64>,
    /// Last activity (Unix ms).
    pub last_activity: i64,
}

impl Session {
    pub fn new(action: SessionAction, coordinates: CatalogCoordinates) -> Self {
        Self {
            action,
            coordinates,
            anchor_message_id: None,
            pending_first_id: None,
            pending_source_channel: None,
            last_activity: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn with_anchor(mut self, message_id: i64) -> Self {
        self.anchor_message_id = Some(message_id);
        self
    }

    pub fn touch(&mut self) {
        self.last_activity = chrono::Utc::now().timestamp_millis();
    }

    pub fn is_stale(&self, max_age_ms: i64) -> bool {
        let now = chrono::Utc::now().timestamp_millis();
        now - self.last_activity > max_age_ms
    }
}
