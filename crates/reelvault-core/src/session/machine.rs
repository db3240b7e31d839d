//! Turning an admin's next message into a catalog command.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::model::{Session, SessionAction};
use super::store::SessionStore;
use crate::error::SessionError;
use crate::models::{CatalogCoordinates, SeriesDetails};
use crate::transport::{InboundMessage, SourceMessage};

/// Catalog node a typed name creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Language,
    Season,
    BatchQuality,
    Episode,
    EpisodeQuality,
}

/// Both boundaries of a batch, captured from one source channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCapture {
    pub coordinates: CatalogCoordinates,
    pub source_channel_id: i64,
    pub first_id: i64,
    pub last_id: i64,
}

/// What a completed session asks the catalog to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    AddNode {
        kind: NodeKind,
        at: CatalogCoordinates,
        name: String,
    },
    SetPoster {
        series_id: String,
        file_id: String,
    },
    UpdateDetails {
        series_id: String,
        details: SeriesDetails,
    },
    ReplicateBatch(BatchCapture),
    StoreEpisodeFile {
        at: CatalogCoordinates,
        message: SourceMessage,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// No session; the input is ordinary chat (search).
    NotInSession,
    /// The first batch boundary was captured; waiting for the last.
    Advanced { anchor_message_id: Option<i64> },
    /// The session finished with a command.
    Consumed {
        command: SessionCommand,
        anchor_message_id: Option<i64>,
    },
    /// Malformed input; the session is kept as it was.
    Rejected(SessionError),
    /// Not the kind of input the session waits for (e.g. a command).
    Ignored,
}

pub struct SessionMachine {
    store: SessionStore,
}

impl SessionMachine {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Start `action` for a user, replacing any pending session.
    pub async fn begin(
        &self,
        user_id: i64,
        action: SessionAction,
        coordinates: CatalogCoordinates,
        anchor_message_id: Option<i64>,
    ) -> Session {
        let mut session = Session::new(action, coordinates);
        session.anchor_message_id = anchor_message_id;
        if let Some(previous) = self.store.set(user_id, session.clone()).await {
            debug!(
                "Session {:?} of {} replaced by {:?}",
                previous.action, user_id, action
            );
        }
        session
    }

    pub async fn current(&self, user_id: i64) -> Option<Session> {
        self.store.get(user_id).await
    }

    pub async fn cancel(&self, user_id: i64) -> Option<Session> {
        self.store.clear(user_id).await
    }

    /// Feed a message from `user_id` to their session.
    pub async fn consume(&self, user_id: i64, input: &InboundMessage) -> Transition {
        self.store
            .with_session(user_id, |session| step(session, input))
            .await
            .unwrap_or(Transition::NotInSession)
    }
}

fn rejected(reason: impl Into<String>) -> (Transition, bool) {
    (Transition::Rejected(SessionError::Validation(reason.into())), true)
}

fn consumed(session: &Session, command: SessionCommand) -> (Transition, bool) {
    (
        Transition::Consumed {
            command,
            anchor_message_id: session.anchor_message_id,
        },
        false,
    )
}

/// One state transition. The bool tells whether the session stays.
fn step(session: &mut Session, input: &InboundMessage) -> (Transition, bool) {
    let text = input
        .text()
        .map(str::trim)
        .filter(|text| !text.starts_with('/'));
    if input.text().is_some_and(|text| text.trim().starts_with('/')) {
        return (Transition::Ignored, true);
    }

    let kind = match session.action {
        SessionAction::Idle => return (Transition::NotInSession, false),
        SessionAction::AddingLanguage => Some(NodeKind::Language),
        SessionAction::AddingSeason => Some(NodeKind::Season),
        SessionAction::AddingQuality => Some(NodeKind::BatchQuality),
        SessionAction::AddingEpisode => Some(NodeKind::Episode),
        SessionAction::AddingEpisodeQuality => Some(NodeKind::EpisodeQuality),
        _ => None,
    };
    if let Some(kind) = kind {
        return match text {
            Some("") => rejected("The name cannot be empty."),
            Some(name) => consumed(
                session,
                SessionCommand::AddNode {
                    kind,
                    at: session.coordinates.clone(),
                    name: name.to_string(),
                },
            ),
            None => (Transition::Ignored, true),
        };
    }

    match session.action {
        SessionAction::UpdatingPoster => match &input.photo_file_id {
            Some(file_id) => consumed(
                session,
                SessionCommand::SetPoster {
                    series_id: session.coordinates.series_id.clone(),
                    file_id: file_id.clone(),
                },
            ),
            None => rejected("Send the poster as a photo."),
        },
        SessionAction::EditingDetails => match text.and_then(SeriesDetails::parse) {
            Some(details) => consumed(
                session,
                SessionCommand::UpdateDetails {
                    series_id: session.coordinates.series_id.clone(),
                    details,
                },
            ),
            None => rejected("No details found. Use lines like `Title: Dark` or `Year: 2017`."),
        },
        SessionAction::AwaitingBatchFirst => {
            let Some(origin) = input.forward_origin else {
                return rejected("Forward the first message from the source channel.");
            };
            session.action = SessionAction::AwaitingBatchLast;
            session.pending_first_id = Some(origin.message_id);
            session.pending_source_channel = Some(origin.chat_id);
            info!(
                "Batch start captured: message {} of {}",
                origin.message_id, origin.chat_id
            );
            (
                Transition::Advanced {
                    anchor_message_id: session.anchor_message_id,
                },
                true,
            )
        }
        SessionAction::AwaitingBatchLast => {
            let Some(origin) = input.forward_origin else {
                return rejected("Forward the last message from the source channel.");
            };
            let (Some(first_id), Some(channel_id)) =
                (session.pending_first_id, session.pending_source_channel)
            else {
                return (
                    Transition::Rejected(SessionError::Validation(
                        "The first message was lost. Start the batch again.".to_string(),
                    )),
                    false,
                );
            };
            if origin.chat_id != channel_id {
                return rejected(format!(
                    "The last message must come from the same channel as the first ({}), not {}.",
                    channel_id, origin.chat_id
                ));
            }
            consumed(
                session,
                SessionCommand::ReplicateBatch(BatchCapture {
                    coordinates: session.coordinates.clone(),
                    source_channel_id: channel_id,
                    first_id,
                    last_id: origin.message_id,
                }),
            )
        }
        SessionAction::AwaitingEpisodeFile => {
            if input.content.file.is_none() {
                return rejected("Send the episode as a file or video.");
            }
            consumed(
                session,
                SessionCommand::StoreEpisodeFile {
                    at: session.coordinates.clone(),
                    message: input.content.clone(),
                },
            )
        }
        // Name-entry states returned above.
        _ => (Transition::Ignored, true),
    }
}
