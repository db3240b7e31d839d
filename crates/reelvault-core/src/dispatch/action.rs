//! Admin button payloads.
//!
//! Callback data is `<token>:<series>[:<lang>[:<season>[:<episode-or-quality>[:<quality>]]]]`,
//! decoded once into a [`CallbackAction`]. Node ids are short, so the whole
//! payload stays within the 64 bytes Telegram allows.

use std::fmt;
use std::str::FromStr;

use crate::error::SessionError;
use crate::models::CatalogCoordinates;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    AddLanguage,
    AddSeason,
    AddQuality,
    BeginBatch,
    AddEpisode,
    AddEpisodeQuality,
    BeginEpisodeFile,
    UpdatePoster,
    EditDetails,
    TogglePublish,
    PublishQuality,
    ClearEpisodes,
    DeleteLanguage,
    DeleteSeason,
    DeleteQuality,
    DeleteEpisode,
    DeleteEpisodeQuality,
    DeleteSeries,
    Cancel,
}

impl ActionKind {
    const ALL: [ActionKind; 19] = [
        ActionKind::AddLanguage,
        ActionKind::AddSeason,
        ActionKind::AddQuality,
        ActionKind::BeginBatch,
        ActionKind::AddEpisode,
        ActionKind::AddEpisodeQuality,
        ActionKind::BeginEpisodeFile,
        ActionKind::UpdatePoster,
        ActionKind::EditDetails,
        ActionKind::TogglePublish,
        ActionKind::PublishQuality,
        ActionKind::ClearEpisodes,
        ActionKind::DeleteLanguage,
        ActionKind::DeleteSeason,
        ActionKind::DeleteQuality,
        ActionKind::DeleteEpisode,
        ActionKind::DeleteEpisodeQuality,
        ActionKind::DeleteSeries,
        ActionKind::Cancel,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            ActionKind::AddLanguage => "addlang",
            ActionKind::AddSeason => "addseason",
            ActionKind::AddQuality => "addquality",
            ActionKind::BeginBatch => "batch",
            ActionKind::AddEpisode => "addepisode",
            ActionKind::AddEpisodeQuality => "addepquality",
            ActionKind::BeginEpisodeFile => "epfile",
            ActionKind::UpdatePoster => "poster",
            ActionKind::EditDetails => "details",
            ActionKind::TogglePublish => "publish",
            ActionKind::PublishQuality => "publishquality",
            ActionKind::ClearEpisodes => "clearepisodes",
            ActionKind::DeleteLanguage => "dellang",
            ActionKind::DeleteSeason => "delseason",
            ActionKind::DeleteQuality => "delquality",
            ActionKind::DeleteEpisode => "delepisode",
            ActionKind::DeleteEpisodeQuality => "delepquality",
            ActionKind::DeleteSeries => "delseries",
            ActionKind::Cancel => "cancel",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.token() == token)
    }

    /// Which coordinates the action needs, as (lang, season, episode, quality).
    fn required(&self) -> (bool, bool, bool, bool) {
        match self {
            ActionKind::AddLanguage
            | ActionKind::UpdatePoster
            | ActionKind::EditDetails
            | ActionKind::TogglePublish
            | ActionKind::DeleteSeries
            | ActionKind::Cancel => (false, false, false, false),
            ActionKind::AddSeason | ActionKind::DeleteLanguage => (true, false, false, false),
            ActionKind::AddQuality
            | ActionKind::AddEpisode
            | ActionKind::ClearEpisodes
            | ActionKind::DeleteSeason => (true, true, false, false),
            ActionKind::BeginBatch | ActionKind::PublishQuality | ActionKind::DeleteQuality => {
                (true, true, false, true)
            }
            ActionKind::AddEpisodeQuality | ActionKind::DeleteEpisode => (true, true, true, false),
            ActionKind::BeginEpisodeFile | ActionKind::DeleteEpisodeQuality => {
                (true, true, true, true)
            }
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A decoded admin button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackAction {
    pub kind: ActionKind,
    pub at: CatalogCoordinates,
}

impl CallbackAction {
    pub fn new(kind: ActionKind, at: CatalogCoordinates) -> Self {
        Self { kind, at }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lang, season, episode, quality) = self.kind.required();
        write!(f, "{}", self.kind)?;
        if self.kind == ActionKind::Cancel {
            return Ok(());
        }
        write!(f, ":{}", self.at.series_id)?;
        let parts = [
            (lang, self.at.lang()),
            (season, self.at.season()),
            (episode, self.at.episode()),
            (quality, self.at.quality()),
        ];
        for (needed, value) in parts {
            if needed {
                write!(f, ":{}", value.unwrap_or_default())?;
            }
        }
        Ok(())
    }
}

impl FromStr for CallbackAction {
    type Err = SessionError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || SessionError::Validation(format!("Unknown action '{}'", data));
        let mut segments = data.trim().split(':');
        let kind = segments
            .next()
            .and_then(ActionKind::from_token)
            .ok_or_else(invalid)?;
        if kind == ActionKind::Cancel {
            return Ok(Self::new(kind, CatalogCoordinates::default()));
        }

        let ids: Vec<&str> = segments.collect();
        let (lang, season, episode, quality) = kind.required();
        let expected = 1 + [lang, season, episode, quality]
            .iter()
            .filter(|needed| **needed)
            .count();
        if ids.len() != expected || ids.iter().any(|id| id.is_empty()) {
            return Err(invalid());
        }

        let mut rest = ids[1..].iter();
        let mut at = CatalogCoordinates::series(ids[0]);
        if lang {
            at.lang_id = rest.next().map(|id| id.to_string());
        }
        if season {
            at.season_id = rest.next().map(|id| id.to_string());
        }
        if episode {
            at.episode_id = rest.next().map(|id| id.to_string());
        }
        if quality {
            at.quality_id = rest.next().map(|id| id.to_string());
        }
        Ok(Self::new(kind, at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_are_unique() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_token(kind.token()), Some(kind));
        }
    }

    #[test]
    fn test_display_and_parse() {
        let action = CallbackAction::new(
            ActionKind::BeginBatch,
            CatalogCoordinates::series("s1")
                .with_lang("en")
                .with_season("s01")
                .with_quality("q720"),
        );
        assert_eq!(action.to_string(), "batch:s1:en:s01:q720");
        assert_eq!("batch:s1:en:s01:q720".parse::<CallbackAction>(), Ok(action));

        let file = "epfile:s1:en:s01:e1:q720".parse::<CallbackAction>().unwrap();
        assert_eq!(file.at.episode(), Some("e1"));
        assert_eq!(file.at.quality(), Some("q720"));
        assert_eq!(file.to_string(), "epfile:s1:en:s01:e1:q720");
    }

    #[test]
    fn test_payload_fits_callback_limit() {
        let action = CallbackAction::new(
            ActionKind::DeleteEpisodeQuality,
            CatalogCoordinates::series("a1b2c3d4")
                .with_lang("a1b2c3d4")
                .with_season("a1b2c3d4")
                .with_episode("a1b2c3d4")
                .with_quality("a1b2c3d4"),
        );
        assert!(action.to_string().len() <= 64);
    }

    #[test]
    fn test_cancel_has_no_coordinates() {
        let cancel: CallbackAction = "cancel".parse().unwrap();
        assert_eq!(cancel.kind, ActionKind::Cancel);
        assert_eq!(cancel.to_string(), "cancel");
    }

    #[test]
    fn test_rejects_unknown_and_incomplete() {
        assert!("explode:s1".parse::<CallbackAction>().is_err());
        assert!("addseason:s1".parse::<CallbackAction>().is_err());
        assert!("addlang:s1:extra".parse::<CallbackAction>().is_err());
        assert!("addseason:s1:".parse::<CallbackAction>().is_err());
        assert!("".parse::<CallbackAction>().is_err());
    }
}
