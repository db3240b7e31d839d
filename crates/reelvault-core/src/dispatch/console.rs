//! Admin console: catalog commands, button actions and session outputs.
//!
//! Every entry point returns the reply text for the admin. Store failures
//! are logged and turned into a failure reply; they never leave a session
//! half-consumed.

use anyhow::{Result, anyhow};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::action::{ActionKind, CallbackAction};
use super::view::admin_tree;
use crate::announce::{AnnounceOutcome, Announcer, RecentBoard};
use crate::html::escape_html;
use crate::metadata::{MetadataClient, SeriesMetadata};
use crate::models::{CatalogCoordinates, Series};
use crate::replication::{BatchJob, BatchReplicationEngine, EpisodeFileJob};
use crate::session::{
    NodeKind, SessionAction, SessionCommand, SessionMachine, Transition,
};
use crate::storage::Storage;
use crate::transport::InboundMessage;

const ADMIN_HELP: &str = "<b>Admin commands</b>
/newseries Title | Year | IMDb id
/newseries &lt;name&gt; - look the series up (needs a TMDB or OMDb key)
/pick &lt;result id&gt; - create a series from a lookup result
/series - list all series
/show &lt;id&gt; - catalog tree with action payloads
/do &lt;payload&gt; - run an action, e.g. <code>addlang:a1b2c3d4</code>
/recent &lt;channel id&gt; - post the recently added list there
/filecaption &lt;template&gt; - set your caption template
/viewcaption - show your caption template
/delcaption - back to the default template
/cancel - drop the pending step";

/// What a session made of an admin's message.
#[derive(Debug, Clone, PartialEq)]
pub enum InputStep {
    /// No session took the message.
    Pass,
    Reply(String),
    /// The session finished; run the command with [`AdminConsole::execute`].
    Execute(SessionCommand),
}

pub struct AdminConsole {
    storage: Storage,
    sessions: Arc<SessionMachine>,
    engine: Arc<BatchReplicationEngine>,
    announcer: Arc<Announcer>,
    metadata: Option<Arc<MetadataClient>>,
    recent: Option<Arc<RecentBoard>>,
}

impl AdminConsole {
    pub fn new(
        storage: Storage,
        sessions: Arc<SessionMachine>,
        engine: Arc<BatchReplicationEngine>,
        announcer: Arc<Announcer>,
    ) -> Self {
        Self {
            storage,
            sessions,
            engine,
            announcer,
            metadata: None,
            recent: None,
        }
    }

    pub fn with_recent_board(mut self, board: Arc<RecentBoard>) -> Self {
        self.recent = Some(board);
        self
    }

    /// Look `/newseries <name>` up instead of creating a bare series.
    pub fn with_metadata(mut self, metadata: Arc<MetadataClient>) -> Self {
        if metadata.is_enabled() {
            self.metadata = Some(metadata);
        }
        self
    }

    /// Handle an admin `/command`. `None` when the command is not an admin one.
    pub async fn handle_command(&self, admin_id: i64, text: &str) -> Option<String> {
        let text = text.trim();
        let (command, args) = match text.split_once(char::is_whitespace) {
            Some((command, args)) => (command, args.trim()),
            None => (text, ""),
        };
        let command = command.split('@').next().unwrap_or_default().to_lowercase();
        debug!("Admin {} ran {}", admin_id, command);

        let reply = match command.as_str() {
            "/admin" => Ok(ADMIN_HELP.to_string()),
            "/newseries" => self.cmd_new_series(args).await,
            "/pick" => self.cmd_pick(args).await,
            "/recent" => self.cmd_recent(args).await,
            "/series" => self.cmd_list_series().await,
            "/show" => self.cmd_show(args).await,
            "/do" => match args.parse::<CallbackAction>() {
                Ok(action) => return Some(self.apply_action(admin_id, &action, None).await),
                Err(e) => Ok(e.to_string()),
            },
            "/cancel" => {
                return Some(
                    self.apply_action(
                        admin_id,
                        &CallbackAction::new(ActionKind::Cancel, CatalogCoordinates::default()),
                        None,
                    )
                    .await,
                );
            }
            "/filecaption" => self.cmd_set_caption(admin_id, args),
            "/viewcaption" => self.cmd_view_caption(admin_id),
            "/delcaption" => self.cmd_delete_caption(admin_id),
            _ => return None,
        };
        Some(reply.unwrap_or_else(|e| failure(&command, e)))
    }

    /// Apply a decoded button press. `anchor_message_id` is the bot message
    /// the button belongs to.
    pub async fn apply_action(
        &self,
        admin_id: i64,
        action: &CallbackAction,
        anchor_message_id: Option<i64>,
    ) -> String {
        info!("Admin {} action {}", admin_id, action);
        if let Some(state) = session_state(action.kind) {
            return match self.storage.catalog.get_series(&action.at.series_id).await {
                Ok(Some(_)) => {
                    self.sessions
                        .begin(admin_id, state, action.at.clone(), anchor_message_id)
                        .await;
                    state.prompt().to_string()
                }
                Ok(None) => "That series no longer exists.".to_string(),
                Err(e) => failure(action.kind.token(), e),
            };
        }
        self.run_immediate(admin_id, action)
            .await
            .unwrap_or_else(|e| failure(action.kind.token(), e))
    }

    /// Feed an admin's ordinary message to their session. `None` when no
    /// session consumed it.
    pub async fn handle_input(&self, admin_id: i64, input: &InboundMessage) -> Option<String> {
        match self.accept_input(admin_id, input).await {
            InputStep::Pass => None,
            InputStep::Reply(reply) => Some(reply),
            InputStep::Execute(command) => Some(self.execute(admin_id, command).await),
        }
    }

    /// Advance the admin's session by one message without running the
    /// resulting command. Only touches in-memory session state.
    pub async fn accept_input(&self, admin_id: i64, input: &InboundMessage) -> InputStep {
        match self.sessions.consume(admin_id, input).await {
            Transition::NotInSession | Transition::Ignored => InputStep::Pass,
            Transition::Advanced { .. } => {
                InputStep::Reply(SessionAction::AwaitingBatchLast.prompt().to_string())
            }
            Transition::Rejected(e) => InputStep::Reply(format!("⚠️ {}", e)),
            Transition::Consumed { command, .. } => InputStep::Execute(command),
        }
    }

    pub async fn execute(&self, admin_id: i64, command: SessionCommand) -> String {
        match command {
            SessionCommand::AddNode { kind, at, name } => self
                .add_node(kind, &at, &name)
                .await
                .unwrap_or_else(|e| failure("add", e)),
            SessionCommand::SetPoster { series_id, file_id } => {
                match self.storage.catalog.update_poster(&series_id, &file_id).await {
                    Ok(()) => "Poster updated.".to_string(),
                    Err(e) => failure("poster", e),
                }
            }
            SessionCommand::UpdateDetails { series_id, details } => {
                match self.storage.catalog.update_details(&series_id, &details).await {
                    Ok(()) => "Details updated.".to_string(),
                    Err(e) => failure("details", e),
                }
            }
            SessionCommand::ReplicateBatch(capture) => {
                let job = BatchJob {
                    admin_id,
                    coordinates: capture.coordinates,
                    source_channel_id: capture.source_channel_id,
                    first_id: capture.first_id,
                    last_id: capture.last_id,
                };
                info!(
                    "Replicating {}..{} of {} for admin {}",
                    job.first_id, job.last_id, job.source_channel_id, admin_id
                );
                match self.engine.replicate_batch(&job).await {
                    Ok(report) => report.summary(),
                    Err(e) => {
                        error!("Batch replication failed: {}", e);
                        format!("❌ {}", e)
                    }
                }
            }
            SessionCommand::StoreEpisodeFile { at, message } => {
                let job = EpisodeFileJob {
                    admin_id,
                    coordinates: at,
                    message,
                };
                match self.engine.replicate_episode_file(&job).await {
                    Ok(report) => format!("Episode file stored.\nLink: {}", report.file_link),
                    Err(e) => {
                        error!("Episode file failed: {}", e);
                        format!("❌ {}", e)
                    }
                }
            }
        }
    }

    async fn add_node(&self, kind: NodeKind, at: &CatalogCoordinates, name: &str) -> Result<String> {
        let catalog = &self.storage.catalog;
        let (what, id) = match kind {
            NodeKind::Language => ("Language", catalog.add_language(&at.series_id, name).await?),
            NodeKind::Season => ("Season", catalog.add_season(at, name).await?),
            NodeKind::BatchQuality => ("Quality", catalog.add_batch_quality(at, name).await?),
            NodeKind::Episode => ("Episode", catalog.add_episode(at, name).await?),
            NodeKind::EpisodeQuality => {
                ("Episode quality", catalog.add_episode_quality(at, name).await?)
            }
        };
        Ok(format!("{} <b>{}</b> added [{}].", what, escape_html(name), id))
    }

    async fn run_immediate(&self, admin_id: i64, action: &CallbackAction) -> Result<String> {
        let catalog = &self.storage.catalog;
        let at = &action.at;
        let reply = match action.kind {
            ActionKind::Cancel => {
                return Ok(match self.sessions.cancel(admin_id).await {
                    Some(session) => format!("Cancelled ({:?}).", session.action),
                    None => "Nothing to cancel.".to_string(),
                });
            }
            ActionKind::TogglePublish => {
                let series = catalog.require_series(&at.series_id).await?;
                let published = !series.published;
                catalog.set_published(&at.series_id, published).await?;
                if published {
                    let note = self.refresh_announcement(&at.series_id).await;
                    return Ok(format!("Series published.{}", note));
                }
                if let Err(e) = self.announcer.withdraw(&at.series_id).await {
                    warn!("Withdrawing announcement of {} failed: {}", at.series_id, e);
                }
                return Ok("Series unpublished.".to_string());
            }
            ActionKind::PublishQuality => {
                let series = catalog.require_series(&at.series_id).await?;
                let quality = series
                    .batch_quality(
                        at.lang().unwrap_or_default(),
                        at.season().unwrap_or_default(),
                        at.quality().unwrap_or_default(),
                    )
                    .ok_or_else(|| anyhow!("Quality not found"))?;
                let published = !quality.published;
                catalog.set_batch_published(at, published).await?;
                if published {
                    "Quality published."
                } else {
                    "Quality hidden."
                }
            }
            ActionKind::ClearEpisodes => {
                catalog.clear_episodes(at).await?;
                "Episodes cleared."
            }
            ActionKind::DeleteLanguage => {
                catalog.delete_language(at).await?;
                "Language deleted."
            }
            ActionKind::DeleteSeason => {
                catalog.delete_season(at).await?;
                "Season deleted."
            }
            ActionKind::DeleteQuality => {
                catalog.delete_batch_quality(at).await?;
                if let (Some(lang), Some(season), Some(quality)) =
                    (at.lang(), at.season(), at.quality())
                {
                    self.storage
                        .batch_mappings
                        .delete(&at.series_id, lang, season, quality)?;
                }
                "Quality deleted."
            }
            ActionKind::DeleteEpisode => {
                catalog.delete_episode(at).await?;
                "Episode deleted."
            }
            ActionKind::DeleteEpisodeQuality => {
                catalog.delete_episode_quality(at).await?;
                "Episode quality deleted."
            }
            ActionKind::DeleteSeries => return self.delete_series(admin_id, &at.series_id).await,
            other => return Err(anyhow!("{} needs input", other)),
        };
        let note = self.refresh_announcement(&at.series_id).await;
        Ok(format!("{}{}", reply, note))
    }

    async fn delete_series(&self, admin_id: i64, series_id: &str) -> Result<String> {
        let series = self.storage.catalog.require_series(series_id).await?;
        if let Err(e) = self.announcer.withdraw(series_id).await {
            warn!("Withdrawing announcement of {} failed: {}", series_id, e);
        }
        let rows = self.storage.batch_mappings.delete_for_series(series_id)?;
        self.storage.catalog.delete_series(series_id).await?;
        if let Some(session) = self.sessions.current(admin_id).await
            && session.coordinates.series_id == series_id
        {
            self.sessions.cancel(admin_id).await;
        }
        info!(
            "Admin {} deleted series {} ({} reference rows)",
            admin_id, series.title, rows
        );
        Ok(format!("Deleted <b>{}</b>.", escape_html(&series.title)))
    }

    /// Announce after a content change. Failures only add a note; the
    /// catalog change stands.
    async fn refresh_announcement(&self, series_id: &str) -> String {
        match self.announcer.announce(series_id).await {
            Ok(AnnounceOutcome::Sent { .. }) => "\nAnnouncement sent.".to_string(),
            Ok(AnnounceOutcome::Edited { .. }) => "\nAnnouncement updated.".to_string(),
            Ok(_) => String::new(),
            Err(e) => {
                error!("Announcement for {} failed: {}", series_id, e);
                "\n⚠️ Announcement failed; see logs.".to_string()
            }
        }
    }

    async fn cmd_new_series(&self, args: &str) -> Result<String> {
        if let Some(metadata) = &self.metadata
            && !args.is_empty()
            && !args.contains('|')
        {
            return self.lookup_series(metadata, args).await;
        }
        let mut parts = args.split('|').map(str::trim);
        let title = parts.next().unwrap_or_default();
        if title.is_empty() {
            return Ok("Usage: <code>/newseries Title | Year | IMDb id</code>".to_string());
        }
        let year = parts.next().filter(|year| !year.is_empty());
        let imdb_id = parts.next().filter(|id| !id.is_empty());

        let catalog = &self.storage.catalog;
        if catalog.series_exists(imdb_id, title).await? {
            return Ok(format!("<b>{}</b> is already in the catalog.", escape_html(title)));
        }
        let mut series = Series::new(title);
        if let Some(year) = year {
            series = series.with_year(year);
        }
        if let Some(imdb_id) = imdb_id {
            series = series.with_imdb_id(imdb_id);
        }
        let series = catalog.create_series(series).await?;
        Ok(format!("Created.\n\n{}", admin_tree(&series)))
    }

    async fn lookup_series(&self, metadata: &MetadataClient, query: &str) -> Result<String> {
        let results = metadata.search(query).await?;
        if results.is_empty() {
            return Ok(format!(
                "No series found for <b>{}</b>. Try another name, or \
                 <code>/newseries Title | Year</code>.",
                escape_html(query)
            ));
        }
        let mut reply = format!("📺 <b>Results for '{}'</b>\n", escape_html(query));
        for (i, result) in results.iter().enumerate() {
            reply.push_str(&format!(
                "\n{}. {} <code>/pick {}</code>",
                i + 1,
                escape_html(&result.label()),
                escape_html(&result.id)
            ));
        }
        Ok(reply)
    }

    async fn cmd_pick(&self, result_id: &str) -> Result<String> {
        let Some(metadata) = &self.metadata else {
            return Ok("Metadata lookup is not configured.".to_string());
        };
        if result_id.is_empty() {
            return Ok("Usage: <code>/pick &lt;result id&gt;</code>".to_string());
        }
        let Some(found) = metadata.cached(result_id).await else {
            return Ok("That result is no longer available; search again with /newseries.".to_string());
        };

        let catalog = &self.storage.catalog;
        if catalog
            .series_exists(found.imdb_id.as_deref(), &found.title)
            .await?
        {
            return Ok(format!(
                "<b>{}</b> is already in the catalog.",
                escape_html(&found.title)
            ));
        }
        let series = catalog.create_series(series_from(found)).await?;
        info!("Created series {} from a metadata lookup", series.id);
        Ok(format!("Created.\n\n{}", admin_tree(&series)))
    }

    async fn cmd_recent(&self, args: &str) -> Result<String> {
        let Some(board) = &self.recent else {
            return Ok("The recent list is not available.".to_string());
        };
        let channel_id = match args.parse::<i64>() {
            Ok(id) if id < 0 => id,
            _ => return Ok("Usage: <code>/recent -100...</code>".to_string()),
        };
        let message_id = board.post(channel_id).await?;
        Ok(format!(
            "Recent list posted in <code>{}</code> (message {}). It updates as series are announced.",
            channel_id, message_id
        ))
    }

    async fn cmd_list_series(&self) -> Result<String> {
        let series = self.storage.catalog.list_series().await?;
        if series.is_empty() {
            return Ok("The catalog is empty. Start with /newseries.".to_string());
        }
        let lines: Vec<String> = series
            .iter()
            .map(|s| {
                format!(
                    "{} <code>{}</code> {}",
                    if s.published { "🟢" } else { "⚪" },
                    s.id,
                    escape_html(&s.display_title())
                )
            })
            .collect();
        Ok(lines.join("\n"))
    }

    async fn cmd_show(&self, series_id: &str) -> Result<String> {
        if series_id.is_empty() {
            return Ok("Usage: <code>/show &lt;series id&gt;</code>".to_string());
        }
        match self.storage.catalog.get_series(series_id).await? {
            Some(series) => Ok(admin_tree(&series)),
            None => Ok(format!("No series {}.", escape_html(series_id))),
        }
    }

    fn cmd_set_caption(&self, admin_id: i64, template: &str) -> Result<String> {
        if template.is_empty() {
            return Ok(
                "Usage: <code>/filecaption {filename} | {seriesname} S{season}E{episode}</code>\n\
                 Placeholders: {filename} {filecaption} {seriesname} {language} {quality} {season} {episode}"
                    .to_string(),
            );
        }
        self.storage.caption_templates.set(admin_id, template)?;
        Ok(format!(
            "Caption template saved:\n<code>{}</code>",
            escape_html(template)
        ))
    }

    fn cmd_view_caption(&self, admin_id: i64) -> Result<String> {
        let templates = &self.storage.caption_templates;
        Ok(match templates.get(admin_id)? {
            Some(template) => format!("Your template:\n<code>{}</code>", escape_html(&template)),
            None => format!(
                "No template set. Default:\n<code>{}</code>",
                escape_html(templates.default_template())
            ),
        })
    }

    fn cmd_delete_caption(&self, admin_id: i64) -> Result<String> {
        Ok(if self.storage.caption_templates.remove(admin_id)? {
            "Caption template removed.".to_string()
        } else {
            "No caption template to remove.".to_string()
        })
    }
}

fn series_from(found: SeriesMetadata) -> Series {
    let mut series = Series::new(found.title);
    if let Some(year) = found.year {
        series = series.with_year(year);
    }
    if let Some(genre) = found.genre {
        series = series.with_genre(genre);
    }
    if let Some(rating) = found.rating {
        series = series.with_rating(rating);
    }
    if let Some(imdb_id) = found.imdb_id {
        series = series.with_imdb_id(imdb_id);
    }
    if let Some(poster) = found.poster_url {
        series = series.with_poster(poster);
    }
    series
}

fn session_state(kind: ActionKind) -> Option<SessionAction> {
    match kind {
        ActionKind::AddLanguage => Some(SessionAction::AddingLanguage),
        ActionKind::AddSeason => Some(SessionAction::AddingSeason),
        ActionKind::AddQuality => Some(SessionAction::AddingQuality),
        ActionKind::BeginBatch => Some(SessionAction::AwaitingBatchFirst),
        ActionKind::AddEpisode => Some(SessionAction::AddingEpisode),
        ActionKind::AddEpisodeQuality => Some(SessionAction::AddingEpisodeQuality),
        ActionKind::BeginEpisodeFile => Some(SessionAction::AwaitingEpisodeFile),
        ActionKind::UpdatePoster => Some(SessionAction::UpdatingPoster),
        ActionKind::EditDetails => Some(SessionAction::EditingDetails),
        _ => None,
    }
}

fn failure(what: &str, error: anyhow::Error) -> String {
    error!("{} failed: {:#}", what, error);
    format!("❌ {}", escape_html(&error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplicationConfig;
    use crate::link::DeepLinks;
    use crate::session::SessionStore;
    use crate::storage::tests::test_storage;
    use crate::transport::mock::MockTransport;
    use crate::transport::{FileAttachment, MediaKind, SourceMessage};
    use tempfile::TempDir;

    const ADMIN: i64 = 7;
    const CANONICAL: i64 = -100999;
    const ANNOUNCE: i64 = -100555;
    const SOURCE: i64 = -100111;

    struct Fixture {
        transport: Arc<MockTransport>,
        storage: Storage,
        console: AdminConsole,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let (storage, dir) = test_storage();
        let transport = Arc::new(MockTransport::new());
        let config = ReplicationConfig {
            max_rate_limit_wait_secs: 0,
            ..ReplicationConfig::default()
        };
        let recent = Arc::new(RecentBoard::new(
            transport.clone(),
            storage.recent_lists.clone(),
            config.retry_policy(),
        ));
        let announcer = Arc::new(
            Announcer::new(
                transport.clone(),
                storage.catalog.clone(),
                Some(ANNOUNCE),
                config.retry_policy(),
            )
            .with_recent_board(recent.clone()),
        );
        let engine = Arc::new(BatchReplicationEngine::new(
            transport.clone(),
            storage.clone(),
            announcer.clone(),
            DeepLinks::new("reelvault_bot"),
            CANONICAL,
            &config,
        ));
        let sessions = Arc::new(SessionMachine::new(SessionStore::default()));
        let console = AdminConsole::new(storage.clone(), sessions, engine, announcer)
            .with_recent_board(recent);
        Fixture {
            transport,
            storage,
            console,
            _dir: dir,
        }
    }

    fn text(body: &str) -> InboundMessage {
        InboundMessage::private(ADMIN, SourceMessage::new(ADMIN, 1).with_text(body))
    }

    fn forwarded(message_id: i64) -> InboundMessage {
        InboundMessage::private(ADMIN, SourceMessage::new(ADMIN, 2))
            .with_forward_origin(SOURCE, message_id)
    }

    async fn press(fx: &Fixture, kind: ActionKind, at: &CatalogCoordinates) -> String {
        fx.console
            .apply_action(ADMIN, &CallbackAction::new(kind, at.clone()), Some(1))
            .await
    }

    /// Add a node through the session flow and return its id.
    async fn add(
        fx: &Fixture,
        kind: ActionKind,
        at: &CatalogCoordinates,
        name: &str,
    ) -> String {
        press(fx, kind, at).await;
        let reply = fx.console.handle_input(ADMIN, &text(name)).await.unwrap();
        reply
            .rsplit_once('[')
            .and_then(|(_, rest)| rest.split_once(']'))
            .map(|(id, _)| id.to_string())
            .unwrap()
    }

    async fn new_series(fx: &Fixture, title: &str) -> Series {
        fx.console
            .handle_command(ADMIN, &format!("/newseries {} | 2020", title))
            .await
            .unwrap();
        fx.storage
            .catalog
            .list_series()
            .await
            .unwrap()
            .into_iter()
            .find(|s| s.title == title)
            .unwrap()
    }

    #[tokio::test]
    async fn test_non_admin_commands_fall_through() {
        let fx = fixture();
        assert!(fx.console.handle_command(ADMIN, "/start").await.is_none());
        assert!(fx.console.handle_input(ADMIN, &text("dark")).await.is_none());
    }

    #[tokio::test]
    async fn test_new_series_rejects_duplicates() {
        let fx = fixture();
        let series = new_series(&fx, "Dark").await;
        assert_eq!(series.year.as_deref(), Some("2020"));

        let reply = fx
            .console
            .handle_command(ADMIN, "/newseries dark")
            .await
            .unwrap();
        assert!(reply.contains("already in the catalog"));
        assert_eq!(fx.storage.catalog.list_series().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_series_lookup_and_pick() {
        use crate::metadata::MetadataConfig;
        use serde_json::json;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/3/search/tv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "id": 70523,
                    "name": "Dark",
                    "first_air_date": "2017-12-01",
                    "poster_path": "/dark.jpg",
                    "vote_average": 8.4,
                    "genre_ids": [18]
                }]
            })))
            .mount(&server)
            .await;

        let Fixture {
            storage,
            console,
            _dir,
            ..
        } = fixture();
        let console = console.with_metadata(Arc::new(MetadataClient::new(MetadataConfig {
            tmdb_api_key: Some("key".to_string()),
            tmdb_api_base: format!("{}/3", server.uri()),
            ..MetadataConfig::default()
        })));

        let reply = console.handle_command(ADMIN, "/newseries dark").await.unwrap();
        assert!(reply.contains("1. Dark (2017) <code>/pick tmdb-70523</code>"));
        assert!(storage.catalog.list_series().await.unwrap().is_empty());

        let reply = console.handle_command(ADMIN, "/pick tmdb-1").await.unwrap();
        assert!(reply.contains("no longer available"));

        let reply = console.handle_command(ADMIN, "/pick tmdb-70523").await.unwrap();
        assert!(reply.starts_with("Created."));
        let series = storage.catalog.list_series().await.unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].genre.as_deref(), Some("Drama"));
        assert_eq!(series[0].rating.as_deref(), Some("8.4"));
        assert_eq!(
            series[0].poster_file_id.as_deref(),
            Some("https://image.tmdb.org/t/p/w500/dark.jpg")
        );

        let reply = console.handle_command(ADMIN, "/pick tmdb-70523").await.unwrap();
        assert!(reply.contains("already in the catalog"));

        // The explicit form still skips the lookup.
        let reply = console
            .handle_command(ADMIN, "/newseries Babylon Berlin | 2017")
            .await
            .unwrap();
        assert!(reply.starts_with("Created."));
    }

    #[tokio::test]
    async fn test_batch_flow_publishes_and_announces() {
        let fx = fixture();
        fx.transport.add_range(SOURCE, 10, 14).await;
        let series = new_series(&fx, "Dark").await;
        let root = CatalogCoordinates::series(&series.id);
        let lang = add(&fx, ActionKind::AddLanguage, &root, "German").await;
        let at = root.clone().with_lang(lang);
        let season = add(&fx, ActionKind::AddSeason, &at, "Season 1").await;
        let at = at.with_season(season);
        let quality = add(&fx, ActionKind::AddQuality, &at, "720p").await;
        let at = at.with_quality(quality);

        let prompt = press(&fx, ActionKind::BeginBatch, &at).await;
        assert_eq!(prompt, SessionAction::AwaitingBatchFirst.prompt());
        let reply = fx.console.handle_input(ADMIN, &forwarded(10)).await.unwrap();
        assert_eq!(reply, SessionAction::AwaitingBatchLast.prompt());
        let reply = fx.console.handle_input(ADMIN, &forwarded(14)).await.unwrap();
        assert!(reply.starts_with("Copied 5 message(s)"), "{}", reply);

        let stored = fx.storage.catalog.require_series(&series.id).await.unwrap();
        let node = stored
            .batch_quality(at.lang().unwrap(), at.season().unwrap(), at.quality().unwrap())
            .unwrap();
        assert!(node.is_live());
        assert_eq!(fx.transport.copies().await.len(), 5);
        assert!(fx.transport.sent().await.is_empty());

        let reply = press(&fx, ActionKind::TogglePublish, &root).await;
        assert_eq!(reply, "Series published.\nAnnouncement sent.");
        let sent = fx.transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].2.contains("S01: 720p"));
    }

    #[tokio::test]
    async fn test_recent_list_follows_announcements() {
        const RECENT: i64 = -100777;
        let fx = fixture();
        let reply = fx.console.handle_command(ADMIN, "/recent abc").await.unwrap();
        assert!(reply.starts_with("Usage"));

        let reply = fx
            .console
            .handle_command(ADMIN, &format!("/recent {}", RECENT))
            .await
            .unwrap();
        assert!(reply.starts_with("Recent list posted"), "{}", reply);
        let posted = fx.transport.sent().await;
        assert_eq!(posted.len(), 1);
        assert!(posted[0].2.contains("No series added yet."));

        fx.transport.add_range(SOURCE, 10, 14).await;
        let series = new_series(&fx, "Dark").await;
        let root = CatalogCoordinates::series(&series.id);
        let lang = add(&fx, ActionKind::AddLanguage, &root, "German").await;
        let at = root.clone().with_lang(lang);
        let season = add(&fx, ActionKind::AddSeason, &at, "Season 1").await;
        let at = at.with_season(season);
        let quality = add(&fx, ActionKind::AddQuality, &at, "720p").await;
        let at = at.with_quality(quality);
        press(&fx, ActionKind::BeginBatch, &at).await;
        fx.console.handle_input(ADMIN, &forwarded(10)).await.unwrap();
        fx.console.handle_input(ADMIN, &forwarded(14)).await.unwrap();
        press(&fx, ActionKind::TogglePublish, &root).await;

        let edits = fx.transport.edits().await;
        let last = edits.last().unwrap();
        assert_eq!((last.0, last.1), (RECENT, posted[0].1));
        assert!(last.2.contains("1. <b>Dark</b> S01"), "{}", last.2);

        press(&fx, ActionKind::DeleteSeries, &root).await;
        let last = fx.transport.edits().await.pop().unwrap();
        assert!(last.2.contains("No series added yet."));
    }

    #[tokio::test]
    async fn test_rejected_boundary_keeps_session() {
        let fx = fixture();
        let series = new_series(&fx, "Dark").await;
        let root = CatalogCoordinates::series(&series.id);
        let lang = add(&fx, ActionKind::AddLanguage, &root, "German").await;
        let at = root.with_lang(lang);
        let season = add(&fx, ActionKind::AddSeason, &at, "Season 1").await;
        let at = at.with_season(season);
        let quality = add(&fx, ActionKind::AddQuality, &at, "720p").await;
        let at = at.with_quality(quality);

        press(&fx, ActionKind::BeginBatch, &at).await;
        fx.console.handle_input(ADMIN, &forwarded(10)).await;
        let other = InboundMessage::private(ADMIN, SourceMessage::new(ADMIN, 3))
            .with_forward_origin(-100222, 20);
        let reply = fx.console.handle_input(ADMIN, &other).await.unwrap();
        assert!(reply.starts_with("⚠️"));
        assert!(fx.transport.copies().await.is_empty());

        let reply = fx.console.handle_command(ADMIN, "/cancel").await.unwrap();
        assert!(reply.starts_with("Cancelled"));
        assert!(fx.console.handle_input(ADMIN, &forwarded(12)).await.is_none());
    }

    #[tokio::test]
    async fn test_episode_file_flow() {
        let fx = fixture();
        let series = new_series(&fx, "Dark").await;
        let root = CatalogCoordinates::series(&series.id);
        let lang = add(&fx, ActionKind::AddLanguage, &root, "German").await;
        let at = root.with_lang(lang);
        let season = add(&fx, ActionKind::AddSeason, &at, "Season 1").await;
        let at = at.with_season(season);
        let episode = add(&fx, ActionKind::AddEpisode, &at, "Episode 1").await;
        let at = at.with_episode(episode);
        let quality = add(&fx, ActionKind::AddEpisodeQuality, &at, "1080p").await;
        let at = at.with_quality(quality);

        press(&fx, ActionKind::BeginEpisodeFile, &at).await;
        let file = InboundMessage::private(
            ADMIN,
            SourceMessage::new(ADMIN, 5).with_file(
                FileAttachment::new(MediaKind::Document, "f1").with_file_name("Dark.S01E01.mkv"),
            ),
        );
        let reply = fx.console.handle_input(ADMIN, &file).await.unwrap();
        assert!(reply.contains("?start=get_100999_"), "{}", reply);

        let copies = fx.transport.copies().await;
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].caption.as_deref(), Some("<code>Dark.S01E01.mkv</code>"));
    }

    #[tokio::test]
    async fn test_details_and_caption_commands() {
        let fx = fixture();
        let series = new_series(&fx, "Dark").await;
        press(&fx, ActionKind::EditDetails, &CatalogCoordinates::series(&series.id)).await;
        let reply = fx
            .console
            .handle_input(ADMIN, &text("Genre: Thriller\nRating: 8.7"))
            .await
            .unwrap();
        assert_eq!(reply, "Details updated.");
        let stored = fx.storage.catalog.require_series(&series.id).await.unwrap();
        assert_eq!(stored.genre.as_deref(), Some("Thriller"));

        let reply = fx.console.handle_command(ADMIN, "/viewcaption").await.unwrap();
        assert!(reply.starts_with("No template set"));
        fx.console
            .handle_command(ADMIN, "/filecaption {filename} | {quality}")
            .await
            .unwrap();
        let reply = fx.console.handle_command(ADMIN, "/viewcaption").await.unwrap();
        assert!(reply.contains("{filename} | {quality}"));
        let reply = fx.console.handle_command(ADMIN, "/delcaption").await.unwrap();
        assert_eq!(reply, "Caption template removed.");
    }

    #[tokio::test]
    async fn test_delete_series_withdraws_announcement() {
        let fx = fixture();
        fx.transport.add_range(SOURCE, 1, 2).await;
        let series = new_series(&fx, "Dark").await;
        let root = CatalogCoordinates::series(&series.id);
        let lang = add(&fx, ActionKind::AddLanguage, &root, "German").await;
        let at = root.clone().with_lang(lang);
        let season = add(&fx, ActionKind::AddSeason, &at, "Season 1").await;
        let at = at.with_season(season);
        let quality = add(&fx, ActionKind::AddQuality, &at, "720p").await;
        let at = at.with_quality(quality);
        press(&fx, ActionKind::BeginBatch, &at).await;
        fx.console.handle_input(ADMIN, &forwarded(1)).await;
        fx.console.handle_input(ADMIN, &forwarded(2)).await;
        press(&fx, ActionKind::TogglePublish, &root).await;
        assert_eq!(fx.transport.sent().await.len(), 1);

        let payload = format!("/do delseries:{}", series.id);
        let reply = fx.console.handle_command(ADMIN, &payload).await.unwrap();
        assert!(reply.starts_with("Deleted"));
        assert_eq!(fx.transport.deleted().await.len(), 1);
        assert!(fx.storage.catalog.get_series(&series.id).await.unwrap().is_none());
        assert!(
            fx.storage
                .batch_mappings
                .list_for_series(&series.id)
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_unknown_payload() {
        let fx = fixture();
        let reply = fx.console.handle_command(ADMIN, "/do nope:1").await.unwrap();
        assert!(reply.contains("Unknown action"));
    }
}
