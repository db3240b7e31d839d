//! Bot runtime: routes every inbound update to deep links, the admin
//! console, session input or search.
//!
//! Each update is handled on its own task, so a rate-limit backoff in one
//! replication or relay suspends only that job. Admin session input is the
//! exception: it advances the session inline, in arrival order, and only the
//! resulting work is spawned.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, error, info, warn};

use crate::announce::{Announcer, RecentBoard};
use crate::config::BotConfig;
use crate::dispatch::{AdminConsole, CallbackAction, InputStep, public_view};
use crate::error::LinkError;
use crate::html::escape_html;
use crate::link::{DeepLinks, StartPayload};
use crate::metadata::MetadataClient;
use crate::replication::BatchReplicationEngine;
use crate::resolver::LinkResolver;
use crate::search::{ChatScope, SearchOutcome, resolve};
use crate::session::{SessionMachine, SessionStore};
use crate::storage::Storage;
use crate::transport::{
    CallbackQuery, ChatKind, InboundMessage, InboundUpdate, TelegramTransport, Transport,
    UpdateSource,
};

#[cfg(test)]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_millis(20);
#[cfg(not(test))]
const STREAM_RECONNECT_DELAY: Duration = Duration::from_secs(2);

const GREETING: &str = "Hi! Send me a series title to search the catalog, or open a link to get its files.";

/// How an inbound message is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// `/start` with its payload (possibly empty).
    Start { payload: String },
    /// A `/command` from an admin.
    AdminCommand,
    /// Anything else from an admin in a private chat: session input first,
    /// search when no session takes it.
    AdminInput,
    Search(ChatScope),
    Ignore,
}

/// Decide how to handle a message. Channel posts and messages without
/// text from non-admins are ignored.
pub fn route(message: &InboundMessage, is_admin: bool) -> RouteDecision {
    let text = message.text().map(str::trim).unwrap_or_default();
    if message.chat_kind == ChatKind::Channel {
        return RouteDecision::Ignore;
    }
    if let Some(rest) = text.strip_prefix("/start") {
        let payload = match rest.strip_prefix('@') {
            Some(mention) => Some(
                mention
                    .split_once(char::is_whitespace)
                    .map_or("", |(_, tail)| tail),
            ),
            None if rest.is_empty() || rest.starts_with(char::is_whitespace) => Some(rest),
            None => None,
        };
        if let Some(payload) = payload {
            return RouteDecision::Start {
                payload: payload.trim().to_string(),
            };
        }
    }
    let private = message.is_private();
    if is_admin && private {
        if text.starts_with('/') {
            return RouteDecision::AdminCommand;
        }
        return RouteDecision::AdminInput;
    }
    if text.is_empty() || text.starts_with('/') {
        return RouteDecision::Ignore;
    }
    if private {
        RouteDecision::Search(ChatScope::Private)
    } else {
        RouteDecision::Search(ChatScope::Group)
    }
}

/// An update after its order-sensitive part ran.
#[derive(Debug)]
pub enum Sequenced {
    Update(InboundUpdate),
    /// Admin message already fed to the session.
    Input {
        message: InboundMessage,
        admin_id: i64,
        step: InputStep,
    },
}

pub struct BotRuntime {
    config: BotConfig,
    transport: Arc<dyn Transport>,
    updates: Arc<dyn UpdateSource>,
    storage: Storage,
    console: AdminConsole,
    resolver: LinkResolver,
    links: DeepLinks,
}

impl BotRuntime {
    /// Wire every component over one transport and update source.
    pub fn new(
        config: BotConfig,
        storage: Storage,
        transport: Arc<dyn Transport>,
        updates: Arc<dyn UpdateSource>,
    ) -> Result<Self> {
        let canonical = config
            .channels
            .canonical_channel_id
            .context("channels.canonical_channel_id is not set")?;
        let links = DeepLinks::new(config.telegram.bot_username.clone().unwrap_or_default());
        let policy = config.replication.retry_policy();

        let recent = Arc::new(RecentBoard::new(
            transport.clone(),
            storage.recent_lists.clone(),
            policy.clone(),
        ));
        let announcer = Arc::new(
            Announcer::new(
                transport.clone(),
                storage.catalog.clone(),
                config.channels.announcement_channel_id,
                policy,
            )
            .with_recent_board(recent.clone()),
        );
        let engine = Arc::new(BatchReplicationEngine::new(
            transport.clone(),
            storage.clone(),
            announcer.clone(),
            links.clone(),
            canonical,
            &config.replication,
        ));
        let ttl = config.session.ttl_secs.map(Duration::from_secs);
        let sessions = Arc::new(SessionMachine::new(SessionStore::new(ttl)));
        let metadata = Arc::new(MetadataClient::new(config.metadata.clone()));
        let console = AdminConsole::new(storage.clone(), sessions, engine, announcer)
            .with_metadata(metadata)
            .with_recent_board(recent);
        let resolver = LinkResolver::new(
            transport.clone(),
            storage.batch_mappings.clone(),
            canonical,
            &config.replication,
        );

        Ok(Self {
            config,
            transport,
            updates,
            storage,
            console,
            resolver,
            links,
        })
    }

    /// Build the runtime on the Bot API transport.
    pub fn with_telegram(config: BotConfig, storage: Storage) -> Result<Self> {
        config.validate()?;
        let telegram = Arc::new(TelegramTransport::new(config.telegram.clone()));
        Self::new(config, storage, telegram.clone(), telegram)
    }

    /// Receive updates until the source ends for good or `shutdown` resolves.
    pub async fn run(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
        info!(
            "Bot runtime started ({} admin(s))",
            self.config.admins.len()
        );
        tokio::pin!(shutdown);

        loop {
            let Some(mut stream) = self.updates.start_receiving() else {
                warn!(
                    "Update source not configured, retrying in {:?}",
                    STREAM_RECONNECT_DELAY
                );
                let stop = tokio::select! {
                    _ = &mut shutdown => true,
                    _ = sleep(STREAM_RECONNECT_DELAY) => false,
                };
                if stop {
                    break;
                }
                continue;
            };

            loop {
                let update = tokio::select! {
                    _ = &mut shutdown => {
                        self.updates.stop_receiving();
                        info!("Bot runtime stopping");
                        return;
                    }
                    update = stream.next() => update,
                };
                let Some(update) = update else {
                    warn!(
                        "Update stream ended, restarting in {:?}",
                        STREAM_RECONNECT_DELAY
                    );
                    break;
                };

                let sequenced = self.sequence(update).await;
                let runtime = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = runtime.complete(sequenced).await {
                        error!("Error handling update: {:#}", e);
                    }
                });
            }

            sleep(STREAM_RECONNECT_DELAY).await;
        }
        self.updates.stop_receiving();
    }

    pub async fn handle_update(&self, update: InboundUpdate) -> Result<()> {
        let sequenced = self.sequence(update).await;
        self.complete(sequenced).await
    }

    /// Run the part of an update that must follow arrival order: feeding an
    /// admin's private message to their session.
    pub async fn sequence(&self, update: InboundUpdate) -> Sequenced {
        let InboundUpdate::Message(message) = update else {
            return Sequenced::Update(update);
        };
        match (self.admin_sender(&message), route(&message, self.is_admin(&message))) {
            (Some(admin_id), RouteDecision::AdminInput) => {
                let step = self.console.accept_input(admin_id, &message).await;
                Sequenced::Input {
                    message,
                    admin_id,
                    step,
                }
            }
            _ => Sequenced::Update(InboundUpdate::Message(message)),
        }
    }

    /// Finish a sequenced update. Long work (replication, relays) runs here.
    pub async fn complete(&self, sequenced: Sequenced) -> Result<()> {
        match sequenced {
            Sequenced::Update(InboundUpdate::Message(message)) => {
                self.handle_message(&message).await
            }
            Sequenced::Update(InboundUpdate::Callback(callback)) => {
                self.handle_callback(&callback).await
            }
            Sequenced::Input {
                message,
                admin_id,
                step,
            } => match step {
                InputStep::Reply(reply) => self.reply(message.chat_id, &reply).await,
                InputStep::Execute(command) => {
                    let reply = self.console.execute(admin_id, command).await;
                    self.reply(message.chat_id, &reply).await
                }
                InputStep::Pass => match message.text() {
                    Some(query) => self.search(message.chat_id, query, ChatScope::Private).await,
                    None => Ok(()),
                },
            },
        }
    }

    fn is_admin(&self, message: &InboundMessage) -> bool {
        message
            .sender_id
            .is_some_and(|id| self.config.is_admin(id))
    }

    fn admin_sender(&self, message: &InboundMessage) -> Option<i64> {
        message.sender_id.filter(|id| self.config.is_admin(*id))
    }

    async fn handle_message(&self, message: &InboundMessage) -> Result<()> {
        let decision = route(message, self.is_admin(message));
        debug!("Message in {} routed to {:?}", message.chat_id, decision);

        match decision {
            RouteDecision::Start { payload } => self.handle_start(message.chat_id, &payload).await,
            RouteDecision::AdminCommand => {
                let admin_id = message.sender_id.unwrap_or(message.chat_id);
                let text = message.text().unwrap_or_default();
                match self.console.handle_command(admin_id, text).await {
                    Some(reply) => self.reply(message.chat_id, &reply).await,
                    None => Ok(()),
                }
            }
            // Sequenced before reaching here; only a search fallback is left.
            RouteDecision::AdminInput => match message.text() {
                Some(query) => self.search(message.chat_id, query, ChatScope::Private).await,
                None => Ok(()),
            },
            RouteDecision::Search(scope) => {
                let query = message.text().unwrap_or_default();
                self.search(message.chat_id, query, scope).await
            }
            RouteDecision::Ignore => Ok(()),
        }
    }

    async fn handle_callback(&self, callback: &CallbackQuery) -> Result<()> {
        if !self.config.is_admin(callback.sender_id) {
            warn!("Ignoring button press from non-admin {}", callback.sender_id);
            return self
                .updates
                .answer_callback(&callback.id, Some("Not allowed."))
                .await
                .map_err(Into::into);
        }

        let action = match callback.data.parse::<CallbackAction>() {
            Ok(action) => action,
            Err(e) => {
                self.updates
                    .answer_callback(&callback.id, Some(&e.to_string()))
                    .await?;
                return Ok(());
            }
        };
        self.updates.answer_callback(&callback.id, None).await?;
        let reply = self
            .console
            .apply_action(callback.sender_id, &action, callback.message_id)
            .await;
        let chat_id = callback.chat_id.unwrap_or(callback.sender_id);
        self.reply(chat_id, &reply).await
    }

    async fn handle_start(&self, chat_id: i64, payload: &str) -> Result<()> {
        let payload = match StartPayload::parse(payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Bad start payload from {}: {}", chat_id, e);
                return self.reply(chat_id, "❌ Invalid link.").await;
            }
        };

        match payload {
            StartPayload::Greeting => self.reply(chat_id, GREETING).await,
            StartPayload::Series(series_id) => {
                match self.storage.catalog.get_series(&series_id).await? {
                    Some(series) if series.published => {
                        self.reply(chat_id, &public_view(&series)).await
                    }
                    _ => self.reply(chat_id, "That series is not available.").await,
                }
            }
            StartPayload::Range(address) => {
                match self.resolver.relay(&address.encode(), chat_id).await {
                    Ok(report) if report.succeeded.is_empty() => {
                        self.reply(chat_id, "Those files are no longer available.").await
                    }
                    Ok(report) => {
                        if report.is_partial() {
                            info!(
                                "Relay to {} skipped {} message(s)",
                                chat_id,
                                report.skipped.len()
                            );
                        }
                        Ok(())
                    }
                    Err(LinkError::UnknownChannel(channel)) => {
                        warn!("Link to foreign channel {} from {}", channel, chat_id);
                        self.reply(chat_id, "❌ Invalid link.").await
                    }
                    Err(e) => {
                        warn!("Rejected link from {}: {}", chat_id, e);
                        self.reply(chat_id, "❌ Invalid link.").await
                    }
                }
            }
        }
    }

    async fn search(&self, chat_id: i64, query: &str, scope: ChatScope) -> Result<()> {
        let catalog = self.storage.catalog.list_published().await?;
        let outcome = resolve(query, &catalog, scope, &self.config.search);
        match outcome {
            SearchOutcome::Ignored => Ok(()),
            SearchOutcome::Direct { series, score, .. } => {
                debug!("Search '{}' opened {} ({:.2})", query, series.title, score);
                self.reply(chat_id, &public_view(series)).await
            }
            SearchOutcome::Results {
                series,
                corrected_query,
            } => {
                let mut text = match corrected_query {
                    Some(corrected) => format!(
                        "Results for <i>{}</i>:\n",
                        escape_html(&corrected)
                    ),
                    None => "Results:\n".to_string(),
                };
                for item in series {
                    text.push_str(&format!(
                        "\n<a href=\"{}\">{}</a>",
                        self.links.series(&item.id),
                        escape_html(&item.display_title())
                    ));
                }
                self.reply(chat_id, &text).await
            }
            // Groups stay quiet on misses.
            SearchOutcome::NoMatch if scope == ChatScope::Group => Ok(()),
            SearchOutcome::NoMatch => {
                self.reply(
                    chat_id,
                    &format!("No series found for <i>{}</i>.", escape_html(query.trim())),
                )
                .await
            }
        }
    }

    async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
        self.transport
            .send_message(chat_id, text)
            .await
            .with_context(|| format!("Failed to reply in {}", chat_id))?;
        Ok(())
    }
}
