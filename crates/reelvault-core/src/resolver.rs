//! Relaying a decoded range link back to the user who opened it.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ReplicationConfig;
use crate::error::LinkError;
use crate::link::{MAX_RANGE_MESSAGES, RangeAddress};
use crate::models::{CopiedMessage, SkipReason, UnitReport};
use crate::replication::{RetryPolicy, fetch_in_chunks};
use crate::storage::BatchMappingStore;
use crate::transport::Transport;

pub struct LinkResolver {
    transport: Arc<dyn Transport>,
    mappings: BatchMappingStore,
    canonical_channel_id: i64,
    chunk_size: usize,
    policy: RetryPolicy,
    relay_delay: Duration,
}

impl LinkResolver {
    pub fn new(
        transport: Arc<dyn Transport>,
        mappings: BatchMappingStore,
        canonical_channel_id: i64,
        config: &ReplicationConfig,
    ) -> Self {
        Self {
            transport,
            mappings,
            canonical_channel_id,
            chunk_size: config.chunk_size,
            policy: config.retry_policy(),
            relay_delay: Duration::from_millis(config.relay_delay_ms),
        }
    }

    /// Decode a token and check it addresses the canonical channel.
    pub fn decode(&self, token: &str) -> Result<RangeAddress, LinkError> {
        let address = RangeAddress::decode(token)?;
        if address.channel_id != self.canonical_channel_id {
            return Err(LinkError::UnknownChannel(address.channel_id));
        }
        Ok(address)
    }

    /// Ids a link relays, in link order.
    ///
    /// A batch whose copies landed with foreign posts in between relays only
    /// its recorded copies. Any other range is relayed whole, up to
    /// [`MAX_RANGE_MESSAGES`].
    pub fn message_ids(&self, token: &str, address: &RangeAddress) -> Result<Vec<i64>, LinkError> {
        match self
            .mappings
            .find_sparse(address.channel_id, address.first_id, address.last_id)
        {
            Ok(Some(mapping)) => {
                if let Some(ids) = mapping.canonical_ids {
                    debug!("{} resolves to {} recorded copies", token, ids.len());
                    return Ok(ids);
                }
            }
            Ok(None) => {}
            Err(e) => warn!("Batch mapping lookup for {} failed: {}", token, e),
        }
        if address.len() > MAX_RANGE_MESSAGES {
            return Err(LinkError::invalid(
                token,
                format!("range of {} exceeds {}", address.len(), MAX_RANGE_MESSAGES),
            ));
        }
        Ok(address.ids())
    }

    /// Copy every message the link addresses into `user_chat_id`, in link order.
    ///
    /// Messages that cannot be fetched or copied are skipped; the relay never aborts.
    pub async fn relay(
        &self,
        token: &str,
        user_chat_id: i64,
    ) -> Result<UnitReport<CopiedMessage>, LinkError> {
        let address = self.decode(token)?;
        let ids = self.message_ids(token, &address)?;
        debug!("Relaying {} message(s) of {} to {}", ids.len(), token, user_chat_id);

        let fetched = fetch_in_chunks(
            self.transport.as_ref(),
            address.channel_id,
            &ids,
            self.chunk_size,
            &self.policy,
        )
        .await;

        let mut report = UnitReport {
            succeeded: Vec::with_capacity(fetched.succeeded.len()),
            skipped: fetched.skipped,
        };
        for (index, message) in fetched.succeeded.iter().enumerate() {
            if index > 0 && !self.relay_delay.is_zero() {
                tokio::time::sleep(self.relay_delay).await;
            }
            let copied = self
                .policy
                .run(&format!("relay of {}", message.message_id), || {
                    self.transport.copy_message(message, user_chat_id, None)
                })
                .await;
            match copied {
                Ok(new_id) => report.succeeded.push(CopiedMessage {
                    source_id: message.message_id,
                    canonical_id: new_id,
                }),
                Err(e) => {
                    warn!("Relay of {} to {} skipped: {}", message.message_id, user_chat_id, e);
                    report.skip(message.message_id, SkipReason::from(e));
                }
            }
        }

        info!(
            "Relayed {}/{} message(s) to {}",
            report.succeeded.len(),
            ids.len(),
            user_chat_id
        );
        Ok(report)
    }
}
