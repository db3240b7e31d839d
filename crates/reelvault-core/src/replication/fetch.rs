//! Chunked fetching shared by batch replication and link resolution.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::retry::RetryPolicy;
use crate::models::{SkipReason, UnitReport};
use crate::transport::{SourceMessage, Transport};

pub const DEFAULT_CHUNK_SIZE: usize = 200;

/// Fetch `ids` from `chat_id` in chunks, in the order given.
///
/// A rate-limited chunk is retried per `policy`; a chunk that still fails is
/// reported as skipped and the remaining chunks continue. Ids the transport
/// does not return are skipped as not found.
pub async fn fetch_in_chunks(
    transport: &dyn Transport,
    chat_id: i64,
    ids: &[i64],
    chunk_size: usize,
    policy: &RetryPolicy,
) -> UnitReport<SourceMessage> {
    let mut report = UnitReport::default();

    for (index, chunk) in ids.chunks(chunk_size.max(1)).enumerate() {
        let label = format!("fetch chunk {} of {}", index + 1, chat_id);
        match policy
            .run(&label, || transport.fetch_messages(chat_id, chunk))
            .await
        {
            Ok(messages) => {
                let mut by_id: HashMap<i64, SourceMessage> = messages
                    .into_iter()
                    .map(|message| (message.message_id, message))
                    .collect();
                for id in chunk {
                    match by_id.remove(id) {
                        Some(message) => report.succeeded.push(message),
                        None => report.skip(*id, SkipReason::NotFound),
                    }
                }
                debug!("Fetched chunk {} ({} ids) from {}", index + 1, chunk.len(), chat_id);
            }
            Err(e) => {
                warn!(
                    "Dropping chunk {} ({} ids) from {}: {}",
                    index + 1,
                    chunk.len(),
                    chat_id,
                    e
                );
                let reason = SkipReason::from(e);
                for id in chunk {
                    report.skip(*id, reason.clone());
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::expand_range;
    use crate::transport::mock::{MockTransport, ScriptedFailure};
    use std::time::Duration;

    const SOURCE: i64 = -100111;

    #[tokio::test]
    async fn test_chunks_of_200() {
        let transport = MockTransport::new();
        transport.add_range(SOURCE, 1, 450).await;

        let report = fetch_in_chunks(
            &transport,
            SOURCE,
            &expand_range(1, 450),
            DEFAULT_CHUNK_SIZE,
            &RetryPolicy::default(),
        )
        .await;

        let sizes: Vec<usize> = transport
            .fetch_calls()
            .await
            .iter()
            .map(|(_, ids)| ids.len())
            .collect();
        assert_eq!(sizes, vec![200, 200, 50]);
        assert_eq!(report.succeeded.len(), 450);
        assert!(report.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_descending_order_is_kept() {
        let transport = MockTransport::new();
        transport.add_range(SOURCE, 1, 5).await;

        let report =
            fetch_in_chunks(&transport, SOURCE, &expand_range(5, 1), 2, &RetryPolicy::default())
                .await;
        let ids: Vec<i64> = report.succeeded.iter().map(|m| m.message_id).collect();
        assert_eq!(ids, vec![5, 4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn test_rate_limited_chunk_retried_once() {
        let transport = MockTransport::new();
        transport.add_range(SOURCE, 1, 250).await;
        transport
            .fail_fetch(201, ScriptedFailure::RateLimited(Duration::ZERO))
            .await;

        let report = fetch_in_chunks(
            &transport,
            SOURCE,
            &expand_range(1, 250),
            DEFAULT_CHUNK_SIZE,
            &RetryPolicy::default(),
        )
        .await;

        assert_eq!(report.succeeded.len(), 250);
        assert_eq!(transport.fetch_calls().await.len(), 3);
    }

    #[tokio::test]
    async fn test_chunk_dropped_after_second_rate_limit() {
        let transport = MockTransport::new();
        transport.add_range(SOURCE, 1, 250).await;
        for _ in 0..2 {
            transport
                .fail_fetch(201, ScriptedFailure::RateLimited(Duration::ZERO))
                .await;
        }

        let report = fetch_in_chunks(
            &transport,
            SOURCE,
            &expand_range(1, 250),
            DEFAULT_CHUNK_SIZE,
            &RetryPolicy::default(),
        )
        .await;

        assert_eq!(report.succeeded.len(), 200);
        assert_eq!(report.skipped_ids(), expand_range(201, 250));
        assert!(
            report
                .skipped
                .iter()
                .all(|skip| skip.reason == SkipReason::RateLimited)
        );
    }

    #[tokio::test]
    async fn test_missing_messages_are_skipped_as_not_found() {
        let transport = MockTransport::new();
        transport.add_range(SOURCE, 1, 5).await;
        transport.remove_message(SOURCE, 3).await;

        let report =
            fetch_in_chunks(&transport, SOURCE, &expand_range(1, 5), 200, &RetryPolicy::default())
                .await;
        assert_eq!(report.succeeded.len(), 4);
        assert_eq!(report.skipped_ids(), vec![3]);
        assert_eq!(report.skipped[0].reason, SkipReason::NotFound);
    }
}
