use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::Error;
use crate::migration::RejectedBatch;
use crate::migration::writer::Writer;
use crate::store::TableStore;

/// Backoff policy for items a bulk write left unprocessed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retry rounds before the items are reported as unresolved
    pub max_retries: usize,
    /// Delay before round `n` is `base_delay * 2^n`
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryConfig {
    /// Delay before the given one-based retry round
    pub fn delay(&self, attempt: usize) -> Duration {
        retry_delay(attempt, self.base_delay, self.max_delay)
    }
}

/// Calculate retry delay with exponential backoff
///
/// # Arguments
/// * `attempt` - The retry attempt number (1-based)
/// * `base` - Base delay, doubled for every attempt
/// * `max` - Maximum delay duration
fn retry_delay(attempt: usize, base: Duration, max: Duration) -> Duration {
    let factor = 2u64.saturating_pow(attempt.min(u32::MAX as usize) as u32);
    let delay_ms = (base.as_millis() as u64).saturating_mul(factor);
    let capped_delay = delay_ms.min(max.as_millis() as u64);
    Duration::from_millis(capped_delay)
}

/// Result of draining a rejected batch
#[derive(Debug, PartialEq)]
pub enum RetryOutcome {
    /// Every rejected item was eventually applied
    Resolved,
    /// Items still unapplied after the last allowed round
    Exhausted(RejectedBatch),
}

/// Re-submits rejected items with exponential backoff
#[derive(Debug)]
pub struct Retrier<'w, 'a, S> {
    writer: &'w Writer<'a, S>,
    config: RetryConfig,
}

impl<'w, 'a, S: TableStore> Retrier<'w, 'a, S> {
    /// Retrier resubmitting through `writer`
    pub fn new(writer: &'w Writer<'a, S>, config: RetryConfig) -> Self {
        Self { writer, config }
    }

    /// Retry policy in use
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Keep re-submitting exactly the rejected subset until it is applied or
    /// the round budget is spent
    ///
    /// A round that applies everything ends the loop without consuming
    /// another attempt. A failing bulk write call aborts with that error.
    pub async fn drain(&self, mut rejected: RejectedBatch, table: &str) -> Result<RetryOutcome, Error> {
        let mut attempt = 1;

        while !rejected.is_empty() && attempt <= self.config.max_retries {
            let delay = self.config.delay(attempt);
            warn!(
                table,
                attempt,
                pending = rejected.len(),
                delay_ms = delay.as_millis() as u64,
                "retrying unprocessed items"
            );
            sleep(delay).await;

            let mut remaining = RejectedBatch::new();
            for (table_name, items) in rejected {
                for (still_table, still_items) in self.writer.write_batch(items, &table_name).await? {
                    remaining.extend(still_table, still_items);
                }
            }

            if remaining.is_empty() {
                info!(table, attempt, "unprocessed items resolved");
                return Ok(RetryOutcome::Resolved);
            }

            rejected = remaining;
            attempt += 1;
        }

        if rejected.is_empty() {
            Ok(RetryOutcome::Resolved)
        } else {
            Ok(RetryOutcome::Exhausted(rejected))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Item, KeySchema, MemoryStore};
    use aws_sdk_dynamodb::types::AttributeValue;
    use std::collections::HashMap;
    use tokio::time::Instant;

    fn items(count: usize) -> Vec<Item> {
        (0..count)
            .map(|id| {
                let mut item = HashMap::new();
                let _ = item.insert("id".to_string(), AttributeValue::S(format!("{id:03}")));
                item
            })
            .collect()
    }

    fn target() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("target", KeySchema::partition("id"));
        store
    }

    #[test]
    fn test_default_schedule_doubles_from_100ms() {
        let config = RetryConfig::default();
        let delays: Vec<u64> = (1..=5)
            .map(|attempt| config.delay(attempt).as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![100, 200, 400, 800, 1600]);
        assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(300),
        };

        assert_eq!(config.delay(2), Duration::from_millis(200));
        assert_eq!(config.delay(3), Duration::from_millis(300));
        assert_eq!(config.delay(64), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_second_round_after_one_backoff() {
        let store = target();
        store.reject_next_writes([3, 0]);
        let writer = Writer::new(&store);
        let retrier = Retrier::new(&writer, RetryConfig::default());

        let rejected = writer.write_batch(items(25), "target").await.unwrap();
        assert_eq!(rejected.len(), 3);

        let started = Instant::now();
        let outcome = retrier.drain(rejected, "target").await.unwrap();

        assert_eq!(outcome, RetryOutcome::Resolved);
        assert_eq!(started.elapsed(), Duration::from_millis(100));
        assert_eq!(store.write_calls(), 2);
        assert_eq!(store.len("target"), 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_five_rounds() {
        let store = target();
        store.reject_next_writes([4; 6]);
        let writer = Writer::new(&store);
        let retrier = Retrier::new(&writer, RetryConfig::default());

        let rejected = writer.write_batch(items(4), "target").await.unwrap();

        let started = Instant::now();
        let outcome = retrier.drain(rejected, "target").await.unwrap();

        match outcome {
            RetryOutcome::Exhausted(remaining) => assert_eq!(remaining.len(), 4),
            other => panic!("expected exhaustion, got {other:?}"),
        }
        assert_eq!(store.write_calls(), 6);
        assert_eq!(started.elapsed(), Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_rejections_are_resubmitted_exactly() {
        let store = target();
        store.reject_next_writes([5, 2, 0]);
        let writer = Writer::new(&store);
        let retrier = Retrier::new(&writer, RetryConfig::default());

        let rejected = writer.write_batch(items(10), "target").await.unwrap();
        let started = Instant::now();
        let outcome = retrier.drain(rejected, "target").await.unwrap();

        assert_eq!(outcome, RetryOutcome::Resolved);
        assert_eq!(started.elapsed(), Duration::from_millis(300));
        assert_eq!(store.len("target"), 10);
    }

    #[tokio::test]
    async fn test_empty_batch_resolves_immediately() {
        let store = target();
        let writer = Writer::new(&store);
        let retrier = Retrier::new(&writer, RetryConfig::default());

        let outcome = retrier.drain(RejectedBatch::new(), "target").await.unwrap();
        assert_eq!(outcome, RetryOutcome::Resolved);
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_retries_exhausts_without_sleeping() {
        let store = target();
        store.reject_next_writes([1]);
        let writer = Writer::new(&store);
        let config = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        let retrier = Retrier::new(&writer, config);

        let rejected = writer.write_batch(items(2), "target").await.unwrap();
        let outcome = retrier.drain(rejected, "target").await.unwrap();

        assert!(matches!(outcome, RetryOutcome::Exhausted(ref r) if r.len() == 1));
        assert_eq!(store.write_calls(), 1);
    }
}
