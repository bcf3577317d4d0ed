//! `Broker` trait: the durable queue/store primitives the task lifecycle is
//! built on.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrokerError;

/// Slice used by [`Broker::dequeue_blocking`] between claim attempts.
pub const BLOCKING_POLL: Duration = Duration::from_secs(1);

/// List and hash primitives with an atomic pop.
///
/// Lists are FIFO: `enqueue` appends to the tail, `dequeue` removes from the
/// head. A popped item is handed to exactly one caller.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Append `payload` to the tail of `queue`.
    async fn enqueue(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError>;

    /// Pop the head of `queue`, waiting up to `wait` for an item to arrive.
    /// Returns `None` if the queue stayed empty.
    async fn dequeue(&self, queue: &str, wait: Duration) -> Result<Option<Vec<u8>>, BrokerError>;

    /// Pop the head of `queue`, suspending until an item is available.
    async fn dequeue_blocking(&self, queue: &str) -> Result<Vec<u8>, BrokerError> {
        loop {
            if let Some(payload) = self.dequeue(queue, BLOCKING_POLL).await? {
                return Ok(payload);
            }
        }
    }

    /// Set `key` to `value` in `hash`, overwriting any previous value.
    async fn hash_set(&self, hash: &str, key: &[u8], value: &[u8]) -> Result<(), BrokerError>;

    /// Read `key` from `hash`.
    async fn hash_get(&self, hash: &str, key: &[u8]) -> Result<Option<Vec<u8>>, BrokerError>;

    /// All keys of `hash`, in no particular order.
    async fn hash_keys(&self, hash: &str) -> Result<Vec<Vec<u8>>, BrokerError>;

    /// Non-destructive read of `queue[start..=stop]`. Negative indices count
    /// from the tail (`-1` is the last item), as Redis `LRANGE` does.
    async fn range(
        &self,
        queue: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Vec<u8>>, BrokerError>;
}
