//! In-process broker — lists and hashes behind a mutex, with a `Notify` to
//! wake blocked claimers. Used by tests and by `standalone` mode.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::trace;

use super::traits::Broker;
use crate::error::BrokerError;

#[derive(Default)]
struct State {
    lists: HashMap<String, VecDeque<Vec<u8>>>,
    hashes: HashMap<String, HashMap<Vec<u8>, Vec<u8>>>,
}

/// In-memory [`Broker`]. Nothing survives the process.
#[derive(Default)]
pub struct InMemoryBroker {
    state: Mutex<State>,
    pushed: Notify,
}

impl InMemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn try_pop(&self, queue: &str) -> Option<Vec<u8>> {
        let mut state = self.state.lock().await;
        state.lists.get_mut(queue).and_then(VecDeque::pop_front)
    }
}

/// Resolve `LRANGE`-style inclusive bounds against a list of `len` items.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = isize::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn enqueue(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        {
            let mut state = self.state.lock().await;
            state
                .lists
                .entry(queue.to_string())
                .or_default()
                .push_back(payload.to_vec());
        }
        trace!(queue, "Enqueued payload");
        self.pushed.notify_waiters();
        Ok(())
    }

    async fn dequeue(&self, queue: &str, wait: Duration) -> Result<Option<Vec<u8>>, BrokerError> {
        let deadline = Instant::now() + wait;
        loop {
            // Register interest before checking so a push between the check
            // and the wait is not missed.
            let notified = self.pushed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(payload) = self.try_pop(queue).await {
                return Ok(Some(payload));
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn hash_set(&self, hash: &str, key: &[u8], value: &[u8]) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        state
            .hashes
            .entry(hash.to_string())
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn hash_get(&self, hash: &str, key: &[u8]) -> Result<Option<Vec<u8>>, BrokerError> {
        let state = self.state.lock().await;
        Ok(state.hashes.get(hash).and_then(|h| h.get(key)).cloned())
    }

    async fn hash_keys(&self, hash: &str) -> Result<Vec<Vec<u8>>, BrokerError> {
        let state = self.state.lock().await;
        Ok(state
            .hashes
            .get(hash)
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn range(
        &self,
        queue: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Vec<u8>>, BrokerError> {
        let state = self.state.lock().await;
        let Some(list) = state.lists.get(queue) else {
            return Ok(Vec::new());
        };
        Ok(match resolve_range(list.len(), start, stop) {
            Some((start, stop)) => list.range(start..=stop).cloned().collect(),
            None => Vec::new(),
        })
    }
}
