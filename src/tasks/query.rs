//! Query service: resolves task ids against the outcome stores.

use std::sync::Arc;

use tracing::{debug, warn};

use super::model::{Outcome, Task, TaskId, TaskList, id_from_key, id_key};
use crate::broker::Broker;
use crate::config::KeyConfig;
use crate::error::{CodecError, Result};

/// Read side of the lifecycle. Stateless; every call goes to the broker.
#[derive(Clone)]
pub struct QueryService {
    broker: Arc<dyn Broker>,
    keys: KeyConfig,
}

impl QueryService {
    pub fn new(broker: Arc<dyn Broker>, keys: KeyConfig) -> Self {
        Self { broker, keys }
    }

    /// Outcome of task `id`, or `None` if it is still pending or was never
    /// submitted. A done entry wins over a failed one.
    pub async fn get_status(&self, id: TaskId) -> Result<Option<Outcome>> {
        let key = id_key(id);

        if let Some(raw) = self.broker.hash_get(&self.keys.result_key, &key).await? {
            return match Task::decode(&raw)? {
                Task::Done { result, .. } => Ok(Some(Outcome::Done { result })),
                other => Err(CodecError::UnexpectedState {
                    expected: "done",
                    found: other.state(),
                }
                .into()),
            };
        }

        if let Some(raw) = self.broker.hash_get(&self.keys.fail_key, &key).await? {
            return match Task::decode(&raw)? {
                Task::Failed { error, .. } => Ok(Some(Outcome::Failed { error })),
                other => Err(CodecError::UnexpectedState {
                    expected: "failed",
                    found: other.state(),
                }
                .into()),
            };
        }

        debug!(task_id = %id, "No outcome recorded");
        Ok(None)
    }

    /// Ids of all tasks: pending in queue order, then done and failed.
    pub async fn list_tasks(&self) -> Result<TaskList> {
        let pending = self.broker.range(&self.keys.queue_key, 0, -1).await?;
        let done = self.broker.hash_keys(&self.keys.result_key).await?;
        let fail = self.broker.hash_keys(&self.keys.fail_key).await?;

        let new = pending
            .iter()
            .filter_map(|raw| match Task::decode(raw) {
                Ok(task) => Some(task.id()),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable pending entry");
                    None
                }
            })
            .collect();

        Ok(TaskList {
            new,
            done: ids_from_keys(&done, &self.keys.result_key),
            fail: ids_from_keys(&fail, &self.keys.fail_key),
        })
    }
}

fn ids_from_keys(keys: &[Vec<u8>], hash: &str) -> Vec<TaskId> {
    keys.iter()
        .filter_map(|key| match id_from_key(key) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(hash, error = %e, "Skipping malformed hash key");
                None
            }
        })
        .collect()
}
