//! Worker loop — consumer side of the lifecycle.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::broker::Broker;
use crate::config::{KeyConfig, WorkerConfig};
use crate::error::Result;
use crate::tasks::calc;
use crate::tasks::model::{Task, TaskId, id_key};

/// What a single iteration did with the task it claimed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedTask {
    /// Result stored in the done hash.
    Done { id: TaskId, result: f64 },
    /// Fault message stored in the failed hash.
    Failed { id: TaskId, error: String },
    /// The claimed entry could not be read as a pending task and was dropped.
    Skipped { reason: String },
}

/// Claims pending tasks one at a time, evaluates them, and records the
/// outcome. Any number of workers may share a broker.
pub struct Worker {
    broker: Arc<dyn Broker>,
    keys: KeyConfig,
    config: WorkerConfig,
}

impl Worker {
    pub fn new(broker: Arc<dyn Broker>, keys: KeyConfig, config: WorkerConfig) -> Self {
        Self {
            broker,
            keys,
            config,
        }
    }

    /// Run one claim → compute → record iteration. Returns `None` if no task
    /// arrived within `wait`.
    pub async fn process_next(&self, wait: Duration) -> Result<Option<ProcessedTask>> {
        let Some(raw) = self.broker.dequeue(&self.keys.queue_key, wait).await? else {
            return Ok(None);
        };

        let task = match Task::decode_pending(&raw) {
            Ok(task) => task,
            Err(e) => {
                error!(error = %e, bytes = raw.len(), "Dropping malformed queue entry");
                return Ok(Some(ProcessedTask::Skipped {
                    reason: e.to_string(),
                }));
            }
        };

        let id = task.id();
        let key = id_key(id);

        match calc::evaluate(task.calc_request()) {
            Ok(result) => {
                let done = task.into_done(result);
                self.broker
                    .hash_set(&self.keys.result_key, &key, &done.encode()?)
                    .await?;
                info!(task_id = %id, result, "Task done");
                Ok(Some(ProcessedTask::Done { id, result }))
            }
            Err(fault) => {
                let error = fault.to_string();
                let failed = task.into_failed(error.clone());
                self.broker
                    .hash_set(&self.keys.fail_key, &key, &failed.encode()?)
                    .await?;
                warn!(task_id = %id, error = %error, "Task failed");
                Ok(Some(ProcessedTask::Failed { id, error }))
            }
        }
    }

    /// Process tasks until `cancel` fires or the broker fails.
    ///
    /// Cancellation is checked between claims; an in-flight claim is never
    /// abandoned, so a popped task is always recorded.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        info!(
            queue = %self.keys.queue_key,
            claim_timeout = ?self.config.claim_timeout,
            "Worker started"
        );

        let mut processed: u64 = 0;
        while !cancel.is_cancelled() {
            match self.process_next(self.config.claim_timeout).await {
                Ok(Some(_)) => processed += 1,
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, processed, "Worker halted");
                    return Err(e);
                }
            }
        }

        info!(processed, "Worker stopped");
        Ok(())
    }

    /// Spawn [`Worker::run`] as a background task.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(cancel).await })
    }
}
