//! Task registry — producer side of the lifecycle.

use std::sync::Arc;

use tracing::info;

use super::model::{CalcRequest, Task, TaskId};
use crate::broker::Broker;
use crate::config::KeyConfig;
use crate::error::Result;

/// Turns requests into queued `Pending` tasks.
#[derive(Clone)]
pub struct TaskRegistry {
    broker: Arc<dyn Broker>,
    keys: KeyConfig,
}

impl TaskRegistry {
    pub fn new(broker: Arc<dyn Broker>, keys: KeyConfig) -> Self {
        Self { broker, keys }
    }

    /// Queue `request` for processing and return its id without waiting.
    pub async fn submit(&self, request: CalcRequest) -> Result<TaskId> {
        let task = Task::new(request);
        let id = task.id();
        let payload = task.encode()?;

        self.broker.enqueue(&self.keys.queue_key, &payload).await?;

        info!(
            task_id = %id,
            x = request.x,
            y = request.y,
            operand = %request.operand,
            "Task registered"
        );
        Ok(id)
    }
}
