//! Task data model — calculation requests, the three task states, and their
//! wire encoding.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CodecError;

/// Identifier of a submitted task.
pub type TaskId = Uuid;

/// Arithmetic operation of a [`CalcRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Subtract,
    #[serde(rename = "*")]
    Multiply,
    #[serde(rename = "/")]
    Divide,
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "+"),
            Self::Subtract => write!(f, "-"),
            Self::Multiply => write!(f, "*"),
            Self::Divide => write!(f, "/"),
        }
    }
}

/// A four-function calculation, as submitted by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcRequest {
    pub x: i64,
    pub y: i64,
    pub operand: Operand,
}

impl CalcRequest {
    pub fn new(x: i64, y: i64, operand: Operand) -> Self {
        Self { x, y, operand }
    }
}

/// A unit of work in one of its three states.
///
/// Serialized as JSON, internally tagged on `type_`:
///
/// ```json
/// {"type_": "done", "id_": "…", "calc_request": {"x": 4, "y": 2, "operand": "/"}, "result": 2.0}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type_")]
pub enum Task {
    /// Submitted, not yet processed.
    #[serde(rename = "new")]
    Pending {
        #[serde(rename = "id_")]
        id: TaskId,
        calc_request: CalcRequest,
    },
    /// Processed successfully.
    #[serde(rename = "done")]
    Done {
        #[serde(rename = "id_")]
        id: TaskId,
        calc_request: CalcRequest,
        result: f64,
    },
    /// Processing raised an evaluation fault.
    #[serde(rename = "failed")]
    Failed {
        #[serde(rename = "id_")]
        id: TaskId,
        calc_request: CalcRequest,
        error: String,
    },
}

impl Task {
    /// Create a pending task with a fresh v4 id.
    pub fn new(calc_request: CalcRequest) -> Self {
        Self::Pending {
            id: Uuid::new_v4(),
            calc_request,
        }
    }

    pub fn id(&self) -> TaskId {
        match self {
            Self::Pending { id, .. } | Self::Done { id, .. } | Self::Failed { id, .. } => *id,
        }
    }

    pub fn calc_request(&self) -> &CalcRequest {
        match self {
            Self::Pending { calc_request, .. }
            | Self::Done { calc_request, .. }
            | Self::Failed { calc_request, .. } => calc_request,
        }
    }

    /// Wire tag of the current state.
    pub fn state(&self) -> &'static str {
        match self {
            Self::Pending { .. } => "new",
            Self::Done { .. } => "done",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Transition to `Done`, keeping id and request.
    pub fn into_done(self, result: f64) -> Self {
        Self::Done {
            id: self.id(),
            calc_request: *self.calc_request(),
            result,
        }
    }

    /// Transition to `Failed`, keeping id and request.
    pub fn into_failed(self, error: impl Into<String>) -> Self {
        Self::Failed {
            id: self.id(),
            calc_request: *self.calc_request(),
            error: error.into(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Decode a payload that must be in the `Pending` state.
    pub fn decode_pending(bytes: &[u8]) -> Result<Self, CodecError> {
        let task = Self::decode(bytes)?;
        if !task.is_pending() {
            return Err(CodecError::UnexpectedState {
                expected: "new",
                found: task.state(),
            });
        }
        Ok(task)
    }
}

/// Hash key under which a task's outcome is stored: the 16 raw id bytes.
pub fn id_key(id: TaskId) -> [u8; 16] {
    *id.as_bytes()
}

/// Inverse of [`id_key`].
pub fn id_from_key(key: &[u8]) -> Result<TaskId, CodecError> {
    Uuid::from_slice(key).map_err(|_| CodecError::InvalidId(key.len()))
}

/// Terminal result of a task, as seen by a status query.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done { result: f64 },
    Failed { error: String },
}

/// Ids of all known tasks, grouped by state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    /// Pending, in queue order (oldest first).
    pub new: Vec<TaskId>,
    pub done: Vec<TaskId>,
    pub fail: Vec<TaskId>,
}
