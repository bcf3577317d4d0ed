//! Task lifecycle: model, arithmetic, submission and status queries.

pub mod calc;
pub mod model;
pub mod query;
pub mod registry;

pub use model::{CalcRequest, Operand, Outcome, Task, TaskId, TaskList};
pub use query::QueryService;
pub use registry::TaskRegistry;
