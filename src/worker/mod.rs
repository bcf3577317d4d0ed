//! Worker system: claims queued tasks and records their outcomes.

pub mod worker;

pub use worker::{ProcessedTask, Worker};
