//! HTTP surface: thin request/response mapping over the task lifecycle.

pub mod routes;

pub use routes::{AppState, api_routes};
