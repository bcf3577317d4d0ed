//! magnit-calc: queued arithmetic tasks over HTTP.

pub mod api;
pub mod broker;
pub mod config;
pub mod error;
pub mod tasks;
pub mod worker;
