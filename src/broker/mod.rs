//! Broker layer: the durable queue/store shared by producers and consumers.

pub mod memory;
pub mod redis;
pub mod traits;

pub use memory::InMemoryBroker;
pub use redis::RedisBroker;
pub use traits::Broker;
