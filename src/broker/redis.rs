//! Redis broker.
//!
//! | Primitive | Redis command |
//! |-----------|---------------|
//! | `enqueue` | `RPUSH` |
//! | `dequeue` | `BLPOP` |
//! | `hash_set` / `hash_get` / `hash_keys` | `HSET` / `HGET` / `HKEYS` |
//! | `range` | `LRANGE` |
//!
//! Regular commands share one multiplexed connection. `BLPOP` parks the
//! connection it runs on, so claims go through a second, dedicated
//! connection and never stall HTTP-side reads and writes.
//!
//! The claim connection has no client-side response timeout. Once Redis has
//! popped an entry the reply must be read, otherwise the entry is gone from
//! the queue without anyone holding it.

use std::time::Duration;

use ::redis::AsyncConnectionConfig;
use ::redis::aio::MultiplexedConnection;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::traits::Broker;
use crate::error::BrokerError;

/// Smallest `BLPOP` timeout sent; `0` would block forever.
const MIN_BLPOP_WAIT: Duration = Duration::from_millis(10);

/// [`Broker`] backed by a Redis server.
pub struct RedisBroker {
    conn: MultiplexedConnection,
    claim_conn: Mutex<MultiplexedConnection>,
}

impl RedisBroker {
    /// Connect to Redis at `url` (`redis://[:<password>@]<host>[:<port>][/<db>]`).
    pub async fn connect(url: &str) -> Result<Self, BrokerError> {
        let connect_err = |e: ::redis::RedisError| BrokerError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        };

        let client = ::redis::Client::open(url).map_err(connect_err)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(connect_err)?;
        let claim_config = AsyncConnectionConfig::new().set_response_timeout(None);
        let claim_conn = client
            .get_multiplexed_async_connection_with_config(&claim_config)
            .await
            .map_err(connect_err)?;

        info!(url, "Connected to Redis");

        Ok(Self {
            conn,
            claim_conn: Mutex::new(claim_conn),
        })
    }
}

fn command_err(command: &'static str, key: &str) -> impl FnOnce(::redis::RedisError) -> BrokerError {
    let key = key.to_string();
    move |e| BrokerError::Command {
        command,
        key,
        reason: e.to_string(),
    }
}

#[async_trait]
impl Broker for RedisBroker {
    async fn enqueue(&self, queue: &str, payload: &[u8]) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _len: i64 = ::redis::cmd("RPUSH")
            .arg(queue)
            .arg(payload)
            .query_async(&mut conn)
            .await
            .map_err(command_err("RPUSH", queue))?;
        Ok(())
    }

    async fn dequeue(&self, queue: &str, wait: Duration) -> Result<Option<Vec<u8>>, BrokerError> {
        let wait = wait.max(MIN_BLPOP_WAIT);
        let mut conn = self.claim_conn.lock().await;

        let popped: Option<(Vec<u8>, Vec<u8>)> = ::redis::cmd("BLPOP")
            .arg(queue)
            .arg(wait.as_secs_f64())
            .query_async(&mut *conn)
            .await
            .map_err(command_err("BLPOP", queue))?;

        Ok(popped.map(|(_key, payload)| {
            debug!(queue, bytes = payload.len(), "Claimed payload");
            payload
        }))
    }

    async fn hash_set(&self, hash: &str, key: &[u8], value: &[u8]) -> Result<(), BrokerError> {
        let mut conn = self.conn.clone();
        let _added: i64 = ::redis::cmd("HSET")
            .arg(hash)
            .arg(key)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(command_err("HSET", hash))?;
        Ok(())
    }

    async fn hash_get(&self, hash: &str, key: &[u8]) -> Result<Option<Vec<u8>>, BrokerError> {
        let mut conn = self.conn.clone();
        ::redis::cmd("HGET")
            .arg(hash)
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_err("HGET", hash))
    }

    async fn hash_keys(&self, hash: &str) -> Result<Vec<Vec<u8>>, BrokerError> {
        let mut conn = self.conn.clone();
        ::redis::cmd("HKEYS")
            .arg(hash)
            .query_async(&mut conn)
            .await
            .map_err(command_err("HKEYS", hash))
    }

    async fn range(
        &self,
        queue: &str,
        start: isize,
        stop: isize,
    ) -> Result<Vec<Vec<u8>>, BrokerError> {
        let mut conn = self.conn.clone();
        ::redis::cmd("LRANGE")
            .arg(queue)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await
            .map_err(command_err("LRANGE", queue))
    }
}
