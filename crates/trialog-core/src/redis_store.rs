//! Redis-backed store.
//!
//! Every caller shares one `ConnectionManager`. Each operation runs under the
//! configured operation timeout so an outage surfaces as an error instead of a
//! hang. A dropped connection fails the operation in flight and the manager
//! reconnects in the background, so the next operation runs on a fresh
//! connection. Operations themselves are never retried.

use crate::config::StoreConfig;
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{Cmd, FromRedisValue, Pipeline, RedisError, RedisResult};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};
use trialog_proto::{ListSlice, Store, StoreError, StoreResult};

/// Extra connection attempts per reconnect before the waiting operation fails.
const RECONNECT_ATTEMPTS: usize = 2;

/// Store client speaking the Redis protocol.
pub struct RedisStore {
    conn: ConnectionManager,
    url: String,
    op_timeout: Duration,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.url)
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connects within `connect_timeout_ms` and verifies the server with PING.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let url = config.redis_url();
        let client = redis::Client::open(url.as_str())
            .map_err(|e| StoreError::Backend(format!("invalid store url '{url}': {e}")))?;

        debug!(url = %url, timeout_ms = config.connect_timeout_ms, "Connecting to store");
        let manager = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connect_timeout())
            .set_response_timeout(config.op_timeout())
            .set_number_of_retries(RECONNECT_ATTEMPTS);
        let conn = match tokio::time::timeout(
            config.connect_timeout(),
            ConnectionManager::new_with_config(client, manager),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(StoreError::Unreachable(format!("{url}: {e}"))),
            Err(_) => {
                return Err(StoreError::Timeout {
                    op: "connect",
                    timeout_ms: config.connect_timeout_ms,
                });
            }
        };

        let store = Self {
            conn,
            url,
            op_timeout: config.op_timeout(),
        };
        store.ping().await?;
        info!(url = %store.url, "Connected to store");
        Ok(store)
    }

    /// The URL this client is connected to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn timed<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(map_redis_error),
            Err(_) => Err(StoreError::Timeout {
                op,
                timeout_ms: self.op_timeout.as_millis() as u64,
            }),
        }
    }

    async fn run<T: FromRedisValue>(&self, op: &'static str, cmd: Cmd) -> StoreResult<T> {
        let mut conn = self.conn.clone();
        self.timed(op, query(&cmd, &mut conn)).await
    }

    async fn run_pipeline<T: FromRedisValue>(
        &self,
        op: &'static str,
        pipe: Pipeline,
    ) -> StoreResult<T> {
        let mut conn = self.conn.clone();
        self.timed(op, query_pipeline(&pipe, &mut conn)).await
    }

    /// LLEN and LRANGE in one MULTI/EXEC so both come from the same snapshot.
    async fn snapshot(&self, op: &'static str, key: &str, from: i64) -> StoreResult<(u64, Vec<String>)> {
        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("LLEN")
            .arg(key)
            .cmd("LRANGE")
            .arg(key)
            .arg(from)
            .arg(-1);
        self.run_pipeline(op, pipe).await
    }
}

async fn query<T: FromRedisValue>(cmd: &Cmd, conn: &mut ConnectionManager) -> RedisResult<T> {
    cmd.query_async(conn).await
}

async fn query_pipeline<T: FromRedisValue>(
    pipe: &Pipeline,
    conn: &mut ConnectionManager,
) -> RedisResult<T> {
    pipe.query_async(conn).await
}

fn map_redis_error(e: RedisError) -> StoreError {
    if e.is_io_error() || e.is_connection_refusal() || e.is_connection_dropped() || e.is_timeout() {
        StoreError::Unreachable(e.to_string())
    } else {
        StoreError::Backend(e.to_string())
    }
}

/// Escapes glob metacharacters so a literal prefix can be used in KEYS.
fn glob_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl Store for RedisStore {
    async fn ping(&self) -> StoreResult<()> {
        let _pong: String = self.run("PING", redis::cmd("PING")).await?;
        Ok(())
    }

    async fn append(&self, key: &str, values: &[String]) -> StoreResult<u64> {
        if values.is_empty() {
            let mut cmd = redis::cmd("LLEN");
            cmd.arg(key);
            return self.run("LLEN", cmd).await;
        }
        let mut cmd = redis::cmd("RPUSH");
        cmd.arg(key).arg(values);
        self.run("RPUSH", cmd).await
    }

    async fn list_tail(&self, key: &str, max: usize) -> StoreResult<ListSlice> {
        if max == 0 {
            let mut cmd = redis::cmd("LLEN");
            cmd.arg(key);
            let total: u64 = self.run("LLEN", cmd).await?;
            return Ok(ListSlice {
                start: total,
                total,
                items: Vec::new(),
            });
        }
        // A window at least as long as any list reads from the head.
        let from = i64::try_from(max).map_or(0, |max| -max);
        let (total, items) = self.snapshot("LRANGE", key, from).await?;
        Ok(ListSlice {
            start: total.saturating_sub(items.len() as u64),
            total,
            items,
        })
    }

    async fn list_from(&self, key: &str, start: u64) -> StoreResult<ListSlice> {
        let from = i64::try_from(start).unwrap_or(i64::MAX);
        let (total, items) = self.snapshot("LRANGE", key, from).await?;
        Ok(ListSlice {
            start,
            total,
            items,
        })
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        let () = self.run("SET", cmd).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("GET", cmd).await
    }

    async fn get_many(&self, keys: &[String]) -> StoreResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut cmd = redis::cmd("MGET");
        cmd.arg(keys);
        self.run("MGET", cmd).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut cmd = redis::cmd("KEYS");
        cmd.arg(glob_prefix(prefix));
        self.run("KEYS", cmd).await
    }

    async fn flush(&self) -> StoreResult<()> {
        let () = self.run("FLUSHDB", redis::cmd("FLUSHDB")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_prefix_escapes_metacharacters() {
        assert_eq!(glob_prefix("tau_bench:messages:"), "tau_bench:messages:*");
        assert_eq!(glob_prefix("a*b?[c]"), "a\\*b\\?\\[c\\]*");
    }

    #[test]
    fn connection_errors_map_to_unreachable() {
        let io = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        ));
        assert!(matches!(map_redis_error(io), StoreError::Unreachable(_)));

        let server = RedisError::from((redis::ErrorKind::TypeError, "WRONGTYPE"));
        assert!(matches!(map_redis_error(server), StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails_fast() {
        let config = StoreConfig {
            url: Some("redis://127.0.0.1:1/0".to_string()),
            connect_timeout_ms: 1000,
            ..StoreConfig::default()
        };
        let started = std::time::Instant::now();
        let err = RedisStore::connect(&config).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Unreachable(_) | StoreError::Timeout { .. }
        ));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn invalid_url_is_rejected() {
        let config = StoreConfig {
            url: Some("not a url".to_string()),
            ..StoreConfig::default()
        };
        assert!(RedisStore::connect(&config).await.is_err());
    }
}
