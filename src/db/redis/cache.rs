use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::fmt::Display;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::{GenreId, MovieId};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Genres,
    Popular(u32),
    Search(String, u32),
    Details(MovieId),
    Credits(MovieId),
    Similar(MovieId, u32),
    Discover(Vec<GenreId>, u32),
    Recommendations(MovieId, u32),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Genres => write!(f, "genres"),
            CacheKey::Popular(page) => write!(f, "popular:{}", page),
            CacheKey::Search(query, page) => {
                write!(f, "search:{}:{}", query.trim().to_lowercase(), page)
            }
            CacheKey::Details(id) => write!(f, "details:{}", id),
            CacheKey::Credits(id) => write!(f, "credits:{}", id),
            CacheKey::Similar(id, page) => write!(f, "similar:{}:{}", id, page),
            CacheKey::Discover(genres, page) => {
                let genres = genres
                    .iter()
                    .map(|g| g.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                write!(f, "discover:{}:{}", genres, page)
            }
            CacheKey::Recommendations(id, page) => write!(f, "recs:{}:{}", id, page),
        }
    }
}

/// Creates a Redis client for caching
///
/// The client connects lazily; nothing is dialed until the first command.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// A serialized value waiting to be written
struct PendingWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Background task that drains queued writes into Redis
///
/// The connection is opened on the first write and reused until a command
/// fails, after which the next write reconnects.
struct CacheWriter {
    client: Client,
    conn: Option<MultiplexedConnection>,
}

impl CacheWriter {
    async fn write(&mut self, pending: PendingWrite) -> AppResult<()> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => self.client.get_multiplexed_async_connection().await?,
        };

        let result: redis::RedisResult<()> =
            conn.set_ex(pending.key, pending.value, pending.ttl).await;
        if result.is_ok() {
            self.conn = Some(conn);
        }

        Ok(result?)
    }

    async fn run(
        mut self,
        mut writes: mpsc::UnboundedReceiver<PendingWrite>,
        mut shutdown: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer started");

        loop {
            tokio::select! {
                Some(pending) = writes.recv() => {
                    let key = pending.key.clone();
                    if let Err(e) = self.write(pending).await {
                        tracing::warn!(key = %key, error = %e, "Cache write failed");
                    }
                }
                _ = shutdown.recv() => break,
                else => break,
            }
        }

        // Stop accepting writes, then flush what is already queued
        writes.close();
        let mut flushed = 0usize;
        while let Some(pending) = writes.recv().await {
            if self.write(pending).await.is_ok() {
                flushed += 1;
            }
        }

        tracing::info!(flushed, "Cache writer stopped");
    }
}

/// Read-through cache over Redis with fire-and-forget writes
#[derive(Clone)]
pub struct Cache {
    redis_client: Client,
    writes: mpsc::UnboundedSender<PendingWrite>,
}

/// Stops the background writer after flushing queued writes
pub struct CacheWriterHandle {
    shutdown: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer and waits until its flush has finished
    pub async fn shutdown(self) {
        if self.shutdown.send(()).await.is_err() {
            tracing::debug!("Cache writer already stopped");
        }
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl Cache {
    /// Spawns the writer task; must be called inside a Tokio runtime
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (writes_tx, writes_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let writer = CacheWriter {
            client: redis_client.clone(),
            conn: None,
        };
        let task = tokio::spawn(writer.run(writes_rx, shutdown_rx));

        (
            Self {
                redis_client,
                writes: writes_tx,
            },
            CacheWriterHandle {
                shutdown: shutdown_tx,
                task,
            },
        )
    }

    /// Reads and deserializes a cached value
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cached value for {} is corrupt: {}", key, e))
                })
            })
            .transpose()
    }

    /// Like `get_from_cache`, but a failed read is logged and reported as a miss
    pub async fn lookup<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        match self.get_from_cache(key).await {
            Ok(hit) => {
                tracing::debug!(key = %key, hit = hit.is_some(), "Cache lookup");
                hit
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                None
            }
        }
    }

    /// Queues a value for writing without waiting for Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Value not cacheable");
                return;
            }
        };

        let pending = PendingWrite {
            key: key.to_string(),
            value,
            ttl,
        };
        if self.writes.send(pending).is_err() {
            tracing::warn!(key = %key, "Cache writer stopped, dropping write");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_search_is_normalized() {
        let key = CacheKey::Search("  The Matrix ".to_string(), 1);
        assert_eq!(key.to_string(), "search:the matrix:1");
    }

    #[test]
    fn test_cache_key_display_discover() {
        let key = CacheKey::Discover(vec![28, 12], 1);
        assert_eq!(key.to_string(), "discover:28,12:1");
    }

    #[test]
    fn test_cache_key_display_movie_keys() {
        assert_eq!(CacheKey::Details(603).to_string(), "details:603");
        assert_eq!(CacheKey::Credits(603).to_string(), "credits:603");
        assert_eq!(CacheKey::Similar(603, 2).to_string(), "similar:603:2");
        assert_eq!(CacheKey::Recommendations(603, 1).to_string(), "recs:603:1");
        assert_eq!(CacheKey::Popular(1).to_string(), "popular:1");
        assert_eq!(CacheKey::Genres.to_string(), "genres");
    }

    #[tokio::test]
    async fn test_lookup_against_unreachable_redis_is_a_miss() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client);

        let hit: Option<Vec<String>> = cache.lookup(&CacheKey::Genres).await;
        assert_eq!(hit, None);
    }

    #[tokio::test]
    async fn test_set_in_background_does_not_block_without_redis() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        cache.set_in_background(&CacheKey::Popular(1), &vec![1, 2, 3], 60);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_writer_to_finish() {
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        cache.set_in_background(&CacheKey::Genres, &vec!["Action"], 60);
        cache.set_in_background(&CacheKey::Popular(2), &vec![7], 60);
        handle.shutdown().await;

        // The writer closes the queue on its way out
        assert!(cache.writes.is_closed());
    }
}
