pub mod postgres;
pub mod redis;
mod store;

pub use self::postgres::{create_pool, run_migrations, PgMovieStore};
pub use self::redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use self::store::MovieStore;

#[cfg(test)]
pub use self::store::MockMovieStore;
