/// Read-through caching around an async computation.
///
/// Looks `$key` up in `$cache`; on a hit the cached value is returned. On a
/// miss (or a failed cache read) `$block` is awaited, its error propagated with
/// `?`, and a successful value is queued for a background write with `$ttl`
/// seconds to live.
///
/// # Example
/// ```rust,ignore
/// let genres: UpstreamResult<Vec<Genre>> =
///     cached!(self.cache, CacheKey::Genres, GENRES_TTL, self.inner.genres());
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.lookup(&key).await {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
