/// Memoizes an async computation in Redis.
///
/// Returns the cached value when present. Otherwise awaits `$block`, queues the
/// result for a background write with `$ttl` seconds and returns it. A failed
/// cache read is logged and treated as a miss, so Redis being down only costs
/// a trip to the upstream source.
///
/// # Arguments
/// * `$cache`: a [`Cache`](crate::db::Cache).
/// * `$key`: the [`CacheKey`](crate::db::CacheKey) to read and write.
/// * `$ttl`: time-to-live for the written value, in seconds.
/// * `$block`: future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// let results: Vec<Anime> = cached!(self.cache, CacheKey::AnimeSearch(query.to_string()), 3600, async move {
///     self.post_graphql(SEARCH_QUERY, variables).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        let hit = match $cache.get_from_cache(&key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, bypassing cache");
                None
            }
        };

        match hit {
            Some(cached) => {
                tracing::debug!(key = %key, "Cache hit");
                Ok(cached)
            }
            None => match $block.await {
                Ok(value) => {
                    $cache.set_in_background(&key, &value, $ttl);
                    Ok(value)
                }
                Err(e) => Err(e),
            },
        }
    }};
}
