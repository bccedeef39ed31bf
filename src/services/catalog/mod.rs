/// Movie catalog abstraction
///
/// The catalog is the external movie database every candidate comes from.
/// `TmdbClient` talks to it over HTTP with bounded retry; `CachedCatalog`
/// wraps any implementation with Redis-backed response caching.
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::UpstreamError,
    models::{CandidateMovie, Credits, Genre, GenreId, MovieDetails, MovieId},
};

pub mod cached;
pub mod endpoint;
pub mod retry;
#[cfg(test)]
pub mod scripted;
pub mod tmdb;

pub use cached::CachedCatalog;
pub use endpoint::Endpoint;
pub use retry::RetryPolicy;
#[cfg(test)]
pub use scripted::ScriptedCatalog;
pub use tmdb::TmdbClient;

pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// Read-only queries against the movie catalog
///
/// Implementations hold no mutable state and are shared across requests
/// behind an `Arc`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogApi: Send + Sync {
    /// One page of the popularity feed, in upstream order
    async fn popular_movies(&self, page: u32) -> UpstreamResult<Vec<CandidateMovie>>;

    async fn search_movies(&self, query: &str, page: u32) -> UpstreamResult<Vec<CandidateMovie>>;

    async fn movie_details(&self, id: MovieId) -> UpstreamResult<MovieDetails>;

    async fn movie_credits(&self, id: MovieId) -> UpstreamResult<Credits>;

    async fn similar_movies(&self, id: MovieId, page: u32) -> UpstreamResult<Vec<CandidateMovie>>;

    async fn genres(&self) -> UpstreamResult<Vec<Genre>>;

    /// Movies matching all of `genre_ids`, most popular first
    async fn discover_by_genre(
        &self,
        genre_ids: &[GenreId],
        page: u32,
    ) -> UpstreamResult<Vec<CandidateMovie>>;

    async fn recommendations_for_movie(
        &self,
        id: MovieId,
        page: u32,
    ) -> UpstreamResult<Vec<CandidateMovie>>;
}

/// Decodes the array under `field`, skipping elements that don't fit `T`.
///
/// A missing or non-array field yields an empty list.
pub fn extract_list<T: DeserializeOwned>(body: &Value, field: &str) -> Vec<T> {
    let Some(items) = body.get(field).and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<T>(item.clone()) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                tracing::debug!(error = %e, field = field, "Skipping malformed catalog entry");
                None
            }
        })
        .collect()
}

/// Decodes a whole response body as a single object
pub fn extract_object<T: DeserializeOwned>(body: Value) -> UpstreamResult<T> {
    serde_json::from_value(body).map_err(|e| UpstreamError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_list_skips_malformed_entries() {
        let body = json!({
            "page": 1,
            "results": [
                {"id": 1, "title": "Kept"},
                {"title": "Missing id"},
                "not an object",
                {"id": 2, "title": "Also kept", "popularity": 12.5}
            ]
        });

        let movies: Vec<CandidateMovie> = extract_list(&body, "results");
        assert_eq!(movies.iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_extract_list_missing_field_is_empty() {
        let movies: Vec<CandidateMovie> = extract_list(&json!({"page": 1}), "results");
        assert!(movies.is_empty());

        let genres: Vec<Genre> = extract_list(&json!({"genres": null}), "genres");
        assert!(genres.is_empty());
    }

    #[test]
    fn test_extract_object_decode_error() {
        let err = extract_object::<MovieDetails>(json!({"title": "No id"})).unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }
}
