use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::Instant;

use crate::{
    error::UpstreamError,
    models::{CandidateMovie, GenreId, MovieId, UserPreferences},
    services::catalog::{CatalogApi, UpstreamResult},
};

/// Every aggregation call asks for the first page only
const FIRST_PAGE: u32 = 1;

/// A favorite whose similarity lookup failed and was left out
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFavorite {
    pub movie_id: MovieId,
    pub error: UpstreamError,
}

/// Raw candidates in discovery order, duplicates included
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    pub candidates: Vec<CandidateMovie>,
    pub skipped: Vec<SkippedFavorite>,
}

impl Aggregation {
    pub fn skipped_ids(&self) -> Vec<MovieId> {
        self.skipped.iter().map(|s| s.movie_id).collect()
    }
}

/// Collects genre-based and favorite-based candidates from the catalog
#[derive(Clone)]
pub struct CandidateAggregator {
    catalog: Arc<dyn CatalogApi>,
    concurrency: usize,
}

impl CandidateAggregator {
    pub fn new(catalog: Arc<dyn CatalogApi>, concurrency: usize) -> Self {
        Self {
            catalog,
            concurrency: concurrency.max(1),
        }
    }

    /// Gathers candidates for the given preferences.
    ///
    /// Genre discovery is mandatory: its failure is returned at once and any
    /// favorite lookups still in flight are dropped. Per-favorite lookups are
    /// optional: a failed favorite is recorded in `skipped` and the rest still
    /// contribute. With a `lookup_deadline`, a favorite that has not answered
    /// by then counts as failed. Genre results come first, then each
    /// favorite's results in the order the favorites were supplied.
    pub async fn aggregate(
        &self,
        preferences: &UserPreferences,
        lookup_deadline: Option<Instant>,
    ) -> UpstreamResult<Aggregation> {
        let mut aggregation = Aggregation::default();

        if preferences.is_empty() {
            return Ok(aggregation);
        }

        let genre_ids: Vec<GenreId> = preferences.favorite_genre_ids.iter().copied().collect();

        let favorites = async {
            let lookups = self
                .recommendations_for_favorites(&preferences.favorite_movies, lookup_deadline)
                .await;
            Ok::<_, UpstreamError>(lookups)
        };
        let (by_genre, by_favorite) =
            tokio::try_join!(self.discover_by_genres(&genre_ids), favorites)?;

        aggregation.candidates.extend(by_genre);

        for (movie_id, result) in by_favorite {
            match result {
                Ok(movies) => aggregation.candidates.extend(movies),
                Err(error) => {
                    tracing::warn!(
                        movie_id,
                        error = %error,
                        "Skipping favorite after failed recommendations lookup"
                    );
                    aggregation.skipped.push(SkippedFavorite { movie_id, error });
                }
            }
        }

        tracing::debug!(
            candidates = aggregation.candidates.len(),
            skipped = aggregation.skipped.len(),
            "Candidate aggregation completed"
        );

        Ok(aggregation)
    }

    async fn discover_by_genres(&self, genre_ids: &[GenreId]) -> UpstreamResult<Vec<CandidateMovie>> {
        if genre_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.catalog.discover_by_genre(genre_ids, FIRST_PAGE).await
    }

    /// Looks up every favorite concurrently; results come back in favorite order
    async fn recommendations_for_favorites(
        &self,
        favorites: &[CandidateMovie],
        deadline: Option<Instant>,
    ) -> Vec<(MovieId, UpstreamResult<Vec<CandidateMovie>>)> {
        let lookups: Vec<_> = favorites
            .iter()
            .map(|favorite| {
                let catalog = Arc::clone(&self.catalog);
                let movie_id = favorite.id;
                async move {
                    let lookup = catalog.recommendations_for_movie(movie_id, FIRST_PAGE);
                    let result = match deadline {
                        Some(deadline) => tokio::time::timeout_at(deadline, lookup)
                            .await
                            .unwrap_or_else(|_| {
                                Err(UpstreamError::Transport(
                                    "no response before the recommendation deadline".to_string(),
                                ))
                            }),
                        None => lookup.await,
                    };
                    (movie_id, result)
                }
            })
            .collect();

        stream::iter(lookups)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::{MockCatalogApi, ScriptedCatalog};
    use std::time::Duration;

    fn movie(id: MovieId) -> CandidateMovie {
        CandidateMovie::new(id, format!("Movie {}", id))
    }

    fn aggregator(catalog: MockCatalogApi) -> CandidateAggregator {
        CandidateAggregator::new(Arc::new(catalog), 4)
    }

    #[tokio::test]
    async fn test_empty_preferences_skip_upstream() {
        let catalog = MockCatalogApi::new();
        let result = aggregator(catalog)
            .aggregate(&UserPreferences::new().with_watched([1]), None)
            .await
            .unwrap();

        assert!(result.candidates.is_empty());
        assert!(result.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_genres_joined_into_single_discover_call() {
        let mut catalog = MockCatalogApi::new();
        catalog
            .expect_discover_by_genre()
            .withf(|genres, page| genres.to_vec() == vec![12, 28] && *page == 1)
            .times(1)
            .returning(|_, _| Ok(vec![movie(1), movie(2)]));

        let prefs = UserPreferences::new().with_genres([28, 12]);
        let result = aggregator(catalog).aggregate(&prefs, None).await.unwrap();

        assert_eq!(result.candidates, vec![movie(1), movie(2)]);
    }

    #[tokio::test]
    async fn test_genre_failure_is_fatal() {
        let mut catalog = MockCatalogApi::new();
        catalog
            .expect_discover_by_genre()
            .returning(|_, _| Err(UpstreamError::ClientError { status: 401 }));
        catalog
            .expect_recommendations_for_movie()
            .returning(|_, _| Ok(vec![movie(9)]));

        let prefs = UserPreferences::new()
            .with_genres([28])
            .with_favorite_movie(movie(100));
        let err = aggregator(catalog).aggregate(&prefs, None).await.unwrap_err();

        assert_eq!(err, UpstreamError::ClientError { status: 401 });
    }

    #[tokio::test]
    async fn test_failed_favorite_is_isolated() {
        let mut catalog = MockCatalogApi::new();
        catalog
            .expect_recommendations_for_movie()
            .returning(|id, _| match id {
                200 => Err(UpstreamError::Exhausted {
                    attempts: 3,
                    last_status: Some(503),
                    last_error: "status 503".to_string(),
                }),
                _ => Ok(vec![movie(id * 10)]),
            });

        let prefs = UserPreferences::new()
            .with_favorite_movie(movie(100))
            .with_favorite_movie(movie(200))
            .with_favorite_movie(movie(300));
        let result = aggregator(catalog).aggregate(&prefs, None).await.unwrap();

        assert_eq!(result.candidates, vec![movie(1000), movie(3000)]);
        assert_eq!(result.skipped_ids(), vec![200]);
    }

    #[tokio::test]
    async fn test_discovery_order_genres_then_favorites() {
        let mut catalog = MockCatalogApi::new();
        catalog
            .expect_discover_by_genre()
            .returning(|_, _| Ok(vec![movie(1), movie(2)]));
        catalog
            .expect_recommendations_for_movie()
            .returning(|id, _| Ok(vec![movie(id + 1), movie(2)]));

        let prefs = UserPreferences::new()
            .with_genres([18])
            .with_favorite_movie(movie(50))
            .with_favorite_movie(movie(10));
        let result = aggregator(catalog).aggregate(&prefs, None).await.unwrap();

        let ids: Vec<_> = result.candidates.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 51, 2, 11, 2]);
    }

    #[tokio::test]
    async fn test_genre_failure_does_not_wait_for_favorites() {
        let catalog = ScriptedCatalog::new()
            .discover(Duration::ZERO, Err(UpstreamError::ClientError { status: 401 }))
            .favorite(100, Duration::from_secs(3600), Ok(vec![movie(9)]));
        let aggregator = CandidateAggregator::new(Arc::new(catalog), 4);

        let prefs = UserPreferences::new()
            .with_genres([28])
            .with_favorite_movie(movie(100));
        let result =
            tokio::time::timeout(Duration::from_secs(1), aggregator.aggregate(&prefs, None))
                .await
                .expect("genre failure should be returned right away");

        assert_eq!(result.unwrap_err(), UpstreamError::ClientError { status: 401 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_favorite_past_lookup_deadline_is_skipped() {
        let catalog = ScriptedCatalog::new()
            .discover(Duration::from_secs(2), Ok(vec![movie(1)]))
            .favorite(100, Duration::from_secs(5), Ok(vec![movie(10)]))
            .favorite(
                200,
                Duration::from_secs(33),
                Err(UpstreamError::Exhausted {
                    attempts: 3,
                    last_status: None,
                    last_error: "timed out".to_string(),
                }),
            );
        let aggregator = CandidateAggregator::new(Arc::new(catalog), 4);

        let prefs = UserPreferences::new()
            .with_genres([28])
            .with_favorite_movie(movie(100))
            .with_favorite_movie(movie(200));
        let start = Instant::now();
        let result = aggregator
            .aggregate(&prefs, Some(start + Duration::from_secs(30)))
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_secs(33));
        assert_eq!(result.candidates, vec![movie(1), movie(10)]);
        assert_eq!(result.skipped_ids(), vec![200]);
        assert!(result.skipped[0].error.is_transport());
    }
}
