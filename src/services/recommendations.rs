use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateMovie, Recommendation, Recommendations, Strategy, UserPreferences},
    services::{
        aggregator::CandidateAggregator,
        catalog::CatalogApi,
        scoring::ScoringEngine,
    },
};

/// Generates personalized watch recommendations
///
/// With no favorite genres or movies the first page of the popularity feed is
/// returned as-is. Otherwise candidates are aggregated, deduplicated, stripped
/// of watched movies, scored and truncated to the requested limit.
///
/// The service holds only immutable collaborators and is shared across
/// requests behind an `Arc`. Dropping the future returned by
/// [`RecommendationService::recommend`] cancels every outstanding upstream call.
#[derive(Clone)]
pub struct RecommendationService {
    catalog: Arc<dyn CatalogApi>,
    aggregator: CandidateAggregator,
    scoring: ScoringEngine,
    deadline: Option<Duration>,
}

impl RecommendationService {
    pub fn new(catalog: Arc<dyn CatalogApi>, scoring: ScoringEngine, concurrency: usize) -> Self {
        Self {
            aggregator: CandidateAggregator::new(Arc::clone(&catalog), concurrency),
            catalog,
            scoring,
            deadline: None,
        }
    }

    /// Bounds the recommendation call.
    ///
    /// The popularity feed and genre discovery must finish in time or the
    /// call fails with [`AppError::DeadlineExceeded`]. A favorite lookup still
    /// pending at the deadline is skipped like any other failed favorite.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub async fn recommend(
        &self,
        preferences: &UserPreferences,
        limit: usize,
    ) -> AppResult<Recommendations> {
        let Some(deadline) = self.deadline else {
            return self.run(preferences, limit, None).await;
        };

        let expires_at = Instant::now() + deadline;
        tokio::time::timeout_at(expires_at, self.run(preferences, limit, Some(expires_at)))
            .await
            .map_err(|_| {
                tracing::warn!(
                    deadline_ms = deadline.as_millis() as u64,
                    "Recommendation deadline exceeded"
                );
                AppError::DeadlineExceeded(deadline)
            })?
    }

    async fn run(
        &self,
        preferences: &UserPreferences,
        limit: usize,
        expires_at: Option<Instant>,
    ) -> AppResult<Recommendations> {
        if preferences.is_empty() {
            return self.popularity_fallback(limit).await;
        }

        let aggregation = self.aggregator.aggregate(preferences, expires_at).await?;
        let skipped_favorites = aggregation.skipped_ids();
        let raw_count = aggregation.candidates.len();

        let eligible = dedup_and_filter(aggregation.candidates, preferences);
        let mut results = self.scoring.rank(eligible, preferences);
        let eligible_count = results.len();
        results.truncate(limit);

        tracing::info!(
            raw_candidates = raw_count,
            eligible = eligible_count,
            returned = results.len(),
            skipped_favorites = skipped_favorites.len(),
            "Personalized recommendations generated"
        );

        Ok(Recommendations {
            strategy: Strategy::Personalized,
            results,
            skipped_favorites,
        })
    }

    async fn popularity_fallback(&self, limit: usize) -> AppResult<Recommendations> {
        let popular = self.catalog.popular_movies(1).await?;

        let results: Vec<Recommendation> = popular
            .into_iter()
            .take(limit)
            .map(Recommendation::unscored)
            .collect();

        tracing::info!(returned = results.len(), "No preferences, using popularity feed");

        Ok(Recommendations {
            strategy: Strategy::Popularity,
            results,
            skipped_favorites: Vec::new(),
        })
    }
}

/// Keeps the first occurrence of each id and drops watched movies.
///
/// The surviving order is discovery order, which later serves as the
/// tie-break for equal scores.
pub fn dedup_and_filter(
    candidates: Vec<CandidateMovie>,
    preferences: &UserPreferences,
) -> Vec<CandidateMovie> {
    let mut seen = HashSet::with_capacity(candidates.len());

    candidates
        .into_iter()
        .filter(|movie| seen.insert(movie.id))
        .filter(|movie| !preferences.has_watched(movie.id))
        .collect()
}
