use serde::{Deserialize, Serialize};

use crate::models::{CandidateMovie, Recommendation, UserPreferences};

/// Weights of the ranking heuristic
///
/// `score = matches * genre_match + popularity / popularity_divisor
///          + vote_average / vote_average_divisor`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    /// Added once per favorite genre the candidate carries
    pub genre_match: f64,
    /// Popularity values run into the hundreds; this brings them near the rating scale
    pub popularity_divisor: f64,
    /// Vote average is 0..10; halved it tops out around 5
    pub vote_average_divisor: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            genre_match: 2.0,
            popularity_divisor: 100.0,
            vote_average_divisor: 2.0,
        }
    }
}

/// Pure ranking function over candidates
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine {
    weights: ScoringWeights,
}

impl ScoringEngine {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Number of distinct candidate genres among the user's favorites
    pub fn genre_match_count(candidate: &CandidateMovie, preferences: &UserPreferences) -> usize {
        let mut matched: Vec<_> = candidate
            .genre_ids
            .iter()
            .filter(|g| preferences.favorite_genre_ids.contains(g))
            .collect();
        matched.sort_unstable();
        matched.dedup();
        matched.len()
    }

    pub fn score(&self, candidate: &CandidateMovie, preferences: &UserPreferences) -> f64 {
        let matches = Self::genre_match_count(candidate, preferences) as f64;

        matches * self.weights.genre_match
            + candidate.popularity / self.weights.popularity_divisor
            + candidate.vote_average / self.weights.vote_average_divisor
    }

    /// Scores every candidate and sorts by score, highest first.
    ///
    /// The sort is stable: equal scores keep their input order.
    pub fn rank(
        &self,
        candidates: Vec<CandidateMovie>,
        preferences: &UserPreferences,
    ) -> Vec<Recommendation> {
        let mut ranked: Vec<Recommendation> = candidates
            .into_iter()
            .map(|movie| {
                let score = self.score(&movie, preferences);
                Recommendation::scored(movie, score)
            })
            .collect();

        ranked.sort_by(|a, b| {
            let a = a.score.unwrap_or_default();
            let b = b.score.unwrap_or_default();
            b.total_cmp(&a)
        });

        ranked
    }
}
