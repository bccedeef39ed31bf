use serde::{Deserialize, Serialize};

use super::{CandidateMovie, MovieId};

/// Which path produced a recommendation list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// No preferences: first page of the popularity feed, unscored
    Popularity,
    /// Aggregated, deduplicated and scored candidates
    Personalized,
}

/// A ranked movie. `score` is absent for the popularity fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(flatten)]
    pub movie: CandidateMovie,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Recommendation {
    pub fn unscored(movie: CandidateMovie) -> Self {
        Self { movie, score: None }
    }

    pub fn scored(movie: CandidateMovie, score: f64) -> Self {
        Self {
            movie,
            score: Some(score),
        }
    }
}

/// Result of one recommendation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub strategy: Strategy,
    pub results: Vec<Recommendation>,
    /// Favorite movies whose similarity lookup failed and was skipped
    #[serde(default)]
    pub skipped_favorites: Vec<MovieId>,
}

impl Recommendations {
    pub fn ids(&self) -> Vec<MovieId> {
        self.results.iter().map(|r| r.movie.id).collect()
    }
}
