use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CandidateMovie, Genre, GenreId, MovieDetails, MovieId, UserPreferences};

/// User identifier; authentication happens outside this service
pub type UserId = i64;

/// A movie saved to the local library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredMovie {
    pub tmdb_id: i64,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f64,
    pub vote_count: i64,
    #[sqlx(skip)]
    #[serde(default)]
    pub genres: Vec<Genre>,
}

impl StoredMovie {
    pub fn from_details(details: &MovieDetails) -> Self {
        Self {
            tmdb_id: details.id as i64,
            title: details.title.clone(),
            overview: details.overview.clone(),
            poster_path: details.poster_path.clone(),
            backdrop_path: details.backdrop_path.clone(),
            release_date: details.release_date.clone().filter(|d| !d.is_empty()),
            vote_average: details.vote_average,
            vote_count: details.vote_count as i64,
            genres: details.genres.clone(),
        }
    }

    /// Converts to a ranking candidate (favorites seed similarity lookups)
    pub fn to_candidate(&self) -> CandidateMovie {
        let mut candidate = CandidateMovie::new(self.tmdb_id as MovieId, self.title.clone())
            .with_genres(self.genres.iter().map(|g| g.id).collect())
            .with_vote_average(self.vote_average);
        candidate.overview = self.overview.clone();
        candidate.poster_path = self.poster_path.clone();
        candidate.release_date = self.release_date.clone();
        candidate
    }
}

/// One row of a user's watch history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchEntry {
    pub movie: StoredMovie,
    pub watched_at: DateTime<Utc>,
    pub user_rating: Option<i32>,
}

/// Everything the library knows about a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub favorite_genres: Vec<Genre>,
    pub favorite_movies: Vec<StoredMovie>,
    pub watch_history: Vec<WatchEntry>,
}

impl UserProfile {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            favorite_genres: Vec::new(),
            favorite_movies: Vec::new(),
            watch_history: Vec::new(),
        }
    }

    /// Snapshot used to drive the recommendation pipeline
    pub fn preferences(&self) -> UserPreferences {
        let mut preferences = UserPreferences::new()
            .with_genres(self.favorite_genres.iter().map(|g| g.id as GenreId))
            .with_watched(
                self.watch_history
                    .iter()
                    .map(|entry| entry.movie.tmdb_id as MovieId),
            );
        for movie in &self.favorite_movies {
            preferences.add_favorite_movie(movie.to_candidate());
        }
        preferences
    }
}

/// A persisted trivia question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredTrivia {
    pub id: i64,
    pub movie_id: i64,
    pub question: String,
    pub answers: Vec<String>,
    pub correct_answer_index: i32,
    pub explanation: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveMovieRequest {
    pub tmdb_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteGenresRequest {
    pub genre_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteMoviesRequest {
    pub movie_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct WatchedRequest {
    pub movie_ids: Vec<i64>,
    #[serde(default)]
    pub user_rating: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateTriviaRequest {
    pub movie_id: i64,
}
