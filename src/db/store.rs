use crate::{
    error::AppResult,
    models::{Genre, StoredMovie, StoredTrivia, TriviaQuestion, UserId, UserProfile},
};

/// Persistent movie library: saved movies, user favorites, watch history and trivia
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieStore: Send + Sync {
    /// Inserts or renames genres; returns how many were written
    async fn upsert_genres(&self, genres: &[Genre]) -> AppResult<usize>;

    async fn list_genres(&self) -> AppResult<Vec<Genre>>;

    /// Inserts or refreshes a movie together with its genres
    async fn upsert_movie(&self, movie: &StoredMovie) -> AppResult<StoredMovie>;

    async fn list_movies(&self) -> AppResult<Vec<StoredMovie>>;

    /// Fails with `NotFound` when the movie was never saved
    async fn get_movie(&self, tmdb_id: i64) -> AppResult<StoredMovie>;

    /// Replaces the user's favorite genres. Unknown ids fail with `NotFound`.
    async fn set_favorite_genres(&self, user_id: UserId, genre_ids: &[i64]) -> AppResult<()>;

    /// Replaces the user's favorite movies, keeping the given order.
    /// Unknown ids fail with `NotFound`.
    async fn set_favorite_movies(&self, user_id: UserId, movie_ids: &[i64]) -> AppResult<()>;

    /// Marks movies as watched now; watching again refreshes time and rating
    async fn record_watched(
        &self,
        user_id: UserId,
        movie_ids: &[i64],
        user_rating: Option<i32>,
    ) -> AppResult<()>;

    /// Profile of a user; users without any rows get an empty profile
    async fn load_profile(&self, user_id: UserId) -> AppResult<UserProfile>;

    async fn save_trivia(
        &self,
        movie_id: i64,
        questions: &[TriviaQuestion],
    ) -> AppResult<Vec<StoredTrivia>>;

    async fn list_trivia(&self, movie_id: i64) -> AppResult<Vec<StoredTrivia>>;
}
