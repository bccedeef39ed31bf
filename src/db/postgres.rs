use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::collections::{BTreeSet, HashMap};

use crate::{
    db::MovieStore,
    error::{AppError, AppResult},
    models::{
        Genre, GenreId, StoredMovie, StoredTrivia, TriviaQuestion, UserId, UserProfile, WatchEntry,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

const MOVIE_COLUMNS: &str = "m.tmdb_id, m.title, m.overview, m.poster_path, m.backdrop_path, \
                             m.release_date, m.vote_average, m.vote_count";

#[derive(sqlx::FromRow)]
struct WatchRow {
    #[sqlx(flatten)]
    movie: StoredMovie,
    watched_at: chrono::DateTime<chrono::Utc>,
    user_rating: Option<i32>,
}

fn genre_from_row((id, name): (i64, String)) -> Genre {
    Genre {
        id: id as GenreId,
        name,
    }
}

/// Ids from `requested` that are absent from `found`, in ascending order
fn missing_ids(requested: &[i64], found: &[i64]) -> Vec<i64> {
    let found: BTreeSet<_> = found.iter().collect();
    requested
        .iter()
        .filter(|id| !found.contains(id))
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Keeps the first occurrence of every id
fn unique_in_order(ids: &[i64]) -> Vec<i64> {
    let mut seen = BTreeSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[derive(Clone)]
pub struct PgMovieStore {
    pool: PgPool,
}

impl PgMovieStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_exist(
        tx: &mut Transaction<'_, Postgres>,
        table: &str,
        column: &str,
        ids: &[i64],
    ) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let sql = format!("SELECT {column} FROM {table} WHERE {column} = ANY($1)");
        let found: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(ids)
            .fetch_all(&mut **tx)
            .await?;

        let missing = missing_ids(ids, &found);
        if !missing.is_empty() {
            return Err(AppError::NotFound(format!(
                "Unknown {} ids: {:?}",
                table, missing
            )));
        }
        Ok(())
    }

    /// Fills in `genres` for each movie with a single query
    async fn attach_genres(&self, movies: &mut [StoredMovie]) -> AppResult<()> {
        if movies.is_empty() {
            return Ok(());
        }

        let ids: Vec<i64> = movies.iter().map(|m| m.tmdb_id).collect();
        let rows: Vec<(i64, i64, String)> = sqlx::query_as(
            "SELECT mg.movie_id, g.id, g.name FROM movie_genres mg \
             JOIN genres g ON g.id = mg.genre_id \
             WHERE mg.movie_id = ANY($1) ORDER BY g.name",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_movie: HashMap<i64, Vec<Genre>> = HashMap::new();
        for (movie_id, genre_id, name) in rows {
            by_movie
                .entry(movie_id)
                .or_default()
                .push(genre_from_row((genre_id, name)));
        }

        for movie in movies.iter_mut() {
            movie.genres = by_movie.remove(&movie.tmdb_id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl MovieStore for PgMovieStore {
    async fn upsert_genres(&self, genres: &[Genre]) -> AppResult<usize> {
        let mut tx = self.pool.begin().await?;

        for genre in genres {
            sqlx::query(
                "INSERT INTO genres (id, name) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
            )
            .bind(genre.id as i64)
            .bind(&genre.name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(count = genres.len(), "Genres synced");
        Ok(genres.len())
    }

    async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM genres ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(genre_from_row).collect())
    }

    async fn upsert_movie(&self, movie: &StoredMovie) -> AppResult<StoredMovie> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO movies (tmdb_id, title, overview, poster_path, backdrop_path, \
                                 release_date, vote_average, vote_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (tmdb_id) DO UPDATE SET \
                 title = EXCLUDED.title, overview = EXCLUDED.overview, \
                 poster_path = EXCLUDED.poster_path, backdrop_path = EXCLUDED.backdrop_path, \
                 release_date = EXCLUDED.release_date, vote_average = EXCLUDED.vote_average, \
                 vote_count = EXCLUDED.vote_count",
        )
        .bind(movie.tmdb_id)
        .bind(&movie.title)
        .bind(&movie.overview)
        .bind(&movie.poster_path)
        .bind(&movie.backdrop_path)
        .bind(&movie.release_date)
        .bind(movie.vote_average)
        .bind(movie.vote_count)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM movie_genres WHERE movie_id = $1")
            .bind(movie.tmdb_id)
            .execute(&mut *tx)
            .await?;

        for genre in &movie.genres {
            sqlx::query(
                "INSERT INTO genres (id, name) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name",
            )
            .bind(genre.id as i64)
            .bind(&genre.name)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "INSERT INTO movie_genres (movie_id, genre_id) VALUES ($1, $2) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(movie.tmdb_id)
            .bind(genre.id as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(tmdb_id = movie.tmdb_id, title = %movie.title, "Movie saved");

        Ok(movie.clone())
    }

    async fn list_movies(&self) -> AppResult<Vec<StoredMovie>> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies m ORDER BY m.title");
        let mut movies: Vec<StoredMovie> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        self.attach_genres(&mut movies).await?;
        Ok(movies)
    }

    async fn get_movie(&self, tmdb_id: i64) -> AppResult<StoredMovie> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies m WHERE m.tmdb_id = $1");
        let movie: Option<StoredMovie> = sqlx::query_as(&sql)
            .bind(tmdb_id)
            .fetch_optional(&self.pool)
            .await?;

        let mut movies = vec![movie
            .ok_or_else(|| AppError::NotFound(format!("Movie {} is not in the library", tmdb_id)))?];
        self.attach_genres(&mut movies).await?;

        Ok(movies.remove(0))
    }

    async fn set_favorite_genres(&self, user_id: UserId, genre_ids: &[i64]) -> AppResult<()> {
        let genre_ids = unique_in_order(genre_ids);
        let mut tx = self.pool.begin().await?;

        Self::ensure_exist(&mut tx, "genres", "id", &genre_ids).await?;

        sqlx::query("DELETE FROM favorite_genres WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for genre_id in &genre_ids {
            sqlx::query("INSERT INTO favorite_genres (user_id, genre_id) VALUES ($1, $2)")
                .bind(user_id)
                .bind(genre_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(user_id, count = genre_ids.len(), "Favorite genres updated");
        Ok(())
    }

    async fn set_favorite_movies(&self, user_id: UserId, movie_ids: &[i64]) -> AppResult<()> {
        let movie_ids = unique_in_order(movie_ids);
        let mut tx = self.pool.begin().await?;

        Self::ensure_exist(&mut tx, "movies", "tmdb_id", &movie_ids).await?;

        sqlx::query("DELETE FROM favorite_movies WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for (position, movie_id) in movie_ids.iter().enumerate() {
            sqlx::query(
                "INSERT INTO favorite_movies (user_id, movie_id, position) VALUES ($1, $2, $3)",
            )
            .bind(user_id)
            .bind(movie_id)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(user_id, count = movie_ids.len(), "Favorite movies updated");
        Ok(())
    }

    async fn record_watched(
        &self,
        user_id: UserId,
        movie_ids: &[i64],
        user_rating: Option<i32>,
    ) -> AppResult<()> {
        let movie_ids = unique_in_order(movie_ids);
        let mut tx = self.pool.begin().await?;

        Self::ensure_exist(&mut tx, "movies", "tmdb_id", &movie_ids).await?;

        for movie_id in &movie_ids {
            sqlx::query(
                "INSERT INTO watch_history (user_id, movie_id, watched_at, user_rating) \
                 VALUES ($1, $2, now(), $3) \
                 ON CONFLICT (user_id, movie_id) DO UPDATE SET \
                     watched_at = EXCLUDED.watched_at, \
                     user_rating = COALESCE(EXCLUDED.user_rating, watch_history.user_rating)",
            )
            .bind(user_id)
            .bind(movie_id)
            .bind(user_rating)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(user_id, count = movie_ids.len(), "Watch history updated");
        Ok(())
    }

    async fn load_profile(&self, user_id: UserId) -> AppResult<UserProfile> {
        let genre_rows: Vec<(i64, String)> = sqlx::query_as(
            "SELECT g.id, g.name FROM favorite_genres f \
             JOIN genres g ON g.id = f.genre_id \
             WHERE f.user_id = $1 ORDER BY g.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let sql = format!(
            "SELECT {MOVIE_COLUMNS} FROM favorite_movies f \
             JOIN movies m ON m.tmdb_id = f.movie_id \
             WHERE f.user_id = $1 ORDER BY f.position"
        );
        let mut favorite_movies: Vec<StoredMovie> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_genres(&mut favorite_movies).await?;

        let sql = format!(
            "SELECT {MOVIE_COLUMNS}, w.watched_at, w.user_rating FROM watch_history w \
             JOIN movies m ON m.tmdb_id = w.movie_id \
             WHERE w.user_id = $1 ORDER BY w.watched_at DESC"
        );
        let watch_rows: Vec<WatchRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        let mut watched: Vec<StoredMovie> = Vec::with_capacity(watch_rows.len());
        let mut stamps = Vec::with_capacity(watch_rows.len());
        for row in watch_rows {
            watched.push(row.movie);
            stamps.push((row.watched_at, row.user_rating));
        }
        self.attach_genres(&mut watched).await?;

        let watch_history = watched
            .into_iter()
            .zip(stamps)
            .map(|(movie, (watched_at, user_rating))| WatchEntry {
                movie,
                watched_at,
                user_rating,
            })
            .collect();

        Ok(UserProfile {
            user_id,
            favorite_genres: genre_rows.into_iter().map(genre_from_row).collect(),
            favorite_movies,
            watch_history,
        })
    }

    async fn save_trivia(
        &self,
        movie_id: i64,
        questions: &[TriviaQuestion],
    ) -> AppResult<Vec<StoredTrivia>> {
        let mut tx = self.pool.begin().await?;
        Self::ensure_exist(&mut tx, "movies", "tmdb_id", &[movie_id]).await?;

        let mut saved = Vec::with_capacity(questions.len());
        for question in questions {
            let row: StoredTrivia = sqlx::query_as(
                "INSERT INTO movie_trivia (movie_id, question, answers, correct_answer_index, explanation) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING id, movie_id, question, answers, correct_answer_index, explanation",
            )
            .bind(movie_id)
            .bind(&question.question)
            .bind(&question.answers)
            .bind(question.correct_answer_index as i32)
            .bind(&question.explanation)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        tracing::info!(movie_id, count = saved.len(), "Trivia saved");
        Ok(saved)
    }

    async fn list_trivia(&self, movie_id: i64) -> AppResult<Vec<StoredTrivia>> {
        let rows = sqlx::query_as(
            "SELECT id, movie_id, question, answers, correct_answer_index, explanation \
             FROM movie_trivia WHERE movie_id = $1 ORDER BY id",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
