use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{
        resolve_limit, FavoriteGenresRequest, FavoriteMoviesRequest, GenerateTriviaRequest, Genre,
        MovieId, Recommendations, SaveMovieRequest, StoredMovie, StoredTrivia, UserId,
        UserProfile, WatchedRequest,
    },
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TriviaQuery {
    movie_id: i64,
}

fn require_positive(ids: &[i64], field: &str) -> AppResult<()> {
    match ids.iter().find(|id| **id <= 0) {
        Some(id) => Err(AppError::Validation(format!(
            "{} must contain positive ids, got {}",
            field, id
        ))),
        None => Ok(()),
    }
}

pub async fn list_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.store.list_genres().await?))
}

/// Copies the catalog's genre list into the library
pub async fn sync_genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    let genres = state.catalog.genres().await?;
    state.store.upsert_genres(&genres).await?;
    Ok(Json(state.store.list_genres().await?))
}

pub async fn list_movies(State(state): State<AppState>) -> AppResult<Json<Vec<StoredMovie>>> {
    Ok(Json(state.store.list_movies().await?))
}

/// Fetches a movie from the catalog and saves it to the library
pub async fn save_movie(
    State(state): State<AppState>,
    Json(request): Json<SaveMovieRequest>,
) -> AppResult<(StatusCode, Json<StoredMovie>)> {
    require_positive(&[request.tmdb_id], "tmdb_id")?;

    let details = state
        .catalog
        .movie_details(request.tmdb_id as MovieId)
        .await?;
    let movie = state
        .store
        .upsert_movie(&StoredMovie::from_details(&details))
        .await?;

    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn profile(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.store.load_profile(user_id).await?))
}

pub async fn set_favorite_genres(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<FavoriteGenresRequest>,
) -> AppResult<Json<UserProfile>> {
    require_positive(&request.genre_ids, "genre_ids")?;
    state
        .store
        .set_favorite_genres(user_id, &request.genre_ids)
        .await?;
    Ok(Json(state.store.load_profile(user_id).await?))
}

pub async fn set_favorite_movies(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<FavoriteMoviesRequest>,
) -> AppResult<Json<UserProfile>> {
    require_positive(&request.movie_ids, "movie_ids")?;
    state
        .store
        .set_favorite_movies(user_id, &request.movie_ids)
        .await?;
    Ok(Json(state.store.load_profile(user_id).await?))
}

pub async fn record_watched(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(request): Json<WatchedRequest>,
) -> AppResult<Json<UserProfile>> {
    require_positive(&request.movie_ids, "movie_ids")?;
    if let Some(rating) = request.user_rating {
        if !(1..=10).contains(&rating) {
            return Err(AppError::Validation(format!(
                "user_rating must be between 1 and 10, got {}",
                rating
            )));
        }
    }

    state
        .store
        .record_watched(user_id, &request.movie_ids, request.user_rating)
        .await?;
    Ok(Json(state.store.load_profile(user_id).await?))
}

/// Recommendations driven by the stored profile instead of a request body
pub async fn profile_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Query(params): Query<LimitQuery>,
) -> AppResult<Json<Recommendations>> {
    let limit = resolve_limit(params.limit, state.limits.default, state.limits.max)?;
    let profile = state.store.load_profile(user_id).await?;

    let recommendations = state
        .recommender
        .recommend(&profile.preferences(), limit)
        .await?;
    Ok(Json(recommendations))
}

pub async fn list_trivia(
    State(state): State<AppState>,
    Query(params): Query<TriviaQuery>,
) -> AppResult<Json<Vec<StoredTrivia>>> {
    Ok(Json(state.store.list_trivia(params.movie_id).await?))
}

/// Generates trivia for a saved movie and stores the questions
pub async fn generate_trivia(
    State(state): State<AppState>,
    Json(request): Json<GenerateTriviaRequest>,
) -> AppResult<(StatusCode, Json<Vec<StoredTrivia>>)> {
    let movie = state.store.get_movie(request.movie_id).await?;
    let trivia = state.oracle.generate_trivia(&movie.title).await?;

    let saved = state
        .store
        .save_trivia(movie.tmdb_id, &trivia.questions)
        .await?;

    Ok((StatusCode::CREATED, Json(saved)))
}
