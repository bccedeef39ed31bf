use axum::{extract::State, Json};

use crate::{
    error::{AppError, AppResult},
    models::{GuessRequest, MovieGuess, TriviaRequest, TriviaSet},
    routes::AppState,
};

/// Shorter descriptions rarely identify anything
const MIN_PLOT_CHARS: usize = 10;

pub async fn guess_movie(
    State(state): State<AppState>,
    Json(request): Json<GuessRequest>,
) -> AppResult<Json<MovieGuess>> {
    let plot = request.plot_description.trim();
    if plot.chars().count() < MIN_PLOT_CHARS {
        return Err(AppError::Validation(format!(
            "plot_description must be at least {} characters",
            MIN_PLOT_CHARS
        )));
    }

    Ok(Json(state.oracle.guess_movie(plot).await?))
}

pub async fn movie_trivia(
    State(state): State<AppState>,
    Json(request): Json<TriviaRequest>,
) -> AppResult<Json<TriviaSet>> {
    let title = request.movie_title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("movie_title must not be empty".to_string()));
    }

    Ok(Json(state.oracle.generate_trivia(title).await?))
}
