use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{CandidateMovie, Credits, Genre, MovieDetails, MovieId},
    routes::AppState,
};

/// Highest page the catalog will serve
const MAX_PAGE: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
    page: Option<u32>,
}

fn resolve_page(page: Option<u32>) -> AppResult<u32> {
    match page.unwrap_or(1) {
        page @ 1..=MAX_PAGE => Ok(page),
        page => Err(AppError::Validation(format!(
            "page must be between 1 and {}, got {}",
            MAX_PAGE, page
        ))),
    }
}

pub async fn popular(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<Vec<CandidateMovie>>> {
    let page = resolve_page(params.page)?;
    Ok(Json(state.catalog.popular_movies(page).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<Vec<CandidateMovie>>> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::Validation("query must not be empty".to_string()));
    }

    let page = resolve_page(params.page)?;
    Ok(Json(state.catalog.search_movies(query, page).await?))
}

pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<MovieDetails>> {
    Ok(Json(state.catalog.movie_details(id).await?))
}

pub async fn credits(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<Credits>> {
    Ok(Json(state.catalog.movie_credits(id).await?))
}

pub async fn similar(
    State(state): State<AppState>,
    Path(id): Path<MovieId>,
    Query(params): Query<PageQuery>,
) -> AppResult<Json<Vec<CandidateMovie>>> {
    let page = resolve_page(params.page)?;
    Ok(Json(state.catalog.similar_movies(id, page).await?))
}

pub async fn genres(State(state): State<AppState>) -> AppResult<Json<Vec<Genre>>> {
    Ok(Json(state.catalog.genres().await?))
}
