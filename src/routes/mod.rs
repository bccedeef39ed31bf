use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

pub mod ai;
pub mod library;
pub mod movies;
pub mod recommendations;
mod state;

pub use state::{AppState, ResultLimits};

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/movies/popular", get(movies::popular))
        .route("/movies/search", get(movies::search))
        .route("/movies/genres", get(movies::genres))
        .route("/movies/:id", get(movies::details))
        .route("/movies/:id/credits", get(movies::credits))
        .route("/movies/:id/similar", get(movies::similar))
        .route("/recommendations", post(recommendations::recommend))
        .route("/ai/guess-movie", post(ai::guess_movie))
        .route("/ai/movie-trivia", post(ai::movie_trivia))
        .route("/db/genres", get(library::list_genres))
        .route("/db/genres/sync", post(library::sync_genres))
        .route(
            "/db/movies",
            get(library::list_movies).post(library::save_movie),
        )
        .route("/db/profiles/:user_id", get(library::profile))
        .route(
            "/db/profiles/:user_id/favorite-genres",
            put(library::set_favorite_genres),
        )
        .route(
            "/db/profiles/:user_id/favorite-movies",
            put(library::set_favorite_movies),
        )
        .route("/db/profiles/:user_id/watched", post(library::record_watched))
        .route(
            "/db/profiles/:user_id/recommendations",
            get(library::profile_recommendations),
        )
        .route(
            "/db/trivia",
            get(library::list_trivia).post(library::generate_trivia),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
