use axum::{extract::State, Json};

use crate::{
    error::AppResult,
    models::{resolve_limit, PreferencesPayload, Recommendations, UserPreferences},
    routes::AppState,
};

/// Handler for recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Json(payload): Json<PreferencesPayload>,
) -> AppResult<Json<Recommendations>> {
    let limit = resolve_limit(payload.limit, state.limits.default, state.limits.max)?;
    let preferences = UserPreferences::try_from(payload)?;

    let recommendations = state.recommender.recommend(&preferences, limit).await?;
    Ok(Json(recommendations))
}
