use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use crate::error::{AppError, AppResult};

use super::{CandidateMovie, GenreId, MovieId};

/// Read-only preference snapshot for one recommendation call
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserPreferences {
    /// Genres the user likes
    pub favorite_genre_ids: BTreeSet<GenreId>,
    /// Favorite movies, unique by id, in the order the caller supplied them
    pub favorite_movies: Vec<CandidateMovie>,
    /// Movies the user has already seen; never recommended
    pub watched_movie_ids: HashSet<MovieId>,
}

impl UserPreferences {
    /// Creates empty user preferences
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_genres(mut self, genre_ids: impl IntoIterator<Item = GenreId>) -> Self {
        self.favorite_genre_ids.extend(genre_ids);
        self
    }

    /// Adds a favorite movie; a repeated id keeps the first entry
    pub fn add_favorite_movie(&mut self, movie: CandidateMovie) {
        if !self.favorite_movies.iter().any(|m| m.id == movie.id) {
            self.favorite_movies.push(movie);
        }
    }

    pub fn with_favorite_movie(mut self, movie: CandidateMovie) -> Self {
        self.add_favorite_movie(movie);
        self
    }

    pub fn with_watched(mut self, movie_ids: impl IntoIterator<Item = MovieId>) -> Self {
        self.watched_movie_ids.extend(movie_ids);
        self
    }

    /// True when neither favorite genres nor favorite movies are present
    pub fn is_empty(&self) -> bool {
        self.favorite_genre_ids.is_empty() && self.favorite_movies.is_empty()
    }

    pub fn has_watched(&self, movie_id: MovieId) -> bool {
        self.watched_movie_ids.contains(&movie_id)
    }
}

/// A movie reference inside a preference payload
///
/// Clients send whole movie objects; only `id` is mandatory.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieRef {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<i64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

/// Preference payload as it arrives over HTTP
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferencesPayload {
    #[serde(default, rename = "favoriteGenres", alias = "favorite_genres")]
    pub favorite_genres: Vec<i64>,
    #[serde(default, rename = "favoriteMovies", alias = "favorite_movies")]
    pub favorite_movies: Vec<MovieRef>,
    #[serde(default, rename = "watchedMovies", alias = "watched_movies")]
    pub watched_movies: Vec<MovieRef>,
    #[serde(default)]
    pub limit: Option<usize>,
}

fn positive_id(raw: i64, field: &str) -> AppResult<u64> {
    if raw <= 0 {
        return Err(AppError::Validation(format!(
            "{} contains invalid id {}",
            field, raw
        )));
    }
    Ok(raw as u64)
}

fn required_id(movie: &MovieRef, field: &str) -> AppResult<MovieId> {
    let raw = movie
        .id
        .ok_or_else(|| AppError::Validation(format!("{} entry is missing an id", field)))?;
    positive_id(raw, field)
}

impl TryFrom<MovieRef> for CandidateMovie {
    type Error = AppError;

    fn try_from(movie: MovieRef) -> AppResult<Self> {
        let id = required_id(&movie, "favoriteMovies")?;
        let genre_ids = movie
            .genre_ids
            .iter()
            .map(|g| positive_id(*g, "favoriteMovies.genre_ids"))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(CandidateMovie::new(id, movie.title.unwrap_or_default())
            .with_genres(genre_ids)
            .with_popularity(movie.popularity.unwrap_or_default())
            .with_vote_average(movie.vote_average.unwrap_or_default()))
    }
}

impl TryFrom<PreferencesPayload> for UserPreferences {
    type Error = AppError;

    fn try_from(payload: PreferencesPayload) -> AppResult<Self> {
        let mut preferences = UserPreferences::new();

        for raw in payload.favorite_genres {
            preferences
                .favorite_genre_ids
                .insert(positive_id(raw, "favoriteGenres")?);
        }

        for movie in payload.favorite_movies {
            preferences.add_favorite_movie(CandidateMovie::try_from(movie)?);
        }

        for movie in &payload.watched_movies {
            preferences
                .watched_movie_ids
                .insert(required_id(movie, "watchedMovies")?);
        }

        Ok(preferences)
    }
}

/// Resolves the requested result size against the configured bounds
pub fn resolve_limit(requested: Option<usize>, default: usize, max: usize) -> AppResult<usize> {
    match requested {
        None => Ok(default.min(max)),
        Some(0) => Err(AppError::Validation(
            "limit must be at least 1".to_string(),
        )),
        Some(limit) if limit > max => Err(AppError::Validation(format!(
            "limit must not exceed {}",
            max
        ))),
        Some(limit) => Ok(limit),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AppResult<UserPreferences> {
        let payload: PreferencesPayload = serde_json::from_str(json).unwrap();
        UserPreferences::try_from(payload)
    }

    #[test]
    fn test_new_preferences_are_empty() {
        let prefs = UserPreferences::new();
        assert!(prefs.is_empty());
        assert!(prefs.watched_movie_ids.is_empty());
    }

    #[test]
    fn test_watched_only_counts_as_empty() {
        let prefs = UserPreferences::new().with_watched([603]);
        assert!(prefs.is_empty());
        assert!(prefs.has_watched(603));
    }

    #[test]
    fn test_duplicate_favorite_keeps_first() {
        let mut prefs = UserPreferences::new();
        prefs.add_favorite_movie(CandidateMovie::new(1, "First"));
        prefs.add_favorite_movie(CandidateMovie::new(2, "Second"));
        prefs.add_favorite_movie(CandidateMovie::new(1, "Duplicate"));

        assert_eq!(prefs.favorite_movies.len(), 2);
        assert_eq!(prefs.favorite_movies[0].title, "First");
        assert_eq!(prefs.favorite_movies[1].id, 2);
    }

    #[test]
    fn test_payload_camel_case() {
        let prefs = parse(
            r#"{
                "favoriteGenres": [28, 12, 28],
                "favoriteMovies": [{"id": 27205, "title": "Inception"}, {"id": 155}],
                "watchedMovies": [{"id": 603, "title": "The Matrix"}]
            }"#,
        )
        .unwrap();

        assert_eq!(prefs.favorite_genre_ids.len(), 2);
        assert_eq!(
            prefs.favorite_movies.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![27205, 155]
        );
        assert!(prefs.has_watched(603));
    }

    #[test]
    fn test_payload_snake_case_alias() {
        let prefs = parse(r#"{"favorite_genres": [18], "watched_movies": [{"id": 1}]}"#).unwrap();
        assert!(prefs.favorite_genre_ids.contains(&18));
        assert!(prefs.has_watched(1));
    }

    #[test]
    fn test_payload_rejects_non_positive_genre() {
        let err = parse(r#"{"favoriteGenres": [28, 0]}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_payload_rejects_movie_without_id() {
        let err = parse(r#"{"favoriteMovies": [{"title": "Nameless"}]}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = parse(r#"{"watchedMovies": [{"title": "Nameless"}]}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_resolve_limit() {
        assert_eq!(resolve_limit(None, 20, 100).unwrap(), 20);
        assert_eq!(resolve_limit(Some(5), 20, 100).unwrap(), 5);
        assert!(resolve_limit(Some(0), 20, 100).is_err());
        assert!(resolve_limit(Some(101), 20, 100).is_err());
    }
}
