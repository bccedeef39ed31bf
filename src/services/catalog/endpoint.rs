use crate::models::{GenreId, MovieId};

const LANGUAGE: &str = "en-US";

/// Path and query of a single catalog request, relative to the API base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl Endpoint {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: vec![("language", LANGUAGE.to_string())],
        }
    }

    fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }

    pub fn popular_movies(page: u32) -> Self {
        Self::new("/movie/popular").param("page", page)
    }

    pub fn search_movies(query: &str, page: u32) -> Self {
        Self::new("/search/movie")
            .param("query", query)
            .param("page", page)
            .param("include_adult", "false")
    }

    pub fn movie_details(id: MovieId) -> Self {
        Self::new(format!("/movie/{}", id))
    }

    pub fn movie_credits(id: MovieId) -> Self {
        Self::new(format!("/movie/{}/credits", id))
    }

    pub fn similar_movies(id: MovieId, page: u32) -> Self {
        Self::new(format!("/movie/{}/similar", id)).param("page", page)
    }

    pub fn genres() -> Self {
        Self::new("/genre/movie/list")
    }

    /// One page of movies matching all given genres, most popular first
    pub fn discover_by_genre(genre_ids: &[GenreId], page: u32) -> Self {
        let genres = genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        Self::new("/discover/movie")
            .param("with_genres", genres)
            .param("page", page)
            .param("sort_by", "popularity.desc")
    }

    pub fn recommendations_for_movie(id: MovieId, page: u32) -> Self {
        Self::new(format!("/movie/{}/recommendations", id)).param("page", page)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}
