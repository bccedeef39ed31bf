use std::{collections::HashMap, time::Duration};

use crate::{
    error::UpstreamError,
    models::{CandidateMovie, Credits, Genre, GenreId, MovieDetails, MovieId},
};

use super::{CatalogApi, UpstreamResult};

/// A canned answer delivered after a delay
#[derive(Clone)]
struct Reply {
    delay: Duration,
    result: UpstreamResult<Vec<CandidateMovie>>,
}

impl Reply {
    async fn deliver(&self) -> UpstreamResult<Vec<CandidateMovie>> {
        tokio::time::sleep(self.delay).await;
        self.result.clone()
    }
}

impl Default for Reply {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(Vec::new()),
        }
    }
}

/// Catalog with per-call delays, for tests that race upstream calls against time
///
/// List calls that were not scripted answer at once with no movies; the
/// remaining calls fail with a transport error.
#[derive(Default)]
pub struct ScriptedCatalog {
    popular: Reply,
    discover: Reply,
    favorites: HashMap<MovieId, Reply>,
}

impl ScriptedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn popular(mut self, delay: Duration, result: UpstreamResult<Vec<CandidateMovie>>) -> Self {
        self.popular = Reply { delay, result };
        self
    }

    pub fn discover(mut self, delay: Duration, result: UpstreamResult<Vec<CandidateMovie>>) -> Self {
        self.discover = Reply { delay, result };
        self
    }

    pub fn favorite(
        mut self,
        id: MovieId,
        delay: Duration,
        result: UpstreamResult<Vec<CandidateMovie>>,
    ) -> Self {
        self.favorites.insert(id, Reply { delay, result });
        self
    }

    fn unscripted<T>() -> UpstreamResult<T> {
        Err(UpstreamError::Transport("unscripted call".to_string()))
    }
}

#[async_trait::async_trait]
impl CatalogApi for ScriptedCatalog {
    async fn popular_movies(&self, _: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        self.popular.deliver().await
    }

    async fn search_movies(&self, _: &str, _: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        Self::unscripted()
    }

    async fn movie_details(&self, _: MovieId) -> UpstreamResult<MovieDetails> {
        Self::unscripted()
    }

    async fn movie_credits(&self, _: MovieId) -> UpstreamResult<Credits> {
        Self::unscripted()
    }

    async fn similar_movies(&self, _: MovieId, _: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        Self::unscripted()
    }

    async fn genres(&self) -> UpstreamResult<Vec<Genre>> {
        Self::unscripted()
    }

    async fn discover_by_genre(&self, _: &[GenreId], _: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        self.discover.deliver().await
    }

    async fn recommendations_for_movie(
        &self,
        id: MovieId,
        _: u32,
    ) -> UpstreamResult<Vec<CandidateMovie>> {
        match self.favorites.get(&id) {
            Some(reply) => reply.deliver().await,
            None => Ok(Vec::new()),
        }
    }
}
