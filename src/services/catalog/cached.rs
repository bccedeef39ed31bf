/// Read-through Redis caching for any catalog implementation
use crate::{
    cached,
    db::{Cache, CacheKey},
    models::{CandidateMovie, Credits, Genre, GenreId, MovieDetails, MovieId},
    services::catalog::{CatalogApi, UpstreamResult},
};

const GENRES_TTL: u64 = 86400; // 1 day
const DETAILS_TTL: u64 = 86400; // 1 day
const LIST_TTL: u64 = 3600; // 1 hour

pub struct CachedCatalog<C> {
    inner: C,
    cache: Cache,
}

impl<C: CatalogApi> CachedCatalog<C> {
    pub fn new(inner: C, cache: Cache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait::async_trait]
impl<C: CatalogApi> CatalogApi for CachedCatalog<C> {
    async fn popular_movies(&self, page: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        cached!(
            self.cache,
            CacheKey::Popular(page),
            LIST_TTL,
            self.inner.popular_movies(page)
        )
    }

    async fn search_movies(&self, query: &str, page: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        cached!(
            self.cache,
            CacheKey::Search(query.to_string(), page),
            LIST_TTL,
            self.inner.search_movies(query, page)
        )
    }

    async fn movie_details(&self, id: MovieId) -> UpstreamResult<MovieDetails> {
        cached!(
            self.cache,
            CacheKey::Details(id),
            DETAILS_TTL,
            self.inner.movie_details(id)
        )
    }

    async fn movie_credits(&self, id: MovieId) -> UpstreamResult<Credits> {
        cached!(
            self.cache,
            CacheKey::Credits(id),
            DETAILS_TTL,
            self.inner.movie_credits(id)
        )
    }

    async fn similar_movies(&self, id: MovieId, page: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        cached!(
            self.cache,
            CacheKey::Similar(id, page),
            LIST_TTL,
            self.inner.similar_movies(id, page)
        )
    }

    async fn genres(&self) -> UpstreamResult<Vec<Genre>> {
        cached!(self.cache, CacheKey::Genres, GENRES_TTL, self.inner.genres())
    }

    async fn discover_by_genre(
        &self,
        genre_ids: &[GenreId],
        page: u32,
    ) -> UpstreamResult<Vec<CandidateMovie>> {
        cached!(
            self.cache,
            CacheKey::Discover(genre_ids.to_vec(), page),
            LIST_TTL,
            self.inner.discover_by_genre(genre_ids, page)
        )
    }

    async fn recommendations_for_movie(
        &self,
        id: MovieId,
        page: u32,
    ) -> UpstreamResult<Vec<CandidateMovie>> {
        cached!(
            self.cache,
            CacheKey::Recommendations(id, page),
            LIST_TTL,
            self.inner.recommendations_for_movie(id, page)
        )
    }
}
