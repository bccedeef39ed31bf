/// TMDB (The Movie Database) catalog client
///
/// Every request is a GET carrying the configured bearer credential. Transient
/// failures (transport errors and the statuses in the retry policy) are retried
/// with exponential backoff; other error statuses fail on the first attempt.
use reqwest::{header::CONTENT_TYPE, Client as HttpClient};
use serde_json::Value;
use std::time::Duration;

use crate::{
    error::UpstreamError,
    models::{CandidateMovie, Credits, Genre, GenreId, MovieDetails, MovieId},
    services::catalog::{
        extract_list, extract_object, CatalogApi, Endpoint, RetryPolicy, UpstreamResult,
    },
};

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Outcome of a single HTTP attempt
enum Attempt {
    Success(Value),
    Retryable {
        status: Option<u16>,
        error: String,
    },
    Fatal(UpstreamError),
}

#[derive(Clone)]
pub struct TmdbClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    policy: RetryPolicy,
}

impl TmdbClient {
    /// Creates a client with a per-request timeout ceiling
    pub fn new(
        api_key: String,
        api_url: String,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> UpstreamResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            policy,
        })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends the request, retrying transient failures per the policy
    pub async fn fetch(&self, endpoint: &Endpoint) -> UpstreamResult<Value> {
        let url = format!("{}{}", self.api_url, endpoint.path);
        let mut attempt = 1;

        loop {
            let (status, error) = match self.attempt(&url, endpoint).await {
                Attempt::Success(body) => {
                    if attempt > 1 {
                        tracing::info!(path = %endpoint.path, attempt, "Upstream request recovered");
                    }
                    return Ok(body);
                }
                Attempt::Fatal(e) => {
                    tracing::warn!(path = %endpoint.path, error = %e, "Upstream request failed");
                    return Err(e);
                }
                Attempt::Retryable { status, error } => (status, error),
            };

            if !self.policy.allows_retry_after(attempt) {
                tracing::warn!(
                    path = %endpoint.path,
                    attempts = attempt,
                    last_status = ?status,
                    error = %error,
                    "Upstream retries exhausted"
                );
                return Err(UpstreamError::Exhausted {
                    attempts: attempt,
                    last_status: status,
                    last_error: error,
                });
            }

            let delay = self.policy.delay_for(attempt);
            tracing::warn!(
                path = %endpoint.path,
                attempt,
                status = ?status,
                error = %error,
                delay_ms = delay.as_millis() as u64,
                "Retrying upstream request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, url: &str, endpoint: &Endpoint) -> Attempt {
        let response = match self
            .http_client
            .get(url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .query(&endpoint.query)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Retryable {
                    status: None,
                    error: UpstreamError::Transport(e.to_string()).to_string(),
                }
            }
        };

        let status = response.status();

        if status.is_success() {
            let bytes = match response.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => {
                    return Attempt::Retryable {
                        status: None,
                        error: UpstreamError::Transport(e.to_string()).to_string(),
                    }
                }
            };

            return match serde_json::from_slice(&bytes) {
                Ok(body) => Attempt::Success(body),
                Err(e) => Attempt::Fatal(UpstreamError::Decode(e.to_string())),
            };
        }

        let code = status.as_u16();
        if self.policy.is_retryable_status(code) {
            Attempt::Retryable {
                status: Some(code),
                error: format!("status {}", code),
            }
        } else if status.is_client_error() {
            Attempt::Fatal(UpstreamError::ClientError { status: code })
        } else {
            Attempt::Fatal(UpstreamError::UnexpectedStatus { status: code })
        }
    }

    async fn fetch_list<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        field: &str,
    ) -> UpstreamResult<Vec<T>> {
        let body = self.fetch(&endpoint).await?;
        let items = extract_list(&body, field);

        tracing::debug!(path = %endpoint.path, results = items.len(), "Catalog list fetched");

        Ok(items)
    }
}

#[async_trait::async_trait]
impl CatalogApi for TmdbClient {
    async fn popular_movies(&self, page: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        self.fetch_list(Endpoint::popular_movies(page), "results")
            .await
    }

    async fn search_movies(&self, query: &str, page: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        self.fetch_list(Endpoint::search_movies(query, page), "results")
            .await
    }

    async fn movie_details(&self, id: MovieId) -> UpstreamResult<MovieDetails> {
        extract_object(self.fetch(&Endpoint::movie_details(id)).await?)
    }

    async fn movie_credits(&self, id: MovieId) -> UpstreamResult<Credits> {
        extract_object(self.fetch(&Endpoint::movie_credits(id)).await?)
    }

    async fn similar_movies(&self, id: MovieId, page: u32) -> UpstreamResult<Vec<CandidateMovie>> {
        self.fetch_list(Endpoint::similar_movies(id, page), "results")
            .await
    }

    async fn genres(&self) -> UpstreamResult<Vec<Genre>> {
        self.fetch_list(Endpoint::genres(), "genres").await
    }

    async fn discover_by_genre(
        &self,
        genre_ids: &[GenreId],
        page: u32,
    ) -> UpstreamResult<Vec<CandidateMovie>> {
        self.fetch_list(Endpoint::discover_by_genre(genre_ids, page), "results")
            .await
    }

    async fn recommendations_for_movie(
        &self,
        id: MovieId,
        page: u32,
    ) -> UpstreamResult<Vec<CandidateMovie>> {
        self.fetch_list(Endpoint::recommendations_for_movie(id, page), "results")
            .await
    }
}
