use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use cinematch_api::{
    error::UpstreamError,
    services::catalog::{CatalogApi, RetryPolicy, TmdbClient},
};

/// Scripted upstream: answers the n-th call with the n-th status, then 200
struct Stub {
    statuses: Vec<u16>,
    calls: AtomicUsize,
    last_request: Mutex<Option<(Option<String>, HashMap<String, String>)>>,
}

impl Stub {
    fn new(statuses: Vec<u16>) -> Arc<Self> {
        Arc::new(Self {
            statuses,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn popular(
    State(stub): State<Arc<Stub>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let call = stub.calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    *stub.last_request.lock().unwrap() = Some((auth, query));

    match stub.statuses.get(call) {
        Some(code) if *code != 200 => {
            let status = StatusCode::from_u16(*code).unwrap();
            (status, Json(json!({ "status_message": "scripted failure" }))).into_response()
        }
        _ => Json(json!({
            "page": 1,
            "results": [
                { "id": 550, "title": "Fight Club", "genre_ids": [18], "popularity": 61.4, "vote_average": 8.4 },
                { "title": "Missing id is skipped" },
                { "id": 13, "title": "Forrest Gump", "genre_ids": [35, 18] }
            ]
        }))
        .into_response(),
    }
}

/// Counts the call, then answers long after any client timeout used here
async fn slow_credits(State(stub): State<Arc<Stub>>) -> Response {
    stub.calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "id": 550, "cast": [], "crew": [] })).into_response()
}

async fn not_json() -> &'static str {
    "<html>maintenance</html>"
}

/// Serves the stub on an ephemeral port and returns its base URL
async fn spawn_stub(stub: Arc<Stub>) -> String {
    let app = Router::new()
        .route("/movie/popular", get(popular))
        .route("/genre/movie/list", get(not_json))
        .route("/movie/:id/credits", get(slow_credits))
        .with_state(stub);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/", addr)
}

fn client(api_url: String, max_attempts: u32) -> TmdbClient {
    client_with_timeout(api_url, max_attempts, Duration::from_secs(5))
}

fn client_with_timeout(api_url: String, max_attempts: u32, timeout: Duration) -> TmdbClient {
    TmdbClient::new(
        "test-token".to_string(),
        api_url,
        RetryPolicy::new(max_attempts, Duration::from_millis(10)),
        timeout,
    )
    .unwrap()
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let stub = Stub::new(vec![503, 429]);
    let client = client(spawn_stub(Arc::clone(&stub)).await, 3);

    let movies = assert_ok!(client.popular_movies(1).await);

    assert_eq!(stub.calls(), 3);
    // The entry without an id is dropped, the rest keep upstream order
    let ids: Vec<_> = movies.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![550, 13]);
    assert_eq!(movies[0].genre_ids, vec![18]);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let stub = Stub::new(vec![503, 503, 503, 503]);
    let client = client(spawn_stub(Arc::clone(&stub)).await, 3);

    let err = assert_err!(client.popular_movies(1).await);

    assert_eq!(stub.calls(), 3);
    match err {
        UpstreamError::Exhausted {
            attempts,
            last_status,
            ..
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_status, Some(503));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_errors_fail_immediately() {
    let stub = Stub::new(vec![401]);
    let client = client(spawn_stub(Arc::clone(&stub)).await, 3);

    let err = assert_err!(client.popular_movies(1).await);

    assert_eq!(err, UpstreamError::ClientError { status: 401 });
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_single_attempt_policy_never_retries() {
    let stub = Stub::new(vec![500]);
    let client = client(spawn_stub(Arc::clone(&stub)).await, 1);

    let err = assert_err!(client.popular_movies(1).await);

    assert!(matches!(err, UpstreamError::Exhausted { attempts: 1, .. }));
    assert_eq!(stub.calls(), 1);
}

#[tokio::test]
async fn test_requests_carry_credentials_and_language() {
    let stub = Stub::new(vec![]);
    let client = client(spawn_stub(Arc::clone(&stub)).await, 3);

    assert_ok!(client.popular_movies(2).await);

    let (auth, query) = stub.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(auth.as_deref(), Some("Bearer test-token"));
    assert_eq!(query.get("language").map(String::as_str), Some("en-US"));
    assert_eq!(query.get("page").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let stub = Stub::new(vec![]);
    let client = client(spawn_stub(stub).await, 3);

    let err = assert_err!(client.genres().await);

    assert!(matches!(err, UpstreamError::Decode(_)));
}

#[tokio::test]
async fn test_unreachable_upstream_is_transport_exhaustion() {
    // Nothing listens on the discard port
    let client = client("http://127.0.0.1:9".to_string(), 2);

    let err = assert_err!(client.popular_movies(1).await);

    assert!(err.is_transport());
    assert!(matches!(err, UpstreamError::Exhausted { attempts: 2, .. }));
}

#[tokio::test]
async fn test_request_timeout_is_retried_as_transport_failure() {
    let stub = Stub::new(vec![]);
    let client = client_with_timeout(
        spawn_stub(Arc::clone(&stub)).await,
        3,
        Duration::from_millis(200),
    );

    let err = assert_err!(client.movie_credits(550).await);

    assert_eq!(stub.calls(), 3);
    assert!(err.is_transport());
    assert!(matches!(
        err,
        UpstreamError::Exhausted {
            attempts: 3,
            last_status: None,
            ..
        }
    ));
}
