use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use cinescope::app::{build_router, AppState};
use cinescope::error::{MovieError, MovieResult};
use cinescope::models::{MediaType, MovieDetail, MovieSummary, SearchResult};
use cinescope::omdb::MovieApi;
use cinescope::session::UserDirectory;
use cinescope::storage::{LocalStore, MemoryStore, SESSION_KEY};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

type SearchCall = (String, Option<MediaType>, Option<i32>);

#[derive(Default)]
struct FakeOmdb {
    searches: Mutex<Vec<SearchCall>>,
    detail_calls: Mutex<Vec<String>>,
}

fn summary(id: &str, title: &str, year: &str) -> MovieSummary {
    MovieSummary {
        id: id.to_string(),
        title: title.to_string(),
        year: year.to_string(),
        poster_url: Some(format!("https://img/{id}.jpg")),
        media_type: MediaType::Movie,
    }
}

#[async_trait::async_trait]
impl MovieApi for FakeOmdb {
    async fn search(
        &self,
        term: &str,
        media_type: Option<MediaType>,
        year: Option<i32>,
    ) -> SearchResult {
        self.searches
            .lock()
            .unwrap()
            .push((term.to_string(), media_type, year));
        if term == "Nothing" {
            return SearchResult::failed("Movie not found!");
        }
        let items = vec![
            summary("tt0848228", "The Avengers", "2012"),
            summary("tt2395427", "Avengers: Age of Ultron", "2015"),
            summary("tt4154756", "Avengers: Infinity War", "2018"),
            summary("tt0118661", "The Avengers", "1998"),
        ];
        SearchResult {
            total_count: 143,
            items,
            ok: true,
            error: None,
        }
    }

    async fn get_detail(&self, id: &str) -> MovieResult<MovieDetail> {
        self.detail_calls.lock().unwrap().push(id.to_string());
        Err(MovieError::Network("HTTP error! Status: 503".to_string()))
    }
}

fn app() -> (Router, Arc<FakeOmdb>, Arc<MemoryStore>) {
    let api = Arc::new(FakeOmdb::default());
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        api.clone(),
        store.clone(),
        UserDirectory::demo(),
        chrono::Duration::hours(24),
    );
    (build_router(state), api, store)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (app, _, _) = app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn year_range_search_only_returns_titles_in_range() {
    let (app, api, _) = app();
    let (status, body) = send(
        &app,
        get("/search?q=Avengers&type=movie&start=2010&end=2015"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let years: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["year"].as_str().unwrap())
        .collect();
    assert_eq!(years, vec!["2012", "2015"]);
    assert_eq!(body["loading"], json!(false));
    assert_eq!(
        api.searches.lock().unwrap().as_slice(),
        &[("Avengers".to_string(), Some(MediaType::Movie), Some(2010))]
    );
}

#[tokio::test]
async fn blank_year_params_mean_no_range() {
    let (app, api, _) = app();
    let (status, body) = send(&app, get("/search?q=Avengers&type=&start=&end=")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 4);
    assert_eq!(
        api.searches.lock().unwrap().as_slice(),
        &[("Avengers".to_string(), None, None)]
    );

    let (status, _) = send(&app, get("/search?q=Avengers&start=twenty&end=2015")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn empty_search_term_skips_the_network() {
    let (app, api, _) = app();
    let (status, body) = send(&app, get("/search?q=&type=any")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"], json!([]));
    assert!(api.searches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn provider_message_is_surfaced_as_search_error() {
    let (app, _, _) = app();
    let (status, body) = send(&app, get("/search?q=Nothing")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["error"], json!("Movie not found!"));
    assert_eq!(body["items"], json!([]));
}

#[tokio::test]
async fn invalid_filters_are_rejected() {
    let (app, api, _) = app();
    let (status, _) = send(&app, get("/search?q=Avengers&start=2015&end=2010")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, get("/search?q=Avengers&start=2015")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, get("/search?q=Avengers&type=game")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(api.searches.lock().unwrap().is_empty());
}

#[tokio::test]
async fn failed_detail_falls_back_to_placeholder() {
    let (app, api, _) = app();
    let (status, body) = send(&app, get("/movies/tt0000000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], json!("Sample Movie"));
    assert_eq!(body["id"], json!("tt0000000"));
    assert_eq!(body["fallback"], json!(true));
    assert_eq!(api.detail_calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn favorites_require_a_session() {
    let (app, _, _) = app();
    let (status, _) = send(&app, get("/favorites")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(
        &app,
        post_json("/favorites/toggle", json!(summary("tt1", "x", "2000"))),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_toggle_list_logout_flow() {
    let (app, _, store) = app();

    let (status, body) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "user@example.com", "password": "password123"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (_, body) = send(&app, get("/auth/check")).await;
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["user"]["display_name"], json!("Demo User"));

    let item = summary("tt0848228", "The Avengers", "2012");
    let (status, body) = send(&app, post_json("/favorites/toggle", json!(item))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorite"], json!(true));

    let (_, body) = send(&app, get("/favorites")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], json!("tt0848228"));

    let (_, body) = send(&app, post_json("/favorites/toggle", json!(item))).await;
    assert_eq!(body["favorite"], json!(false));
    assert_eq!(body["items"], json!([]));

    let (status, _) = send(&app, post_json("/auth/logout", json!({}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(store.get(SESSION_KEY).await.unwrap().is_none());

    let (_, body) = send(&app, get("/auth/check")).await;
    assert_eq!(body["authenticated"], json!(false));
    let (status, _) = send(&app, get("/favorites")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn auth_failures_map_to_statuses() {
    let (app, _, _) = app();

    let (status, body) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "user@example.com", "password": "wrong"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid email or password"));

    let (status, body) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"email": "user@example.com", "name": "Dup", "password": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], json!("User already exists"));

    let (status, _) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"email": "broken", "name": "Broken", "password": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, get("/auth/check")).await;
    assert_eq!(body["authenticated"], json!(false));
}

#[tokio::test]
async fn demo_password_and_registration_both_sign_in() {
    let (app, _, _) = app();
    let (status, _) = send(
        &app,
        post_json(
            "/auth/login",
            json!({"email": "guest@films.test", "password": "password"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, get("/auth/check")).await;
    assert_eq!(body["user"]["display_name"], json!("guest"));

    let (status, body) = send(
        &app,
        post_json(
            "/auth/register",
            json!({"email": "new@films.test", "name": "Newcomer", "password": "pw"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], json!("Registration successful"));
    let (_, body) = send(&app, get("/auth/check")).await;
    assert_eq!(body["user"]["email"], json!("new@films.test"));
}

#[tokio::test]
async fn featured_snapshot_starts_empty() {
    let (app, _, _) = app();
    let (status, body) = send(&app, get("/featured")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"items": [], "current": 0}));
}
