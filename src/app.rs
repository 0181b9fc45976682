use crate::config::Config;
use crate::error::MovieError;
use crate::favorites::FavoritesStore;
use crate::featured::{fetch_featured, Carousel, CarouselSnapshot};
use crate::models::{parse_media_filter, MovieDetail, MovieSummary};
use crate::omdb::{get_detail_with_fallback, MovieApi, OmdbClient};
use crate::search::{SearchFilterHolder, SearchFilters, SearchState, YearRange};
use crate::session::{AuthFailure, AuthOutcome, SessionManager, User, UserDirectory};
use crate::storage::{FileStore, LocalStore};
use anyhow::Result;
use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Every shared container, composed once at startup and handed to handlers.
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn MovieApi>,
    pub session: Arc<SessionManager>,
    pub search: Arc<SearchFilterHolder>,
    pub favorites: Arc<FavoritesStore>,
    pub carousel: Arc<Carousel>,
}

impl AppState {
    pub fn new(
        api: Arc<dyn MovieApi>,
        store: Arc<dyn LocalStore>,
        directory: UserDirectory,
        session_ttl: chrono::Duration,
    ) -> Self {
        Self {
            search: Arc::new(SearchFilterHolder::new(api.clone())),
            session: Arc::new(SessionManager::new(store.clone(), directory, session_ttl)),
            favorites: Arc::new(FavoritesStore::new(store)),
            carousel: Arc::new(Carousel::new(Vec::new())),
            api,
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let store: Arc<dyn LocalStore> = Arc::new(FileStore::open(&config.data_dir).await?);
    info!("Using data directory {:?}", config.data_dir);
    let api: Arc<dyn MovieApi> = Arc::new(OmdbClient::from_config(&config)?);

    let state = AppState::new(api, store, UserDirectory::demo(), config.session_ttl);
    state.session.restore().await;

    let featured = fetch_featured(state.api.as_ref()).await;
    state.carousel.set_items(featured);
    let ticker = state.carousel.spawn_auto_advance(config.carousel_interval);

    let app = build_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http());

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    ticker.abort();
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let favorites = Router::new()
        .route("/favorites", get(list_favorites))
        .route("/favorites/toggle", post(toggle_favorite))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/movies/:id", get(movie_detail))
        .route("/featured", get(featured))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/check", get(check_auth))
        .merge(favorites)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

pub struct ApiError(MovieError);

impl From<MovieError> for ApiError {
    fn from(e: MovieError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            MovieError::Network(_) => StatusCode::BAD_GATEWAY,
            MovieError::NotFound(_) => StatusCode::NOT_FOUND,
            MovieError::Validation(_) => StatusCode::BAD_REQUEST,
            MovieError::Auth(_) => StatusCode::UNAUTHORIZED,
            MovieError::Storage(e) => {
                error!("Storage failure: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    q: String,
    #[serde(rename = "type", default)]
    media_type: String,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

/// A blank year (`?start=`) means no bound was given.
fn parse_year_param(name: &str, raw: Option<&str>) -> Result<Option<i32>, MovieError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<i32>()
            .map(Some)
            .map_err(|_| MovieError::Validation(format!("{} must be a year, got '{}'", name, s))),
    }
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchState>, ApiError> {
    let media_type = parse_media_filter(&params.media_type)?;
    let start = parse_year_param("start", params.start.as_deref())?;
    let end = parse_year_param("end", params.end.as_deref())?;
    let year_range = match (start, end) {
        (Some(start), Some(end)) => Some(YearRange::new(start, end)?),
        (None, None) => None,
        _ => {
            return Err(MovieError::Validation(
                "Both start and end years are required for a year range".to_string(),
            )
            .into())
        }
    };
    let result = state
        .search
        .apply(SearchFilters {
            term: params.q,
            media_type,
            year_range,
        })
        .await;
    Ok(Json(result))
}

async fn movie_detail(State(state): State<AppState>, Path(id): Path<String>) -> Json<MovieDetail> {
    Json(get_detail_with_fallback(state.api.as_ref(), &id).await)
}

async fn featured(State(state): State<AppState>) -> Json<CarouselSnapshot> {
    Json(state.carousel.snapshot())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    email: String,
    name: String,
    password: String,
}

fn outcome_response(outcome: AuthOutcome) -> Response {
    let status = match outcome.failure {
        None => StatusCode::OK,
        Some(AuthFailure::InvalidCredentials) => StatusCode::UNAUTHORIZED,
        Some(AuthFailure::UserExists) => StatusCode::CONFLICT,
        Some(AuthFailure::Validation) => StatusCode::BAD_REQUEST,
        Some(AuthFailure::Storage) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(outcome)).into_response()
}

async fn login(State(state): State<AppState>, Json(body): Json<LoginRequest>) -> Response {
    outcome_response(state.session.login(&body.email, &body.password).await)
}

async fn register(State(state): State<AppState>, Json(body): Json<RegisterRequest>) -> Response {
    outcome_response(
        state
            .session
            .register(&body.email, &body.name, &body.password)
            .await,
    )
}

async fn logout(State(state): State<AppState>) -> StatusCode {
    state.session.logout().await;
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
struct AuthStatus {
    authenticated: bool,
    user: Option<User>,
}

async fn check_auth(State(state): State<AppState>) -> Json<AuthStatus> {
    let authenticated = state.session.check_auth().await;
    Json(AuthStatus {
        authenticated,
        user: state.session.current_user().filter(|_| authenticated),
    })
}

async fn require_session(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if !state.session.check_auth().await {
        warn!("Rejecting {} without a valid session", req.uri().path());
        return ApiError(MovieError::Auth("Sign in to manage favorites".to_string()))
            .into_response();
    }
    next.run(req).await
}

async fn list_favorites(State(state): State<AppState>) -> Result<Json<Vec<MovieSummary>>, ApiError> {
    Ok(Json(state.favorites.list().await?))
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    favorite: bool,
    items: Vec<MovieSummary>,
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Json(item): Json<MovieSummary>,
) -> Result<Json<ToggleResponse>, ApiError> {
    let favorite = state.favorites.toggle(item).await?;
    let items = state.favorites.list().await?;
    Ok(Json(ToggleResponse { favorite, items }))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
