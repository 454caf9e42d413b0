use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skillswap_match_engine::{
    metrics::MetricSummary,
    store::{SkillEntry, StoreStats},
    AdminMessage, EngineConfig, MatchEngine, MatchEngineError, MatchQuery, MatchResponse,
    MatchResult, NewAdminMessage, NewRating, NewSwapRequest, ProficiencyLevel, ProfileRecord,
    Rating, RequestDirection, RequestFilters, RequestPage, SearchFilters, SearchPage,
    SwapDecision, SwapRequest, SwapRequestStatus,
};

#[derive(Clone)]
struct AppState {
    engine: Arc<MatchEngine>,
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    user_id: String,
    other_id: String,
}

/// Directory query string, using the web client's parameter names
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsersQuery {
    search: Option<String>,
    skill_category: Option<String>,
    location: Option<String>,
    skill_level: Option<String>,
    availability: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl UsersQuery {
    fn into_filters(self) -> Result<SearchFilters, MatchEngineError> {
        let skill_level = match self.skill_level.as_deref().map(str::trim) {
            Some(level) if !level.is_empty() => Some(level.parse::<ProficiencyLevel>()?),
            _ => None,
        };
        let defaults = SearchFilters::default();

        Ok(SearchFilters {
            query: self.search,
            skill_category: self.skill_category,
            location: self.location,
            skill_level,
            availability: self.availability,
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        })
    }
}

/// Request list query string; `status=all` lists every status
#[derive(Debug, Deserialize)]
struct RequestsQuery {
    direction: Option<String>,
    status: Option<String>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl RequestsQuery {
    fn into_filters(self) -> Result<RequestFilters, MatchEngineError> {
        let direction = match self.direction.as_deref() {
            Some(direction) => direction.parse::<RequestDirection>()?,
            None => RequestDirection::All,
        };
        let status = match self.status.as_deref().map(str::trim) {
            Some(status) if !status.is_empty() && !status.eq_ignore_ascii_case("all") => {
                Some(status.parse::<SwapRequestStatus>()?)
            }
            _ => None,
        };
        let defaults = RequestFilters::default();

        Ok(RequestFilters {
            direction,
            status,
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        })
    }
}

#[derive(Debug, Deserialize)]
struct RespondRequest {
    user_id: String,
    action: SwapDecision,
}

#[derive(Debug, Deserialize)]
struct ActorQuery {
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct SkillsQuery {
    #[serde(default)]
    pending: bool,
}

#[derive(Debug, Deserialize)]
struct SkillReviewRequest {
    approved: bool,
}

#[derive(Debug, Deserialize)]
struct MessageToggleRequest {
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct BanRequest {
    #[serde(default = "default_true")]
    banned: bool,
}

fn default_true() -> bool { true }

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct AckResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    store: StoreStats,
    timings: BTreeMap<String, MetricSummary>,
    ranking_method: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillswap_server=debug,skillswap_match_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EngineConfig::from_env();

    tracing::info!("🚀 Starting SkillSwap Match Engine Server");
    tracing::info!("📦 Database: {}", config.db_path);
    tracing::info!("🔌 Port: {}", config.port);

    let engine = MatchEngine::new(&config.db_path)
        .await?
        .with_options(config.match_options());

    let state = AppState {
        engine: Arc::new(engine),
    };

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/v1/matches", post(matches_handler))
        .route("/v1/score", post(score_handler))
        .route("/v1/users", get(users_handler))
        .route("/v1/users/:id/requests", get(user_requests_handler))
        .route("/v1/profiles", put(profile_handler))
        .route("/v1/requests", post(create_request_handler))
        .route(
            "/v1/requests/:id",
            get(get_request_handler)
                .put(respond_request_handler)
                .delete(delete_request_handler),
        )
        .route("/v1/ratings", post(rating_handler))
        .route("/v1/messages", get(messages_handler))
        .route("/v1/admin/users/:id/ban", post(ban_handler))
        .route("/v1/admin/users/:id", delete(delete_user_handler))
        .route("/v1/admin/skills", get(skills_handler))
        .route("/v1/admin/skills/:name/review", post(review_skill_handler))
        .route(
            "/v1/admin/messages",
            get(admin_messages_handler).post(post_message_handler),
        )
        .route("/v1/admin/messages/:id/active", post(toggle_message_handler))
        .route("/v1/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.bind_addr();
    tracing::info!("🤝 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: skillswap_match_engine::VERSION.to_string(),
    })
}

async fn matches_handler(
    State(state): State<AppState>,
    Json(req): Json<MatchQuery>,
) -> Result<Json<MatchResponse>, AppError> {
    tracing::debug!("Match request: {:?}", req);

    let response = state.engine.find_matches(req).await?;

    tracing::info!(
        "✅ {} → {} matches of {} candidates ({:.2}ms)",
        response.user_id,
        response.matches.len(),
        response.total_candidates,
        response.latency_ms
    );

    Ok(Json(response))
}

async fn score_handler(
    State(state): State<AppState>,
    Json(req): Json<ScoreRequest>,
) -> Result<Json<MatchResult>, AppError> {
    let result = state.engine.score_pair(&req.user_id, &req.other_id).await?;
    Ok(Json(result))
}

async fn users_handler(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<Json<SearchPage>, AppError> {
    let filters = query.into_filters()?;
    let page = state.engine.search(&filters).await?;
    Ok(Json(page))
}

async fn profile_handler(
    State(state): State<AppState>,
    Json(record): Json<ProfileRecord>,
) -> Result<Json<AckResponse>, AppError> {
    state.engine.upsert_profile(&record).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn create_request_handler(
    State(state): State<AppState>,
    Json(req): Json<NewSwapRequest>,
) -> Result<Json<SwapRequest>, AppError> {
    let created = state.engine.create_request(&req).await?;
    Ok(Json(created))
}

async fn get_request_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SwapRequest>, AppError> {
    Ok(Json(state.engine.get_request(id).await?))
}

async fn respond_request_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<SwapRequest>, AppError> {
    let updated = state
        .engine
        .respond_to_request(&req.user_id, id, req.action)
        .await?;
    Ok(Json(updated))
}

async fn delete_request_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(actor): Query<ActorQuery>,
) -> Result<Json<AckResponse>, AppError> {
    state.engine.delete_request(&actor.user_id, id).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn user_requests_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RequestsQuery>,
) -> Result<Json<RequestPage>, AppError> {
    let filters = query.into_filters()?;
    Ok(Json(state.engine.list_requests(&id, &filters).await?))
}

async fn rating_handler(
    State(state): State<AppState>,
    Json(req): Json<NewRating>,
) -> Result<Json<Rating>, AppError> {
    Ok(Json(state.engine.rate_request(&req).await?))
}

async fn messages_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminMessage>>, AppError> {
    Ok(Json(state.engine.messages(false).await?))
}

async fn ban_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<BanRequest>,
) -> Result<Json<AckResponse>, AppError> {
    state.engine.set_banned(&id, req.banned).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AckResponse>, AppError> {
    state.engine.delete_profile(&id).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn skills_handler(
    State(state): State<AppState>,
    Query(query): Query<SkillsQuery>,
) -> Result<Json<Vec<SkillEntry>>, AppError> {
    Ok(Json(state.engine.list_skills(query.pending).await?))
}

async fn review_skill_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SkillReviewRequest>,
) -> Result<Json<AckResponse>, AppError> {
    state.engine.review_skill(&name, req.approved).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn admin_messages_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminMessage>>, AppError> {
    Ok(Json(state.engine.messages(true).await?))
}

async fn post_message_handler(
    State(state): State<AppState>,
    Json(req): Json<NewAdminMessage>,
) -> Result<Json<AdminMessage>, AppError> {
    Ok(Json(state.engine.post_message(&req).await?))
}

async fn toggle_message_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<MessageToggleRequest>,
) -> Result<Json<AckResponse>, AppError> {
    state.engine.set_message_active(id, req.is_active).await?;
    Ok(Json(AckResponse { success: true }))
}

async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, AppError> {
    let store = state.engine.store_stats().await?;

    Ok(Json(StatsResponse {
        store,
        timings: state.engine.metrics_snapshot(),
        ranking_method: state.engine.ranking_method().to_string(),
    }))
}

// Error handling
struct AppError(MatchEngineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self.0 {
            MatchEngineError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            e @ MatchEngineError::Json(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            MatchEngineError::ProfileNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Profile not found: {}", id))
            }
            MatchEngineError::NotFound(what) => {
                (StatusCode::NOT_FOUND, format!("Not found: {}", what))
            }
            MatchEngineError::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            MatchEngineError::Conflict(message) => (StatusCode::CONFLICT, message),
            e => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        tracing::error!("❌ Error: {} - {}", status, message);

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<MatchEngineError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
