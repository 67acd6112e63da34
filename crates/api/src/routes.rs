use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use fintellect_core::domain::{Answers, Variant};
use fintellect_core::gateway::{Gateway, Health};
use fintellect_core::session::{PendingCall, Session, SessionError};
use fintellect_core::view::SessionView;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct SessionEntry {
    session: Session,
    last_active: Instant,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            session,
            last_active: Instant::now(),
        }
    }

    fn touch(&mut self) -> &mut Session {
        self.last_active = Instant::now();
        &mut self.session
    }
}

#[derive(Clone)]
pub struct AppState {
    gateway: Arc<dyn Gateway>,
    sessions: Arc<Mutex<HashMap<Uuid, SessionEntry>>>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Drops sessions untouched for longer than `ttl`. Returns how many were removed.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        self.evict_idle_at(Instant::now(), ttl).await
    }

    async fn evict_idle_at(&self, now: Instant, ttl: Duration) -> usize {
        let Some(cutoff) = now.checked_sub(ttl) else {
            return 0;
        };
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_active >= cutoff);
        before - sessions.len()
    }
}

/// Periodically evicts idle sessions; runs for the life of the process.
pub async fn sweep_idle_sessions(state: AppState, ttl: Duration) {
    let mut tick = tokio::time::interval(SWEEP_INTERVAL.min(ttl));
    loop {
        tick.tick().await;
        let evicted = state.evict_idle(ttl).await;
        if evicted > 0 {
            tracing::info!(evicted, ttl_secs = ttl.as_secs(), "evicted idle sessions");
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/healthz/upstream", get(upstream_health))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/profile", post(submit_profile))
        .route("/sessions/:id/variant", post(select_variant))
        .route("/sessions/:id/proceed", post(proceed))
        .route("/sessions/:id/retry", post(retry))
        .route("/sessions/:id/start-over", post(start_over))
        .route("/sessions/:id/error", delete(dismiss_error))
        .with_state(state)
}

#[derive(Debug)]
pub enum ApiError {
    SessionNotFound(Uuid),
    /// The action is not available in the session's current stage. Carries the session view,
    /// which now shows the rejection in its banner.
    Rejected(SessionView),
    Upstream(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": format!("session {id} not found") })),
            )
                .into_response(),
            ApiError::Rejected(view) => (StatusCode::CONFLICT, Json(view)).into_response(),
            ApiError::Upstream(err) => {
                sentry_anyhow::capture_anyhow(&err);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(serde_json::json!({ "error": format!("{err:#}") })),
                )
                    .into_response()
            }
        }
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize)]
pub struct CreatedSession {
    pub id: Uuid,
    pub session: SessionView,
}

#[derive(Debug, Deserialize)]
pub struct VariantRequest {
    pub variant: Variant,
}

async fn healthz() -> &'static str {
    "ok"
}

async fn upstream_health(State(state): State<AppState>) -> ApiResult<Health> {
    state
        .gateway
        .health_check()
        .await
        .map(Json)
        .map_err(ApiError::Upstream)
}

async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<CreatedSession>) {
    let id = Uuid::new_v4();
    let session = Session::default();
    let view = SessionView::of(&session);
    state.sessions.lock().await.insert(id, SessionEntry::new(session));
    tracing::info!(session_id = %id, "session created");
    (StatusCode::CREATED, Json(CreatedSession { id, session: view }))
}

async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
    current_view(&state, id).await
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .lock()
        .await
        .remove(&id)
        .ok_or(ApiError::SessionNotFound(id))?;
    tracing::info!(session_id = %id, "session deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_profile(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(answers): Json<Answers>,
) -> ApiResult<SessionView> {
    act(&state, id, |session| session.begin_submit(answers)).await
}

async fn select_variant(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<VariantRequest>,
) -> ApiResult<SessionView> {
    act(&state, id, |session| session.begin_select_variant(req.variant)).await
}

async fn proceed(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
    act(&state, id, Session::begin_proceed).await
}

async fn retry(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
    act(&state, id, |session| Ok(session.begin_retry())).await
}

async fn start_over(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<SessionView> {
    act(&state, id, |session| {
        session.start_over();
        Ok(None)
    })
    .await
}

async fn dismiss_error(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<SessionView> {
    act(&state, id, |session| {
        session.dismiss_error();
        Ok(None)
    })
    .await
}

/// Applies `action` under the session lock, then runs any resulting gateway calls with the lock
/// released.
async fn act<F>(state: &AppState, id: Uuid, action: F) -> ApiResult<SessionView>
where
    F: FnOnce(&mut Session) -> Result<Option<PendingCall>, SessionError>,
{
    let pending = {
        let mut sessions = state.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound(id))?
            .touch();
        match action(session) {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!(session_id = %id, error = %err, "action rejected");
                session.report_error(err.to_string());
                return Err(ApiError::Rejected(SessionView::of(session)));
            }
        }
    };

    drive(state, id, pending).await?;
    current_view(state, id).await
}

async fn drive(state: &AppState, id: Uuid, mut pending: Option<PendingCall>) -> Result<(), ApiError> {
    while let Some(call) = pending {
        let outcome = call.execute(state.gateway.as_ref()).await;
        let mut sessions = state.sessions.lock().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound(id))?
            .touch();
        pending = session.apply(outcome);
    }
    Ok(())
}

async fn current_view(state: &AppState, id: Uuid) -> ApiResult<SessionView> {
    let mut sessions = state.sessions.lock().await;
    let session = sessions
        .get_mut(&id)
        .ok_or(ApiError::SessionNotFound(id))?
        .touch();
    Ok(Json(SessionView::of(session)))
}
