//! REST API router for the match server.
//!
//! Used by the binary and by integration tests. Create with [`create_router`] and
//! serve with `into_make_service_with_connect_info::<SocketAddr>()` so callers can
//! be identified by address. Uses Extension for state so the router is `Router<()>`.

use axum::{
    body::Bytes,
    extract::{Extension, Path, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::{self, ServerConfig};
use crate::error::MatchError;
use crate::identity::{self, Caller, IdentityConfig};
use crate::requests::{AttackBody, ChangeTeamBody, HealBody, JoinBody, PlayerBody, UpdateBody};
use crate::{Match, PlayerId};

/// Shared app state: one match per process.
#[derive(Clone)]
pub struct AppState {
    pub(crate) game: Arc<Mutex<Match>>,
    hostname: Arc<str>,
}

impl AppState {
    pub fn new(game: Match) -> Self {
        Self {
            game: Arc::new(Mutex::new(game)),
            hostname: config::hostname().into(),
        }
    }

    /// Every operation validates before mutating, so a poisoned guard still holds a
    /// consistent match.
    fn lock(&self) -> MutexGuard<'_, Match> {
        self.game.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Builds the REST router for `config`. Returns `Router<()>`.
pub fn create_router(config: &ServerConfig) -> Router<()> {
    router_with_state(
        AppState::new(Match::with_event_capacity(config.event_log_capacity)),
        config.identity(),
    )
}

/// Builds the router around existing state (tests share the match this way).
pub fn router_with_state(state: AppState, identity_config: IdentityConfig) -> Router<()> {
    Router::new()
        .route("/status", get(status))
        .route("/api/players", get(list_players))
        .route("/api/events", get(list_events))
        .route("/api/player/join", post(join))
        .route("/api/player/update", post(update_stats))
        .route("/api/player/leave", post(leave))
        .route("/api/player/attack", post(attack))
        .route("/api/player/heal", post(heal))
        .route("/api/player/changeTeam", post(change_team))
        .route("/api/player/:id", delete(remove_player))
        .route("/api/flag/obtain", post(obtain_flag))
        .route("/api/flag/capture", post(capture_flag))
        .route("/api/restart", post(restart))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            identity::resolve_caller(req, next, identity_config)
        }))
        .layer(Extension(state))
}

impl IntoResponse for MatchError {
    fn into_response(self) -> Response {
        (self.status(), Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

/// Missing, empty, or non-object bodies become the default (all fields absent) and
/// fail field validation instead of being rejected by the extractor.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> T {
    if body.is_empty() {
        return T::default();
    }
    serde_json::from_slice(body).unwrap_or_default()
}

fn respond<T: Serialize>(op: &str, result: Result<T, MatchError>) -> Response {
    match result {
        Ok(out) => (StatusCode::OK, Json(out)).into_response(),
        Err(e) => {
            warn!("request rejected op={} kind={} error={}", op, e.kind(), e);
            e.into_response()
        }
    }
}

async fn status(Extension(state): Extension<AppState>) -> Response {
    #[derive(Serialize)]
    struct Out<'a> {
        ok: bool,
        hostname: &'a str,
    }
    (
        StatusCode::OK,
        Json(Out {
            ok: true,
            hostname: &state.hostname,
        }),
    )
        .into_response()
}

async fn list_players(
    Extension(state): Extension<AppState>,
    Extension(caller): Extension<Caller>,
) -> Response {
    let guard = state.lock();
    (StatusCode::OK, Json(guard.roster(Some(caller.source.as_str())))).into_response()
}

async fn list_events(Extension(state): Extension<AppState>) -> Response {
    let guard = state.lock();
    (StatusCode::OK, Json(serde_json::json!({ "events": guard.events() }))).into_response()
}

async fn join(
    Extension(state): Extension<AppState>,
    Extension(caller): Extension<Caller>,
    body: Bytes,
) -> Response {
    let result = parse_body::<JoinBody>(&body).validate().and_then(|req| {
        let mut guard = state.lock();
        guard.join(req.code, &caller.source)
    });
    respond("join", result)
}

#[derive(Serialize)]
struct PlayerOut {
    player: crate::Player,
}

async fn update_stats(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let result = parse_body::<UpdateBody>(&body).validate().and_then(|req| {
        let mut guard = state.lock();
        guard
            .update_stats(&req.player_id, req.kills, req.health)
            .map(|player| PlayerOut { player })
    });
    respond("update", result)
}

#[derive(Serialize)]
struct MessageOut {
    message: String,
}

fn remove_by_id(state: &AppState, player_id: &PlayerId) -> Result<MessageOut, MatchError> {
    let mut guard = state.lock();
    guard.remove(player_id).map(|player| MessageOut {
        message: format!("{} removed", player.name),
    })
}

async fn remove_player(Extension(state): Extension<AppState>, Path(id): Path<String>) -> Response {
    respond("remove", remove_by_id(&state, &PlayerId(id)))
}

async fn leave(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let result = parse_body::<PlayerBody>(&body)
        .validate()
        .and_then(|player_id| remove_by_id(&state, &player_id));
    respond("leave", result)
}

async fn obtain_flag(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let result = parse_body::<PlayerBody>(&body).validate().and_then(|player_id| {
        let mut guard = state.lock();
        guard.obtain_flag(&player_id)
    });
    respond("obtain_flag", result)
}

async fn capture_flag(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let result = parse_body::<PlayerBody>(&body).validate().and_then(|player_id| {
        let mut guard = state.lock();
        guard.capture_flag(&player_id)
    });
    respond("capture_flag", result)
}

async fn attack(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let result = parse_body::<AttackBody>(&body).validate().and_then(|req| {
        let mut guard = state.lock();
        guard.attack(&req.attacker_id, &req.target_id, req.damage)
    });
    respond("attack", result)
}

async fn heal(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    #[derive(Serialize)]
    struct Out {
        target: crate::Player,
    }
    let result = parse_body::<HealBody>(&body).validate().and_then(|req| {
        let mut guard = state.lock();
        guard
            .heal(req.healer_id.as_ref(), &req.target_id, req.amount)
            .map(|target| Out { target })
    });
    respond("heal", result)
}

async fn change_team(Extension(state): Extension<AppState>, body: Bytes) -> Response {
    let result = parse_body::<ChangeTeamBody>(&body).validate().and_then(|req| {
        let mut guard = state.lock();
        guard
            .change_team(&req.player_id, req.team)
            .map(|player| PlayerOut { player })
    });
    respond("change_team", result)
}

async fn restart(Extension(state): Extension<AppState>) -> Response {
    let mut guard = state.lock();
    guard.restart();
    let roster = guard.roster(None);
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": "Match restarted",
            "players": roster.players,
            "teams": roster.teams,
            "flagHolder": roster.flag_holder,
        })),
    )
        .into_response()
}
