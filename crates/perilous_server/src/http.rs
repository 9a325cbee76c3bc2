//! REST API over the [`Orchestrator`].

use crate::error::GameError;
use crate::orchestrator::Orchestrator;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use perilous_rules::Difficulty;
use serde::Deserialize;
use tower::ServiceBuilder;
use tracing::{debug, info, warn};

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    orchestrator: Orchestrator,
    auto_bots: bool,
}

impl AppState {
    /// Wraps an orchestrator; with `auto_bots`, bots move in the background
    /// after any request that leaves one to move.
    pub fn new(orchestrator: Orchestrator, auto_bots: bool) -> Self {
        Self {
            orchestrator,
            auto_bots,
        }
    }

    fn wake_bots(&self, game_id: &str, awaiting_bot: bool) {
        if !(self.auto_bots && awaiting_bot) {
            return;
        }
        let orchestrator = self.orchestrator.clone();
        let game_id = game_id.to_string();
        debug!(%game_id, "Driving bots in the background");
        tokio::spawn(async move {
            if let Err(e) = orchestrator.drive_bots(&game_id).await {
                warn!(%game_id, error = %e, "Background bot drive stopped");
            }
        });
    }
}

/// Builds the router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(get_game))
        .route("/games/{id}/join", post(join_game))
        .route("/games/{id}/start", post(start_game))
        .route("/games/{id}/bots", post(add_bot))
        .route("/games/{id}/action", post(submit_action))
        .route("/games/{id}/letter", post(pick_letter))
        .route("/games/{id}/guess", post(guess_phrase))
        .route("/games/{id}/continue", post(continue_turn))
        .route("/games/{id}/bot-act", post(bot_act))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGame {
    name: Option<String>,
    #[serde(default)]
    difficulty: Difficulty,
}

#[derive(Debug, Deserialize)]
struct JoinGame {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAction {
    player_id: String,
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PickLetter {
    player_id: String,
    letter: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GuessPhrase {
    player_id: String,
    guess: String,
}

#[derive(Debug, Deserialize)]
struct ViewerQuery {
    viewer: Option<String>,
}

async fn create_game(
    State(state): State<AppState>,
    body: Option<Json<CreateGame>>,
) -> Result<Response, ApiError> {
    let Json(body) = body.unwrap_or_default();
    let response = match body.name {
        Some(name) => {
            let joined = state
                .orchestrator
                .create_game(&name, body.difficulty)
                .await?;
            (StatusCode::CREATED, Json(joined)).into_response()
        }
        None => {
            let view = state.orchestrator.create_lobby(body.difficulty).await?;
            (StatusCode::CREATED, Json(view)).into_response()
        }
    };
    Ok(response)
}

async fn get_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Response, ApiError> {
    let view = state
        .orchestrator
        .public_state(&id, query.viewer.as_deref())
        .await?;
    Ok(Json(view).into_response())
}

async fn join_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JoinGame>,
) -> Result<Response, ApiError> {
    let joined = state.orchestrator.join_game(&id, &body.name).await?;
    Ok(Json(joined).into_response())
}

async fn start_game(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let view = state.orchestrator.start_game(&id).await?;
    state.wake_bots(&view.id, view.awaiting_bot);
    Ok(Json(view).into_response())
}

async fn add_bot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let view = state.orchestrator.add_bot(&id).await?;
    Ok(Json(view).into_response())
}

async fn submit_action(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<SubmitAction>,
) -> Result<Response, ApiError> {
    let played = state
        .orchestrator
        .submit_action(&id, &body.player_id, &body.text)
        .await?;
    state.wake_bots(&played.view.id, played.view.awaiting_bot);
    Ok(Json(played).into_response())
}

async fn pick_letter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PickLetter>,
) -> Result<Response, ApiError> {
    let played = state
        .orchestrator
        .pick_letter(&id, &body.player_id, &body.letter)
        .await?;
    state.wake_bots(&played.view.id, played.view.awaiting_bot);
    Ok(Json(played).into_response())
}

async fn guess_phrase(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<GuessPhrase>,
) -> Result<Response, ApiError> {
    let played = state
        .orchestrator
        .guess_phrase(&id, &body.player_id, &body.guess)
        .await?;
    state.wake_bots(&played.view.id, played.view.awaiting_bot);
    Ok(Json(played).into_response())
}

async fn continue_turn(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let view = state.orchestrator.continue_turn(&id).await?;
    state.wake_bots(&view.id, view.awaiting_bot);
    Ok(Json(view).into_response())
}

async fn bot_act(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let played = state.orchestrator.bot_act(&id).await?;
    Ok(Json(played).into_response())
}

/// A [`GameError`] on its way to the client.
#[derive(Debug)]
pub struct ApiError(GameError);

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            GameError::GameNotFound(_) => StatusCode::NOT_FOUND,
            GameError::NotYourTurn { .. }
            | GameError::WrongPhase { .. }
            | GameError::InsufficientPlayers { .. }
            | GameError::DuplicateGuess(_) => StatusCode::CONFLICT,
            GameError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GameError::Storage(_) | GameError::InvariantViolated(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, code = self.0.code(), message = %self.0, "Request failed");
        (
            status,
            Json(serde_json::json!({
                "error": self.0.code(),
                "message": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GameError::GameNotFound("X".into()), StatusCode::NOT_FOUND),
            (GameError::DuplicateGuess('E'), StatusCode::CONFLICT),
            (GameError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (
                GameError::InvariantViolated("winner".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GameError::NotYourTurn {
                    expected: "Bob".into(),
                },
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
