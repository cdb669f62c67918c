//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs the user id and the turn outcome.

use std::sync::Arc;
use axum::{extract::{Query, State}, Json, response::IntoResponse};
use tracing::{info, instrument};

use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

/// Liveness probe; the body is fixed.
pub async fn http_root() -> &'static str {
  "Bot is running!"
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state, body), fields(user_id = %body.user_id, photo = body.photo.is_some()))]
pub async fn http_post_message(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MessageIn>,
) -> impl IntoResponse {
  let reply = match body.command() {
    Some(Command::Start) => start_quest(&state, &body.user_id).await,
    Some(Command::Reset) => reset_quest(&state, &body.user_id).await,
    Some(Command::Help) => help_text(&state),
    Some(Command::Progress) => progress(&state, &body.user_id).await,
    None => submit(&state, &body.user_id, &body.submission()).await,
  };
  info!(target: "quest", user_id = %body.user_id, outcome = ?reply.outcome, "HTTP message handled");
  Json(MessageOut { replies: reply.messages, outcome: reply.outcome })
}

#[instrument(level = "info", skip(state), fields(user_id = %q.user_id))]
pub async fn http_get_progress(
  State(state): State<Arc<AppState>>,
  Query(q): Query<ProgressQuery>,
) -> impl IntoResponse {
  let report: ProgressOut = progress_report(&state, &q.user_id).await;
  Json(report)
}
