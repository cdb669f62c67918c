//! Quest progression: the behaviors behind every command and answer.
//!
//! This includes:
//!   - (re)starting a user's quest
//!   - judging a submission against the current checkpoint
//!   - advancing to the next checkpoint, or to the finish
//!   - issuing the prize code exactly once
//!   - progress and help replies
//!
//! Every operation returns a `Reply`: the decision taken (`TurnOutcome`) plus the
//! messages to send back to the user.

use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{AnswerKind, Checkpoint, Submission, UserState};
use crate::prize::generate_code;
use crate::state::AppState;
use crate::store::StoreError;
use crate::util::{fill_template, trunc_for_log};

/// What a turn decided. Serialized into HTTP replies as `{"kind": ...}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnOutcome {
  Started,
  Help,
  Progress,
  /// Answer accepted; user moved on to `to`.
  Advanced { from: String, to: String },
  /// Answer accepted on the last checkpoint; next message claims the prize.
  AwaitingClaim { from: String },
  Rejected { checkpoint: String },
  WrongInput { checkpoint: String, expected: AnswerKind },
  PrizeIssued { code: String },
  PrizeRedisplayed { code: String },
  /// User state points at a checkpoint the quest no longer defines.
  Stale { checkpoint: String },
  /// The store refused the write; nothing shown to the user was kept.
  NotSaved { checkpoint: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct Reply {
  pub outcome: TurnOutcome,
  pub messages: Vec<String>,
}

impl Reply {
  fn new(outcome: TurnOutcome, messages: Vec<String>) -> Self {
    Self { outcome, messages }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
  pub completed: usize,
  pub total: usize,
  /// `None` when the stored checkpoint id is unknown to the quest.
  pub current_title: Option<String>,
}

/// Result of checking a submission against a checkpoint, before any state change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Judgement {
  Accept,
  Reject,
  WrongInput,
}

/// Decide whether `sub` satisfies `cp`. Finish checkpoints accept anything.
pub fn judge(cp: &Checkpoint, sub: &Submission) -> Judgement {
  let text_verdict = |t: &str| if cp.rule.accepts(t) { Judgement::Accept } else { Judgement::Reject };
  match cp.kind {
    AnswerKind::Finish => Judgement::Accept,
    AnswerKind::Text => match sub.non_empty_text() {
      Some(t) if !sub.has_photo() => text_verdict(t),
      _ => Judgement::WrongInput,
    },
    AnswerKind::Photo => {
      if sub.has_photo() { Judgement::Accept } else { Judgement::WrongInput }
    }
    AnswerKind::TextOrPhoto => {
      if sub.has_photo() {
        Judgement::Accept
      } else if let Some(t) = sub.non_empty_text() {
        text_verdict(t)
      } else {
        Judgement::WrongInput
      }
    }
  }
}

fn present(state: &AppState, cp: &Checkpoint) -> String {
  fill_template(&state.quest.messages().checkpoint, &[("title", cp.title.as_str()), ("text", cp.text.as_str())])
}

async fn load_state(state: &AppState, user_id: &str) -> UserState {
  state
    .store
    .load(user_id)
    .await
    .unwrap_or_else(|| UserState::fresh(state.quest.start()))
}

async fn persist(state: &AppState, user_id: &str, st: &UserState) -> Result<(), StoreError> {
  state.store.save(user_id, st).await.inspect_err(|e| {
    error!(target: "quest", %user_id, current = %st.current, error = %e, "Failed to persist user state");
  })
}

fn not_saved(state: &AppState, checkpoint: &str) -> Reply {
  Reply::new(
    TurnOutcome::NotSaved { checkpoint: checkpoint.to_string() },
    vec![state.quest.messages().not_saved.clone()],
  )
}

fn report_for(state: &AppState, st: &UserState) -> ProgressReport {
  ProgressReport {
    completed: st.history.len(),
    total: state.quest.len(),
    current_title: state.quest.checkpoint(&st.current).map(|cp| cp.title.clone()),
  }
}

pub fn help_text(state: &AppState) -> Reply {
  Reply::new(TurnOutcome::Help, vec![state.quest.messages().help.clone()])
}

/// `/start`: (re)initialize the user's state and show the first checkpoint.
#[instrument(level = "info", skip(state))]
pub async fn start_quest(state: &AppState, user_id: &str) -> Reply {
  let _turn = state.lock_user(user_id).await;
  let fresh = UserState::fresh(state.quest.start());
  if persist(state, user_id, &fresh).await.is_err() {
    return not_saved(state, &fresh.current);
  }
  info!(target: "quest", %user_id, start = %fresh.current, "Quest (re)started");

  let msgs = state.quest.messages();
  let mut messages = vec![fill_template(&msgs.welcome, &[("quest", state.quest.title())])];
  if let Some(cp) = state.quest.checkpoint(&fresh.current) {
    messages.push(present(state, cp));
  }
  Reply::new(TurnOutcome::Started, messages)
}

/// `/reset`: identical to `/start`; history and any prize are discarded.
#[instrument(level = "info", skip(state))]
pub async fn reset_quest(state: &AppState, user_id: &str) -> Reply {
  info!(target: "quest", %user_id, "Reset requested");
  start_quest(state, user_id).await
}

#[instrument(level = "debug", skip(state))]
pub async fn progress_report(state: &AppState, user_id: &str) -> ProgressReport {
  let st = load_state(state, user_id).await;
  report_for(state, &st)
}

/// `/progress`: completed count and current checkpoint title.
pub async fn progress(state: &AppState, user_id: &str) -> Reply {
  let st = load_state(state, user_id).await;
  let report = report_for(state, &st);
  let msgs = state.quest.messages();
  match &report.current_title {
    Some(title) => {
      let completed = report.completed.to_string();
      let total = report.total.to_string();
      let text = fill_template(&msgs.progress, &[("completed", completed.as_str()), ("total", total.as_str()), ("title", title.as_str())]);
      Reply::new(TurnOutcome::Progress, vec![text])
    }
    None => {
      Reply::new(TurnOutcome::Stale { checkpoint: st.current }, vec![msgs.stale.clone()])
    }
  }
}

/// Free-form text/photo: judge it against the current checkpoint and advance on success.
#[instrument(
  level = "info",
  skip(state, sub),
  fields(text = %sub.text.as_deref().map(|t| trunc_for_log(t, 40)).unwrap_or_default(), photo = sub.has_photo())
)]
pub async fn submit(state: &AppState, user_id: &str, sub: &Submission) -> Reply {
  let _turn = state.lock_user(user_id).await;
  let quest = &state.quest;
  let msgs = quest.messages();
  let mut st = load_state(state, user_id).await;

  let Some(cp) = quest.checkpoint(&st.current) else {
    warn!(target: "quest", %user_id, current = %st.current, "User state points at unknown checkpoint");
    return Reply::new(TurnOutcome::Stale { checkpoint: st.current }, vec![msgs.stale.clone()]);
  };

  if cp.kind == AnswerKind::Finish {
    if let Some(code) = &st.prize {
      debug!(target: "quest", %user_id, "Prize already issued; re-displaying");
      let text = fill_template(&msgs.prize_again, &[("code", code.as_str())]);
      return Reply::new(TurnOutcome::PrizeRedisplayed { code: code.clone() }, vec![text]);
    }
    let template = cp.prize_template.as_deref().unwrap_or_default();
    let code = generate_code(template, &mut rand::thread_rng());
    st.mark_completed(&cp.id);
    st.prize = Some(code.clone());
    // Only a stored code may be shown; otherwise the next claim would mint another.
    if persist(state, user_id, &st).await.is_err() {
      return not_saved(state, &cp.id);
    }
    info!(target: "quest", %user_id, checkpoint = %cp.id, "Prize issued");
    let text = fill_template(&msgs.prize_issued, &[("code", code.as_str())]);
    return Reply::new(TurnOutcome::PrizeIssued { code }, vec![text]);
  }

  match judge(cp, sub) {
    Judgement::WrongInput => {
      debug!(target: "quest", %user_id, checkpoint = %cp.id, expected = cp.kind.as_str(), "Wrong input kind");
      let prompt = match cp.kind {
        AnswerKind::Photo => &msgs.need_photo,
        AnswerKind::TextOrPhoto => &msgs.need_text_or_photo,
        _ => &msgs.need_text,
      };
      Reply::new(
        TurnOutcome::WrongInput { checkpoint: cp.id.clone(), expected: cp.kind },
        vec![prompt.clone()],
      )
    }
    Judgement::Reject => {
      debug!(target: "quest", %user_id, checkpoint = %cp.id, "Answer rejected");
      Reply::new(TurnOutcome::Rejected { checkpoint: cp.id.clone() }, vec![msgs.retry.clone()])
    }
    Judgement::Accept => {
      st.mark_completed(&cp.id);
      let next = quest.successor(&cp.id);
      st.current = next.map(|n| n.id.clone()).unwrap_or_else(|| quest.finish().to_string());
      if persist(state, user_id, &st).await.is_err() {
        return not_saved(state, &cp.id);
      }

      let mut messages = Vec::new();
      if let Some(hint) = &cp.hint {
        messages.push(fill_template(&msgs.hint, &[("hint", hint.as_str())]));
      }
      let outcome = match next {
        Some(n) => {
          info!(target: "quest", %user_id, from = %cp.id, to = %n.id, "Checkpoint completed");
          messages.push(present(state, n));
          if n.kind == AnswerKind::Finish {
            messages.push(msgs.claim_prize.clone());
          }
          TurnOutcome::Advanced { from: cp.id.clone(), to: n.id.clone() }
        }
        None => {
          info!(target: "quest", %user_id, from = %cp.id, "Last checkpoint completed; awaiting prize claim");
          messages.push(msgs.claim_prize.clone());
          TurnOutcome::AwaitingClaim { from: cp.id.clone() }
        }
      };
      Reply::new(outcome, messages)
    }
  }
}
