//! Loading the quest definition (checkpoints + optional reply templates) from TOML,
//! and the process settings read from the environment.
//!
//! See `QuestConfig` and `Messages` for the expected schema, and `quest.toml`
//! at the repository root for a complete example.

use std::{io, path::{Path, PathBuf}};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::AnswerKind;

/// Anything that prevents the quest definition from being used. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("quest config not found at {0}")]
  NotFound(PathBuf),
  #[error("failed to read quest config {path}: {source}")]
  Io { path: PathBuf, #[source] source: io::Error },
  #[error("failed to parse quest config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("invalid quest config: {0}")]
  Schema(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct QuestConfig {
  pub title: String,
  pub start: String,
  pub finish: String,
  pub checkpoints: Vec<CheckpointCfg>,
  #[serde(default)]
  pub messages: Messages,
}

/// Checkpoint entry as written in TOML. `patterns` and `min_len` are mutually exclusive.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointCfg {
  pub id: String,
  pub title: String,
  #[serde(default)] pub text: String,
  #[serde(rename = "type")]
  pub kind: AnswerKind,
  #[serde(default)] pub patterns: Option<Vec<String>>,
  #[serde(default)] pub min_len: Option<usize>,
  #[serde(default)] pub hint: Option<String>,
  #[serde(default)] pub prize: Option<String>,
}

/// User-facing reply templates. Defaults are usable as-is; override any of them
/// in a `[messages]` table. Placeholders are written as `{name}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Messages {
  /// `{quest}`
  pub welcome: String,
  /// `{title}`, `{text}`
  pub checkpoint: String,
  pub help: String,
  /// `{completed}`, `{total}`, `{title}`
  pub progress: String,
  pub retry: String,
  pub need_text: String,
  pub need_photo: String,
  pub need_text_or_photo: String,
  /// `{hint}`
  pub hint: String,
  pub claim_prize: String,
  /// `{code}`
  pub prize_issued: String,
  /// `{code}`
  pub prize_again: String,
  pub stale: String,
  pub not_saved: String,
}

impl Default for Messages {
  fn default() -> Self {
    Self {
      welcome: "Welcome to <b>{quest}</b>! Complete each checkpoint in order to win a prize.".into(),
      checkpoint: "<b>{title}</b>\n{text}".into(),
      help: "Commands:\n/start – begin the quest\n/progress – show your progress\n/reset – start over\n/help – this message\n\nSend text or a photo to answer the current checkpoint.".into(),
      progress: "Completed checkpoints: <b>{completed}</b> of {total}.\nCurrent: <b>{title}</b>".into(),
      retry: "Not quite. Try again!".into(),
      need_text: "This checkpoint needs a text answer.".into(),
      need_photo: "This checkpoint needs a photo.".into(),
      need_text_or_photo: "Send a text answer or a photo.".into(),
      hint: "Hint: {hint}".into(),
      claim_prize: "All checkpoints done! Send any message to claim your prize.".into(),
      prize_issued: "Congratulations, you finished the quest! Your prize code: <b>{code}</b>".into(),
      prize_again: "You already finished the quest. Your prize code: <b>{code}</b>".into(),
      stale: "Your progress refers to a checkpoint that no longer exists. Send /reset to start over.".into(),
      not_saved: "Something went wrong while saving your progress. Please send that again.".into(),
    }
  }
}

/// Read and parse the quest definition. Schema checks happen in `Quest::from_config`.
pub fn load_quest_config(path: &Path) -> Result<QuestConfig, ConfigError> {
  let raw = std::fs::read_to_string(path).map_err(|e| match e.kind() {
    io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
    _ => ConfigError::Io { path: path.to_path_buf(), source: e },
  })?;
  let cfg = parse_quest_config(&raw)?;
  info!(target: "quest_backend", path = %path.display(), checkpoints = cfg.checkpoints.len(), "Loaded quest config (TOML)");
  Ok(cfg)
}

pub fn parse_quest_config(raw: &str) -> Result<QuestConfig, ConfigError> {
  Ok(toml::from_str::<QuestConfig>(raw)?)
}

/// Which `QuestStore` backend to run with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
  File,
  Memory,
}

/// Process settings from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub quest_config_path: PathBuf,
  pub state_path: PathBuf,
  pub store: StoreKind,
}

impl Settings {
  pub fn from_env() -> Self {
    let port = std::env::var("PORT")
      .ok()
      .and_then(|p| p.parse::<u16>().ok())
      .unwrap_or(10000);
    let quest_config_path = std::env::var("QUEST_CONFIG_PATH").unwrap_or_else(|_| "quest.toml".into()).into();
    let state_path = std::env::var("QUEST_STATE_PATH").unwrap_or_else(|_| "data/state.json".into()).into();
    let store = match std::env::var("QUEST_STORE").as_deref() {
      Ok("memory") => StoreKind::Memory,
      Ok("file") | Err(_) => StoreKind::File,
      Ok(other) => {
        warn!(target: "quest_backend", store = other, "Unknown QUEST_STORE; using file store");
        StoreKind::File
      }
    };
    Self { port, quest_config_path, state_path, store }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"
title = "Park Hunt"
start = "gate"
finish = "done"

[[checkpoints]]
id = "gate"
title = "The Gate"
text = "What colour is the gate?"
type = "text"
patterns = ["green"]
hint = "Look left."

[[checkpoints]]
id = "done"
title = "Finish"
type = "finish"
prize = "PARK-{digits:6}"

[messages]
retry = "Nope."
"#;

  #[test]
  fn parses_checkpoints_and_message_overrides() {
    let cfg = parse_quest_config(SAMPLE).unwrap();
    assert_eq!(cfg.title, "Park Hunt");
    assert_eq!(cfg.checkpoints.len(), 2);
    assert_eq!(cfg.checkpoints[0].kind, AnswerKind::Text);
    assert_eq!(cfg.checkpoints[0].patterns.as_deref(), Some(&["green".to_string()][..]));
    assert_eq!(cfg.checkpoints[1].kind, AnswerKind::Finish);
    assert_eq!(cfg.checkpoints[1].prize.as_deref(), Some("PARK-{digits:6}"));
    assert_eq!(cfg.messages.retry, "Nope.");
    assert_eq!(cfg.messages.hint, Messages::default().hint);
  }

  #[test]
  fn unknown_answer_type_is_a_parse_error() {
    let raw = SAMPLE.replace("type = \"text\"", "type = \"video\"");
    assert!(matches!(parse_quest_config(&raw), Err(ConfigError::Parse(_))));
  }

  #[test]
  fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.toml");
    assert!(matches!(load_quest_config(&path), Err(ConfigError::NotFound(p)) if p == path));
  }

  #[test]
  fn loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quest.toml");
    std::fs::write(&path, SAMPLE).unwrap();
    let cfg = load_quest_config(&path).unwrap();
    assert_eq!(cfg.start, "gate");
  }
}
