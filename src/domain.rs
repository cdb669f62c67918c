//! Domain models: checkpoints, answer kinds, validation rules, per-user progress.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// What kind of answer a checkpoint expects.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
  Text,
  Photo,
  TextOrPhoto,
  /// Terminal checkpoint: any message claims the prize.
  Finish,
}

impl AnswerKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      AnswerKind::Text => "text",
      AnswerKind::Photo => "photo",
      AnswerKind::TextOrPhoto => "text_or_photo",
      AnswerKind::Finish => "finish",
    }
  }
}

/// Acceptance rule applied to text answers. At most one per checkpoint.
#[derive(Clone, Debug, Default)]
pub enum ValidationRule {
  /// Accept if any (case-insensitive) pattern matches anywhere in the answer.
  Patterns(Vec<Regex>),
  /// Accept if the trimmed answer has at least this many characters.
  MinLen(usize),
  #[default]
  Any,
}

impl ValidationRule {
  pub fn accepts(&self, answer: &str) -> bool {
    match self {
      ValidationRule::Patterns(patterns) => patterns.iter().any(|re| re.is_match(answer)),
      ValidationRule::MinLen(min) => answer.trim().chars().count() >= *min,
      ValidationRule::Any => true,
    }
  }
}

/// One step of the quest, compiled from configuration.
#[derive(Clone, Debug)]
pub struct Checkpoint {
  pub id: String,
  pub title: String,
  pub text: String,
  pub kind: AnswerKind,
  pub rule: ValidationRule,
  pub hint: Option<String>,
  pub prize_template: Option<String>,
}

/// Per-user progress record. Field names are the persisted layout.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserState {
  pub current: String,
  #[serde(default)]
  pub history: Vec<String>,
  #[serde(default)]
  pub prize: Option<String>,
}

impl UserState {
  /// State of a brand-new user (also what a reset produces).
  pub fn fresh(start: &str) -> Self {
    Self { current: start.to_string(), history: Vec::new(), prize: None }
  }

  /// Record a completed checkpoint; repeated ids are ignored.
  pub fn mark_completed(&mut self, id: &str) {
    if !self.history.iter().any(|h| h == id) {
      self.history.push(id.to_string());
    }
  }
}

/// An inbound answer: text, a photo reference, or both (photo with caption).
#[derive(Clone, Debug, Default)]
pub struct Submission {
  pub text: Option<String>,
  pub photo: Option<String>,
}

impl Submission {
  #[allow(dead_code)]
  pub fn text(s: impl Into<String>) -> Self {
    Self { text: Some(s.into()), photo: None }
  }

  #[allow(dead_code)]
  pub fn photo(file_id: impl Into<String>) -> Self {
    Self { text: None, photo: Some(file_id.into()) }
  }

  /// Text with surrounding whitespace removed; blank text counts as absent.
  pub fn non_empty_text(&self) -> Option<&str> {
    self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
  }

  pub fn has_photo(&self) -> bool {
    self.photo.as_deref().is_some_and(|p| !p.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use regex::RegexBuilder;

  fn ci(p: &str) -> Regex {
    RegexBuilder::new(p).case_insensitive(true).build().unwrap()
  }

  #[test]
  fn pattern_rule_is_case_insensitive() {
    let rule = ValidationRule::Patterns(vec![ci("^yes$")]);
    assert!(rule.accepts("YES"));
    assert!(!rule.accepts("no"));
  }

  #[test]
  fn pattern_rule_accepts_any_matching_pattern() {
    let rule = ValidationRule::Patterns(vec![ci("oak"), ci("birch")]);
    assert!(rule.accepts("I think it was a Birch tree"));
    assert!(!rule.accepts("pine"));
  }

  #[test]
  fn min_len_rule() {
    let rule = ValidationRule::MinLen(5);
    assert!(!rule.accepts("hi"));
    assert!(rule.accepts("hello!"));
    assert!(!rule.accepts("  hi   "));
  }

  #[test]
  fn history_suppresses_duplicates() {
    let mut st = UserState::fresh("a");
    st.mark_completed("a");
    st.mark_completed("b");
    st.mark_completed("a");
    assert_eq!(st.history, vec!["a".to_string(), "b".to_string()]);
  }

  #[test]
  fn blank_text_is_not_an_answer() {
    assert_eq!(Submission::text("   ").non_empty_text(), None);
    assert_eq!(Submission::text(" ok ").non_empty_text(), Some("ok"));
    assert!(!Submission::default().has_photo());
    assert!(Submission::photo("file-1").has_photo());
  }

  #[test]
  fn persisted_layout_uses_null_prize() {
    let st = UserState::fresh("intro");
    let json = serde_json::to_value(&st).unwrap();
    assert_eq!(json, serde_json::json!({ "current": "intro", "history": [], "prize": null }));
  }
}
