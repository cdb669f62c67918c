//! Public protocol structs for the HTTP endpoints (serde ready), and the
//! command parser used to route inbound chat messages.

use serde::{Deserialize, Serialize};

use crate::domain::Submission;
use crate::logic::{ProgressReport, TurnOutcome};

/// Slash commands understood by the bot. Everything else is an answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Progress,
    Reset,
}

impl Command {
    /// Parse `/start`, `/help`, `/progress`, `/reset`, optionally suffixed with
    /// `@botname` and followed by arguments (ignored).
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.trim().split_whitespace().next()?;
        let name = first.strip_prefix('/')?;
        let name = name.split('@').next().unwrap_or(name);
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "progress" => Some(Command::Progress),
            "reset" => Some(Command::Reset),
            _ => None,
        }
    }
}

/// One inbound chat message, as delivered by the transport.
#[derive(Debug, Deserialize)]
pub struct MessageIn {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Transport-side reference to an attached photo (file id).
    #[serde(default)]
    pub photo: Option<String>,
}

impl MessageIn {
    /// Commands are only recognized in text-only messages.
    pub fn command(&self) -> Option<Command> {
        if self.photo.is_some() {
            return None;
        }
        self.text.as_deref().and_then(Command::parse)
    }

    pub fn submission(&self) -> Submission {
        Submission {
            text: self.text.clone(),
            photo: self.photo.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageOut {
    pub replies: Vec<String>,
    pub outcome: TurnOutcome,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

pub type ProgressOut = ProgressReport;

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("  /HELP  "), Some(Command::Help));
        assert_eq!(Command::parse("/progress@QuestBot"), Some(Command::Progress));
        assert_eq!(Command::parse("/reset now please"), Some(Command::Reset));
    }

    #[test]
    fn ordinary_text_is_not_a_command() {
        assert_eq!(Command::parse("start"), None);
        assert_eq!(Command::parse("/dance"), None);
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("yes /start"), None);
    }

    #[test]
    fn photo_caption_is_never_a_command() {
        let msg: MessageIn =
            serde_json::from_str(r#"{"userId":"1","text":"/reset","photo":"f1"}"#).unwrap();
        assert_eq!(msg.command(), None);
        assert!(msg.submission().has_photo());
    }
}
