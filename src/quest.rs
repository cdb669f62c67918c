//! Compiled, immutable quest definition.
//!
//! Built once from `QuestConfig` at startup; every schema problem is reported as
//! `ConfigError::Schema` so the process can refuse to start.

use std::collections::HashMap;

use regex::RegexBuilder;

use crate::config::{CheckpointCfg, ConfigError, Messages, QuestConfig};
use crate::domain::{AnswerKind, Checkpoint, ValidationRule};
use crate::prize;

#[derive(Clone, Debug)]
pub struct Quest {
    title: String,
    start: String,
    finish: String,
    checkpoints: Vec<Checkpoint>,
    index: HashMap<String, usize>,
    messages: Messages,
}

fn schema(msg: impl Into<String>) -> ConfigError {
    ConfigError::Schema(msg.into())
}

impl Quest {
    pub fn from_config(cfg: QuestConfig) -> Result<Self, ConfigError> {
        if cfg.checkpoints.is_empty() {
            return Err(schema("quest has no checkpoints"));
        }

        let mut checkpoints = Vec::with_capacity(cfg.checkpoints.len());
        let mut index = HashMap::new();
        for (pos, cc) in cfg.checkpoints.into_iter().enumerate() {
            let cp = compile_checkpoint(cc)?;
            if index.insert(cp.id.clone(), pos).is_some() {
                return Err(schema(format!("duplicate checkpoint id '{}'", cp.id)));
            }
            checkpoints.push(cp);
        }

        if !index.contains_key(&cfg.start) {
            return Err(schema(format!("start checkpoint '{}' is not defined", cfg.start)));
        }
        match index.get(&cfg.finish).map(|&i| &checkpoints[i]) {
            None => return Err(schema(format!("finish checkpoint '{}' is not defined", cfg.finish))),
            Some(cp) if cp.kind != AnswerKind::Finish => {
                return Err(schema(format!("finish checkpoint '{}' must have type 'finish'", cfg.finish)));
            }
            Some(_) => {}
        }

        Ok(Self {
            title: cfg.title,
            start: cfg.start,
            finish: cfg.finish,
            checkpoints,
            index,
            messages: cfg.messages,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn finish(&self) -> &str {
        &self.finish
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn checkpoint(&self, id: &str) -> Option<&Checkpoint> {
        self.index.get(id).map(|&i| &self.checkpoints[i])
    }

    /// Next checkpoint in definition order.
    pub fn successor(&self, id: &str) -> Option<&Checkpoint> {
        self.index.get(id).and_then(|&i| self.checkpoints.get(i + 1))
    }
}

fn compile_checkpoint(cc: CheckpointCfg) -> Result<Checkpoint, ConfigError> {
    let id = cc.id.trim().to_string();
    if id.is_empty() {
        return Err(schema(format!("checkpoint '{}' has an empty id", cc.title)));
    }

    let rule = match (cc.patterns, cc.min_len) {
        (Some(_), Some(_)) => {
            return Err(schema(format!("checkpoint '{id}' sets both 'patterns' and 'min_len'")));
        }
        (Some(patterns), None) => {
            if patterns.is_empty() {
                return Err(schema(format!("checkpoint '{id}' has an empty 'patterns' list")));
            }
            let compiled = patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| schema(format!("checkpoint '{id}': bad pattern {p:?}: {e}")))
                })
                .collect::<Result<Vec<_>, _>>()?;
            ValidationRule::Patterns(compiled)
        }
        (None, Some(min)) => ValidationRule::MinLen(min),
        (None, None) => ValidationRule::Any,
    };

    if let Some(tpl) = &cc.prize {
        match prize::placeholder_count(tpl) {
            0 => {}
            1 => match prize::digit_count(tpl) {
                Some(n) if (1..=prize::MAX_DIGITS).contains(&n) => {}
                _ => {
                    return Err(schema(format!(
                        "checkpoint '{id}': prize placeholder must request 1..={} digits",
                        prize::MAX_DIGITS
                    )));
                }
            },
            _ => return Err(schema(format!("checkpoint '{id}': prize template has more than one placeholder"))),
        }
    }
    if cc.kind == AnswerKind::Finish && cc.prize.is_none() {
        return Err(schema(format!("finish checkpoint '{id}' needs a 'prize' template")));
    }

    Ok(Checkpoint {
        id,
        title: cc.title,
        text: cc.text,
        kind: cc.kind,
        rule,
        hint: cc.hint.filter(|h| !h.trim().is_empty()),
        prize_template: cc.prize,
    })
}
