//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or detailed directives like
//!   "info,quest=debug,store=debug,tower_http=warn").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Notes:
//! - `quest` carries one event per user decision (accepted, rejected, prize issued),
//!   so it stays at debug by default; `store` only speaks up on snapshot trouble.
//! - Tower HTTP TraceLayer adds per-request spans on top of these events.

use tracing_subscriber::EnvFilter;

/// Targets emitted by this crate, each paired with its default level.
const TARGET_LEVELS: &[(&str, &str)] = &[
    ("quest_backend", "debug"), // startup, config, HTTP plumbing
    ("quest", "debug"),         // per-user progression decisions
    ("store", "info"),          // snapshot writes, corruption recovery
    ("tower_http", "info"),
    ("axum", "info"),
];

fn default_filter() -> String {
    let mut directives = vec!["info".to_string()];
    directives.extend(TARGET_LEVELS.iter().map(|(target, level)| format!("{target}={level}")));
    directives.join(",")
}

pub fn init_tracing() {
    // An unset or unparsable LOG_LEVEL falls back to the per-target defaults above.
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(default_filter()));

    // Targets stay visible: `quest` and `store` events share field names like `user_id`.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // JSON when shipping to a log collector; the two builders differ in type, so init in each arm.
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_lists_every_target() {
        assert_eq!(
            default_filter(),
            "info,quest_backend=debug,quest=debug,store=info,tower_http=info,axum=info"
        );
    }
}
