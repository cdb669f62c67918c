//! Quest Backend · linear scavenger-hunt bot
//!
//! - Axum HTTP API: the chat transport posts each inbound message here
//! - Quest definition from TOML, validated once at startup (fatal on error)
//! - Per-user progress in a JSON snapshot file
//!
//! Important env variables:
//!   PORT               : u16 (default 10000)
//!   QUEST_CONFIG_PATH  : path to the quest TOML (default "quest.toml")
//!   QUEST_STATE_PATH   : path to the progress snapshot (default "data/state.json")
//!   QUEST_STORE        : "file" (default) or "memory"
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod config;
mod quest;
mod prize;
mod store;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info, instrument};

use crate::config::{load_quest_config, Settings, StoreKind};
use crate::quest::Quest;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{FileStore, MemoryStore, QuestStore};

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env();

  // No degraded mode: a missing or invalid quest aborts startup.
  let quest = load_quest_config(&settings.quest_config_path)
    .and_then(Quest::from_config)
    .inspect_err(|e| error!(target: "quest_backend", error = %e, "Quest config rejected"))?;

  let store: Arc<dyn QuestStore> = match settings.store {
    StoreKind::File => {
      let fs = FileStore::new(&settings.state_path);
      info!(target: "quest_backend", path = %fs.path().display(), "Using file state store");
      Arc::new(fs)
    }
    StoreKind::Memory => {
      info!(target: "quest_backend", "Using in-memory state store (progress is lost on exit)");
      Arc::new(MemoryStore::new())
    }
  };

  let state = Arc::new(AppState::new(quest, store));
  let app = build_router(state);

  let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
  let listener = TcpListener::bind(addr).await?;
  info!(target: "quest_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "quest_backend", "Shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    error!(target: "quest_backend", error = %e, "Failed to listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
}
