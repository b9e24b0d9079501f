//! clubcal server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `CLUBCAL_*`
//! environment variables, opens the SQLite store and serves the event API.
//!
//! # Seeding
//!
//! Memberships and the major catalog are normally owned by other services.
//! For local use they can be seeded directly:
//!
//! ```text
//! clubcal grant <club-id> <user-id> officer
//! clubcal add-major "Computer Science"
//! ```

mod config;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use clubcal_api::{AppState, BroadcastInvalidator, api_router};
use clubcal_core::membership::Role;
use clubcal_store_sqlite::SqliteStore;
use tokio::{
  net::TcpListener,
  sync::broadcast::{self, error::RecvError},
};
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "Club event calendar server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,
  /// Give a user a role in a club, replacing any previous role.
  Grant {
    club_id: Uuid,
    user_id: Uuid,
    /// member, officer or admin
    role:    Role,
  },
  /// Remove a user's membership in a club.
  Revoke { club_id: Uuid, user_id: Uuid },
  /// Register a major that events can target and print its id.
  AddMajor { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let mut store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  if let Some(limit) = server_cfg.storage_timeout() {
    store = store.with_timeout(limit);
  }

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::Grant { club_id, user_id, role } => {
      store
        .grant_role(club_id, user_id, role)
        .await
        .context("failed to grant role")?;
      tracing::info!(%club_id, %user_id, %role, "role granted");
      Ok(())
    }
    Command::Revoke { club_id, user_id } => {
      let removed = store
        .revoke_membership(club_id, user_id)
        .await
        .context("failed to revoke membership")?;
      tracing::info!(%club_id, %user_id, removed, "membership revoked");
      Ok(())
    }
    Command::AddMajor { name } => {
      let major_id = store.add_major(name).await.context("failed to add major")?;
      println!("{major_id}");
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, server_cfg: &ServerConfig) -> anyhow::Result<()> {
  let invalidator = BroadcastInvalidator::new(256);
  tokio::spawn(log_invalidations(invalidator.subscribe()));

  let app = api_router(AppState::new(store, invalidator)).layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Log every listing invalidation. Stands in for a cache or push channel.
async fn log_invalidations(mut rx: broadcast::Receiver<Uuid>) {
  loop {
    match rx.recv().await {
      Ok(organization_id) => {
        tracing::info!(%organization_id, "event listing invalidated");
      }
      Err(RecvError::Lagged(skipped)) => {
        tracing::warn!(skipped, "invalidation log fell behind");
      }
      Err(RecvError::Closed) => break,
    }
  }
}
