//! popit-server binary.
//!
//! ```text
//! popit-server [--config config.toml] serve [--listen 0.0.0.0:8080] [--language ms]
//! popit-server hash-password
//! popit-server check-config
//! ```
//!
//! Configuration comes from the TOML file with `POPIT_*` environment
//! variables on top; `serve` flags override both. Running without a
//! subcommand serves.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use popit_core::{language::LanguageCode, schema::EntityKind};
use popit_server::{AppState, ServerConfig, auth::hash_password};
use popit_store_sqlite::SqliteStore;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Popolo entity store server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API.
  Serve(ServeArgs),
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
  /// Validate the configuration and open the store, then exit.
  CheckConfig,
}

#[derive(Args, Default)]
struct ServeArgs {
  /// Listen address, overriding `host` and `port`.
  #[arg(long)]
  listen:   Option<String>,
  /// Fallback language, overriding `fallback_language`.
  #[arg(long, value_parser = parse_language)]
  language: Option<LanguageCode>,
}

fn parse_language(code: &str) -> Result<LanguageCode, String> {
  LanguageCode::new(code).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  match cli.command.unwrap_or(Command::Serve(ServeArgs::default())) {
    Command::HashPassword => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
      Ok(())
    }
    Command::CheckConfig => {
      let cfg = load_config(&cli.config)?;
      let store_path = open_store(&cfg).await?.1;
      println!("config ok: {} serving {} ({})", cfg.address(), store_path.display(), cfg.fallback_language);
      Ok(())
    }
    Command::Serve(args) => serve(&cli.config, args).await,
  }
}

async fn serve(config_path: &Path, args: ServeArgs) -> anyhow::Result<()> {
  let mut cfg = load_config(config_path)?;
  if let Some(language) = args.language {
    cfg.fallback_language = language;
  }
  let address = args.listen.unwrap_or_else(|| cfg.address());

  let (store, store_path) = open_store(&cfg).await?;
  let collections: Vec<_> = EntityKind::ALL
    .into_iter()
    .filter(|k| k.is_root())
    .map(EntityKind::collection)
    .collect();
  tracing::info!(path = ?store_path, ?collections, "store opened");

  let language = cfg.fallback_language.clone();
  let app = popit_server::router(AppState::new(store, cfg));

  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;
  tracing::info!(%language, "listening on http://{address}");

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "unable to listen for shutdown signal");
      }
    })
    .await
    .context("server error")?;

  tracing::info!("shut down");
  Ok(())
}

/// Load the config and reject an auth hash no password could match.
fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
  let cfg = ServerConfig::load(path)
    .with_context(|| format!("failed to load config from {}", path.display()))?;
  cfg
    .auth()
    .check_hash()
    .map_err(|e| anyhow::anyhow!("auth_password_hash is not an argon2 PHC string: {e}"))?;
  Ok(cfg)
}

async fn open_store(cfg: &ServerConfig) -> anyhow::Result<(SqliteStore, PathBuf)> {
  let store_path = expand_tilde(&cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;
  Ok((store, store_path))
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
