//! Notes Backend - user-scoped rich-text notes behind JWT auth
//! Mission: Every note reachable by its owner, and only by its owner

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use notes_backend::{
    api::{create_router, AppState},
    clock::SystemClock,
    config::Config,
    db::Database,
};
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "notes-server")]
#[command(about = "Notes API server with JWT authentication")]
struct Args {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<String>,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH")]
    database: Option<String>,

    /// Create the demo account user1/password on startup
    #[arg(long, env = "SEED_DEMO_USER", value_parser = clap::builder::BoolishValueParser::new())]
    seed_demo_user: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let args = Args::parse();
    let mut config = Config::from_env()?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(path) = args.database {
        config.database_path = path;
    }
    if let Some(seed) = args.seed_demo_user {
        config.seed_demo_user = seed;
    }

    info!("🚀 Notes backend starting");
    info!(
        "🔑 Tokens valid for {} minutes",
        config.token.expiration.num_minutes()
    );

    let db = Database::open(&config.database_path)?;
    let state = AppState::new(db, &config, Arc::new(SystemClock));
    state.seed(&config)?;

    let app = create_router(state, &config.cors_allowed_origins);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("🌐 Listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Shutdown signal received");
}

/// Initialize tracing
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notes_backend=debug,notes_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // Also the crate directory, when launched from elsewhere
    let crate_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if crate_env.exists() {
        let _ = dotenv::from_path(&crate_env);
    }
}
