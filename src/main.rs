//! Task Tracker server.
//!
//! Serves per-user task lists behind session-cookie authentication.
//!
//! # Environment Variables
//!
//! - `STORAGE_MODE`, `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`: storage
//!   backend, see `task_tracker::infrastructure::factory`
//! - `SESSION_TTL_SECONDS`: session lifetime (default: two weeks)
//! - `SECURE_COOKIES`: `true` adds the `Secure` attribute to cookies
//! - `RUST_LOG`: tracing filter (default: `task_tracker=debug,tower_http=debug`)
//! - `HOST` / `PORT`: listen address (default: `0.0.0.0:8000`)
//! - `WORKER_THREADS`: tokio worker count, capped at four per logical CPU

use std::env;
use std::fmt::Display;
use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use task_tracker::api::{AppConfig, AppState, create_router};
use task_tracker::infrastructure::{RepositoryConfig, RepositoryFactory};

const DEFAULT_LOG_FILTER: &str = "task_tracker=debug,tower_http=debug";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;

/// Worker count requested through `WORKER_THREADS`.
///
/// Runs before tracing is installed, so problems go to stderr.
fn requested_worker_threads() -> Option<usize> {
    let raw = env::var("WORKER_THREADS").ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let ceiling = std::thread::available_parallelism()
        .map_or(64, |cpus| cpus.get().saturating_mul(4));
    match raw.parse::<usize>() {
        Ok(0) | Err(_) => {
            eprintln!("ignoring WORKER_THREADS={raw:?}: expected a positive integer");
            None
        }
        Ok(count) if count > ceiling => {
            eprintln!("WORKER_THREADS={count} is above {ceiling}; using {ceiling}");
            Some(ceiling)
        }
        Ok(count) => Some(count),
    }
}

fn main() {
    dotenvy::dotenv().ok();

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(count) = requested_worker_threads() {
        runtime.worker_threads(count);
    }

    runtime
        .build()
        .expect("tokio runtime should start")
        .block_on(serve());
}

/// Logs `error` and terminates the process.
fn exit_with(context: &str, error: impl Display) -> ! {
    tracing::error!(%error, "{context}");
    std::process::exit(1);
}

async fn serve() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let storage = RepositoryConfig::from_env()
        .unwrap_or_else(|error| exit_with("invalid storage settings", error));
    let config = AppConfig::from_env()
        .unwrap_or_else(|error| exit_with("invalid application settings", error));
    tracing::info!(
        storage_mode = ?storage.storage_mode,
        page_size = config.page_size,
        session_ttl_seconds = config.session_ttl.num_seconds(),
        secure_cookies = config.secure_cookies,
        "starting task tracker"
    );

    let repositories = RepositoryFactory::new(storage)
        .create()
        .await
        .unwrap_or_else(|error| exit_with("storage backend unavailable", error));

    let router = create_router(AppState::with_config(repositories, config)).layer(
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    );

    let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_owned());
    let port = env::var("PORT")
        .ok()
        .and_then(|raw| raw.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT);
    let address: SocketAddr = format!("{host}:{port}")
        .parse()
        .unwrap_or_else(|error| exit_with("HOST and PORT do not form a socket address", error));

    let listener = TcpListener::bind(address)
        .await
        .unwrap_or_else(|error| exit_with("cannot bind listener", error));
    tracing::info!(%address, "accepting connections");

    if let Err(error) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_requested())
        .await
    {
        exit_with("server stopped unexpectedly", error);
    }
    tracing::info!("shut down cleanly");
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_requested() {
    let interrupt = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let signal_name = tokio::select! {
        () = interrupt => "SIGINT",
        () = terminate => "SIGTERM",
    };
    tracing::info!(signal = signal_name, "draining connections before exit");
}
