//! Customer service binary.
//!
//! Serves the customer resource API on `CUSTOMER_HOST:CUSTOMER_PORT`.
//!
//! # Startup
//!
//! 1. Load configuration and initialize Sentry and tracing
//! 2. Connect the configured document store
//! 3. Ensure the username search index exists (fatal on failure)
//! 4. Serve until Ctrl+C or SIGTERM, then drain in-flight requests
//!
//! # Security
//!
//! Bearer tokens are verified by the gateway in front of this binary. It
//! trusts the `x-auth-*` headers and must not be exposed directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

use customer_service::config::{ConfigError, ServiceConfig};
use customer_service::db::{self, StoreError};
use customer_service::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Errors that abort startup.
#[derive(Debug, Error)]
enum StartupError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("document store unusable: {0}")]
    Store(#[from] StoreError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServiceConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "customer_service=info,tower_http=debug".into());

    // JSON lines for log shippers, text otherwise
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    let json_layer = json.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            report_before_tracing(&StartupError::from(e));
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(&config).await {
        tracing::error!(error = %e, "customer-service failed");
        // process::exit skips destructors; flush Sentry first.
        drop(sentry_guard);
        std::process::exit(1);
    }
}

#[allow(clippy::print_stderr)]
fn report_before_tracing(e: &StartupError) {
    eprintln!("customer-service: {e}");
}

async fn run(config: &ServiceConfig) -> Result<(), StartupError> {
    let store = db::connect(&config.store)?;

    let status = db::ensure_username_index(store.as_ref()).await?;
    tracing::info!(?status, "Username index ready");

    let addr = config.socket_addr();
    let app = customer_service::app(AppState::new(config, store));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("customer-service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
