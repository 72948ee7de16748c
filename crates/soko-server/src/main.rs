#![forbid(unsafe_code)]

use soko_query::CatalogLimits;
use soko_server::{
    build_router, validate_startup_config_contract, ApiConfig, AppState, ProjectStore, RetryPolicy,
    StoreConfig,
};
use std::env;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("register SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("register SIGINT");
        tokio::select! {
            _ = sigterm.recv() => {}
            _ = sigint.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("SOKO_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let bind_addr = env::var("SOKO_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let db_path = PathBuf::from(env::var("SOKO_DB_PATH").unwrap_or_else(|_| "soko.db".to_string()));

    let store_cfg = StoreConfig {
        db_path,
        max_read_connections: env_usize("SOKO_MAX_READ_CONNECTIONS", 16),
        busy_timeout: env_duration_ms("SOKO_BUSY_TIMEOUT_MS", 5000),
        retry: RetryPolicy {
            max_attempts: env_usize("SOKO_STORE_RETRY_ATTEMPTS", 2),
            base_backoff: env_duration_ms("SOKO_STORE_RETRY_BASE_MS", 80),
        },
    };
    let api_cfg = ApiConfig {
        max_body_bytes: env_usize("SOKO_MAX_BODY_BYTES", 16 * 1024),
        request_timeout: env_duration_ms("SOKO_REQUEST_TIMEOUT_MS", 5000),
        sql_timeout: env_duration_ms("SOKO_SQL_TIMEOUT_MS", 800),
        slow_query_threshold: env_duration_ms("SOKO_SLOW_QUERY_THRESHOLD_MS", 200),
    };
    let limits = CatalogLimits {
        default_page_size: env_usize("SOKO_DEFAULT_PAGE_SIZE", 6),
        max_page_size: env_usize("SOKO_MAX_PAGE_SIZE", 100),
        default_similar: env_usize("SOKO_SIMILAR_DEFAULT_LIMIT", 3),
        max_similar: env_usize("SOKO_SIMILAR_MAX_LIMIT", 12),
        ..CatalogLimits::default()
    };
    validate_startup_config_contract(&api_cfg, &store_cfg, &limits)?;

    let store =
        Arc::new(ProjectStore::open(store_cfg).map_err(|e| format!("store open failed: {e}"))?);
    let state = AppState::with_config(store, api_cfg, limits);
    let app = build_router(state.clone());

    let addr: std::net::SocketAddr = bind_addr
        .parse()
        .map_err(|e| format!("invalid bind addr {bind_addr}: {e}"))?;
    let socket = if addr.is_ipv4() {
        tokio::net::TcpSocket::new_v4().map_err(|e| format!("socket v4 failed: {e}"))?
    } else {
        tokio::net::TcpSocket::new_v6().map_err(|e| format!("socket v6 failed: {e}"))?
    };
    socket
        .set_reuseaddr(true)
        .map_err(|e| format!("set_reuseaddr failed: {e}"))?;
    socket
        .set_keepalive(env_bool("SOKO_TCP_KEEPALIVE_ENABLED", true))
        .map_err(|e| format!("set_keepalive failed: {e}"))?;
    socket.bind(addr).map_err(|e| format!("bind failed: {e}"))?;
    let listener: TcpListener = socket
        .listen(1024)
        .map_err(|e| format!("listen failed: {e}"))?;
    info!("soko-server listening on {bind_addr}");
    let accepting = state.accepting_requests.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            accepting.store(false, Ordering::Relaxed);
            let drain_ms = env_u64("SOKO_SHUTDOWN_DRAIN_MS", 5000);
            tokio::time::sleep(Duration::from_millis(drain_ms)).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
