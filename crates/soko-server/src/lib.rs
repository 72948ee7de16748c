// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use soko_api::error_mapping::map_error;
use soko_api::{ApiError, ApiErrorCode};
use soko_model::{AccountId, ProjectId};
use soko_query::CatalogLimits;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

mod config;
mod http;
mod store;

pub use config::{validate_startup_config_contract, ApiConfig, CONFIG_SCHEMA_VERSION};
pub use store::{
    ProjectStore, ReadConnection, RetryPolicy, StoreConfig, StoreMetrics, WriteOutcome,
};

pub const CRATE_NAME: &str = "soko-server";

#[derive(Debug)]
pub struct StoreError(pub String);

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for StoreError {}

#[derive(Default)]
pub struct RequestMetrics {
    counts: Mutex<HashMap<(String, u16), u64>>,
    latency_ns: Mutex<HashMap<String, Vec<u64>>>,
    sqlite_latency_ns: Mutex<HashMap<String, Vec<u64>>>,
}

impl RequestMetrics {
    pub(crate) async fn observe_request(&self, route: &str, status: StatusCode, latency: Duration) {
        let mut counts = self.counts.lock().await;
        *counts
            .entry((route.to_string(), status.as_u16()))
            .or_insert(0) += 1;
        drop(counts);
        let mut latencies = self.latency_ns.lock().await;
        latencies
            .entry(route.to_string())
            .or_default()
            .push(latency.as_nanos() as u64);
    }

    pub(crate) async fn observe_sqlite_query(&self, query_type: &str, latency: Duration) {
        let mut latencies = self.sqlite_latency_ns.lock().await;
        latencies
            .entry(query_type.to_string())
            .or_default()
            .push(latency.as_nanos() as u64);
    }
}

/// Shared handler state. Cloning is cheap; everything mutable sits behind an
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProjectStore>,
    pub api: ApiConfig,
    pub limits: CatalogLimits,
    pub ready: Arc<AtomicBool>,
    pub accepting_requests: Arc<AtomicBool>,
    pub(crate) metrics: Arc<RequestMetrics>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<ProjectStore>) -> Self {
        Self::with_config(store, ApiConfig::default(), CatalogLimits::default())
    }

    #[must_use]
    pub fn with_config(store: Arc<ProjectStore>, api: ApiConfig, limits: CatalogLimits) -> Self {
        Self {
            store,
            api,
            limits,
            ready: Arc::new(AtomicBool::new(true)),
            accepting_requests: Arc::new(AtomicBool::new(true)),
            metrics: Arc::new(RequestMetrics::default()),
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/v1/version", get(http::handlers::version_handler))
        .route("/v1/openapi.json", get(http::handlers::openapi_handler))
        .route(
            "/v1/projects",
            get(http::projects::list_projects_handler).post(http::writes::create_project_handler),
        )
        .route(
            "/v1/projects/{id}",
            get(http::projects::project_detail_handler)
                .put(http::writes::update_project_handler)
                .delete(http::writes::delete_project_handler),
        )
        .route(
            "/v1/projects/{id}/similar",
            get(http::projects::similar_projects_handler),
        )
        .route("/v1/stats", get(http::projects::stats_handler))
        .route("/v1/my/projects", get(http::writes::my_projects_handler))
        .layer(DefaultBodyLimit::max(state.api.max_body_bytes))
        .with_state(state)
}
