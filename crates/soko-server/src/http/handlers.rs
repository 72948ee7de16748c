#![deny(clippy::redundant_clone)]

use crate::*;
use serde_json::{json, Value};

const METRIC_SUBSYSTEM: &str = "catalog";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) fn api_error_response(status: StatusCode, err: ApiError) -> Response {
    let body = Json(json!({"error": err}));
    (status, body).into_response()
}

pub(crate) fn error_json(code: ApiErrorCode, message: &str, details: Value) -> ApiError {
    ApiError {
        code,
        message: message.to_string(),
        details,
    }
}

pub(crate) fn status_for(err: &ApiError) -> StatusCode {
    StatusCode::from_u16(map_error(err).status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

pub(crate) fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

pub(crate) fn propagated_request_id(headers: &HeaderMap, state: &AppState) -> String {
    if let Some(raw) = headers.get("x-request-id").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    if let Some(raw) = headers.get("traceparent").and_then(|v| v.to_str().ok()) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return format!("trace-{trimmed}");
        }
    }
    make_request_id(state)
}

pub(crate) fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

/// Caller identity for the write surface. Absent and malformed headers both
/// land on the 401 code; the details spell out which one it was.
pub(crate) fn caller_account(headers: &HeaderMap) -> Result<AccountId, ApiError> {
    let raw = headers
        .get("x-account-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .unwrap_or("");
    if raw.is_empty() {
        return Err(ApiError::missing_caller());
    }
    AccountId::parse(raw).map_err(|e| {
        error_json(
            ApiErrorCode::MissingCallerIdentity,
            "x-account-id header is not a valid account id",
            json!({"header": "x-account-id", "reason": e.0}),
        )
    })
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let resp = (StatusCode::OK, "ok").into_response();
    state
        .metrics
        .observe_request("/healthz", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let serving =
        state.ready.load(Ordering::Relaxed) && state.accepting_requests.load(Ordering::Relaxed);
    let (status, body) = if serving {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready")
    };
    let resp = (status, body).into_response();
    state
        .metrics
        .observe_request("/readyz", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn version_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let payload = json!({
        "service": {
            "name": "soko",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "server": {
            "crate": CRATE_NAME,
            "api_version": soko_api::API_VERSION,
            "config_schema_version": crate::config::CONFIG_SCHEMA_VERSION,
        }
    });
    let mut response = Json(payload).into_response();
    if let Ok(value) = HeaderValue::from_str("public, max-age=30") {
        response.headers_mut().insert("cache-control", value);
    }
    state
        .metrics
        .observe_request("/v1/version", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(response, &request_id)
}

pub(crate) async fn openapi_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let response = Json(soko_api::openapi_v1_spec()).into_response();
    state
        .metrics
        .observe_request("/v1/openapi.json", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(response, &request_id)
}

fn percentile_ns(values: &[u64], pct: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut v = values.to_vec();
    v.sort_unstable();
    let idx = ((v.len() as f64 - 1.0) * pct).round() as usize;
    v[idx]
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let request_id = make_request_id(&state);
    let started = Instant::now();
    let store = &state.store.metrics;
    let mut body = format!(
        "soko_store_read_open_retry_total{{subsystem=\"{}\",version=\"{}\"}} {}\n\
soko_store_read_open_failure_total{{subsystem=\"{}\",version=\"{}\"}} {}\n\
soko_view_increment_total{{subsystem=\"{}\",version=\"{}\"}} {}\n\
soko_view_increment_failure_total{{subsystem=\"{}\",version=\"{}\"}} {}\n",
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        store.read_open_retries.load(Ordering::Relaxed),
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        store.read_open_failures.load(Ordering::Relaxed),
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        store.view_increments.load(Ordering::Relaxed),
        METRIC_SUBSYSTEM,
        METRIC_VERSION,
        store.view_increment_failures.load(Ordering::Relaxed),
    );
    let req_counts = state.metrics.counts.lock().await.clone();
    for ((route, status), count) in req_counts {
        body.push_str(&format!(
            "soko_http_requests_total{{subsystem=\"{}\",version=\"{}\",route=\"{}\",status=\"{}\"}} {}\n",
            METRIC_SUBSYSTEM, METRIC_VERSION, route, status, count
        ));
    }
    let req_lat = state.metrics.latency_ns.lock().await.clone();
    for (route, vals) in req_lat {
        body.push_str(&format!(
            "soko_http_request_latency_p95_seconds{{subsystem=\"{}\",version=\"{}\",route=\"{}\"}} {:.6}\n",
            METRIC_SUBSYSTEM,
            METRIC_VERSION,
            route,
            percentile_ns(&vals, 0.95) as f64 / 1_000_000_000.0
        ));
    }
    let sql_lat = state.metrics.sqlite_latency_ns.lock().await.clone();
    for (query_type, vals) in sql_lat {
        body.push_str(&format!(
            "soko_sqlite_query_latency_p95_seconds{{subsystem=\"{}\",version=\"{}\",query_type=\"{}\"}} {:.6}\n",
            METRIC_SUBSYSTEM,
            METRIC_VERSION,
            query_type,
            percentile_ns(&vals, 0.95) as f64 / 1_000_000_000.0
        ));
    }
    let resp = (StatusCode::OK, body).into_response();
    state
        .metrics
        .observe_request("/metrics", StatusCode::OK, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
