// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers::{
    api_error_response, propagated_request_id, status_for, with_request_id,
};
use crate::*;
use serde_json::json;
use soko_api::dto;
use soko_api::params;

pub(crate) async fn list_projects_handler(
    State(state): State<AppState>,
    Query(raw_params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let parse_map: BTreeMap<String, String> = raw_params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let parsed = params::parse_list_projects_params_with_limits(
            &parse_map,
            state.limits.default_page_size,
            state.limits.max_page_size,
        )?;
        let current_page = parsed.page;
        let page_size = parsed.page_size;
        let req = parsed.into_query_request();
        let rc = open_read(&state, &request_id).await?;
        let (result, elapsed) =
            run_query(&state, &rc, &request_id, "/v1/projects", || {
                soko_query::list_projects(&rc.conn, &req, &state.limits)
            });
        state.metrics.observe_sqlite_query("list_projects", elapsed).await;
        let page = result?;
        Ok::<_, ApiError>(Json(dto::list_response(page, current_page, page_size)).into_response())
    };
    let resp = match timeout(state.api.request_timeout, work).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => api_error_response(status_for(&err), err),
        Err(_) => api_error_response(StatusCode::GATEWAY_TIMEOUT, ApiError::timeout()),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/projects", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn project_detail_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let rc = open_read(&state, &request_id).await?;
        let (result, elapsed) =
            run_query(&state, &rc, &request_id, "/v1/projects/{id}", || {
                soko_query::fetch_project(&rc.conn, &id)
            });
        state.metrics.observe_sqlite_query("project_detail", elapsed).await;
        let record = result?.ok_or_else(|| ApiError::project_not_found(&id))?;
        Ok::<_, ApiError>(Json(dto::ProjectDetailDto::from_record(record)).into_response())
    };
    let resp = match timeout(state.api.request_timeout, work).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => api_error_response(status_for(&err), err),
        Err(_) => api_error_response(StatusCode::GATEWAY_TIMEOUT, ApiError::timeout()),
    };
    let status = resp.status();
    // Reads never wait on the writer; the increment lands in the background.
    if status == StatusCode::OK {
        spawn_view_increment(&state, &id);
    }
    state
        .metrics
        .observe_request("/v1/projects/{id}", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn similar_projects_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(raw_params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let parse_map: BTreeMap<String, String> = raw_params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let limit = params::parse_similar_limit_with_bounds(
            &parse_map,
            state.limits.default_similar,
            state.limits.max_similar,
        )?;
        let rc = open_read(&state, &request_id).await?;
        let (result, elapsed) =
            run_query(&state, &rc, &request_id, "/v1/projects/{id}/similar", || {
                soko_query::similar_projects(&rc.conn, &id, limit, &state.limits)
            });
        state.metrics.observe_sqlite_query("similar_projects", elapsed).await;
        let items = result?;
        let payload = json!({
            "api_version": soko_api::API_VERSION,
            "reference_id": id,
            "items": items,
        });
        Ok::<_, ApiError>(Json(payload).into_response())
    };
    let resp = match timeout(state.api.request_timeout, work).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => api_error_response(status_for(&err), err),
        Err(_) => api_error_response(StatusCode::GATEWAY_TIMEOUT, ApiError::timeout()),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/projects/{id}/similar", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let rc = open_read(&state, &request_id).await?;
        let (result, elapsed) = run_query(&state, &rc, &request_id, "/v1/stats", || {
            soko_query::aggregate_stats(&rc.conn)
        });
        state.metrics.observe_sqlite_query("stats", elapsed).await;
        let stats = result?;
        let payload = json!({
            "api_version": soko_api::API_VERSION,
            "overall": stats.overall,
            "by_sector": stats.by_sector,
            "by_province": stats.by_province,
        });
        Ok::<_, ApiError>(Json(payload).into_response())
    };
    let resp = match timeout(state.api.request_timeout, work).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => api_error_response(status_for(&err), err),
        Err(_) => api_error_response(StatusCode::GATEWAY_TIMEOUT, ApiError::timeout()),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/stats", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn open_read(
    state: &AppState,
    request_id: &str,
) -> Result<crate::store::ReadConnection, ApiError> {
    state.store.read_conn().await.map_err(|e| {
        warn!(request_id = %request_id, error = %e, "store read connection failed");
        ApiError::store_unavailable()
    })
}

/// Runs one engine query under the statement deadline. An error after the
/// deadline passed is the interrupt itself and reports as a timeout rather
/// than a store failure.
pub(crate) fn run_query<T>(
    state: &AppState,
    rc: &crate::store::ReadConnection,
    request_id: &str,
    route: &str,
    query: impl FnOnce() -> Result<T, soko_query::QueryError>,
) -> (Result<T, ApiError>, Duration) {
    let deadline = Instant::now() + state.api.sql_timeout;
    rc.conn
        .progress_handler(1_000, Some(move || Instant::now() > deadline));
    let query_started = Instant::now();
    let result = query();
    let query_elapsed = query_started.elapsed();
    rc.conn.progress_handler(1_000, None::<fn() -> bool>);
    if query_elapsed > state.api.slow_query_threshold {
        warn!(
            request_id = %request_id,
            route = route,
            elapsed_ms = query_elapsed.as_millis() as u64,
            "slow query detected"
        );
    }
    let mapped = result.map_err(|e| {
        if Instant::now() > deadline {
            ApiError::timeout()
        } else {
            ApiError::from_query_error(&e)
        }
    });
    (mapped, query_elapsed)
}

pub(crate) fn spawn_view_increment(state: &AppState, project_id: &str) {
    let store = Arc::clone(&state.store);
    let id = project_id.to_string();
    tokio::spawn(async move {
        match store.record_view(&id).await {
            Ok(true) => {
                store.metrics.view_increments.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(e) => {
                store
                    .metrics
                    .view_increment_failures
                    .fetch_add(1, Ordering::Relaxed);
                warn!(project_id = %id, error = %e, "view increment failed");
            }
        }
    });
}
