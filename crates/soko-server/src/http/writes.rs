// SPDX-License-Identifier: Apache-2.0

use crate::http::handlers::{
    api_error_response, caller_account, propagated_request_id, status_for, with_request_id,
};
use crate::http::projects::{open_read, run_query};
use crate::store::WriteOutcome;
use crate::*;
use serde_json::json;
use soko_api::dto::{self, ProjectDraftDto, ValidatedDraft};
use soko_api::params;

fn parse_draft(body: &Bytes) -> Result<ValidatedDraft, ApiError> {
    let draft: ProjectDraftDto = serde_json::from_slice(body).map_err(|e| {
        ApiError::invalid_body(json!([{"field": "$body", "reason": e.to_string()}]))
    })?;
    dto::validate_draft(&draft)
}

pub(crate) async fn create_project_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let owner = caller_account(&headers)?;
        let draft = parse_draft(&body)?;
        let record = state.store.create_project(draft, owner).await.map_err(|e| {
            warn!(request_id = %request_id, error = %e, "project insert failed");
            ApiError::store_unavailable()
        })?;
        info!(request_id = %request_id, project_id = %record.project_id, "project created");
        let resp = (
            StatusCode::CREATED,
            Json(dto::ProjectDetailDto::from_record(record)),
        )
            .into_response();
        Ok::<_, ApiError>(resp)
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

pub(crate) async fn update_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let caller = caller_account(&headers)?;
        // An id that does not even parse cannot name a stored project.
        let project_id = ProjectId::parse(&id).map_err(|_| ApiError::project_not_found(&id))?;
        let draft = parse_draft(&body)?;
        let outcome = state
            .store
            .update_project(&project_id, draft, &caller)
            .await
            .map_err(|e| {
                warn!(request_id = %request_id, error = %e, "project replace failed");
                ApiError::store_unavailable()
            })?;
        let record = match outcome {
            WriteOutcome::Done(record) => record,
            WriteOutcome::NotFound => return Err(ApiError::project_not_found(&id)),
            WriteOutcome::NotOwner => return Err(ApiError::forbidden(&id)),
        };
        info!(request_id = %request_id, project_id = %record.project_id, "project replaced");
        Ok::<_, ApiError>(Json(dto::ProjectDetailDto::from_record(record)).into_response())
    };
    let resp = match timeout(state.api.request_timeout, work).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => api_error_response(status_for(&err), err),
        Err(_) => api_error_response(StatusCode::GATEWAY_TIMEOUT, ApiError::timeout()),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/projects/{id}", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

pub(crate) async fn delete_project_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let caller = caller_account(&headers)?;
        let project_id = ProjectId::parse(&id).map_err(|_| ApiError::project_not_found(&id))?;
        let outcome = state
            .store
            .delete_project(&project_id, &caller)
            .await
            .map_err(|e| {
                warn!(request_id = %request_id, error = %e, "project delete failed");
                ApiError::store_unavailable()
            })?;
        match outcome {
            WriteOutcome::Done(()) => {}
            WriteOutcome::NotFound => return Err(ApiError::project_not_found(&id)),
            WriteOutcome::NotOwner => return Err(ApiError::forbidden(&id)),
        }
        info!(request_id = %request_id, project_id = %id, "project deleted");
        Ok::<_, ApiError>(StatusCode::NO_CONTENT.into_response())
    };
    let resp = match timeout(state.api.request_timeout, work).await {
        Ok(Ok(resp)) => resp,
        Ok(Err(err)) => api_error_response(status_for(&err), err),
        Err(_) => api_error_response(StatusCode::GATEWAY_TIMEOUT, ApiError::timeout()),
    };
    let status = resp.status();
    state
        .metrics
        .observe_request("/v1/projects/{id}", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}

/// Owner catalog. Same page shape as the public listing, but scoped to the
/// caller and defaulting to every status so drafts stay visible to their
/// author.
pub(crate) async fn my_projects_handler(
    State(state): State<AppState>,
    Query(raw_params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let request_id = propagated_request_id(&headers, &state);
    let work = async {
        let caller = caller_account(&headers)?;
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
        let mut req = parsed.into_query_request();
        req.filter.owner = Some(caller.as_str().to_string());
        if req.filter.status.is_none() {
            req.filter.status = Some("any".to_string());
        }
        let rc = open_read(&state, &request_id).await?;
        let (result, elapsed) = run_query(&state, &rc, &request_id, "/v1/my/projects", || {
            soko_query::list_projects(&rc.conn, &req, &state.limits)
        });
        state.metrics.observe_sqlite_query("my_projects", elapsed).await;
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
        .observe_request("/v1/my/projects", status, started.elapsed())
        .await;
    with_request_id(resp, &request_id)
}
