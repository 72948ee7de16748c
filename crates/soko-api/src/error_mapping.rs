// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, ApiErrorCode};

pub const API_ERROR_SCHEMA_REF: &str = "#/components/schemas/ApiError";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiErrorMapping {
    pub status_code: u16,
    pub schema_ref: &'static str,
}

#[must_use]
pub fn map_error(error: &ApiError) -> ApiErrorMapping {
    let status_code = match error.code {
        ApiErrorCode::InvalidQueryParameter | ApiErrorCode::InvalidRequestBody => 400,
        ApiErrorCode::MissingCallerIdentity => 401,
        ApiErrorCode::Forbidden => 403,
        ApiErrorCode::ProjectNotFound => 404,
        ApiErrorCode::Timeout => 504,
        ApiErrorCode::StoreUnavailable | ApiErrorCode::NotReady => 503,
        _ => 500,
    };

    ApiErrorMapping {
        status_code,
        schema_ref: API_ERROR_SCHEMA_REF,
    }
}
