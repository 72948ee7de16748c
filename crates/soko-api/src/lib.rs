#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use soko_query::{QueryError, QueryErrorCode};

pub mod dto;
pub mod error_mapping;
pub mod params;

pub const CRATE_NAME: &str = "soko-api";
pub const API_VERSION: &str = "v1";

#[must_use]
pub fn openapi_v1_spec() -> Value {
    json!({
      "openapi": "3.0.3",
      "info": {
        "title": "soko API",
        "version": "v1"
      },
      "paths": {
        "/healthz": {"get": {"responses": {"200": {"description": "ok"}}}},
        "/readyz": {"get": {"responses": {"200": {"description": "ready"}, "503": {"description": "not ready"}}}},
        "/metrics": {"get": {"responses": {"200": {"description": "prometheus metrics"}}}},
        "/v1/version": {"get": {"responses": {"200": {"description": "build identity"}}}},
        "/v1/projects": {
          "get": {
            "parameters": [
              {"name": "page", "in": "query", "schema": {"type": "integer", "minimum": 1}},
              {"name": "page_size", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 100}},
              {"name": "search", "in": "query", "schema": {"type": "string"}},
              {"name": "province", "in": "query", "schema": {"type": "string"}},
              {"name": "sector", "in": "query", "schema": {"type": "string"}},
              {"name": "budget_range", "in": "query", "schema": {"type": "string"}},
              {"name": "status", "in": "query", "schema": {"type": "string"}},
              {"name": "sort", "in": "query", "schema": {"type": "string", "enum": ["created_at", "updated_at", "budget", "views", "title"]}},
              {"name": "order", "in": "query", "schema": {"type": "string", "enum": ["asc", "desc"]}}
            ],
            "responses": {
              "200": {"description": "catalog page"},
              "400": {"description": "invalid query", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "503": {"description": "store unavailable", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "504": {"description": "timed out", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          },
          "post": {
            "responses": {
              "201": {"description": "created"},
              "400": {"description": "invalid body", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "401": {"description": "missing caller identity", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          }
        },
        "/v1/projects/{id}": {
          "get": {
            "responses": {
              "200": {"description": "project detail"},
              "404": {"description": "unknown project", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          },
          "put": {
            "responses": {
              "200": {"description": "replaced"},
              "403": {"description": "not the owner", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "404": {"description": "unknown project", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          },
          "delete": {
            "responses": {
              "204": {"description": "deleted"},
              "403": {"description": "not the owner", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}},
              "404": {"description": "unknown project", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          }
        },
        "/v1/projects/{id}/similar": {
          "get": {
            "parameters": [
              {"name": "limit", "in": "query", "schema": {"type": "integer", "minimum": 1, "maximum": 12}}
            ],
            "responses": {
              "200": {"description": "ranked related projects"},
              "404": {"description": "unknown reference", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          }
        },
        "/v1/stats": {
          "get": {"responses": {"200": {"description": "catalog aggregates"}}}
        },
        "/v1/my/projects": {
          "get": {
            "responses": {
              "200": {"description": "owner catalog page"},
              "401": {"description": "missing caller identity", "content": {"application/json": {"schema": {"$ref": "#/components/schemas/ApiError"}}}}
            }
          }
        }
      },
      "components": {
        "schemas": {
          "ApiErrorCode": {
            "type": "string",
            "enum": [
              "InvalidQueryParameter",
              "InvalidRequestBody",
              "MissingCallerIdentity",
              "Forbidden",
              "ProjectNotFound",
              "Timeout",
              "StoreUnavailable",
              "NotReady",
              "Internal"
            ]
          },
          "ApiError": {
            "type": "object",
            "required": ["code", "message", "details"],
            "additionalProperties": false,
            "properties": {
              "code": {"$ref": "#/components/schemas/ApiErrorCode"},
              "message": {"type": "string"},
              "details": {"type": "object"}
            }
          }
        }
      }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ApiErrorCode {
    InvalidQueryParameter,
    InvalidRequestBody,
    MissingCallerIdentity,
    Forbidden,
    ProjectNotFound,
    Timeout,
    StoreUnavailable,
    NotReady,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiError {
    pub code: ApiErrorCode,
    pub message: String,
    pub details: Value,
}

impl ApiError {
    #[must_use]
    pub fn invalid_param(name: &str, value: &str) -> Self {
        Self {
            code: ApiErrorCode::InvalidQueryParameter,
            message: format!("invalid query parameter: {name}"),
            details: json!({"parameter": name, "value": value}),
        }
    }

    #[must_use]
    pub fn invalid_body(field_errors: Value) -> Self {
        Self {
            code: ApiErrorCode::InvalidRequestBody,
            message: "invalid request body".to_string(),
            details: json!({"field_errors": field_errors}),
        }
    }

    #[must_use]
    pub fn missing_caller() -> Self {
        Self {
            code: ApiErrorCode::MissingCallerIdentity,
            message: "missing caller identity".to_string(),
            details: json!({"header": "x-account-id"}),
        }
    }

    #[must_use]
    pub fn forbidden(project_id: &str) -> Self {
        Self {
            code: ApiErrorCode::Forbidden,
            message: "caller does not own this project".to_string(),
            details: json!({"project_id": project_id}),
        }
    }

    #[must_use]
    pub fn project_not_found(project_id: &str) -> Self {
        Self {
            code: ApiErrorCode::ProjectNotFound,
            message: format!("project {project_id} not found"),
            details: json!({"project_id": project_id}),
        }
    }

    #[must_use]
    pub fn timeout() -> Self {
        Self {
            code: ApiErrorCode::Timeout,
            message: "request timed out".to_string(),
            details: json!({}),
        }
    }

    #[must_use]
    pub fn store_unavailable() -> Self {
        Self {
            code: ApiErrorCode::StoreUnavailable,
            message: "record store unavailable".to_string(),
            details: json!({}),
        }
    }

    #[must_use]
    pub fn not_ready() -> Self {
        Self {
            code: ApiErrorCode::NotReady,
            message: "service is not ready".to_string(),
            details: json!({}),
        }
    }

    #[must_use]
    pub fn internal() -> Self {
        Self {
            code: ApiErrorCode::Internal,
            message: "internal error".to_string(),
            details: json!({}),
        }
    }

    /// Lift an engine error onto the wire. Validation and not-found
    /// messages echo user input and pass through; store error text stays
    /// in the logs.
    #[must_use]
    pub fn from_query_error(err: &QueryError) -> Self {
        match err.code {
            QueryErrorCode::Validation => Self {
                code: ApiErrorCode::InvalidQueryParameter,
                message: err.message.clone(),
                details: json!({}),
            },
            QueryErrorCode::NotFound => Self {
                code: ApiErrorCode::ProjectNotFound,
                message: err.message.clone(),
                details: json!({}),
            },
            QueryErrorCode::Store => Self::store_unavailable(),
        }
    }
}
