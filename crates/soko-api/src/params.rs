use crate::ApiError;
use soko_query::{FilterRequest, ProjectQueryRequest, SortField, SortOrder};
use std::collections::BTreeMap;

pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_SIMILAR_LIMIT: usize = 3;
pub const MAX_SIMILAR_LIMIT: usize = 12;

/// Parsed listing parameters. Filter values stay raw strings here; sentinel
/// and unrecognized-value resolution belongs to the engine's predicate
/// builder so the public and owner listings cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListProjectsParams {
    pub page: usize,
    pub page_size: usize,
    pub search: Option<String>,
    pub province: Option<String>,
    pub sector: Option<String>,
    pub budget_range: Option<String>,
    pub status: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
}

impl ListProjectsParams {
    #[must_use]
    pub fn into_query_request(self) -> ProjectQueryRequest {
        ProjectQueryRequest {
            filter: FilterRequest {
                search: self.search,
                province: self.province,
                sector: self.sector,
                budget_range: self.budget_range,
                status: self.status,
                owner: None,
            },
            page: self.page,
            page_size: self.page_size,
            sort: self.sort,
            order: self.order,
        }
    }
}

pub fn parse_list_projects_params(
    query: &BTreeMap<String, String>,
) -> Result<ListProjectsParams, ApiError> {
    parse_list_projects_params_with_limits(query, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
}

pub fn parse_list_projects_params_with_limits(
    query: &BTreeMap<String, String>,
    default_page_size: usize,
    max_page_size: usize,
) -> Result<ListProjectsParams, ApiError> {
    let page = if let Some(raw) = query.get("page") {
        let value = raw
            .parse::<usize>()
            .map_err(|_| ApiError::invalid_param("page", raw))?;
        if value == 0 {
            return Err(ApiError::invalid_param("page", raw));
        }
        value
    } else {
        1
    };

    let page_size = if let Some(raw) = query.get("page_size") {
        let value = raw
            .parse::<usize>()
            .map_err(|_| ApiError::invalid_param("page_size", raw))?;
        if value == 0 || value > max_page_size {
            return Err(ApiError::invalid_param("page_size", raw));
        }
        value
    } else {
        default_page_size
    };

    let sort = if let Some(raw) = query.get("sort") {
        SortField::parse(raw).map_err(|_| ApiError::invalid_param("sort", raw))?
    } else {
        SortField::default()
    };

    let order = if let Some(raw) = query.get("order") {
        SortOrder::parse(raw).map_err(|_| ApiError::invalid_param("order", raw))?
    } else {
        SortOrder::default()
    };

    Ok(ListProjectsParams {
        page,
        page_size,
        search: query.get("search").cloned(),
        province: query.get("province").cloned(),
        sector: query.get("sector").cloned(),
        budget_range: query.get("budget_range").cloned(),
        status: query.get("status").cloned(),
        sort,
        order,
    })
}

pub fn parse_similar_limit(query: &BTreeMap<String, String>) -> Result<usize, ApiError> {
    parse_similar_limit_with_bounds(query, DEFAULT_SIMILAR_LIMIT, MAX_SIMILAR_LIMIT)
}

pub fn parse_similar_limit_with_bounds(
    query: &BTreeMap<String, String>,
    default_limit: usize,
    max_limit: usize,
) -> Result<usize, ApiError> {
    let Some(raw) = query.get("limit") else {
        return Ok(default_limit);
    };
    let value = raw
        .parse::<usize>()
        .map_err(|_| ApiError::invalid_param("limit", raw))?;
    if value == 0 || value > max_limit {
        return Err(ApiError::invalid_param("limit", raw));
    }
    Ok(value)
}
