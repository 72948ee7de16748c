// SPDX-License-Identifier: Apache-2.0

use crate::{ApiError, API_VERSION};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use soko_model::{
    canonical_sector, format_timestamp, BudgetBand, Category, ProjectRecord, ProjectStatus,
    Province, SECTORS,
};
use soko_query::{CatalogPage, ProjectSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationDto {
    pub current_page: usize,
    pub total_pages: u64,
    pub total_projects: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[must_use]
pub fn pagination_for(page: usize, page_size: usize, total_projects: u64) -> PaginationDto {
    let total_pages = if page_size == 0 {
        0
    } else {
        total_projects.div_ceil(page_size as u64)
    };
    PaginationDto {
        current_page: page,
        total_pages,
        total_projects,
        has_next_page: (page as u64) < total_pages,
        has_prev_page: page > 1,
    }
}

/// The choices the UI may offer. Rendered straight from the model catalogs
/// so offered choices and accepted filter values cannot diverge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterOptionsDto {
    pub provinces: Vec<String>,
    pub sectors: Vec<String>,
    pub budget_ranges: Vec<String>,
}

impl FilterOptionsDto {
    #[must_use]
    pub fn from_catalogs() -> Self {
        Self {
            provinces: Province::ALL.iter().map(|p| p.label().to_string()).collect(),
            sectors: SECTORS.iter().map(|s| (*s).to_string()).collect(),
            budget_ranges: BudgetBand::ALL.iter().map(|b| b.label().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectListResponseDto {
    pub api_version: String,
    pub items: Vec<ProjectSummary>,
    pub pagination: PaginationDto,
    pub filter_options: FilterOptionsDto,
}

#[must_use]
pub fn list_response(page: CatalogPage, current_page: usize, page_size: usize) -> ProjectListResponseDto {
    ProjectListResponseDto {
        api_version: API_VERSION.to_string(),
        pagination: pagination_for(current_page, page_size, page.total_count),
        items: page.items,
        filter_options: FilterOptionsDto::from_catalogs(),
    }
}

/// Wire shape of the full record: taxonomy enums flattened to their labels,
/// timestamps to the canonical fixed-width text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDetailDto {
    pub project_id: String,
    pub title: String,
    pub description: String,
    pub sector: String,
    pub location: String,
    pub province: String,
    pub budget: f64,
    pub budget_range: Option<String>,
    pub revenue: f64,
    pub jobs: u64,
    pub profitability: f64,
    pub goal: String,
    pub technology: String,
    pub impact: String,
    pub incentives: String,
    pub partners: String,
    pub category: String,
    pub status: String,
    pub views: u64,
    pub image_ref: Option<String>,
    pub document_ref: Option<String>,
    pub owner_id: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ProjectDetailDto {
    #[must_use]
    pub fn from_record(record: ProjectRecord) -> Self {
        let budget_range = BudgetBand::classify(record.budget)
            .ok()
            .map(|band| band.label().to_string());
        Self {
            project_id: record.project_id.as_str().to_string(),
            title: record.title,
            description: record.description,
            sector: record.sector,
            location: record.location,
            province: record.province.label().to_string(),
            budget: record.budget,
            budget_range,
            revenue: record.revenue,
            jobs: record.jobs,
            profitability: record.profitability,
            goal: record.goal,
            technology: record.technology,
            impact: record.impact,
            incentives: record.incentives,
            partners: record.partners,
            category: record.category.label().to_string(),
            status: record.status.as_str().to_string(),
            views: record.views,
            image_ref: record.image_ref,
            document_ref: record.document_ref,
            owner_id: record.owner_id.as_str().to_string(),
            created_at: format_timestamp(record.created_at),
            updated_at: format_timestamp(record.updated_at),
        }
    }
}

/// Caller-supplied project body for create and full-replace update. Core
/// marketplace fields are required; narrative fields default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectDraftDto {
    pub title: String,
    pub description: String,
    pub sector: String,
    pub location: String,
    pub province: String,
    pub budget: f64,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub jobs: u64,
    #[serde(default)]
    pub profitability: f64,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub technology: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub incentives: String,
    #[serde(default)]
    pub partners: String,
    pub category: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub image_ref: Option<String>,
    #[serde(default)]
    pub document_ref: Option<String>,
}

/// Draft after validation: taxonomy fields resolved to their typed forms,
/// free text trimmed. Only the store layer turns this into a record.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub title: String,
    pub description: String,
    pub sector: &'static str,
    pub location: String,
    pub province: Province,
    pub budget: f64,
    pub revenue: f64,
    pub jobs: u64,
    pub profitability: f64,
    pub goal: String,
    pub technology: String,
    pub impact: String,
    pub incentives: String,
    pub partners: String,
    pub category: Category,
    pub status: Option<ProjectStatus>,
    pub image_ref: Option<String>,
    pub document_ref: Option<String>,
}

/// Validate a draft in full, reporting every offending field at once.
pub fn validate_draft(draft: &ProjectDraftDto) -> Result<ValidatedDraft, ApiError> {
    let mut field_errors: Vec<Value> = Vec::new();

    let title = draft.title.trim();
    if title.is_empty() {
        field_errors.push(json!({"field": "title", "reason": "must be non-empty"}));
    }
    let description = draft.description.trim();
    if description.is_empty() {
        field_errors.push(json!({"field": "description", "reason": "must be non-empty"}));
    }
    let location = draft.location.trim();
    if location.is_empty() {
        field_errors.push(json!({"field": "location", "reason": "must be non-empty"}));
    }

    let sector = canonical_sector(&draft.sector);
    if sector.is_none() {
        field_errors.push(json!({"field": "sector", "reason": "unknown sector", "value": draft.sector}));
    }
    let province = Province::parse(&draft.province);
    if province.is_err() {
        field_errors.push(json!({"field": "province", "reason": "unknown province", "value": draft.province}));
    }
    let category = Category::parse(&draft.category);
    if category.is_err() {
        field_errors.push(json!({"field": "category", "reason": "unknown category", "value": draft.category}));
    }
    if let Err(e) = BudgetBand::classify(draft.budget) {
        field_errors.push(json!({"field": "budget", "reason": e.0}));
    }
    if !draft.revenue.is_finite() || draft.revenue < 0.0 {
        field_errors.push(json!({"field": "revenue", "reason": "must be finite and non-negative"}));
    }
    if !draft.profitability.is_finite() {
        field_errors.push(json!({"field": "profitability", "reason": "must be finite"}));
    }
    let status = match draft.status.as_deref() {
        None => Ok(None),
        Some(raw) => ProjectStatus::parse(raw).map(Some),
    };
    if status.is_err() {
        field_errors.push(json!({"field": "status", "reason": "unknown status"}));
    }

    if !field_errors.is_empty() {
        return Err(ApiError::invalid_body(json!(field_errors)));
    }
    let (Some(sector), Ok(province), Ok(category), Ok(status)) =
        (sector, province, category, status)
    else {
        return Err(ApiError::internal());
    };

    Ok(ValidatedDraft {
        title: title.to_string(),
        description: description.to_string(),
        sector,
        location: location.to_string(),
        province,
        budget: draft.budget,
        revenue: draft.revenue,
        jobs: draft.jobs,
        profitability: draft.profitability,
        goal: draft.goal.trim().to_string(),
        technology: draft.technology.trim().to_string(),
        impact: draft.impact.trim().to_string(),
        incentives: draft.incentives.trim().to_string(),
        partners: draft.partners.trim().to_string(),
        category,
        status,
        image_ref: draft.image_ref.clone(),
        document_ref: draft.document_ref.clone(),
    })
}
