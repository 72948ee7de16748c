use soko_api::dto::{
    list_response, pagination_for, validate_draft, FilterOptionsDto, ProjectDetailDto,
    ProjectDraftDto,
};
use soko_api::error_mapping::{map_error, API_ERROR_SCHEMA_REF};
use soko_api::{ApiError, ApiErrorCode};
use soko_model::{
    parse_account_id, parse_project_id, parse_timestamp, Category, ProjectRecord, ProjectStatus,
    Province,
};
use soko_query::{CatalogPage, ProjectSummary};

fn draft() -> ProjectDraftDto {
    ProjectDraftDto {
        title: "  Irrigation Expansion  ".to_string(),
        description: "Drip irrigation for 400 hectares".to_string(),
        sector: "agriculture & agro-processing".to_string(),
        location: "Bugesera".to_string(),
        province: "eastern".to_string(),
        budget: 4.5,
        revenue: 1.2,
        jobs: 35,
        profitability: 14.0,
        goal: String::new(),
        technology: String::new(),
        impact: String::new(),
        incentives: String::new(),
        partners: String::new(),
        category: "Expansion".to_string(),
        status: None,
        image_ref: None,
        document_ref: None,
    }
}

fn record() -> ProjectRecord {
    ProjectRecord {
        project_id: parse_project_id("p-irrigation").expect("id"),
        title: "Irrigation Expansion".to_string(),
        description: "Drip irrigation for 400 hectares".to_string(),
        sector: "Agriculture & Agro-processing".to_string(),
        location: "Bugesera".to_string(),
        province: Province::Eastern,
        budget: 7.5,
        revenue: 1.2,
        jobs: 35,
        profitability: 14.0,
        goal: "goal".to_string(),
        technology: "tech".to_string(),
        impact: "impact".to_string(),
        incentives: "incentives".to_string(),
        partners: "partners".to_string(),
        category: Category::Expansion,
        status: ProjectStatus::Active,
        views: 11,
        image_ref: None,
        document_ref: Some("doc-1".to_string()),
        owner_id: parse_account_id("acct-alice").expect("owner"),
        created_at: parse_timestamp("2024-03-01T08:00:00.000Z").expect("created"),
        updated_at: parse_timestamp("2024-03-02T09:30:00.000Z").expect("updated"),
    }
}

#[test]
fn api_error_mapping_is_centralized_and_stable() {
    let cases = [
        (ApiError::invalid_param("page", "x"), 400),
        (ApiError::invalid_body(serde_json::json!([])), 400),
        (ApiError::missing_caller(), 401),
        (ApiError::forbidden("p-1234"), 403),
        (ApiError::project_not_found("p-1234"), 404),
        (ApiError::timeout(), 504),
        (ApiError::store_unavailable(), 503),
        (ApiError::not_ready(), 503),
        (ApiError::internal(), 500),
    ];
    for (err, status) in cases {
        let mapped = map_error(&err);
        assert_eq!(mapped.status_code, status, "code {:?}", err.code);
        assert_eq!(mapped.schema_ref, API_ERROR_SCHEMA_REF);
    }
}

#[test]
fn pagination_math_matches_the_catalog_contract() {
    let first = pagination_for(1, 6, 13);
    assert_eq!(first.total_pages, 3);
    assert!(first.has_next_page);
    assert!(!first.has_prev_page);

    let last = pagination_for(3, 6, 13);
    assert!(!last.has_next_page);
    assert!(last.has_prev_page);

    let exact = pagination_for(1, 6, 12);
    assert_eq!(exact.total_pages, 2);

    let empty = pagination_for(1, 6, 0);
    assert_eq!(empty.total_pages, 0);
    assert!(!empty.has_next_page);
    assert!(!empty.has_prev_page);
}

#[test]
fn filter_options_mirror_the_model_catalogs() {
    let options = FilterOptionsDto::from_catalogs();
    assert_eq!(options.provinces.len(), 5);
    assert!(options.provinces.contains(&"Kigali City".to_string()));
    assert_eq!(options.sectors.len(), 11);
    assert_eq!(options.budget_ranges, vec!["<2M", "2-5M", "5-10M", ">10M"]);
}

#[test]
fn list_response_wraps_page_with_pagination_and_options() {
    let page = CatalogPage {
        items: vec![ProjectSummary {
            project_id: "p-one".to_string(),
            title: "One".to_string(),
            summary: "One description".to_string(),
            sector: "Energy".to_string(),
            location: "Kayonza".to_string(),
            province: "Eastern".to_string(),
            budget: 3.0,
            category: "Startup".to_string(),
            status: "active".to_string(),
            views: 4,
            image_ref: None,
            created_at: "2024-03-01T08:00:00.000Z".to_string(),
        }],
        total_count: 13,
    };
    let response = list_response(page, 2, 6);
    assert_eq!(response.api_version, "v1");
    assert_eq!(response.items.len(), 1);
    assert_eq!(response.pagination.total_projects, 13);
    assert_eq!(response.pagination.current_page, 2);
    assert!(response.pagination.has_prev_page);
    assert_eq!(response.filter_options.budget_ranges.len(), 4);
}

#[test]
fn validate_draft_resolves_taxonomies_and_trims() {
    let validated = validate_draft(&draft()).expect("valid draft");
    assert_eq!(validated.title, "Irrigation Expansion");
    assert_eq!(validated.sector, "Agriculture & Agro-processing");
    assert_eq!(validated.province, Province::Eastern);
    assert_eq!(validated.category, Category::Expansion);
    assert!(validated.status.is_none());
}

#[test]
fn validate_draft_reports_every_offending_field() {
    let mut bad = draft();
    bad.title = "   ".to_string();
    bad.sector = "Cryptocurrency".to_string();
    bad.budget = -1.0;
    bad.status = Some("archived".to_string());

    let err = validate_draft(&bad).expect_err("invalid draft");
    assert_eq!(err.code, ApiErrorCode::InvalidRequestBody);
    let field_errors = err.details["field_errors"].as_array().expect("array");
    assert_eq!(field_errors.len(), 4);
    let fields: Vec<&str> = field_errors
        .iter()
        .map(|e| e["field"].as_str().expect("field"))
        .collect();
    assert_eq!(fields, vec!["title", "sector", "budget", "status"]);
}

#[test]
fn draft_body_rejects_unknown_fields() {
    let raw = r#"{
        "title": "T", "description": "D", "sector": "Energy", "location": "L",
        "province": "Eastern", "budget": 1.0, "category": "Startup", "surprise": true
    }"#;
    let err = serde_json::from_str::<ProjectDraftDto>(raw).expect_err("deny unknown fields");
    assert!(err.to_string().contains("unknown field"));
}

#[test]
fn detail_dto_flattens_labels_and_timestamps() {
    let dto = ProjectDetailDto::from_record(record());
    assert_eq!(dto.province, "Eastern");
    assert_eq!(dto.category, "Expansion");
    assert_eq!(dto.status, "active");
    assert_eq!(dto.budget_range.as_deref(), Some("5-10M"));
    assert_eq!(dto.created_at, "2024-03-01T08:00:00.000Z");
    assert_eq!(dto.updated_at, "2024-03-02T09:30:00.000Z");
    assert_eq!(dto.owner_id, "acct-alice");
    assert_eq!(dto.document_ref.as_deref(), Some("doc-1"));
}
