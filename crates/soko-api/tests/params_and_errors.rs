use serde_json::json;
use soko_api::params::{
    parse_list_projects_params, parse_similar_limit, parse_similar_limit_with_bounds,
};
use soko_api::{ApiError, ApiErrorCode};
use soko_query::{SortField, SortOrder};
use std::collections::BTreeMap;

fn query(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[test]
fn page_and_page_size_bounds_are_enforced() {
    let err = parse_list_projects_params(&query(&[("page", "0")])).expect_err("page=0");
    assert_eq!(err.code, ApiErrorCode::InvalidQueryParameter);

    let err = parse_list_projects_params(&query(&[("page_size", "0")])).expect_err("page_size=0");
    assert_eq!(err.code, ApiErrorCode::InvalidQueryParameter);

    let err =
        parse_list_projects_params(&query(&[("page_size", "101")])).expect_err("page_size>max");
    assert_eq!(err.code, ApiErrorCode::InvalidQueryParameter);

    let parsed = parse_list_projects_params(&query(&[("page_size", "100")])).expect("max size");
    assert_eq!(parsed.page_size, 100);
}

#[test]
fn filter_values_pass_through_raw() {
    let parsed = parse_list_projects_params(&query(&[
        ("province", "All Provinces"),
        ("sector", "Agriculture"),
        ("budget_range", "2-5M"),
        ("status", "any"),
    ]))
    .expect("params parse");
    // Sentinel and unrecognized-value handling belongs to the engine.
    assert_eq!(parsed.province.as_deref(), Some("All Provinces"));
    assert_eq!(parsed.sector.as_deref(), Some("Agriculture"));
    assert_eq!(parsed.budget_range.as_deref(), Some("2-5M"));
    assert_eq!(parsed.status.as_deref(), Some("any"));
}

#[test]
fn sort_contract_is_strict() {
    let parsed =
        parse_list_projects_params(&query(&[("sort", "budget"), ("order", "asc")])).expect("sort");
    assert_eq!(parsed.sort, SortField::Budget);
    assert_eq!(parsed.order, SortOrder::Asc);

    let err = parse_list_projects_params(&query(&[("sort", "relevance")])).expect_err("bad sort");
    assert_eq!(err.code, ApiErrorCode::InvalidQueryParameter);

    let err = parse_list_projects_params(&query(&[("order", "upward")])).expect_err("bad order");
    assert_eq!(err.code, ApiErrorCode::InvalidQueryParameter);
}

#[test]
fn similar_limit_contract() {
    assert_eq!(parse_similar_limit(&BTreeMap::new()).expect("default"), 3);
    assert_eq!(
        parse_similar_limit(&query(&[("limit", "12")])).expect("max"),
        12
    );
    for raw in ["0", "13", "many"] {
        let err = parse_similar_limit(&query(&[("limit", raw)])).expect_err("bad limit");
        assert_eq!(err.code, ApiErrorCode::InvalidQueryParameter, "limit {raw:?}");
    }
    assert_eq!(
        parse_similar_limit_with_bounds(&BTreeMap::new(), 5, 20).expect("custom default"),
        5
    );
}

#[test]
fn parsing_is_order_independent() {
    let a = parse_list_projects_params(&query(&[
        ("search", "solar"),
        ("province", "Eastern"),
        ("page", "2"),
    ]));
    let b = parse_list_projects_params(&query(&[
        ("page", "2"),
        ("province", "Eastern"),
        ("search", "solar"),
    ]));
    assert_eq!(a.ok(), b.ok());
}

#[test]
fn into_query_request_carries_no_owner() {
    let parsed = parse_list_projects_params(&query(&[("search", "tea")])).expect("params");
    let req = parsed.into_query_request();
    assert_eq!(req.filter.search.as_deref(), Some("tea"));
    assert!(req.filter.owner.is_none());
    assert_eq!(req.page, 1);
    assert_eq!(req.page_size, 6);
}

#[test]
fn error_envelope_serializes_code_as_string() {
    let envelope = json!({"error": ApiError::invalid_param("page", "x")});
    assert_eq!(
        envelope["error"]["code"].as_str(),
        Some("InvalidQueryParameter")
    );
    assert!(envelope["error"]["message"]
        .as_str()
        .expect("message")
        .contains("page"));
    assert!(envelope["error"]["details"].is_object());
}

#[test]
fn error_schema_rejects_unknown_fields() {
    let raw = r#"{"code":"ProjectNotFound","message":"gone","details":{},"extra":1}"#;
    let err = serde_json::from_str::<ApiError>(raw).expect_err("deny unknown fields");
    assert!(err.to_string().contains("unknown field"));
}
