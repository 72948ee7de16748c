use soko_model::{
    canonical_sector, format_timestamp, is_known_sector, parse_project_id, parse_timestamp,
    AccountId, BudgetBand, Category, ProjectId, ProjectStatus, Province, SECTORS,
};

#[test]
fn project_id_rejects_hidden_trimming() {
    assert!(ProjectId::parse("prj-0a1b2c").is_ok());
    assert!(ProjectId::parse(" prj-0a1b2c").is_err());
    assert!(ProjectId::parse("prj-0a1b2c ").is_err());
}

#[test]
fn project_id_charset_and_length_are_strict() {
    assert!(parse_project_id("abcd").is_ok());
    assert!(parse_project_id("abc").is_err());
    assert!(parse_project_id(&"a".repeat(64)).is_ok());
    assert!(parse_project_id(&"a".repeat(65)).is_err());
    assert!(parse_project_id("prj_0a1b").is_err());
    assert!(parse_project_id("prj 0a1b").is_err());
}

#[test]
fn account_id_parses_like_project_id() {
    assert!(AccountId::parse("acct-42xyz").is_ok());
    assert!(AccountId::parse("a!b").is_err());
}

#[test]
fn status_parse_is_case_insensitive_and_closed() {
    assert_eq!(
        ProjectStatus::parse("Active").expect("status"),
        ProjectStatus::Active
    );
    assert_eq!(
        ProjectStatus::parse(" pending ").expect("status"),
        ProjectStatus::Pending
    );
    assert!(ProjectStatus::parse("archived").is_err());
    assert!(ProjectStatus::parse("").is_err());
}

#[test]
fn province_accepts_short_and_long_forms() {
    assert_eq!(Province::parse("Kigali").expect("kigali"), Province::Kigali);
    assert_eq!(
        Province::parse("kigali city").expect("kigali"),
        Province::Kigali
    );
    assert_eq!(
        Province::parse("Northern Province").expect("northern"),
        Province::Northern
    );
    assert!(Province::parse("Oriental").is_err());
}

#[test]
fn province_labels_round_trip_through_parse() {
    for p in Province::ALL {
        assert_eq!(Province::parse(p.label()).expect("label parses"), p);
    }
}

#[test]
fn sector_catalog_is_canonicalizing() {
    assert_eq!(
        canonical_sector("ict & digital services"),
        Some("ICT & Digital Services")
    );
    assert!(is_known_sector("Energy"));
    assert!(!is_known_sector("Agriculture"));
    assert_eq!(SECTORS.len(), 11);
}

#[test]
fn category_parse_accepts_ppp_shorthand() {
    assert_eq!(
        Category::parse("PPP").expect("ppp"),
        Category::PublicPrivatePartnership
    );
    assert_eq!(
        Category::parse("joint venture").expect("jv"),
        Category::JointVenture
    );
    assert!(Category::parse("merger").is_err());
}

#[test]
fn budget_band_boundary_ownership_is_exact() {
    assert_eq!(BudgetBand::classify(0.0).expect("band"), BudgetBand::Under2M);
    assert_eq!(
        BudgetBand::classify(1.999).expect("band"),
        BudgetBand::Under2M
    );
    assert_eq!(
        BudgetBand::classify(2.0).expect("band"),
        BudgetBand::From2MTo5M
    );
    assert_eq!(
        BudgetBand::classify(5.0).expect("band"),
        BudgetBand::From5MTo10M
    );
    assert_eq!(
        BudgetBand::classify(10.0).expect("band"),
        BudgetBand::From5MTo10M
    );
    assert_eq!(
        BudgetBand::classify(10.0001).expect("band"),
        BudgetBand::Over10M
    );
}

#[test]
fn budget_band_rejects_nan_and_negative() {
    assert!(BudgetBand::classify(f64::NAN).is_err());
    assert!(BudgetBand::classify(-0.01).is_err());
}

#[test]
fn budget_band_labels_round_trip() {
    for band in BudgetBand::ALL {
        assert_eq!(BudgetBand::from_label(band.label()), Some(band));
    }
    assert_eq!(BudgetBand::from_label("2–5M"), None);
    assert_eq!(BudgetBand::from_label("all"), None);
}

#[test]
fn budget_band_serde_uses_literal_labels() {
    let json = serde_json::to_string(&BudgetBand::From2MTo5M).expect("serialize");
    assert_eq!(json, "\"2-5M\"");
    let back: BudgetBand = serde_json::from_str("\">10M\"").expect("deserialize");
    assert_eq!(back, BudgetBand::Over10M);
}

#[test]
fn timestamp_format_is_fixed_width_and_sortable() {
    let early = parse_timestamp("2025-01-02T03:04:05.006Z").expect("parse");
    let late = parse_timestamp("2025-11-02T03:04:05.006Z").expect("parse");
    let a = format_timestamp(early);
    let b = format_timestamp(late);
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(parse_timestamp(&a).expect("round trip"), early);
}
