#![forbid(unsafe_code)]
//! Soko domain model SSOT.
//!
//! Every fixed enumeration the marketplace advertises (provinces, sectors,
//! categories, budget bands, statuses) is defined exactly once here and
//! consumed by both the predicate builder and the filter-options response,
//! so the accepted values and the offered choices cannot diverge.

mod budget;
mod project;
mod taxonomy;

pub use budget::BudgetBand;
pub use project::{
    format_timestamp, parse_account_id, parse_project_id, parse_timestamp, AccountId, ProjectId,
    ProjectRecord, ProjectStatus, ValidationError, ID_MAX_LEN, ID_MIN_LEN,
};
pub use taxonomy::{canonical_sector, is_known_sector, Category, Province, SECTORS};

pub const CRATE_NAME: &str = "soko-model";
