#![forbid(unsafe_code)]

use rusqlite::{params_from_iter, types::Value, Connection};
use serde::{Deserialize, Serialize};
use soko_model::{
    parse_timestamp, AccountId, BudgetBand, Category, ProjectId, ProjectRecord, ProjectStatus,
    Province, ValidationError,
};

pub const CRATE_NAME: &str = "soko-query";

/// Raw filter input as it arrives from the caller. Every field is optional;
/// resolution into typed constraints (including sentinel and unrecognized
/// value handling) happens in [`build_predicate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterRequest {
    pub search: Option<String>,
    pub province: Option<String>,
    pub sector: Option<String>,
    pub budget_range: Option<String>,
    pub status: Option<String>,
    pub owner: Option<String>,
}

/// Resolved constraint set. All present constraints AND-combine; the search
/// constraint is itself an OR-group over the searchable text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub search: Option<String>,
    pub province: Option<Province>,
    pub sector: Option<String>,
    pub budget: Option<BudgetBand>,
    pub status: Option<ProjectStatus>,
    pub owner: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Budget,
    Views,
    Title,
}

impl SortField {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "created_at" => Ok(SortField::CreatedAt),
            "updated_at" => Ok(SortField::UpdatedAt),
            "budget" => Ok(SortField::Budget),
            "views" => Ok(SortField::Views),
            "title" => Ok(SortField::Title),
            other => Err(QueryError::validation(format!(
                "unknown sort field {other:?}; expected created_at|updated_at|budget|views|title"
            ))),
        }
    }

    fn column(self) -> &'static str {
        match self {
            SortField::CreatedAt => "p.created_at",
            SortField::UpdatedAt => "p.updated_at",
            SortField::Budget => "p.budget",
            SortField::Views => "p.views",
            SortField::Title => "p.title",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(QueryError::validation(format!(
                "unknown sort order {other:?}; expected asc|desc"
            ))),
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectQueryRequest {
    pub filter: FilterRequest,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
    pub sort: SortField,
    pub order: SortOrder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogLimits {
    pub max_page_size: usize,
    pub default_page_size: usize,
    pub max_search_len: usize,
    pub default_similar: usize,
    pub max_similar: usize,
    pub summary_preview_len: usize,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            default_page_size: 6,
            max_search_len: 120,
            default_similar: 3,
            max_similar: 12,
            summary_preview_len: 280,
        }
    }
}

/// Listing projection of a project record. Narrative free-text fields are
/// absent and the description is cut to a fixed preview prefix; callers
/// needing the full record must use [`fetch_project`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectSummary {
    pub project_id: String,
    pub title: String,
    pub summary: String,
    pub sector: String,
    pub location: String,
    pub province: String,
    pub budget: f64,
    pub category: String,
    pub status: String,
    pub views: u64,
    pub image_ref: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<ProjectSummary>,
    pub total_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OverallStats {
    pub project_count: u64,
    pub total_budget: f64,
    pub total_jobs: u64,
    pub total_revenue: f64,
    pub average_profitability: f64,
    pub total_views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupStat {
    pub key: String,
    pub project_count: u64,
    pub total_budget: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogStats {
    pub overall: OverallStats,
    pub by_sector: Vec<GroupStat>,
    pub by_province: Vec<GroupStat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryErrorCode {
    Validation,
    NotFound,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    pub code: QueryErrorCode,
    pub message: String,
}

impl QueryError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::Validation,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::NotFound,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self {
            code: QueryErrorCode::Store,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}
impl std::error::Error for QueryError {}

impl From<rusqlite::Error> for QueryError {
    fn from(e: rusqlite::Error) -> Self {
        QueryError::store(e.to_string())
    }
}

/// Resolve a raw filter into typed constraints.
///
/// Sentinels (`all`, `all provinces`, `all sectors`) and unrecognized
/// province or budget labels become "no constraint", with one exception:
/// an invalid `status` is a validation error, because status gates which
/// records are discoverable at all.
pub fn build_predicate(filter: &FilterRequest) -> Result<Predicate, QueryError> {
    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    let province = match filter.province.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) if is_all_sentinel(raw) => None,
        Some(raw) => Province::parse(raw).ok(),
    };

    let sector = match filter.sector.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) if is_all_sentinel(raw) => None,
        Some(raw) => Some(raw.to_string()),
    };

    let budget = filter
        .budget_range
        .as_deref()
        .map(str::trim)
        .and_then(BudgetBand::from_label);

    let status = match filter.status.as_deref().map(str::trim) {
        None | Some("") => Some(ProjectStatus::Active),
        Some(raw) if raw.eq_ignore_ascii_case("any") => None,
        Some(raw) => Some(ProjectStatus::parse(raw).map_err(|e| QueryError::validation(e.0))?),
    };

    let owner = filter
        .owner
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(Predicate {
        search,
        province,
        sector,
        budget,
        status,
        owner,
    })
}

fn is_all_sentinel(raw: &str) -> bool {
    let lowered = raw.to_ascii_lowercase();
    lowered == "all" || lowered.starts_with("all ")
}

const SUMMARY_COLUMNS: &str = "p.project_id, p.title, p.description, p.sector, p.location, \
     p.province, p.budget, p.category, p.status, p.views, p.image_ref, p.created_at";

const DETAIL_COLUMNS: &str = "p.project_id, p.title, p.description, p.sector, p.location, \
     p.province, p.budget, p.revenue, p.jobs, p.profitability, p.goal, p.technology, p.impact, \
     p.incentives, p.partners, p.category, p.status, p.views, p.image_ref, p.document_ref, \
     p.owner_id, p.created_at, p.updated_at";

/// Catalog listing: predicate, sort, page, projection plus the total match
/// count.
///
/// Items and `total_count` come from two queries with no cross-query
/// transaction; under a concurrent write the count may include or exclude a
/// record the items query raced with. Accepted trade-off, not a defect.
pub fn list_projects(
    conn: &Connection,
    req: &ProjectQueryRequest,
    limits: &CatalogLimits,
) -> Result<CatalogPage, QueryError> {
    validate_request(req, limits)?;
    let predicate = build_predicate(&req.filter)?;
    let (where_parts, params) = build_where(&predicate);

    let offset = req
        .page
        .checked_sub(1)
        .and_then(|p| p.checked_mul(req.page_size))
        .and_then(|o| i64::try_from(o).ok())
        .ok_or_else(|| QueryError::validation("page is out of range"))?;

    let mut sql = format!("SELECT {SUMMARY_COLUMNS} FROM projects p");
    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" AND "));
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(req.sort.column());
    sql.push(' ');
    sql.push_str(req.order.keyword());
    sql.push_str(", p.project_id ASC LIMIT ? OFFSET ?");

    let mut page_params = params.clone();
    page_params.push(Value::Integer(req.page_size as i64));
    page_params.push(Value::Integer(offset));

    let preview_len = limits.summary_preview_len;
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(page_params.iter()), |row| {
            summary_from_row(row, preview_len)
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let total_count = count_where(conn, &where_parts, &params)?;
    Ok(CatalogPage { items, total_count })
}

/// Count of all records matching the filter, ignoring pagination.
pub fn count_projects(conn: &Connection, filter: &FilterRequest) -> Result<u64, QueryError> {
    let predicate = build_predicate(filter)?;
    let (where_parts, params) = build_where(&predicate);
    count_where(conn, &where_parts, &params)
}

/// Full record by identifier, any status. `Ok(None)` when absent.
pub fn fetch_project(
    conn: &Connection,
    project_id: &str,
) -> Result<Option<ProjectRecord>, QueryError> {
    let sql = format!("SELECT {DETAIL_COLUMNS} FROM projects p WHERE p.project_id = ?1");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map([project_id], raw_record_from_row)?;
    match rows.next() {
        None => Ok(None),
        Some(raw) => Ok(Some(record_from_raw(raw?)?)),
    }
}

/// Bounded related-project selection: coarse categorical overlap, ranked
/// by social proof then recency.
///
/// The reference resolves against all statuses; candidates are active only,
/// exclude the reference itself, and must share sector, province or
/// category with it. Order: views DESC, created_at DESC, project_id ASC.
pub fn similar_projects(
    conn: &Connection,
    reference_id: &str,
    limit: usize,
    limits: &CatalogLimits,
) -> Result<Vec<ProjectSummary>, QueryError> {
    if limit == 0 || limit > limits.max_similar {
        return Err(QueryError::validation(format!(
            "similar limit must be between 1 and {}",
            limits.max_similar
        )));
    }
    let reference = fetch_project(conn, reference_id)?
        .ok_or_else(|| QueryError::not_found(format!("project {reference_id} not found")))?;

    let sql = format!(
        "SELECT {SUMMARY_COLUMNS} FROM projects p \
         WHERE p.status = ? AND p.project_id != ? \
         AND (p.sector = ? OR p.province = ? OR p.category = ?) \
         ORDER BY p.views DESC, p.created_at DESC, p.project_id ASC LIMIT ?"
    );
    let params: Vec<Value> = vec![
        Value::Text(ProjectStatus::Active.as_str().to_string()),
        Value::Text(reference.project_id.as_str().to_string()),
        Value::Text(reference.sector.clone()),
        Value::Text(reference.province.label().to_string()),
        Value::Text(reference.category.label().to_string()),
        Value::Integer(limit as i64),
    ];

    let preview_len = limits.summary_preview_len;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            summary_from_row(row, preview_len)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Dashboard rollups over the active record set. Zero active records yield
/// all-zero numerics, never an error.
pub fn aggregate_stats(conn: &Connection) -> Result<CatalogStats, QueryError> {
    let overall = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(budget), 0.0), COALESCE(SUM(jobs), 0), \
         COALESCE(SUM(revenue), 0.0), COALESCE(AVG(profitability), 0.0), \
         COALESCE(SUM(views), 0) FROM projects WHERE status = 'active'",
        [],
        |row| {
            Ok(OverallStats {
                project_count: row.get::<_, i64>(0)?.max(0) as u64,
                total_budget: row.get(1)?,
                total_jobs: row.get::<_, i64>(2)?.max(0) as u64,
                total_revenue: row.get(3)?,
                average_profitability: row.get(4)?,
                total_views: row.get::<_, i64>(5)?.max(0) as u64,
            })
        },
    )?;
    let by_sector = grouped_stats(conn, GroupKey::Sector)?;
    let by_province = grouped_stats(conn, GroupKey::Province)?;
    Ok(CatalogStats {
        overall,
        by_sector,
        by_province,
    })
}

#[derive(Debug, Clone, Copy)]
enum GroupKey {
    Sector,
    Province,
}

impl GroupKey {
    fn column(self) -> &'static str {
        match self {
            GroupKey::Sector => "sector",
            GroupKey::Province => "province",
        }
    }
}

fn grouped_stats(conn: &Connection, key: GroupKey) -> Result<Vec<GroupStat>, QueryError> {
    let column = key.column();
    let sql = format!(
        "SELECT {column}, COUNT(*), COALESCE(SUM(budget), 0.0) FROM projects \
         WHERE status = 'active' GROUP BY {column} \
         ORDER BY COUNT(*) DESC, {column} ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(GroupStat {
                key: row.get(0)?,
                project_count: row.get::<_, i64>(1)?.max(0) as u64,
                total_budget: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One logical view. Relies on the store's atomic in-place increment; the
/// count never decreases and never leaves the numeric domain. Returns
/// whether a row was hit.
pub fn record_view(conn: &Connection, project_id: &str) -> Result<bool, QueryError> {
    let updated = conn.execute(
        "UPDATE projects SET views = views + 1 WHERE project_id = ?1",
        [project_id],
    )?;
    Ok(updated > 0)
}

fn validate_request(req: &ProjectQueryRequest, limits: &CatalogLimits) -> Result<(), QueryError> {
    if req.page < 1 {
        return Err(QueryError::validation("page is 1-based and must be >= 1"));
    }
    if req.page_size == 0 || req.page_size > limits.max_page_size {
        return Err(QueryError::validation(format!(
            "page_size must be between 1 and {}",
            limits.max_page_size
        )));
    }
    if let Some(search) = &req.filter.search {
        if search.trim().chars().count() > limits.max_search_len {
            return Err(QueryError::validation(format!(
                "search length exceeds {}",
                limits.max_search_len
            )));
        }
    }
    Ok(())
}

fn build_where(p: &Predicate) -> (Vec<String>, Vec<Value>) {
    let mut where_parts: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();

    if let Some(status) = p.status {
        where_parts.push("p.status = ?".to_string());
        params.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(needle) = &p.search {
        where_parts.push(
            "(LOWER(p.title) LIKE ? ESCAPE '!' OR LOWER(p.description) LIKE ? ESCAPE '!' \
             OR LOWER(p.location) LIKE ? ESCAPE '!' OR LOWER(p.sector) LIKE ? ESCAPE '!' \
             OR LOWER(p.province) LIKE ? ESCAPE '!')"
                .to_string(),
        );
        let pattern = like_pattern(needle);
        for _ in 0..5 {
            params.push(Value::Text(pattern.clone()));
        }
    }
    if let Some(province) = p.province {
        where_parts.push("p.province = ?".to_string());
        params.push(Value::Text(province.label().to_string()));
    }
    if let Some(sector) = &p.sector {
        where_parts.push("LOWER(p.sector) LIKE ? ESCAPE '!'".to_string());
        params.push(Value::Text(like_pattern(sector)));
    }
    if let Some(band) = p.budget {
        let (sql, bounds) = budget_range_sql(band);
        where_parts.push(sql.to_string());
        for bound in bounds {
            params.push(Value::Real(bound));
        }
    }
    if let Some(owner) = &p.owner {
        where_parts.push("p.owner_id = ?".to_string());
        params.push(Value::Text(owner.clone()));
    }

    (where_parts, params)
}

// Comparators must agree with BudgetBand::classify boundary ownership:
// 2 belongs to 2-5M, 5 and 10 belong to 5-10M.
fn budget_range_sql(band: BudgetBand) -> (&'static str, Vec<f64>) {
    match band {
        BudgetBand::Under2M => ("p.budget < ?", vec![2.0]),
        BudgetBand::From2MTo5M => ("p.budget >= ? AND p.budget < ?", vec![2.0, 5.0]),
        BudgetBand::From5MTo10M => ("p.budget >= ? AND p.budget <= ?", vec![5.0, 10.0]),
        BudgetBand::Over10M => ("p.budget > ?", vec![10.0]),
    }
}

fn count_where(
    conn: &Connection,
    where_parts: &[String],
    params: &[Value],
) -> Result<u64, QueryError> {
    let mut sql = String::from("SELECT COUNT(*) FROM projects p");
    if !where_parts.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_parts.join(" AND "));
    }
    let count: i64 = conn.query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

fn like_pattern(needle: &str) -> String {
    format!("%{}%", escape_like(&needle.to_ascii_lowercase()))
}

// SQLite LOWER() folds ASCII only, so the needle is folded the same way.
fn escape_like(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        match c {
            '!' | '%' | '_' => {
                out.push('!');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn summary_from_row(row: &rusqlite::Row<'_>, preview_len: usize) -> rusqlite::Result<ProjectSummary> {
    let description: String = row.get(2)?;
    Ok(ProjectSummary {
        project_id: row.get(0)?,
        title: row.get(1)?,
        summary: preview(&description, preview_len),
        sector: row.get(3)?,
        location: row.get(4)?,
        province: row.get(5)?,
        budget: row.get(6)?,
        category: row.get(7)?,
        status: row.get(8)?,
        views: row.get::<_, i64>(9)?.max(0) as u64,
        image_ref: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

struct RawRecordRow {
    project_id: String,
    title: String,
    description: String,
    sector: String,
    location: String,
    province: String,
    budget: f64,
    revenue: f64,
    jobs: i64,
    profitability: f64,
    goal: String,
    technology: String,
    impact: String,
    incentives: String,
    partners: String,
    category: String,
    status: String,
    views: i64,
    image_ref: Option<String>,
    document_ref: Option<String>,
    owner_id: String,
    created_at: String,
    updated_at: String,
}

fn raw_record_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecordRow> {
    Ok(RawRecordRow {
        project_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        sector: row.get(3)?,
        location: row.get(4)?,
        province: row.get(5)?,
        budget: row.get(6)?,
        revenue: row.get(7)?,
        jobs: row.get(8)?,
        profitability: row.get(9)?,
        goal: row.get(10)?,
        technology: row.get(11)?,
        impact: row.get(12)?,
        incentives: row.get(13)?,
        partners: row.get(14)?,
        category: row.get(15)?,
        status: row.get(16)?,
        views: row.get(17)?,
        image_ref: row.get(18)?,
        document_ref: row.get(19)?,
        owner_id: row.get(20)?,
        created_at: row.get(21)?,
        updated_at: row.get(22)?,
    })
}

fn record_from_raw(raw: RawRecordRow) -> Result<ProjectRecord, QueryError> {
    Ok(ProjectRecord {
        project_id: ProjectId::parse(&raw.project_id).map_err(corrupt_row)?,
        title: raw.title,
        description: raw.description,
        sector: raw.sector,
        location: raw.location,
        province: Province::parse(&raw.province).map_err(corrupt_row)?,
        budget: raw.budget,
        revenue: raw.revenue,
        jobs: raw.jobs.max(0) as u64,
        profitability: raw.profitability,
        goal: raw.goal,
        technology: raw.technology,
        impact: raw.impact,
        incentives: raw.incentives,
        partners: raw.partners,
        category: Category::parse(&raw.category).map_err(corrupt_row)?,
        status: ProjectStatus::parse(&raw.status).map_err(corrupt_row)?,
        views: raw.views.max(0) as u64,
        image_ref: raw.image_ref,
        document_ref: raw.document_ref,
        owner_id: AccountId::parse(&raw.owner_id).map_err(corrupt_row)?,
        created_at: parse_timestamp(&raw.created_at).map_err(corrupt_row)?,
        updated_at: parse_timestamp(&raw.updated_at).map_err(corrupt_row)?,
    })
}

fn corrupt_row(e: ValidationError) -> QueryError {
    QueryError::store(format!("corrupt project row: {e}"))
}
