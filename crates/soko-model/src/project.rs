use crate::taxonomy::{Category, Province};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

pub const ID_MIN_LEN: usize = 4;
pub const ID_MAX_LEN: usize = 64;

pub fn parse_project_id(input: &str) -> Result<ProjectId, ValidationError> {
    ProjectId::parse(input)
}

pub fn parse_account_id(input: &str) -> Result<AccountId, ValidationError> {
    AccountId::parse(input)
}

fn check_id_charset(kind: &str, s: &str) -> Result<(), ValidationError> {
    if s.len() < ID_MIN_LEN {
        return Err(ValidationError(format!(
            "{kind} must be at least {ID_MIN_LEN} characters"
        )));
    }
    if s.len() > ID_MAX_LEN {
        return Err(ValidationError(format!(
            "{kind} exceeds max length {ID_MAX_LEN}"
        )));
    }
    if s != s.trim() {
        return Err(ValidationError(format!(
            "{kind} must not carry leading or trailing whitespace"
        )));
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ValidationError(format!(
            "{kind} must be ASCII alphanumeric or '-'"
        )));
    }
    Ok(())
}

/// Opaque, stable identifier of a project record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
#[non_exhaustive]
pub struct ProjectId(String);

impl ProjectId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        check_id_charset("project id", input)?;
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Weak reference to the owning account. The account itself lives in the
/// external auth service; this is relation plus lookup, never ownership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[non_exhaustive]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        check_id_charset("account id", input)?;
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
    Active,
    Inactive,
    Pending,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::Active,
        ProjectStatus::Inactive,
        ProjectStatus::Pending,
    ];

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ProjectStatus::Active),
            "inactive" => Ok(ProjectStatus::Inactive),
            "pending" => Ok(ProjectStatus::Pending),
            other => Err(ValidationError(format!(
                "status must be one of active|inactive|pending, got {other:?}"
            ))),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Inactive => "inactive",
            ProjectStatus::Pending => "pending",
        }
    }
}

/// Canonical storage format for record timestamps: fixed-width RFC 3339 UTC
/// with millisecond precision, so lexicographic order over the stored text
/// equals chronological order.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(input)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ValidationError(format!("invalid timestamp {input:?}: {e}")))
}

/// The unit of discovery. The record store owns the durable state; the
/// discovery engine only ever holds transient read projections of this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub sector: String,
    pub location: String,
    pub province: Province,
    /// Millions of currency units, `>= 0`.
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
    pub status: ProjectStatus,
    pub views: u64,
    pub image_ref: Option<String>,
    pub document_ref: Option<String>,
    pub owner_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
