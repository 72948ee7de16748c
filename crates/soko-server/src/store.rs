// SPDX-License-Identifier: Apache-2.0

use crate::StoreError;
use rusqlite::{params, Connection, OpenFlags};
use soko_api::dto::ValidatedDraft;
use soko_model::{format_timestamp, AccountId, ProjectId, ProjectRecord, ProjectStatus};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

pub(crate) const SCHEMA_SQL: &str = "
    CREATE TABLE IF NOT EXISTS projects (
      id INTEGER PRIMARY KEY,
      project_id TEXT NOT NULL UNIQUE,
      title TEXT NOT NULL,
      description TEXT NOT NULL,
      sector TEXT NOT NULL,
      location TEXT NOT NULL,
      province TEXT NOT NULL,
      budget REAL NOT NULL,
      revenue REAL NOT NULL,
      jobs INTEGER NOT NULL,
      profitability REAL NOT NULL,
      goal TEXT NOT NULL,
      technology TEXT NOT NULL,
      impact TEXT NOT NULL,
      incentives TEXT NOT NULL,
      partners TEXT NOT NULL,
      category TEXT NOT NULL,
      status TEXT NOT NULL,
      views INTEGER NOT NULL DEFAULT 0,
      image_ref TEXT,
      document_ref TEXT,
      owner_id TEXT NOT NULL,
      created_at TEXT NOT NULL,
      updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_projects_status ON projects(status);
    CREATE INDEX IF NOT EXISTS idx_projects_status_province ON projects(status, province);
    CREATE INDEX IF NOT EXISTS idx_projects_status_sector ON projects(status, sector);
    CREATE INDEX IF NOT EXISTS idx_projects_created_at ON projects(created_at);
    CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id);
    ";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_backoff: Duration::from_millis(80),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    pub max_read_connections: usize,
    pub busy_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("soko.db"),
            max_read_connections: 16,
            busy_timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Default)]
pub struct StoreMetrics {
    pub read_open_retries: AtomicU64,
    pub read_open_failures: AtomicU64,
    pub view_increments: AtomicU64,
    pub view_increment_failures: AtomicU64,
}

/// Durable home of the project catalog. One WAL writer guarded by an async
/// mutex; readers open their own short-lived read-only connections, capped by
/// a semaphore so a burst cannot exhaust file handles.
pub struct ProjectStore {
    cfg: StoreConfig,
    writer: Mutex<Connection>,
    read_slots: Arc<Semaphore>,
    pub metrics: Arc<StoreMetrics>,
}

/// A pooled read-only connection. Dropping it returns the slot.
pub struct ReadConnection {
    pub conn: Connection,
    _slot: OwnedSemaphorePermit,
}

/// Outcome of an owner-scoped write. `NotFound` and `NotOwner` are data, not
/// errors: the HTTP layer maps them to 404 and 403.
pub enum WriteOutcome<T> {
    Done(T),
    NotFound,
    NotOwner,
}

impl ProjectStore {
    pub fn open(cfg: StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = cfg.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StoreError(format!("create store directory: {e}")))?;
            }
        }
        let conn = Connection::open(&cfg.db_path)
            .map_err(|e| StoreError(format!("open record store: {e}")))?;
        conn.busy_timeout(cfg.busy_timeout)
            .map_err(|e| StoreError(format!("set busy timeout: {e}")))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError(format!("enable WAL: {e}")))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError(format!("set synchronous mode: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| StoreError(format!("apply schema: {e}")))?;
        Ok(Self {
            read_slots: Arc::new(Semaphore::new(cfg.max_read_connections)),
            writer: Mutex::new(conn),
            metrics: Arc::new(StoreMetrics::default()),
            cfg,
        })
    }

    /// Waits for a pool slot, then opens a read-only connection with a small
    /// linear backoff against transient open failures.
    pub async fn read_conn(&self) -> Result<ReadConnection, StoreError> {
        let slot = Arc::clone(&self.read_slots)
            .acquire_owned()
            .await
            .map_err(|e| StoreError(format!("read pool closed: {e}")))?;
        let mut last_error = String::new();
        for attempt in 1..=self.cfg.retry.max_attempts {
            match Connection::open_with_flags(
                &self.cfg.db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            ) {
                Ok(conn) => {
                    conn.busy_timeout(self.cfg.busy_timeout)
                        .map_err(|e| StoreError(format!("set busy timeout: {e}")))?;
                    return Ok(ReadConnection { conn, _slot: slot });
                }
                Err(e) => {
                    last_error = e.to_string();
                    if attempt < self.cfg.retry.max_attempts {
                        self.metrics.read_open_retries.fetch_add(1, Ordering::Relaxed);
                        tokio::time::sleep(self.cfg.retry.base_backoff * attempt as u32).await;
                    }
                }
            }
        }
        self.metrics.read_open_failures.fetch_add(1, Ordering::Relaxed);
        Err(StoreError(format!("open read connection: {last_error}")))
    }

    /// Inserts a new record from a validated draft. Status defaults to
    /// `pending` so new listings stay out of the public catalog until
    /// activated.
    pub async fn create_project(
        &self,
        draft: ValidatedDraft,
        owner: AccountId,
    ) -> Result<ProjectRecord, StoreError> {
        let now = now_stamp();
        let record = ProjectRecord {
            project_id: mint_project_id()?,
            title: draft.title,
            description: draft.description,
            sector: draft.sector.to_string(),
            location: draft.location,
            province: draft.province,
            budget: draft.budget,
            revenue: draft.revenue,
            jobs: draft.jobs,
            profitability: draft.profitability,
            goal: draft.goal,
            technology: draft.technology,
            impact: draft.impact,
            incentives: draft.incentives,
            partners: draft.partners,
            category: draft.category,
            status: draft.status.unwrap_or(ProjectStatus::Pending),
            views: 0,
            image_ref: draft.image_ref,
            document_ref: draft.document_ref,
            owner_id: owner,
            created_at: now,
            updated_at: now,
        };
        let conn = self.writer.lock().await;
        insert_record(&conn, &record).map_err(|e| StoreError(format!("insert project: {e}")))?;
        Ok(record)
    }

    /// Full replace of the mutable fields. `created_at`, `views` and the
    /// owner survive the rewrite; a draft without a status keeps the stored
    /// one.
    pub async fn update_project(
        &self,
        id: &ProjectId,
        draft: ValidatedDraft,
        caller: &AccountId,
    ) -> Result<WriteOutcome<ProjectRecord>, StoreError> {
        let conn = self.writer.lock().await;
        let Some(existing) = soko_query::fetch_project(&conn, id.as_str())
            .map_err(|e| StoreError(format!("load project for update: {e}")))?
        else {
            return Ok(WriteOutcome::NotFound);
        };
        if existing.owner_id != *caller {
            return Ok(WriteOutcome::NotOwner);
        }
        let record = ProjectRecord {
            project_id: existing.project_id,
            title: draft.title,
            description: draft.description,
            sector: draft.sector.to_string(),
            location: draft.location,
            province: draft.province,
            budget: draft.budget,
            revenue: draft.revenue,
            jobs: draft.jobs,
            profitability: draft.profitability,
            goal: draft.goal,
            technology: draft.technology,
            impact: draft.impact,
            incentives: draft.incentives,
            partners: draft.partners,
            category: draft.category,
            status: draft.status.unwrap_or(existing.status),
            views: existing.views,
            image_ref: draft.image_ref,
            document_ref: draft.document_ref,
            owner_id: existing.owner_id,
            created_at: existing.created_at,
            updated_at: now_stamp(),
        };
        update_record(&conn, &record).map_err(|e| StoreError(format!("update project: {e}")))?;
        Ok(WriteOutcome::Done(record))
    }

    pub async fn delete_project(
        &self,
        id: &ProjectId,
        caller: &AccountId,
    ) -> Result<WriteOutcome<()>, StoreError> {
        let conn = self.writer.lock().await;
        let Some(existing) = soko_query::fetch_project(&conn, id.as_str())
            .map_err(|e| StoreError(format!("load project for delete: {e}")))?
        else {
            return Ok(WriteOutcome::NotFound);
        };
        if existing.owner_id != *caller {
            return Ok(WriteOutcome::NotOwner);
        }
        conn.execute(
            "DELETE FROM projects WHERE project_id = ?1",
            params![id.as_str()],
        )
        .map_err(|e| StoreError(format!("delete project: {e}")))?;
        Ok(WriteOutcome::Done(()))
    }

    /// Single in-place increment on the writer connection. Returns whether a
    /// row matched.
    pub async fn record_view(&self, project_id: &str) -> Result<bool, StoreError> {
        let conn = self.writer.lock().await;
        soko_query::record_view(&conn, project_id)
            .map_err(|e| StoreError(format!("record view: {e}")))
    }
}

fn mint_project_id() -> Result<ProjectId, StoreError> {
    let raw = format!("prj-{}", uuid::Uuid::new_v4().simple());
    ProjectId::parse(&raw).map_err(|e| StoreError(format!("mint project id: {e}")))
}

/// Millisecond precision, matching the stored text, so a freshly written
/// record compares equal to its later read-back.
fn now_stamp() -> chrono::DateTime<chrono::Utc> {
    let now = chrono::Utc::now();
    chrono::DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn insert_record(conn: &Connection, record: &ProjectRecord) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO projects (project_id, title, description, sector, location, province, \
         budget, revenue, jobs, profitability, goal, technology, impact, incentives, partners, \
         category, status, views, image_ref, document_ref, owner_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, \
         ?18, ?19, ?20, ?21, ?22, ?23)",
        params![
            record.project_id.as_str(),
            record.title,
            record.description,
            record.sector,
            record.location,
            record.province.label(),
            record.budget,
            record.revenue,
            record.jobs as i64,
            record.profitability,
            record.goal,
            record.technology,
            record.impact,
            record.incentives,
            record.partners,
            record.category.label(),
            record.status.as_str(),
            record.views as i64,
            record.image_ref,
            record.document_ref,
            record.owner_id.as_str(),
            format_timestamp(record.created_at),
            format_timestamp(record.updated_at),
        ],
    )?;
    Ok(())
}

fn update_record(conn: &Connection, record: &ProjectRecord) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE projects SET title = ?2, description = ?3, sector = ?4, location = ?5, \
         province = ?6, budget = ?7, revenue = ?8, jobs = ?9, profitability = ?10, goal = ?11, \
         technology = ?12, impact = ?13, incentives = ?14, partners = ?15, category = ?16, \
         status = ?17, views = ?18, image_ref = ?19, document_ref = ?20, updated_at = ?21 \
         WHERE project_id = ?1",
        params![
            record.project_id.as_str(),
            record.title,
            record.description,
            record.sector,
            record.location,
            record.province.label(),
            record.budget,
            record.revenue,
            record.jobs as i64,
            record.profitability,
            record.goal,
            record.technology,
            record.impact,
            record.incentives,
            record.partners,
            record.category.label(),
            record.status.as_str(),
            record.views as i64,
            record.image_ref,
            record.document_ref,
            format_timestamp(record.updated_at),
        ],
    )?;
    Ok(())
}
