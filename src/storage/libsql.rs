//! LibSQL storage backend implementation
//!
//! Persists the help desk tables in a local libSQL/SQLite file or a remote
//! libSQL server. Resolving a request is a single transaction, so a request
//! is either still pending with no answer rows, or resolved with exactly one
//! response and one knowledge entry.

use crate::error::{FrontdeskError, Result};
use crate::storage::HelpDeskStore;
use crate::types::{
    EntryId, HelpRequest, KnowledgeBaseEntry, NewHelpRequest, RequestId, RequestStatus,
    RequestWithResponse, Resolution, ResponseId, SupervisorResponse,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use libsql::{params, Builder, Connection, Database, Row};
use tracing::{debug, info, warn};

/// Embedded migrations, applied in order
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial_schema.sql",
        include_str!("../../migrations/libsql/001_initial_schema.sql"),
    ),
    (
        "002_add_indexes.sql",
        include_str!("../../migrations/libsql/002_add_indexes.sql"),
    ),
];

const REQUEST_COLUMNS: &str = "id, question, caller_info, status, created_at, resolved_at";

/// Split a migration file into statements, skipping comment-only lines
fn parse_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }

        if !current.is_empty() {
            current.push('\n');
        }
        current.push_str(line);

        if trimmed.ends_with(';') {
            statements.push(std::mem::take(&mut current));
        }
    }

    if !current.trim().is_empty() {
        statements.push(current);
    }

    statements
}

/// Fixed-width UTC timestamp so that text order equals time order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FrontdeskError::Database(format!("Invalid timestamp '{}': {}", raw, e)))
}

/// Current time at the precision we persist
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Database connection mode
#[derive(Debug, Clone)]
pub enum ConnectionMode {
    /// Local file-based database
    Local(String),
    /// Remote libSQL server
    Remote { url: String, token: String },
}

/// LibSQL storage backend
pub struct LibsqlStorage {
    db: Database,
}

impl LibsqlStorage {
    /// Validate a local database file before opening it
    ///
    /// Returns `Ok(false)` when the file is absent and `must_exist` is false.
    fn validate_database_file(db_path: &str, must_exist: bool) -> Result<bool> {
        use std::io::Read;
        use std::path::Path;

        let path = Path::new(db_path);

        if !path.exists() {
            if must_exist {
                return Err(FrontdeskError::Database(format!(
                    "Database file not found at '{}'. Run 'frontdesk init' first or check {}.",
                    db_path,
                    crate::config::DB_PATH_ENV
                )));
            }
            return Ok(false);
        }

        // SQLite files start with "SQLite format 3\0"; empty files are fresh databases
        let mut header = [0u8; 16];
        let mut file = std::fs::File::open(path).map_err(|e| {
            FrontdeskError::Database(format!(
                "Cannot read database file '{}': {}",
                db_path, e
            ))
        })?;
        let read = file.read(&mut header)?;

        if read == 0 {
            return Ok(true);
        }

        if read < header.len() || &header != b"SQLite format 3\0" {
            return Err(FrontdeskError::Database(format!(
                "Database file at '{}' is corrupted or not a SQLite database.",
                db_path
            )));
        }

        debug!("Database file validation passed: {}", db_path);
        Ok(true)
    }

    /// Connect, verify and migrate
    ///
    /// With `create_if_missing` false a missing local file is an error, which
    /// keeps read-only commands from silently creating empty databases.
    pub async fn new_with_validation(mode: ConnectionMode, create_if_missing: bool) -> Result<Self> {
        info!(
            "Connecting to LibSQL database (create_if_missing: {})",
            create_if_missing
        );

        let db = match mode {
            ConnectionMode::Local(ref path) => {
                let exists = Self::validate_database_file(path, !create_if_missing)?;

                if create_if_missing && !exists {
                    if let Some(parent) = std::path::Path::new(path).parent() {
                        if !parent.as_os_str().is_empty() {
                            std::fs::create_dir_all(parent).map_err(|e| {
                                FrontdeskError::Database(format!(
                                    "Failed to create database directory {}: {}",
                                    parent.display(),
                                    e
                                ))
                            })?;
                        }
                    }
                }

                Builder::new_local(path).build().await.map_err(|e| {
                    FrontdeskError::Database(format!("Failed to open local database: {}", e))
                })?
            }
            ConnectionMode::Remote { ref url, ref token } => {
                Builder::new_remote(url.clone(), token.clone())
                    .build()
                    .await
                    .map_err(|e| {
                        FrontdeskError::Database(format!("Failed to connect to remote database: {}", e))
                    })?
            }
        };

        info!("LibSQL database connection established");

        let storage = Self { db };
        storage.verify_database_health().await?;
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Open an existing database
    pub async fn new(mode: ConnectionMode) -> Result<Self> {
        Self::new_with_validation(mode, false).await
    }

    /// Create from a string location
    ///
    /// - "libsql://..." → Remote (token from `FRONTDESK_DB_TOKEN`)
    /// - anything else → local file path
    pub async fn from_path(database_url: &str, create_if_missing: bool) -> Result<Self> {
        let mode = if database_url.starts_with("libsql://") {
            let token = std::env::var(crate::config::DB_TOKEN_ENV).map_err(|_| {
                FrontdeskError::Config(format!("{} not found", crate::config::DB_TOKEN_ENV))
            })?;
            ConnectionMode::Remote {
                url: database_url.to_string(),
                token,
            }
        } else {
            ConnectionMode::Local(database_url.to_string())
        };

        Self::new_with_validation(mode, create_if_missing).await
    }

    /// Check that the database answers queries and accepts writes
    async fn verify_database_health(&self) -> Result<()> {
        let conn = self.get_conn().await?;

        conn.query("SELECT 1", ()).await.map_err(|e| {
            FrontdeskError::Database(format!(
                "Database corruption detected or invalid database file: {}",
                e
            ))
        })?;

        let write_test = r#"
            CREATE TABLE IF NOT EXISTS _health_check (id INTEGER PRIMARY KEY);
            DROP TABLE IF EXISTS _health_check;
        "#;

        if let Err(e) = conn.execute_batch(write_test).await {
            let error_msg = e.to_string().to_lowercase();
            if error_msg.contains("readonly") || error_msg.contains("permission") {
                return Err(FrontdeskError::Database(format!(
                    "Database is read-only or lacks write permissions: {}",
                    e
                )));
            }
            return Err(FrontdeskError::Database(format!(
                "Database write test failed: {}",
                e
            )));
        }

        debug!("Database health check passed");
        Ok(())
    }

    /// Apply embedded migrations that have not run yet
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");

        let conn = self.get_conn().await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations_applied (
                migration_name TEXT PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| {
            FrontdeskError::Migration(format!("Failed to create migrations table: {}", e))
        })?;

        for (name, sql) in MIGRATIONS {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM _migrations_applied WHERE migration_name = ?",
                    params![*name],
                )
                .await?;

            let already_applied = match rows.next().await? {
                Some(row) => row.get::<i64>(0).unwrap_or(0),
                None => 0,
            };

            if already_applied > 0 {
                debug!("Skipping already applied migration: {}", name);
                continue;
            }

            let statements = parse_sql_statements(sql);
            debug!("Parsed {} statements from {}", statements.len(), name);

            for (i, statement) in statements.iter().enumerate() {
                conn.execute(statement.as_str(), ()).await.map_err(|e| {
                    FrontdeskError::Migration(format!(
                        "Failed to execute statement #{} in {}: {}",
                        i + 1,
                        name,
                        e
                    ))
                })?;
            }

            conn.execute(
                "INSERT INTO _migrations_applied (migration_name, applied_at) VALUES (?, ?)",
                params![*name, Utc::now().timestamp()],
            )
            .await
            .map_err(|e| FrontdeskError::Migration(format!("Failed to record migration: {}", e)))?;

            info!("Executed migration: {}", name);
        }

        info!("Database migrations completed");
        Ok(())
    }

    /// Get a connection with foreign keys enforced
    async fn get_conn(&self) -> Result<Connection> {
        let conn = self
            .db
            .connect()
            .map_err(|e| FrontdeskError::Database(format!("Failed to get connection: {}", e)))?;

        conn.execute("PRAGMA foreign_keys = ON", ()).await?;
        Ok(conn)
    }

    fn row_to_request(row: &Row) -> Result<HelpRequest> {
        let id: String = row.get(0)?;
        let question: String = row.get(1)?;
        let caller_info: String = row.get(2)?;
        let status: String = row.get(3)?;
        let created_at: String = row.get(4)?;
        let resolved_at: Option<String> = row.get(5)?;

        Ok(HelpRequest {
            id: RequestId::from_string(&id)?,
            question,
            caller_info: serde_json::from_str(&caller_info)?,
            status: status
                .parse::<RequestStatus>()
                .map_err(FrontdeskError::Database)?,
            created_at: parse_timestamp(&created_at)?,
            resolved_at: resolved_at.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    fn row_to_entry(row: &Row) -> Result<KnowledgeBaseEntry> {
        let id: String = row.get(0)?;
        let question: String = row.get(1)?;
        let answer: String = row.get(2)?;
        let source_request_id: String = row.get(3)?;
        let created_at: String = row.get(4)?;

        Ok(KnowledgeBaseEntry {
            id: EntryId::from_string(&id)?,
            question,
            answer,
            source_request_id: RequestId::from_string(&source_request_id)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }

    /// Response row, knowledge row and guarded status flip, inside the
    /// caller's transaction. Returns how many requests left `pending`.
    async fn write_resolution(
        conn: &Connection,
        response: &SupervisorResponse,
        entry: &KnowledgeBaseEntry,
    ) -> Result<u64> {
        let request_id = response.request_id.to_string();

        conn.execute(
            "INSERT INTO supervisor_responses (id, request_id, answer, created_at) VALUES (?, ?, ?, ?)",
            params![
                response.id.to_string(),
                request_id.clone(),
                response.answer.clone(),
                format_timestamp(&response.created_at),
            ],
        )
        .await?;

        conn.execute(
            "INSERT INTO knowledge_base (id, question, answer, source_request_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                entry.id.to_string(),
                entry.question.clone(),
                entry.answer.clone(),
                request_id.clone(),
                format_timestamp(&entry.created_at),
            ],
        )
        .await?;

        let updated = conn
            .execute(
                "UPDATE help_requests SET status = ?, resolved_at = ? WHERE id = ? AND status = ?",
                params![
                    RequestStatus::Resolved.as_str(),
                    format_timestamp(&response.created_at),
                    request_id,
                    RequestStatus::Pending.as_str(),
                ],
            )
            .await?;

        Ok(updated)
    }
}

#[async_trait]
impl HelpDeskStore for LibsqlStorage {
    async fn create_help_request(&self, request: NewHelpRequest) -> Result<HelpRequest> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(FrontdeskError::Validation(
                "Question cannot be empty".to_string(),
            ));
        }

        let created = HelpRequest {
            id: RequestId::new(),
            question: question.to_string(),
            caller_info: request.caller_info,
            status: RequestStatus::Pending,
            created_at: now(),
            resolved_at: None,
        };

        debug!("Storing help request: {}", created.id);

        let conn = self.get_conn().await?;
        conn.execute(
            "INSERT INTO help_requests (id, question, caller_info, status, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![
                created.id.to_string(),
                created.question.clone(),
                serde_json::to_string(&created.caller_info)?,
                created.status.as_str(),
                format_timestamp(&created.created_at),
            ],
        )
        .await?;

        Ok(created)
    }

    async fn get_help_request(&self, id: RequestId) -> Result<HelpRequest> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {} FROM help_requests WHERE id = ?", REQUEST_COLUMNS);
        let mut rows = conn.query(&sql, params![id.to_string()]).await?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| FrontdeskError::NotFound(format!("help request {}", id)))?;

        Self::row_to_request(&row)
    }

    async fn list_help_requests(&self, status: Option<RequestStatus>) -> Result<Vec<HelpRequest>> {
        debug!("Listing help requests (status: {:?})", status);

        let conn = self.get_conn().await?;
        let mut rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM help_requests WHERE status = ? ORDER BY created_at DESC, rowid DESC",
                    REQUEST_COLUMNS
                );
                conn.query(&sql, params![status.as_str()]).await?
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM help_requests ORDER BY created_at DESC, rowid DESC",
                    REQUEST_COLUMNS
                );
                conn.query(&sql, ()).await?
            }
        };

        let mut requests = Vec::new();
        while let Some(row) = rows.next().await? {
            requests.push(Self::row_to_request(&row)?);
        }

        Ok(requests)
    }

    async fn list_request_history(&self) -> Result<Vec<RequestWithResponse>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                r#"
                SELECT r.id, r.question, r.caller_info, r.status, r.created_at, r.resolved_at,
                       s.answer, s.created_at
                FROM help_requests r
                LEFT JOIN supervisor_responses s ON s.request_id = r.id
                ORDER BY r.created_at DESC, r.rowid DESC
                "#,
                (),
            )
            .await?;

        let mut history = Vec::new();
        while let Some(row) = rows.next().await? {
            let request = Self::row_to_request(&row)?;
            let answer: Option<String> = row.get(6)?;
            let answered_at: Option<String> = row.get(7)?;

            history.push(RequestWithResponse {
                request,
                answer,
                answered_at: answered_at.as_deref().map(parse_timestamp).transpose()?,
            });
        }

        Ok(history)
    }

    async fn resolve_request(&self, id: RequestId, answer: &str) -> Result<Resolution> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(FrontdeskError::Validation(
                "Please provide an answer".to_string(),
            ));
        }

        debug!("Resolving help request: {}", id);

        let conn = self.get_conn().await?;
        let tx = conn.transaction().await?;

        let sql = format!("SELECT {} FROM help_requests WHERE id = ?", REQUEST_COLUMNS);
        let mut rows = tx.query(&sql, params![id.to_string()]).await?;
        let request = match rows.next().await? {
            Some(row) => Self::row_to_request(&row)?,
            None => {
                drop(rows);
                tx.rollback().await?;
                return Err(FrontdeskError::NotFound(format!("help request {}", id)));
            }
        };
        drop(rows);

        if !request.is_pending() {
            tx.rollback().await?;
            return Err(FrontdeskError::InvalidOperation(format!(
                "Help request {} is already {}",
                id, request.status
            )));
        }

        let resolved_at = now();
        let response = SupervisorResponse {
            id: ResponseId::new(),
            request_id: id,
            answer: answer.to_string(),
            created_at: resolved_at,
        };
        let entry = KnowledgeBaseEntry {
            id: EntryId::new(),
            question: request.question.clone(),
            answer: answer.to_string(),
            source_request_id: id,
            created_at: resolved_at,
        };

        let updated = match Self::write_resolution(&tx, &response, &entry).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!("Resolving help request {} failed: {}; rolling back", id, e);
                if let Err(rollback) = tx.rollback().await {
                    warn!("Rollback for help request {} failed: {}", id, rollback);
                }
                return Err(e);
            }
        };

        if updated != 1 {
            warn!("Help request {} changed while resolving; rolling back", id);
            tx.rollback().await?;
            return Err(FrontdeskError::InvalidOperation(format!(
                "Help request {} is no longer pending",
                id
            )));
        }

        tx.commit().await.map_err(|e| {
            let error_msg = e.to_string();
            if error_msg.contains("locked") || error_msg.contains("busy") {
                FrontdeskError::Database(
                    "Transaction failed: database is locked. Another process may be writing."
                        .to_string(),
                )
            } else {
                FrontdeskError::Database(format!("Transaction commit failed: {}", error_msg))
            }
        })?;

        info!("Resolved help request {}", id);

        Ok(Resolution {
            request: HelpRequest {
                status: RequestStatus::Resolved,
                resolved_at: Some(resolved_at),
                ..request
            },
            response,
            entry,
        })
    }

    async fn list_knowledge(&self) -> Result<Vec<KnowledgeBaseEntry>> {
        let conn = self.get_conn().await?;
        let mut rows = conn
            .query(
                "SELECT id, question, answer, source_request_id, created_at
                 FROM knowledge_base ORDER BY created_at DESC, rowid DESC",
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::row_to_entry(&row)?);
        }

        Ok(entries)
    }

    async fn count_requests(&self, status: Option<RequestStatus>) -> Result<usize> {
        let conn = self.get_conn().await?;
        let mut rows = match status {
            Some(status) => {
                conn.query(
                    "SELECT COUNT(*) FROM help_requests WHERE status = ?",
                    params![status.as_str()],
                )
                .await?
            }
            None => conn.query("SELECT COUNT(*) FROM help_requests", ()).await?,
        };

        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };

        Ok(count as usize)
    }
}
