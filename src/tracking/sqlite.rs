use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::tracking::{already_active, no_active_run, RunRecord, RunStatus, Tracker};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteTracker {
    conn: Connection,
    active: Option<String>,
}

impl SqliteTracker {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let tracker = Self { conn, active: None };
        tracker.init_db()?;
        Ok(tracker)
    }

    fn init_db(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                ended_at TEXT
            );

            CREATE TABLE IF NOT EXISTS metrics (
                run_id TEXT NOT NULL REFERENCES runs(id),
                key TEXT NOT NULL,
                value REAL NOT NULL,
                logged_at TEXT NOT NULL,
                PRIMARY KEY (run_id, key)
            );

            CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);
            "#,
        )?;

        Ok(())
    }

    fn get_metrics(&self, run_id: &str) -> Result<BTreeMap<String, f64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, value FROM metrics WHERE run_id = ?1 ORDER BY key")?;
        let metrics = stmt.query_map(params![run_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        metrics.collect::<std::result::Result<_, _>>().map_err(Into::into)
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Tracking(format!("bad timestamp {}: {}", value, e)))
}

impl Tracker for SqliteTracker {
    fn start_run(&mut self, name: &str) -> Result<String> {
        if let Some(id) = &self.active {
            return Err(already_active(id));
        }
        let run = RunRecord::start(name);
        self.conn.execute(
            "INSERT INTO runs (id, name, status, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                run.id,
                run.name,
                run.status.to_string(),
                run.started_at.to_rfc3339(),
            ],
        )?;

        tracing::info!("Started tracking run {} ({})", run.id, name);
        self.active = Some(run.id.clone());
        Ok(run.id)
    }

    fn active_run(&self) -> Option<&str> {
        self.active.as_deref()
    }

    fn log_metric(&mut self, key: &str, value: f64) -> Result<()> {
        let run_id = self
            .active
            .as_deref()
            .ok_or_else(|| no_active_run("log a metric"))?;
        self.conn.execute(
            r#"
            INSERT INTO metrics (run_id, key, value, logged_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(run_id, key) DO UPDATE SET
                value = excluded.value,
                logged_at = excluded.logged_at
            "#,
            params![run_id, key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn end_run(&mut self, status: RunStatus) -> Result<()> {
        let run_id = self.active.take().ok_or_else(|| no_active_run("end a run"))?;
        self.conn.execute(
            "UPDATE runs SET status = ?1, ended_at = ?2 WHERE id = ?3",
            params![status.to_string(), Utc::now().to_rfc3339(), run_id],
        )?;
        tracing::info!("Ended tracking run {} with status {}", run_id, status);
        Ok(())
    }

    fn list_runs(&self) -> Result<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, status, started_at, ended_at FROM runs ORDER BY rowid DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name, status, started_at, ended_at)| {
                Ok(RunRecord {
                    metrics: self.get_metrics(&id)?,
                    id,
                    name,
                    status: status.parse()?,
                    started_at: parse_timestamp(&started_at)?,
                    ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
                })
            })
            .collect()
    }
}
