//! SQLite run archive.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never touches the store. Callers record finished runs.

use crate::{
    error::{FairError, FairResult},
    run::SimulationRun,
    stats::SummaryStatistics,
    types::{RunId, Seed},
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

pub struct RunStore {
    conn: Connection,
}

/// Header row of an archived run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    pub run_id:         RunId,
    pub seed:           Seed,
    pub trial_count:    usize,
    pub engine_version: String,
    pub created_at:     String,
}

impl RunStore {
    /// Open (or create) the archive at `path`.
    pub fn open(path: &str) -> FairResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FairResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FairResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_runs.sql"))?;
        Ok(())
    }

    // ── Runs ───────────────────────────────────────────────────

    /// Archive a run with its summary. Returns the generated run id.
    pub fn record_run(
        &self,
        run: &SimulationRun,
        summary: &SummaryStatistics,
        engine_version: &str,
    ) -> FairResult<RunId> {
        let run_id = Uuid::new_v4().to_string();
        let scenario_json = serde_json::to_string(run.scenario())?;
        let summary_json = serde_json::to_string(summary)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO simulation_run
                (run_id, seed, trial_count, scenario_json, summary_json, engine_version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run_id,
                run.seed() as i64,
                run.trial_count() as i64,
                scenario_json,
                summary_json,
                engine_version,
                Utc::now().to_rfc3339(),
            ],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO trial_loss (run_id, trial_index, event_count, total_loss)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (i, trial) in run.trials().iter().enumerate() {
                stmt.execute(params![run_id, i as i64, trial.event_count as i64, trial.total_loss])?;
            }
        }
        tx.commit()?;

        log::debug!("archived run {run_id} ({} trials)", run.trial_count());
        Ok(run_id)
    }

    pub fn load_summary(&self, run_id: &str) -> FairResult<SummaryStatistics> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT summary_json FROM simulation_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        let json = json.ok_or_else(|| FairError::RunNotFound { run_id: run_id.to_string() })?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Annual losses of an archived run, in trial order.
    pub fn load_losses(&self, run_id: &str) -> FairResult<Vec<f64>> {
        if !self.run_exists(run_id)? {
            return Err(FairError::RunNotFound { run_id: run_id.to_string() });
        }
        let mut stmt = self.conn.prepare(
            "SELECT total_loss FROM trial_loss WHERE run_id = ?1 ORDER BY trial_index ASC",
        )?;
        let losses = stmt
            .query_map(params![run_id], |row| row.get::<_, f64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(losses)
    }

    /// Most recently archived runs first.
    pub fn recent_runs(&self, limit: usize) -> FairResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, seed, trial_count, engine_version, created_at
             FROM simulation_run
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RunRecord {
                    run_id:         row.get(0)?,
                    seed:           row.get::<_, i64>(1)? as u64,
                    trial_count:    row.get::<_, i64>(2)? as usize,
                    engine_version: row.get(3)?,
                    created_at:     row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn run_count(&self) -> FairResult<i64> {
        let count: i64 =
            self.conn.query_row("SELECT COUNT(*) FROM simulation_run", [], |row| row.get(0))?;
        Ok(count)
    }

    fn run_exists(&self, run_id: &str) -> FairResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM simulation_run WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
