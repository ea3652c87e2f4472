//! Statement profiling.
//!
//! When [`SessionConfig::profile`](crate::SessionConfig) is on, every statement
//! the session runs is recorded here, keyed by its kind and SQL text. Repeated
//! statements accumulate into one entry.
//!
//! ```ignore
//! let mut session = Session::with_config(db, driver, SessionConfig::default().profile(true));
//! session.insert_batch(&mut rows)?;
//! for p in session.query_log().unwrap().profiles() {
//!     println!("{:?} x{} {:?}: {}", p.kind, p.repetitions, p.duration, p.sql);
//! }
//! ```

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a statement was run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QueryKind {
    /// Row-count statement: DDL, INSERT, UPDATE, DELETE.
    Update,
    /// Statement returning rows.
    Query,
    /// One template executed for many value rows.
    Batch,
}

/// Accumulated cost of one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryProfile {
    pub kind: QueryKind,
    pub sql: String,
    pub repetitions: u64,
    pub duration: Duration,
}

impl QueryProfile {
    /// Mean time per execution.
    pub fn average(&self) -> Duration {
        match u32::try_from(self.repetitions) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.duration / n,
            Err(_) => Duration::from_secs_f64(self.duration.as_secs_f64() / self.repetitions as f64),
        }
    }
}

/// Summary over every recorded statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileStats {
    /// Executions recorded.
    pub total_runs: u64,
    /// Distinct (kind, SQL) pairs.
    pub distinct: usize,
    pub total_duration: Duration,
}

/// Per-statement execution counts and durations.
#[derive(Debug, Default)]
pub struct QueryLog {
    entries: HashMap<(QueryKind, String), QueryProfile>,
}

impl QueryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one execution of `sql`.
    pub fn record(&mut self, kind: QueryKind, sql: &str, elapsed: Duration) {
        let entry = self
            .entries
            .entry((kind, sql.to_string()))
            .or_insert_with(|| QueryProfile {
                kind,
                sql: sql.to_string(),
                repetitions: 0,
                duration: Duration::ZERO,
            });
        entry.repetitions += 1;
        entry.duration += elapsed;
        tracing::trace!(
            target: "dbmap::profile",
            kind = ?kind,
            repetitions = entry.repetitions,
            elapsed_us = elapsed.as_micros(),
            "Recorded statement"
        );
    }

    /// Recorded statements, most expensive first.
    pub fn profiles(&self) -> Vec<QueryProfile> {
        let mut all: Vec<QueryProfile> = self.entries.values().cloned().collect();
        all.sort_by(|a, b| {
            b.duration
                .cmp(&a.duration)
                .then_with(|| a.kind.cmp(&b.kind))
                .then_with(|| a.sql.cmp(&b.sql))
        });
        all
    }

    /// Profile of one statement, if it ran.
    pub fn get(&self, kind: QueryKind, sql: &str) -> Option<&QueryProfile> {
        self.entries.get(&(kind, sql.to_string()))
    }

    #[must_use]
    pub fn stats(&self) -> ProfileStats {
        ProfileStats {
            total_runs: self.entries.values().map(|p| p.repetitions).sum(),
            distinct: self.entries.len(),
            total_duration: self.entries.values().map(|p| p.duration).sum(),
        }
    }

    /// Profiles as JSON, most expensive first.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.profiles())
    }

    /// Forget everything recorded so far.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
