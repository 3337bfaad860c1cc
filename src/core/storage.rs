//! Result records and the persistence contract for completed assessments.
//!
//! Records are append-only: a completed assessment is inserted exactly once
//! and never mutated afterwards. Corrections mean a new row. Dates travel as
//! strings (`YYYY-MM-DD` for calendar dates, RFC3339 for the completion
//! timestamp) and are parsed fallibly on read, so a malformed row degrades to
//! "no usable record" instead of a crash.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Sport context for an assessment. Each (user, sport) pair keeps its own
/// independent history and cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Baseball,
    Softball,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Baseball => "baseball",
            Sport::Softball => "softball",
        }
    }
}

/// Signed deltas of a new result against the prior one, `None` per metric
/// when no prior result existed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComparison {
    pub processing_speed_change: Option<i32>,
    pub decision_efficiency_change: Option<i32>,
    pub visual_motor_change: Option<i32>,
    pub overall_change: Option<i32>,
}

impl ScoreComparison {
    /// The all-null comparison recorded for a baseline run.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn against(
        prior: Option<&DiagnosticResult>,
        processing_speed: u8,
        decision_efficiency: u8,
        visual_motor: u8,
        overall: u8,
    ) -> Self {
        match prior {
            None => Self::none(),
            Some(prev) => Self {
                processing_speed_change: Some(
                    processing_speed as i32 - prev.processing_speed_score as i32,
                ),
                decision_efficiency_change: Some(
                    decision_efficiency as i32 - prev.decision_efficiency_score as i32,
                ),
                visual_motor_change: Some(visual_motor as i32 - prev.visual_motor_score as i32),
                overall_change: Some(overall as i32 - prev.overall_score as i32),
            },
        }
    }
}

/// One completed assessment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticResult {
    /// Opaque id, assigned by the store at insert time. Empty until then.
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub sport: Sport,
    /// Calendar date the assessment was completed, `YYYY-MM-DD`.
    pub test_date: String,
    pub processing_speed_score: u8,
    pub decision_efficiency_score: u8,
    pub visual_motor_score: u8,
    pub overall_score: u8,
    pub comparison_vs_prior: ScoreComparison,
    /// Earliest date a new assessment may be recorded, `YYYY-MM-DD`.
    pub next_test_date: String,
    /// RFC3339 finalization timestamp. A row without one is never "latest".
    #[serde(default)]
    pub completed_at: String,
}

impl DiagnosticResult {
    pub fn is_finalized(&self) -> bool {
        !self.completed_at.is_empty()
    }

    pub fn parsed_test_date(&self) -> Option<Date> {
        parse_date(&self.test_date)
    }

    pub fn parsed_next_test_date(&self) -> Option<Date> {
        parse_date(&self.next_test_date)
    }

    pub fn parsed_completed_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.completed_at, &Rfc3339).ok()
    }
}

const DATE_FORMAT: &[time::format_description::FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Render a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(&DATE_FORMAT)
        .unwrap_or_else(|_| String::from("0000-00-00"))
}

/// Parse `YYYY-MM-DD`; `None` on format drift.
pub fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw, &DATE_FORMAT).ok()
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no data directory available on this platform")]
    NoDataDir,
}

/// Persistence contract the diagnostic consumes: read the single latest
/// finalized result for a (user, sport), append a new one.
pub trait ResultStore {
    fn fetch_latest(
        &self,
        user_id: &str,
        sport: Sport,
    ) -> Result<Option<DiagnosticResult>, StorageError>;

    /// Append an immutable result row. Assigns the id when empty and returns
    /// the persisted row.
    fn insert(&self, result: DiagnosticResult) -> Result<DiagnosticResult, StorageError>;
}

fn latest_of(rows: &[DiagnosticResult], user_id: &str, sport: Sport) -> Option<DiagnosticResult> {
    rows.iter()
        .filter(|row| row.user_id == user_id && row.sport == sport && row.is_finalized())
        .filter_map(|row| row.parsed_test_date().map(|date| (date, row)))
        .max_by_key(|(date, _)| *date)
        .map(|(_, row)| row.clone())
}

/// File-backed store: one JSON array of results under the platform data dir.
/// Inserts rewrite through a temp file and rename, so a crash mid-write
/// leaves the previous file intact.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store under the platform-appropriate application data directory.
    pub fn new() -> Result<Self, StorageError> {
        let dirs = directories::ProjectDirs::from("com", "dugout", "dugout-cognition")
            .ok_or(StorageError::NoDataDir)?;
        Ok(Self::at(dirs.data_dir().join("results.json")))
    }

    /// Store at an explicit path. Used by tests and embedding hosts.
    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> Result<Vec<DiagnosticResult>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn persist(&self, rows: &[DiagnosticResult]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(serde_json::to_string_pretty(rows)?.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ResultStore for JsonFileStore {
    fn fetch_latest(
        &self,
        user_id: &str,
        sport: Sport,
    ) -> Result<Option<DiagnosticResult>, StorageError> {
        Ok(latest_of(&self.load()?, user_id, sport))
    }

    fn insert(&self, mut result: DiagnosticResult) -> Result<DiagnosticResult, StorageError> {
        if result.id.is_empty() {
            result.id = Uuid::new_v4().to_string();
        }
        let mut rows = self.load()?;
        rows.push(result.clone());
        self.persist(&rows)?;
        tracing::debug!(id = %result.id, user = %result.user_id, sport = result.sport.as_str(), "result persisted");
        Ok(result)
    }
}

/// In-memory store for tests and headless drivers.
#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<DiagnosticResult>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().map(|rows| rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultStore for MemoryStore {
    fn fetch_latest(
        &self,
        user_id: &str,
        sport: Sport,
    ) -> Result<Option<DiagnosticResult>, StorageError> {
        let rows = self
            .rows
            .lock()
            .map_err(|_| StorageError::Io(std::io::Error::other("store mutex poisoned")))?;
        Ok(latest_of(&rows, user_id, sport))
    }

    fn insert(&self, mut result: DiagnosticResult) -> Result<DiagnosticResult, StorageError> {
        if result.id.is_empty() {
            result.id = Uuid::new_v4().to_string();
        }
        let mut rows = self
            .rows
            .lock()
            .map_err(|_| StorageError::Io(std::io::Error::other("store mutex poisoned")))?;
        rows.push(result.clone());
        Ok(result)
    }
}
