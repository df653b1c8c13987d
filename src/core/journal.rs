//! Append-only session journal.
//!
//! Session lifecycle events are stored as newline-delimited JSON in a single
//! file. Appends take an exclusive file lock so a `capture` invocation and a
//! running scheduler can share the journal.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::domain::{SessionEvent, SessionEventType, TaskResult};

#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Journal writer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// File-based session journal using JSONL format
#[derive(Debug, Clone)]
pub struct SessionJournal {
    path: PathBuf,
}

/// Per-session view rebuilt from the journal
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// "recording", "completed" or "failed"
    pub status: &'static str,
    pub uploads_succeeded: usize,
    pub uploads_failed: usize,
    pub error: Option<String>,
    pub analysis: Option<String>,
}

impl SessionJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Open the journal at `<home>/sessions.jsonl`
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::new(crate::config::paths::session_journal()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append an event to the log
    pub async fn append(&self, event: &SessionEvent) -> Result<(), JournalError> {
        let line = format!("{}\n", serde_json::to_string(event)?);
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || -> Result<(), JournalError> {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)?;

            file.lock_exclusive()?;
            let written = file.write_all(line.as_bytes()).and_then(|_| file.flush());
            file.unlock()?;
            written?;
            Ok(())
        })
        .await?
    }

    /// Replay all events in order
    pub async fn replay(&self) -> Result<Vec<SessionEvent>, JournalError> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut events = Vec::new();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<SessionEvent>(&line) {
                Ok(event) => events.push(event),
                // A torn final line from a killed process must not hide history
                Err(e) => tracing::warn!(error = %e, "Skipping unreadable journal line"),
            }
        }

        Ok(events)
    }

    /// Most recent sessions first
    pub async fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionSummary>, JournalError> {
        let events = self.replay().await?;
        let mut summaries = summarize(&events);
        summaries.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        summaries.truncate(limit);
        Ok(summaries)
    }
}

/// Fold journal events into one summary per session
pub fn summarize(events: &[SessionEvent]) -> Vec<SessionSummary> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut by_id: HashMap<Uuid, SessionSummary> = HashMap::new();

    for event in events {
        let summary = by_id.entry(event.session_id).or_insert_with(|| {
            order.push(event.session_id);
            SessionSummary {
                session_id: event.session_id,
                started_at: event.timestamp,
                finished_at: None,
                status: "recording",
                uploads_succeeded: 0,
                uploads_failed: 0,
                error: None,
                analysis: None,
            }
        });

        match event.event_type {
            SessionEventType::SessionStarted => summary.started_at = event.timestamp,
            SessionEventType::TaskResolved => match event.task_result {
                Some(TaskResult::Succeeded) => summary.uploads_succeeded += 1,
                Some(TaskResult::Failed(_)) => summary.uploads_failed += 1,
                _ => {}
            },
            SessionEventType::SessionCompleted => {
                summary.status = "completed";
                summary.finished_at = Some(event.timestamp);
            }
            SessionEventType::SessionFailed => {
                summary.status = "failed";
                summary.finished_at = Some(event.timestamp);
                summary.error = event.error.clone();
            }
            SessionEventType::AnalysisReceived => {
                summary.analysis = Some(event.summary.clone());
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| by_id.remove(&id))
        .collect()
}
