//! Fetch-and-transcode task definitions.
//!
//! A [`Task`] is created in [`TaskStatus::Queued`] and moves forward only:
//!
//! ```text
//! Queued -> Fetching -> Processing -> Completed
//!               \            \
//!                +------------+-----> Failed
//! ```
//!
//! `Completed` and `Failed` are terminal. The filename is present only on
//! `Completed` tasks and the error only on `Failed` tasks.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a new random task ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Task processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
pub enum TaskStatus {
    /// Accepted, waiting for the pipeline to start
    #[default]
    Queued,
    /// Resolving the source and downloading streams
    Fetching,
    /// Transcoding to the target resolution
    Processing,
    /// Output file is ready
    Completed,
    /// Terminal failure
    Failed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Queued,
        TaskStatus::Fetching,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "Queued",
            TaskStatus::Fetching => "Fetching",
            TaskStatus::Processing => "Processing",
            TaskStatus::Completed => "Completed",
            TaskStatus::Failed => "Failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether `next` is a legal successor of this status.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (*self, next),
            (Queued, Fetching)
                | (Fetching, Processing)
                | (Processing, Completed)
                | (Fetching | Processing, Failed)
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rejected status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Illegal task transition: {from} -> {to}")]
pub struct TransitionError {
    pub from: TaskStatus,
    pub to: TaskStatus,
}

/// One fetch+transcode job.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Task {
    task_id: TaskId,
    status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    progress: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new queued task.
    pub fn new(task_id: TaskId) -> Self {
        let now = Utc::now();
        Self {
            task_id,
            status: TaskStatus::Queued,
            filename: None,
            error: None,
            progress: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// Output filename, present only once completed.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Failure message, present only once failed.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Transcode progress percentage (0-100).
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Queued -> Fetching.
    pub fn start_fetching(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Fetching)
    }

    /// Fetching -> Processing.
    pub fn begin_processing(&mut self) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Processing)
    }

    /// Processing -> Completed, recording the output filename.
    pub fn complete(&mut self, filename: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Completed)?;
        self.filename = Some(filename.into());
        self.progress = 100;
        Ok(())
    }

    /// Fetching or Processing -> Failed, recording the error message.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// Record transcode progress. Only valid while processing; never moves backwards.
    pub fn set_progress(&mut self, progress: u8) -> Result<(), TransitionError> {
        if self.status != TaskStatus::Processing {
            return Err(TransitionError {
                from: self.status,
                to: self.status,
            });
        }
        let progress = progress.min(100);
        if progress > self.progress {
            self.progress = progress;
            self.updated_at = Utc::now();
        }
        Ok(())
    }

    fn transition(&mut self, next: TaskStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}
