//! Structured task logging utilities.

use tracing::{error, info, Span};
use vfetch_models::TaskId;

/// Task logger for structured logging with consistent formatting.
///
/// Every event carries the task ID and operation name as fields.
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task_id: String,
    operation: String,
}

impl TaskLogger {
    pub fn new(task_id: &TaskId, operation: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            operation = %self.operation,
            "Task started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            operation = %self.operation,
            "Task progress: {}", message
        );
    }

    /// Log a failure with its classification.
    pub fn log_error(&self, kind: &str, message: &str) {
        error!(
            task_id = %self.task_id,
            operation = %self.operation,
            kind = kind,
            "Task failed: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            operation = %self.operation,
            "Task completed: {}", message
        );
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span wrapping the whole pipeline run.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "task",
            task_id = %self.task_id,
            operation = %self.operation
        )
    }
}
