//! Worker error types.

use std::fmt;
use thiserror::Error;

use vfetch_media::MediaError;
use vfetch_models::SourceUrlError;

use crate::store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid source URL")]
    InvalidSource(#[from] SourceUrlError),

    #[error("Source fetch timed out after {0}s")]
    FetchTimeout(u64),

    #[error("Transcode timed out after {0}s")]
    TranscodeTimeout(u64),

    #[error("{0}")]
    Media(#[from] MediaError),

    #[error("Task store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse failure classification, used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    SourceUnavailable,
    TransportFailure,
    ProcessingFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::SourceUnavailable => "SourceUnavailable",
            ErrorKind::TransportFailure => "TransportFailure",
            ErrorKind::ProcessingFailure => "ProcessingFailure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WorkerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::InvalidSource(_) => ErrorKind::InvalidInput,
            WorkerError::FetchTimeout(_) => ErrorKind::TransportFailure,
            WorkerError::Media(e) => match e {
                MediaError::NoSuitableStream => ErrorKind::SourceUnavailable,
                MediaError::DownloadFailed { .. } | MediaError::YtDlpNotFound => {
                    ErrorKind::TransportFailure
                }
                _ => ErrorKind::ProcessingFailure,
            },
            WorkerError::TranscodeTimeout(_)
            | WorkerError::Store(_)
            | WorkerError::Io(_)
            | WorkerError::Internal(_) => ErrorKind::ProcessingFailure,
        }
    }

    /// Message recorded on the failed task.
    ///
    /// Local I/O and store details stay in the logs.
    pub fn task_message(&self) -> String {
        match self {
            WorkerError::Store(_) | WorkerError::Io(_) | WorkerError::Internal(_) => {
                "Internal error".to_string()
            }
            other => other.to_string(),
        }
    }
}
