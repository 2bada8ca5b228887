//! Fetch-and-transcode worker.
//!
//! This crate provides:
//! - The in-memory task store
//! - The fetch-and-transcode pipeline state machine
//! - Fire-and-forget task scheduling with bounded concurrency
//! - Working directory lifecycle
//! - Structured task logging and metrics

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod store;
pub mod workdir;

pub use config::WorkerConfig;
pub use error::{ErrorKind, WorkerError, WorkerResult};
pub use executor::TaskExecutor;
pub use logging::TaskLogger;
pub use pipeline::Pipeline;
pub use store::{StoreError, StoreResult, TaskStore};
pub use workdir::WorkDir;
