//! Shared data models for the VFetch backend.
//!
//! This crate provides Serde-serializable types for:
//! - Fetch-and-transcode tasks and their lifecycle
//! - The supported output resolutions
//! - Source stream metadata
//! - Encoding configuration
//! - Source URL parsing and filename sanitization

pub mod encoding;
pub mod resolution;
pub mod stream;
pub mod task;
pub mod utils;

// Re-export common types
pub use encoding::EncodingConfig;
pub use resolution::{Resolution, ResolutionError};
pub use stream::{SourceInfo, StreamInfo, StreamKind};
pub use task::{Task, TaskId, TaskStatus, TransitionError};
pub use utils::{canonical_watch_url, extract_video_id, sanitize_filename, SourceUrlError, SourceUrlResult};
