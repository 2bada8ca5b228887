//! Request handlers.

pub mod downloads;
pub mod health;
pub mod status;

pub use downloads::*;
pub use health::*;
pub use status::*;
