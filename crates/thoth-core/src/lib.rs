//! `thoth-core`: configuration, shared errors and identifiers used by every Thoth crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::ThothConfig;
pub use error::{Result, ThothError};
pub use types::MemberId;
