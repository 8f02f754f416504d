//! `snooze-core` — shared configuration for the snooze workspace.

pub mod config;
pub mod error;

pub use config::SnoozeConfig;
pub use error::{Result, SnoozeError};
