//! Verkaudit library - Verkada audit log and notification reporting
//!
//! Resolves a report window, pulls audit logs and camera notifications through
//! `verkada_platform` and prints the events worth a human's attention.
pub mod cli;
pub mod credentials;
pub mod datetime;
pub mod error;
pub mod output;
pub mod report;

// Re-export commonly used types
pub use error::{Result, VerkauditError};
pub use report::{ReportOptions, run_report};
