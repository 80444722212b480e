//! Timetable export library
//!
//! This library turns the time entries recorded in an ERP into a per-day,
//! per-user CSV grid, writes it for download, and exposes the date picker
//! and download endpoints as an Axum router.

pub mod config;
pub mod error;
pub mod helpers;
pub mod models;
pub mod service;

pub use config::TimetableConfig;
pub use error::ExportError;
pub use service::{TimetableService, GenerateResponse};

// Re-export key types for convenience
pub use helpers::csv::build_timetable;
pub use helpers::source::{SqlTimeEntrySource, StaticTimeEntrySource, TimeEntrySource};
pub use helpers::storage::{DocumentStore, FsDocumentStore};
pub use models::timetable::{DateRange, ExportOutcome, GenerateForm, TimeEntry, Timetable};
