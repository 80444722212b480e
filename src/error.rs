//! Errors raised while turning a date range into a timetable export.

use thiserror::Error;

/// Everything that can stop an export. None of these are fatal to the host:
/// each one maps to a short message shown in place of the download link.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("begin date {begin} is after end date {end}")]
    InvalidRange {
        begin: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("date fields are empty or misformed: {0}")]
    EmptyDateFields(String),

    #[error("no time entries found, cannot derive any user")]
    NoUsers,

    #[error("failed to write timetable file: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to fetch time entries: {0}")]
    Query(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Message shown to the person who submitted the form.
    pub fn user_message(&self) -> &'static str {
        match self {
            ExportError::InvalidRange { .. } => "The end date must not be before the begin date.",
            ExportError::EmptyDateFields(_) => "Please fill in both dates with valid values.",
            ExportError::NoUsers => "No time was recorded in this period.",
            ExportError::Write(_) => "The timetable file could not be written.",
            ExportError::Query(_) => "Time entries could not be loaded.",
        }
    }

    /// Whether the failure came from the user's input rather than the
    /// database or filesystem.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ExportError::InvalidRange { .. } | ExportError::EmptyDateFields(_) | ExportError::NoUsers
        )
    }
}
