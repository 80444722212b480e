use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ExportError, Result};

/// Project titles containing this marker are bookkeeping projects; their
/// entries are labelled with the task instead.
const META_PROJECT_MARKER: &str = "meta";

/// One recorded unit of work, as returned by the time-entry source.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TimeEntry {
    pub date: NaiveDate,
    pub login: String,
    pub first_name: String,
    pub last_name: String,
    pub task_label: String,
    pub project_title: String,
}

impl TimeEntry {
    /// Column header for this entry's user.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }

    /// Cell value for this entry: the project title, or the task label for
    /// meta projects.
    pub fn label(&self) -> &str {
        if self.project_title.contains(META_PROJECT_MARKER) {
            &self.task_label
        } else {
            &self.project_title
        }
    }
}

/// Inclusive date range, always `begin <= end`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    begin: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(begin: NaiveDate, end: NaiveDate) -> Result<Self> {
        if begin > end {
            return Err(ExportError::InvalidRange { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// The whole calendar month preceding `today`.
    pub fn previous_month(today: NaiveDate) -> Self {
        let end = today - Days::new(u64::from(today.day()));
        let begin = end.with_day(1).unwrap_or(end);
        Self { begin, end }
    }

    pub fn begin(&self) -> NaiveDate {
        self.begin
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.begin <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.begin, self.end)
    }
}

/// Fields posted by the date picker form.
///
/// The combined `timetable_*date_` fields carry the date as typed; the
/// `_day`, `_month` and `_year` companions carry its parsed components.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct GenerateForm {
    pub action: Option<String>,
    #[serde(rename = "timetable_begindate_")]
    pub begin: Option<String>,
    #[serde(rename = "timetable_begindate_day")]
    pub begin_day: Option<String>,
    #[serde(rename = "timetable_begindate_month")]
    pub begin_month: Option<String>,
    #[serde(rename = "timetable_begindate_year")]
    pub begin_year: Option<String>,
    #[serde(rename = "timetable_enddate_")]
    pub end: Option<String>,
    #[serde(rename = "timetable_enddate_day")]
    pub end_day: Option<String>,
    #[serde(rename = "timetable_enddate_month")]
    pub end_month: Option<String>,
    #[serde(rename = "timetable_enddate_year")]
    pub end_year: Option<String>,
}

impl GenerateForm {
    /// Only the `generate` action runs an export; anything else just shows
    /// the picker.
    pub fn wants_export(&self) -> bool {
        self.action.as_deref() == Some("generate")
    }

    pub fn parse_range(&self) -> Result<DateRange> {
        if is_blank(&self.begin) || is_blank(&self.end) {
            return Err(ExportError::EmptyDateFields(
                "begin and end dates are required".to_string(),
            ));
        }

        let begin = parse_components("begin", &self.begin_day, &self.begin_month, &self.begin_year)?;
        let end = parse_components("end", &self.end_day, &self.end_month, &self.end_year)?;

        DateRange::new(begin, end)
    }

    /// Dates to pre-fill in the picker: what was submitted when it parses,
    /// otherwise the previous month.
    pub fn picker_defaults(&self, today: NaiveDate) -> PickerDefaults {
        let fallback = DateRange::previous_month(today);
        let begin = if is_blank(&self.begin) {
            None
        } else {
            parse_components("begin", &self.begin_day, &self.begin_month, &self.begin_year).ok()
        };
        let end = if is_blank(&self.end) {
            None
        } else {
            parse_components("end", &self.end_day, &self.end_month, &self.end_year).ok()
        };

        PickerDefaults {
            begin: begin.unwrap_or(fallback.begin()),
            end: end.unwrap_or(fallback.end()),
        }
    }
}

fn is_blank(field: &Option<String>) -> bool {
    field.as_deref().is_none_or(|value| value.trim().is_empty())
}

fn parse_components(
    which: &str,
    day: &Option<String>,
    month: &Option<String>,
    year: &Option<String>,
) -> Result<NaiveDate> {
    let component = |value: &Option<String>, name: &str| -> Result<u32> {
        value
            .as_deref()
            .map(str::trim)
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| ExportError::EmptyDateFields(format!("{which} {name} is not a number")))
    };

    let day = component(day, "day")?;
    let month = component(month, "month")?;
    let year = component(year, "year")?;
    let year = i32::try_from(year)
        .map_err(|_| ExportError::EmptyDateFields(format!("{which} year is out of range")))?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        ExportError::EmptyDateFields(format!("{which} date {day:02}/{month:02}/{year} does not exist"))
    })
}

/// Dates shown in the picker when the form is rendered.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickerDefaults {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

/// Pure result of the pivot: the CSV text and the name it should be saved as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timetable {
    pub filename: String,
    pub content: String,
    pub rows: usize,
    pub users: usize,
}

/// What the caller gets back once the file is on disk.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub filename: String,
    pub relative_path: String,
    pub url: String,
    pub rows: usize,
    pub users: usize,
}
