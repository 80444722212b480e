use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::error::{ExportError, Result};
use crate::helpers::pivot::{business_days, Pivot, UserDirectory};
use crate::models::timetable::{DateRange, TimeEntry, Timetable};

const DATE_FORMAT: &str = "%d/%m/%Y";
const SEPARATOR: &str = ", ";

/// Pivots `entries` over the weekdays of `range` and renders the CSV.
///
/// Nothing is written here; see `TimetableService::generate` for the full
/// pipeline.
pub fn build_timetable(range: &DateRange, entries: &[TimeEntry]) -> Result<Timetable> {
    let users = UserDirectory::from_entries(entries);
    if users.is_empty() {
        warn!("No time entries for {}, nothing to export", range);
        return Err(ExportError::NoUsers);
    }

    let pivot = Pivot::from_entries(entries);
    let days = business_days(range);
    let content = render(&users, &pivot, &days);
    let filename = filename_for(range);

    info!(
        "Built timetable {} with {} rows and {} users",
        filename,
        days.len(),
        users.len()
    );

    Ok(Timetable {
        filename,
        content,
        rows: days.len(),
        users: users.len(),
    })
}

/// Header line of display names, then one line per day. Every cell is
/// quoted, and the last line has no trailing newline.
pub fn render(users: &UserDirectory, pivot: &Pivot, days: &[NaiveDate]) -> String {
    let mut lines = Vec::with_capacity(days.len() + 1);

    let header = std::iter::once("").chain(users.display_names());
    lines.push(join_quoted(header));

    for day in days {
        let date = day.format(DATE_FORMAT).to_string();
        let cells = users
            .logins()
            .map(|login| pivot.get(*day, login).unwrap_or_default());
        lines.push(join_quoted(std::iter::once(date.as_str()).chain(cells)));
    }

    lines.join("\n")
}

fn join_quoted<'a>(cells: impl Iterator<Item = &'a str>) -> String {
    cells.map(quote).collect::<Vec<_>>().join(SEPARATOR)
}

fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}

/// `timetable-March.csv` for a range inside one month, otherwise
/// `timetable-March-to-April.csv`.
pub fn filename_for(range: &DateRange) -> String {
    let (begin, end) = (range.begin(), range.end());
    let begin_month = begin.format("%B");

    if begin.year() == end.year() && begin.month() == end.month() {
        format!("timetable-{begin_month}.csv")
    } else {
        format!("timetable-{begin_month}-to-{}.csv", end.format("%B"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(day: NaiveDate, login: &str, first: &str, last: &str, task: &str, project: &str) -> TimeEntry {
        TimeEntry {
            date: day,
            login: login.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            task_label: task.to_string(),
            project_title: project.to_string(),
        }
    }

    #[test]
    fn test_single_entry_timetable() {
        let monday = date(2024, 3, 4);
        let range = DateRange::new(monday, monday).unwrap();
        let entries = vec![entry(monday, "jdoe", "John", "Doe", "Design", "Apollo")];

        let timetable = build_timetable(&range, &entries).unwrap();
        assert_eq!(timetable.filename, "timetable-March.csv");
        assert_eq!(timetable.content, "\"\", \"Doe John\"\n\"04/03/2024\", \"Apollo\"");
        assert_eq!(timetable.rows, 1);
        assert_eq!(timetable.users, 1);
    }

    #[test]
    fn test_meta_project_cell() {
        let monday = date(2024, 3, 4);
        let range = DateRange::new(monday, monday).unwrap();
        let entries = vec![entry(monday, "jdoe", "John", "Doe", "Standup", "meta-overhead")];

        let timetable = build_timetable(&range, &entries).unwrap();
        assert!(timetable.content.ends_with("\"04/03/2024\", \"Standup\""));
        assert!(!timetable.content.contains("meta-overhead"));
    }

    #[test]
    fn test_empty_entries_fail() {
        let range = DateRange::new(date(2024, 3, 4), date(2024, 3, 8)).unwrap();
        assert!(matches!(build_timetable(&range, &[]), Err(ExportError::NoUsers)));
    }

    #[test]
    fn test_grid_shape_and_cells() {
        // Thu 29 Feb to Tue 5 March 2024: 4 weekdays
        let range = DateRange::new(date(2024, 2, 29), date(2024, 3, 5)).unwrap();
        let entries = vec![
            entry(date(2024, 2, 29), "bsmith", "Bob", "Smith", "Code", "Gemini"),
            entry(date(2024, 3, 1), "adoe", "Ann", "Doe", "Code", "Apollo"),
            entry(date(2024, 3, 2), "adoe", "Ann", "Doe", "Code", "Weekend"),
            entry(date(2024, 3, 5), "bsmith", "Bob", "Smith", "Review", "meta"),
        ];

        let timetable = build_timetable(&range, &entries).unwrap();
        let lines: Vec<&str> = timetable.content.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "\"\", \"Doe Ann\", \"Smith Bob\"");
        assert_eq!(lines[1], "\"29/02/2024\", \"\", \"Gemini\"");
        assert_eq!(lines[2], "\"01/03/2024\", \"Apollo\", \"\"");
        assert_eq!(lines[3], "\"04/03/2024\", \"\", \"\"");
        assert_eq!(lines[4], "\"05/03/2024\", \"\", \"Review\"");
        assert!(lines.iter().all(|l| l.split(SEPARATOR).count() == 3));
        assert!(!timetable.content.ends_with('\n'));
        assert_eq!(timetable.filename, "timetable-February-to-March.csv");
    }

    #[test]
    fn test_weekend_only_range_has_header_only() {
        let saturday = date(2024, 3, 2);
        let range = DateRange::new(saturday, date(2024, 3, 3)).unwrap();
        let entries = vec![entry(saturday, "jdoe", "John", "Doe", "Design", "Apollo")];

        let timetable = build_timetable(&range, &entries).unwrap();
        assert_eq!(timetable.content, "\"\", \"Doe John\"");
        assert_eq!(timetable.rows, 0);
    }

    #[test]
    fn test_quotes_in_labels_are_doubled() {
        let monday = date(2024, 3, 4);
        let range = DateRange::new(monday, monday).unwrap();
        let entries = vec![entry(monday, "jdoe", "John", "Doe", "Design", "The \"Big\" One")];

        let timetable = build_timetable(&range, &entries).unwrap();
        assert!(timetable.content.ends_with("\"The \"\"Big\"\" One\""));
    }

    #[test]
    fn test_filenames() {
        let range = DateRange::new(date(2024, 3, 1), date(2024, 4, 2)).unwrap();
        assert_eq!(filename_for(&range), "timetable-March-to-April.csv");

        let range = DateRange::new(date(2024, 3, 1), date(2024, 3, 31)).unwrap();
        assert_eq!(filename_for(&range), "timetable-March.csv");

        let range = DateRange::new(date(2024, 1, 15), date(2025, 1, 10)).unwrap();
        assert_eq!(filename_for(&range), "timetable-January-to-January.csv");
    }
}
