use chrono::{Datelike, NaiveDate, Weekday};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::info;

use crate::models::timetable::{DateRange, TimeEntry};

/// Users seen in a batch of entries, in column order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserDirectory {
    users: Vec<(String, String)>,
}

impl UserDirectory {
    /// Collects each login once, with the name from its first entry, then
    /// sorts by display name. The sort is stable so equal names keep the
    /// order in which they were first seen.
    pub fn from_entries(entries: &[TimeEntry]) -> Self {
        let mut seen = HashSet::new();
        let mut users = Vec::new();

        for entry in entries {
            if seen.insert(entry.login.as_str()) {
                users.push((entry.login.clone(), entry.display_name()));
            }
        }

        users.sort_by(|a, b| compare_names(&a.1, &b.1));

        info!("Derived {} users from {} entries", users.len(), entries.len());
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn logins(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(|(login, _)| login.as_str())
    }

    pub fn display_names(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(|(_, name)| name.as_str())
    }
}

// Case-insensitive first so "de Vries" sorts next to "Dupont", then by exact
// bytes so the order stays total.
fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Label per (date, login). A later entry for the same pair replaces the
/// earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pivot {
    cells: BTreeMap<NaiveDate, HashMap<String, String>>,
}

impl Pivot {
    pub fn from_entries(entries: &[TimeEntry]) -> Self {
        let mut cells: BTreeMap<NaiveDate, HashMap<String, String>> = BTreeMap::new();

        for entry in entries {
            cells
                .entry(entry.date)
                .or_default()
                .insert(entry.login.clone(), entry.label().to_string());
        }

        Self { cells }
    }

    pub fn get(&self, date: NaiveDate, login: &str) -> Option<&str> {
        self.cells
            .get(&date)
            .and_then(|row| row.get(login))
            .map(String::as_str)
    }

    /// Whether any user has an entry on `date`.
    pub fn has_day(&self, date: NaiveDate) -> bool {
        self.cells.contains_key(&date)
    }
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Every weekday from `begin` to `end`, both included, in order.
pub fn business_days(range: &DateRange) -> Vec<NaiveDate> {
    let end = range.end();
    range
        .begin()
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| is_business_day(*day))
        .collect()
}
