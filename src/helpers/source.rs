use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::models::timetable::{DateRange, TimeEntry};

/// Anything able to list the time entries recorded inside a date range.
#[async_trait]
pub trait TimeEntrySource: Send + Sync {
    /// All entries whose date lies in `range`, bounds included.
    async fn fetch(&self, range: &DateRange) -> Result<Vec<TimeEntry>>;
}

/// Reads entries straight from the ERP's project tables.
#[derive(Clone)]
pub struct SqlTimeEntrySource {
    pool: SqlitePool,
    query: String,
}

impl SqlTimeEntrySource {
    pub fn new(pool: SqlitePool, table_prefix: &str) -> Self {
        info!("Creating SQL time entry source with prefix '{}'", table_prefix);
        Self {
            pool,
            query: build_query(table_prefix),
        }
    }

    pub async fn connect(database_url: &str, table_prefix: &str) -> Result<Self> {
        info!("Connecting to time tracking database");
        let pool = match SqlitePool::connect(database_url).await {
            Ok(pool) => pool,
            Err(e) => {
                error!("Failed to connect to time tracking database: {}", e);
                return Err(e.into());
            }
        };
        Ok(Self::new(pool, table_prefix))
    }
}

fn build_query(prefix: &str) -> String {
    format!(
        "SELECT t.task_date, pt.label, u.login, u.firstname, u.lastname, p.title \
         FROM ((({prefix}projet_task_time AS t \
         INNER JOIN {prefix}projet_task AS pt ON t.fk_task = pt.rowid) \
         INNER JOIN {prefix}projet AS p ON pt.fk_projet = p.rowid) \
         INNER JOIN {prefix}user AS u ON t.fk_user = u.rowid) \
         WHERE date(t.task_date) >= ? AND date(t.task_date) <= ?"
    )
}

#[async_trait]
impl TimeEntrySource for SqlTimeEntrySource {
    async fn fetch(&self, range: &DateRange) -> Result<Vec<TimeEntry>> {
        info!("Fetching time entries for {}", range);

        let rows = match sqlx::query(&self.query)
            .bind(range.begin().to_string())
            .bind(range.end().to_string())
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                error!("Time entry query failed: {}", e);
                return Err(e.into());
            }
        };

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let raw_date: String = row.try_get("task_date")?;
            // Stored either as a date or as a datetime.
            let date = match raw_date
                .get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            {
                Some(date) => date,
                None => {
                    warn!("Skipping time entry with unreadable date '{}'", raw_date);
                    continue;
                }
            };

            entries.push(TimeEntry {
                date,
                login: row.try_get("login")?,
                first_name: row.try_get::<Option<String>, _>("firstname")?.unwrap_or_default(),
                last_name: row.try_get::<Option<String>, _>("lastname")?.unwrap_or_default(),
                task_label: row.try_get("label")?,
                project_title: row.try_get("title")?,
            });
        }

        info!("Fetched {} time entries", entries.len());
        Ok(entries)
    }
}

/// Fixed set of entries kept in memory, mostly for demos and tests.
#[derive(Clone, Debug, Default)]
pub struct StaticTimeEntrySource {
    entries: Vec<TimeEntry>,
}

impl StaticTimeEntrySource {
    pub fn new(entries: Vec<TimeEntry>) -> Self {
        Self { entries }
    }
}

#[async_trait]
impl TimeEntrySource for StaticTimeEntrySource {
    async fn fetch(&self, range: &DateRange) -> Result<Vec<TimeEntry>> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| range.contains(entry.date))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_uses_prefix() {
        let query = build_query("erp_");
        assert!(query.contains("erp_projet_task_time AS t"));
        assert!(query.contains("erp_user AS u"));
        assert!(!query.contains("llx_"));
    }

    #[tokio::test]
    async fn test_static_source_filters_range() {
        let entry = |d: u32| TimeEntry {
            date: NaiveDate::from_ymd_opt(2024, 3, d).unwrap(),
            login: "jdoe".to_string(),
            first_name: "John".to_string(),
            last_name: "Doe".to_string(),
            task_label: "Design".to_string(),
            project_title: "Apollo".to_string(),
        };
        let source = StaticTimeEntrySource::new(vec![entry(1), entry(4), entry(8), entry(9)]);
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 8).unwrap(),
        )
        .unwrap();

        let fetched = source.fetch(&range).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        assert_eq!(fetched[1].date, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
    }
}
