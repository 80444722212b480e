use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use timetable_export::{FsDocumentStore, SqlTimeEntrySource, TimetableConfig, TimetableService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up TIMETABLE_* settings from a local .env, if any
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting timetable export example");

    let config = TimetableConfig::from_env()?;

    let source = SqlTimeEntrySource::connect(&config.database_url, &config.table_prefix).await?;
    let store = FsDocumentStore::new(&config.data_root);
    let bind_addr = config.bind_addr.clone();

    let timetable_service = TimetableService::new(Arc::new(source), Arc::new(store), config);

    let app = Router::new()
        .merge(timetable_service.router())
        .route("/health", axum::routing::get(|| async { "OK" }));

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Server running on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/*
Example usage:

1. GET /timetable
   - Returns the picker defaults (first and last day of the previous month)

2. POST /timetable
   - Form fields: action=generate, timetable_begindate_, timetable_begindate_day,
     timetable_begindate_month, timetable_begindate_year and the same for
     timetable_enddate_
   - Writes <data_root>/temp/timetable-<Month>.csv and returns its download URL

3. GET /document?modulepart=timetable&file=temp%2Ftimetable-March.csv
   - Downloads a generated timetable
*/
